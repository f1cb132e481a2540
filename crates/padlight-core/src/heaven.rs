use padlight_domain_signal::Signal;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Something that can show a group of signals released on the same tick.
pub trait RenderTarget: Send + Sync {
    fn render(&self, signals: Vec<Signal>);
}

/// Millisecond buckets. Items filed with delay `d` become due at
/// `last_tick + d + 1`; within a tick they keep filing order.
#[derive(Debug)]
pub struct TickQueue<T> {
    last_tick: u64,
    buckets: BTreeMap<u64, Vec<T>>,
}

impl<T> TickQueue<T> {
    pub fn new() -> Self {
        Self {
            last_tick: 0,
            buckets: BTreeMap::new(),
        }
    }

    pub fn last_tick(&self) -> u64 {
        self.last_tick
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Returns the tick the item is due on.
    pub fn file(&mut self, delay_ms: u64, item: T) -> u64 {
        let due = self.last_tick + delay_ms + 1;
        self.buckets.entry(due).or_default().push(item);
        due
    }

    /// Release everything due at or before `now`, in tick order.
    pub fn advance(&mut self, now: u64) -> Vec<T> {
        if now < self.last_tick {
            return Vec::new();
        }
        self.last_tick = now;
        let later = self.buckets.split_off(&(now + 1));
        let due = std::mem::replace(&mut self.buckets, later);
        due.into_values().flatten().collect()
    }
}

impl<T> Default for TickQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct Filed {
    target: Arc<dyn RenderTarget>,
    signal: Signal,
}

fn same_target(a: &Arc<dyn RenderTarget>, b: &Arc<dyn RenderTarget>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

struct HeavenShared {
    queue: Mutex<TickQueue<Filed>>,
    running: AtomicBool,
    started_at: Instant,
}

impl HeavenShared {
    fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    fn dispatch(&self, now: u64) -> usize {
        let due = self.queue.lock().advance(now);
        let count = due.len();

        let mut groups: Vec<(Arc<dyn RenderTarget>, Vec<Signal>)> = Vec::new();
        for filed in due {
            match groups
                .iter_mut()
                .find(|(target, _)| same_target(target, &filed.target))
            {
                Some((_, signals)) => signals.push(filed.signal),
                None => groups.push((filed.target, vec![filed.signal])),
            }
        }

        for (target, signals) in groups {
            target.render(signals);
        }
        count
    }
}

/// Single clock that releases delayed signals to their devices.
pub struct Heaven {
    shared: Arc<HeavenShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Heaven {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(HeavenShared {
                queue: Mutex::new(TickQueue::new()),
                running: AtomicBool::new(false),
                started_at: Instant::now(),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Spawn the clock thread. Calling it twice is a no-op.
    pub fn start(&self) {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return;
        }
        self.shared.running.store(true, Ordering::SeqCst);
        let shared = self.shared.clone();
        *worker = Some(thread::spawn(move || {
            while shared.running.load(Ordering::SeqCst) {
                shared.dispatch(shared.elapsed_ms());
                thread::sleep(POLL_INTERVAL);
            }
        }));
    }

    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// File a signal for `target`, due after its own `delay_ms`.
    pub fn schedule(&self, target: Arc<dyn RenderTarget>, mut signal: Signal) -> u64 {
        let delay = u64::from(signal.delay_ms);
        signal.delay_ms = 0;
        self.shared.queue.lock().file(delay, Filed { target, signal })
    }

    /// Dispatch everything due at `now` ms. Used by the clock thread and
    /// by callers that drive time themselves. Returns the signal count.
    pub fn advance_to(&self, now: u64) -> usize {
        self.shared.dispatch(now)
    }

    pub fn pending(&self) -> usize {
        self.shared.queue.lock().len()
    }
}

impl Default for Heaven {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Heaven {
    fn drop(&mut self) {
        self.stop();
    }
}
