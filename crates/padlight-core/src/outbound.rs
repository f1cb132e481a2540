use padlight_ports::midi::MidiOutputStream;
use padlight_ports::types::DeviceId;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub type SharedOutput = Arc<Mutex<Box<dyn MidiOutputStream>>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Liveness {
    /// Nothing queued.
    Idle,
    /// Sends completed since the check was armed, more are queued.
    Progressing,
    /// Messages queued but nothing completed since the check was armed.
    Stalled,
}

#[derive(Default)]
struct Counters {
    queued: AtomicU64,
    /// Finished sends, successful or not.
    done: AtomicU64,
    failed: AtomicU64,
    /// Set by the first failed send. Later messages are dropped unsent.
    unavailable: AtomicBool,
}

impl Counters {
    fn pending(&self) -> u64 {
        self.queued
            .load(Ordering::SeqCst)
            .saturating_sub(self.done.load(Ordering::SeqCst))
    }
}

/// Per-device send queue drained by one worker thread, plus the liveness
/// bookkeeping for that queue.
pub struct Outbound {
    device: DeviceId,
    tx: Option<mpsc::Sender<Vec<u8>>>,
    worker: Option<JoinHandle<()>>,
    output: SharedOutput,
    counters: Arc<Counters>,
    armed_at: Mutex<Option<u64>>,
}

impl Outbound {
    pub fn spawn(device: DeviceId, stream: Box<dyn MidiOutputStream>) -> Self {
        let output: SharedOutput = Arc::new(Mutex::new(stream));
        let counters = Arc::new(Counters::default());
        let (tx, rx) = mpsc::channel::<Vec<u8>>();

        let worker = {
            let output = output.clone();
            let counters = counters.clone();
            let device = device.clone();
            thread::spawn(move || {
                for bytes in rx {
                    if counters.unavailable.load(Ordering::SeqCst) {
                        counters.failed.fetch_add(1, Ordering::SeqCst);
                        counters.done.fetch_add(1, Ordering::SeqCst);
                        continue;
                    }
                    let result = output.lock().send(&bytes);
                    if let Err(err) = result {
                        counters.failed.fetch_add(1, Ordering::SeqCst);
                        counters.unavailable.store(true, Ordering::SeqCst);
                        tracing::warn!(device = %device, error = %err, "midi send failed");
                    }
                    counters.done.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        Self {
            device,
            tx: Some(tx),
            worker: Some(worker),
            output,
            counters,
            armed_at: Mutex::new(None),
        }
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    /// Queue one message. Returns false once the queue is closed or a
    /// previous send failed.
    pub fn send(&self, bytes: Vec<u8>) -> bool {
        if self.is_unavailable() {
            return false;
        }
        let Some(tx) = self.tx.as_ref() else {
            return false;
        };
        self.counters.queued.fetch_add(1, Ordering::SeqCst);
        if tx.send(bytes).is_err() {
            self.counters.done.fetch_add(1, Ordering::SeqCst);
            return false;
        }
        true
    }

    pub fn is_unavailable(&self) -> bool {
        self.counters.unavailable.load(Ordering::SeqCst)
    }

    pub fn pending(&self) -> u64 {
        self.counters.pending()
    }

    pub fn sent(&self) -> u64 {
        self.counters.done.load(Ordering::SeqCst) - self.counters.failed.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u64 {
        self.counters.failed.load(Ordering::SeqCst)
    }

    /// Remember the current completion count. Returns false when already
    /// armed, so callers only start one watchdog at a time.
    pub fn arm(&self) -> bool {
        let mut armed = self.armed_at.lock();
        if armed.is_some() {
            return false;
        }
        *armed = Some(self.counters.done.load(Ordering::SeqCst));
        true
    }

    /// Evaluate the armed watchdog. `Progressing` re-arms at the new count.
    pub fn check_liveness(&self) -> Liveness {
        let mut armed = self.armed_at.lock();
        let done = self.counters.done.load(Ordering::SeqCst);
        if self.counters.pending() == 0 {
            *armed = None;
            return Liveness::Idle;
        }
        match *armed {
            Some(at) if done == at => Liveness::Stalled,
            _ => {
                *armed = Some(done);
                Liveness::Progressing
            }
        }
    }

    /// Block until the queue drains or `timeout` passes.
    pub fn flush(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.pending() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Stop accepting messages. With sends still queued the worker is
    /// detached instead of joined and drops the stream when it finishes.
    pub fn close(mut self) {
        self.tx.take();
        let busy = self.pending() > 0;
        if let Some(worker) = self.worker.take() {
            if !busy {
                let _ = worker.join();
            }
        }
        if let Ok(output) = Arc::try_unwrap(self.output) {
            output.into_inner().close();
        }
    }
}
