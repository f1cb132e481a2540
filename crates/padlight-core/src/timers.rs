use padlight_ports::types::DeviceId;
use parking_lot::{Condvar, Mutex};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKind {
    HandshakeRetry,
    Liveness,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerKey {
    pub device: DeviceId,
    pub kind: TimerKind,
}

impl TimerKey {
    pub fn new(device: DeviceId, kind: TimerKind) -> Self {
        Self { device, kind }
    }
}

#[derive(Default)]
struct TimerState {
    deadlines: BTreeMap<TimerKey, Instant>,
    fired: VecDeque<TimerKey>,
    running: bool,
}

impl TimerState {
    fn fire_due(&mut self, now: Instant) -> usize {
        let due: Vec<TimerKey> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &due {
            self.deadlines.remove(key);
        }
        let count = due.len();
        self.fired.extend(due);
        count
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }
}

#[derive(Default)]
struct TimerShared {
    state: Mutex<TimerState>,
    wake: Condvar,
}

/// Keyed one-shot timers. At most one deadline per key; scheduling again
/// replaces it. Expired keys are collected with `take_fired`.
#[derive(Default)]
pub struct Timers {
    shared: Arc<TimerShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return;
        }
        self.shared.state.lock().running = true;
        let shared = self.shared.clone();
        *worker = Some(thread::spawn(move || {
            let mut state = shared.state.lock();
            while state.running {
                state.fire_due(Instant::now());
                match state.next_deadline() {
                    Some(deadline) => {
                        shared.wake.wait_until(&mut state, deadline);
                    }
                    None => shared.wake.wait(&mut state),
                }
            }
        }));
    }

    pub fn stop(&self) {
        self.shared.state.lock().running = false;
        self.shared.wake.notify_all();
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
    }

    pub fn schedule(&self, key: TimerKey, delay: Duration) {
        let deadline = Instant::now() + delay;
        let mut state = self.shared.state.lock();
        state.deadlines.insert(key, deadline);
        drop(state);
        self.shared.wake.notify_all();
    }

    /// Returns whether a deadline was pending.
    pub fn cancel(&self, key: &TimerKey) -> bool {
        let mut state = self.shared.state.lock();
        state.fired.retain(|fired| fired != key);
        state.deadlines.remove(key).is_some()
    }

    pub fn cancel_device(&self, device: &DeviceId) {
        let mut state = self.shared.state.lock();
        state.deadlines.retain(|key, _| &key.device != device);
        state.fired.retain(|key| &key.device != device);
    }

    pub fn is_scheduled(&self, key: &TimerKey) -> bool {
        self.shared.state.lock().deadlines.contains_key(key)
    }

    /// Move every deadline at or before `now` to the fired list.
    pub fn fire_due(&self, now: Instant) -> usize {
        self.shared.state.lock().fire_due(now)
    }

    pub fn take_fired(&self) -> Vec<TimerKey> {
        self.shared.state.lock().fired.drain(..).collect()
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        self.stop();
    }
}
