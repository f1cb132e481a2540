use padlight_domain_protocol::InputEvent;
use padlight_domain_signal::{Color, Macros, Signal};
use padlight_ports::types::{DeviceId, PadIndex};
use std::collections::HashMap;
use std::sync::Arc;

/// Consumer of decoded pad input.
pub trait InputReceiver: Send + Sync {
    fn on_signal(&self, signal: Signal);

    fn on_reset(&self) {}
}

/// Turns pad events into signals and hands them to receivers. A press
/// carries the macros current at press time, and the matching release
/// carries the same values even if macros changed in between.
#[derive(Default)]
pub struct InputRouter {
    macros: Macros,
    held: HashMap<(DeviceId, PadIndex), Macros>,
    exclusive: Option<Arc<dyn InputReceiver>>,
    receivers: Vec<Arc<dyn InputReceiver>>,
}

impl InputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn macros(&self) -> Macros {
        self.macros
    }

    pub fn set_macro(&mut self, slot: usize, value: u8) {
        self.macros.set(slot, value);
    }

    pub fn add_receiver(&mut self, receiver: Arc<dyn InputReceiver>) {
        self.receivers.push(receiver);
    }

    pub fn clear_receivers(&mut self) {
        self.receivers.clear();
    }

    /// While set, every pad signal goes only here, untouched.
    pub fn set_exclusive(&mut self, receiver: Option<Arc<dyn InputReceiver>>) {
        self.exclusive = receiver;
    }

    pub fn has_exclusive(&self) -> bool {
        self.exclusive.is_some()
    }

    pub fn route(&mut self, source: &DeviceId, event: InputEvent) {
        let (index, velocity) = match event {
            InputEvent::Reset => {
                for receiver in &self.receivers {
                    receiver.on_reset();
                }
                return;
            }
            InputEvent::Pad { index, velocity } => (index, velocity),
        };

        let mut signal = Signal::from_source(source.clone(), index, Color::gray(velocity >> 1));

        if let Some(exclusive) = &self.exclusive {
            exclusive.on_signal(signal);
            return;
        }

        let key = (source.clone(), index);
        signal.macros = if velocity > 0 {
            self.held.insert(key, self.macros);
            self.macros
        } else {
            self.held.remove(&key).unwrap_or(self.macros)
        };

        for receiver in &self.receivers {
            receiver.on_signal(signal.clone());
        }
    }
}
