#![allow(dead_code)]

use padlight_core::{DeviceTimings, PortPair};
use padlight_domain_signal::Signal;
use padlight_ports::midi::{
    MidiError, MidiInputPort, MidiInputStream, MidiOutputPort, MidiOutputStream,
    RawMessageCallback, RawMidiMessage,
};
use padlight_ports::storage::{DeviceSettingsDto, SettingsDto, StorageError, StoragePort};
use padlight_ports::types::{DeviceId, MidiPortInfo};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub const WAIT: Duration = Duration::from_secs(2);

#[derive(Default)]
struct MockState {
    callbacks: HashMap<String, RawMessageCallback>,
    sent: HashMap<String, Vec<Vec<u8>>>,
    failing: bool,
    stalled: bool,
}

/// In-memory transport: every name is both an input and an output port.
#[derive(Clone, Default)]
pub struct MockMidi {
    names: Vec<String>,
    state: Arc<Mutex<MockState>>,
}

impl MockMidi {
    pub fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|name| name.to_string()).collect(),
            state: Arc::default(),
        }
    }

    pub fn ports(name: &str) -> PortPair {
        PortPair {
            input: DeviceId::new(format!("in:{name}")),
            output: DeviceId::new(format!("out:{name}")),
        }
    }

    pub fn inject(&self, name: &str, bytes: &[u8]) {
        let cb = self.state.lock().callbacks.get(name).cloned();
        if let Some(cb) = cb {
            cb(RawMidiMessage::new(bytes.to_vec()));
        }
    }

    pub fn sent(&self, name: &str) -> Vec<Vec<u8>> {
        self.state.lock().sent.get(name).cloned().unwrap_or_default()
    }

    pub fn clear_sent(&self, name: &str) {
        self.state.lock().sent.remove(name);
    }

    pub fn is_input_open(&self, name: &str) -> bool {
        self.state.lock().callbacks.contains_key(name)
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }

    /// While stalled, output sends block.
    pub fn set_stalled(&self, stalled: bool) {
        self.state.lock().stalled = stalled;
    }

    fn infos(&self, prefix: &str) -> Vec<MidiPortInfo> {
        self.names
            .iter()
            .map(|name| MidiPortInfo {
                id: DeviceId::new(format!("{prefix}:{name}")),
                name: name.clone(),
                is_available: true,
            })
            .collect()
    }

    fn name_for(&self, prefix: &str, id: &DeviceId) -> Result<String, MidiError> {
        id.0.strip_prefix(&format!("{prefix}:"))
            .filter(|name| self.names.iter().any(|known| known.as_str() == *name))
            .map(str::to_string)
            .ok_or_else(|| MidiError::DeviceNotFound(id.to_string()))
    }
}

struct MockInput {
    name: String,
    state: Arc<Mutex<MockState>>,
}

impl MidiInputStream for MockInput {
    fn close(self: Box<Self>) {
        self.state.lock().callbacks.remove(&self.name);
    }
}

struct MockOutput {
    name: String,
    state: Arc<Mutex<MockState>>,
}

impl MidiOutputStream for MockOutput {
    fn send(&mut self, bytes: &[u8]) -> Result<(), MidiError> {
        while self.state.lock().stalled {
            thread::sleep(Duration::from_millis(1));
        }
        let mut state = self.state.lock();
        if state.failing {
            return Err(MidiError::Send("mock failure".to_string()));
        }
        state
            .sent
            .entry(self.name.clone())
            .or_default()
            .push(bytes.to_vec());
        Ok(())
    }

    fn close(self: Box<Self>) {}
}

impl MidiInputPort for MockMidi {
    fn list_inputs(&self) -> Result<Vec<MidiPortInfo>, MidiError> {
        Ok(self.infos("in"))
    }

    fn open_input(
        &self,
        device_id: &DeviceId,
        cb: RawMessageCallback,
    ) -> Result<Box<dyn MidiInputStream>, MidiError> {
        let name = self.name_for("in", device_id)?;
        self.state.lock().callbacks.insert(name.clone(), cb);
        Ok(Box::new(MockInput {
            name,
            state: self.state.clone(),
        }))
    }
}

impl MidiOutputPort for MockMidi {
    fn list_outputs(&self) -> Result<Vec<MidiPortInfo>, MidiError> {
        Ok(self.infos("out"))
    }

    fn open_output(&self, device_id: &DeviceId) -> Result<Box<dyn MidiOutputStream>, MidiError> {
        let name = self.name_for("out", device_id)?;
        Ok(Box::new(MockOutput {
            name,
            state: self.state.clone(),
        }))
    }
}

#[derive(Clone, Default)]
pub struct MockStorage {
    pub initial: SettingsDto,
    pub saved: Arc<Mutex<Vec<SettingsDto>>>,
}

impl StoragePort for MockStorage {
    fn load_settings(&self) -> Result<SettingsDto, StorageError> {
        Ok(self.initial.clone())
    }

    fn save_settings(&self, s: &SettingsDto) -> Result<(), StorageError> {
        self.saved.lock().push(s.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct Recorder {
    pub renders: Mutex<Vec<Vec<Signal>>>,
    pub signals: Mutex<Vec<Signal>>,
    pub resets: AtomicUsize,
}

impl Recorder {
    pub fn render_count(&self) -> usize {
        self.renders.lock().len()
    }

    pub fn reset_count(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

impl padlight_core::RenderTarget for Recorder {
    fn render(&self, signals: Vec<Signal>) {
        self.renders.lock().push(signals);
    }
}

impl padlight_core::InputReceiver for Recorder {
    fn on_signal(&self, signal: Signal) {
        self.signals.lock().push(signal);
    }

    fn on_reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn device_settings(name: &str) -> DeviceSettingsDto {
    DeviceSettingsDto {
        name: name.to_string(),
        rotation: Default::default(),
        input_format: Default::default(),
    }
}

pub fn timings() -> DeviceTimings {
    DeviceTimings::default()
}

/// Inquiry reply from a Novation device.
pub fn novation_reply(code: [u8; 2], version: [u8; 4]) -> Vec<u8> {
    let mut bytes = vec![0xF0, 0x7E, 0x7F, 0x06, 0x02, 0x00, 0x20, 0x29];
    bytes.extend_from_slice(&code);
    bytes.extend_from_slice(&[0x00, 0x00]);
    bytes.extend_from_slice(&version);
    bytes.push(0xF7);
    bytes
}

pub const PRO: [u8; 2] = [0x51, 0x00];

pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}
