use crate::types::*;
use std::{sync::Arc, time::Instant};

pub const SYSEX_START: u8 = 0xF0;
pub const SYSEX_END: u8 = 0xF7;

/// Raw bytes from a MIDI input, as delivered by the platform backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawMidiMessage {
    pub at: Instant,
    pub bytes: Vec<u8>,
}

impl RawMidiMessage {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            at: Instant::now(),
            bytes: bytes.into(),
        }
    }

    /// Complete SysEx frame: starts with F0 and ends with F7.
    pub fn is_sysex(&self) -> bool {
        is_sysex(&self.bytes)
    }

    /// Three-byte channel message (status, data1, data2).
    pub fn is_channel_message(&self) -> bool {
        self.bytes.len() == 3 && (0x80..0xF0).contains(&self.bytes[0])
    }
}

pub fn is_sysex(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == SYSEX_START && bytes[bytes.len() - 1] == SYSEX_END
}

#[derive(thiserror::Error, Debug)]
pub enum MidiError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("send failed: {0}")]
    Send(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// MIDI input stream handle: drop closes it.
pub trait MidiInputStream: Send {
    fn close(self: Box<Self>);
}

/// MIDI output stream handle: one writer at a time, callers serialize access.
pub trait MidiOutputStream: Send {
    fn send(&mut self, bytes: &[u8]) -> Result<(), MidiError>;
    fn close(self: Box<Self>);
}

pub type RawMessageCallback = Arc<dyn Fn(RawMidiMessage) + Send + Sync + 'static>;

pub trait MidiInputPort: Send + Sync {
    fn list_inputs(&self) -> Result<Vec<MidiPortInfo>, MidiError>;

    /// Open input stream: implementation should invoke cb from a background thread/callback.
    fn open_input(
        &self,
        device_id: &DeviceId,
        cb: RawMessageCallback,
    ) -> Result<Box<dyn MidiInputStream>, MidiError>;
}

pub trait MidiOutputPort: Send + Sync {
    fn list_outputs(&self) -> Result<Vec<MidiPortInfo>, MidiError>;

    fn open_output(&self, device_id: &DeviceId) -> Result<Box<dyn MidiOutputStream>, MidiError>;
}
