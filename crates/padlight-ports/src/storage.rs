use crate::types::*;
use serde::{Deserialize, Serialize};

fn default_client_name() -> String {
    "Padlight".to_string()
}

fn default_auto_connect() -> bool {
    true
}

fn default_handshake_retry_ms() -> u64 {
    1500
}

fn default_liveness_timeout_ms() -> u64 {
    1000
}

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serde(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSettingsDto {
    pub name: String,
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default)]
    pub input_format: InputFormat,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsDto {
    #[serde(default = "default_client_name")]
    pub client_name: String,
    #[serde(default = "default_auto_connect")]
    pub auto_connect: bool,
    #[serde(default = "default_handshake_retry_ms")]
    pub handshake_retry_ms: u64,
    #[serde(default = "default_liveness_timeout_ms")]
    pub liveness_timeout_ms: u64,
    pub devices: Vec<DeviceSettingsDto>,
}

impl Default for SettingsDto {
    fn default() -> Self {
        Self {
            client_name: default_client_name(),
            auto_connect: true,
            handshake_retry_ms: 1500,
            liveness_timeout_ms: 1000,
            devices: Vec::new(),
        }
    }
}

impl SettingsDto {
    pub fn device(&self, name: &str) -> Option<&DeviceSettingsDto> {
        self.devices.iter().find(|device| device.name == name)
    }

    /// Insert or replace the per-device entry for `settings.name`.
    pub fn upsert_device(&mut self, settings: DeviceSettingsDto) {
        match self.devices.iter_mut().find(|d| d.name == settings.name) {
            Some(existing) => *existing = settings,
            None => self.devices.push(settings),
        }
    }
}

pub trait StoragePort: Send + Sync {
    fn load_settings(&self) -> Result<SettingsDto, StorageError>;
    fn save_settings(&self, s: &SettingsDto) -> Result<(), StorageError>;
}
