use crate::device::PadDevice;
use crate::ipc::DeviceSummary;
use padlight_ports::storage::{SettingsDto, StorageError};
use padlight_ports::types::MidiPortInfo;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Serialize)]
struct AppVersion {
    name: String,
    version: String,
}

#[derive(Serialize)]
struct PlatformInfo {
    os: String,
    arch: String,
}

#[derive(Serialize)]
struct PortSnapshot {
    inputs: Vec<MidiPortInfo>,
    outputs: Vec<MidiPortInfo>,
}

#[derive(Serialize)]
struct DeviceState {
    #[serde(flatten)]
    summary: DeviceSummary,
    /// Shown colour per logical index, `[r, g, b]`.
    screen: Vec<[u8; 3]>,
}

pub fn export_diagnostics(
    dir: &Path,
    settings: &SettingsDto,
    inputs: Vec<MidiPortInfo>,
    outputs: Vec<MidiPortInfo>,
    devices: &[Arc<PadDevice>],
) -> Result<(), StorageError> {
    fs::create_dir_all(dir).map_err(|e| StorageError::Io(e.to_string()))?;

    let app_version = AppVersion {
        name: "Padlight".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let platform = PlatformInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
    };

    let devices: Vec<DeviceState> = devices
        .iter()
        .map(|device| DeviceState {
            summary: device.summary(),
            screen: device.snapshot().iter().map(|color| color.to_array()).collect(),
        })
        .collect();

    write_json(&dir.join("app_version.json"), &app_version)?;
    write_json(&dir.join("platform.json"), &platform)?;
    write_json(&dir.join("settings.json"), settings)?;
    write_json(&dir.join("ports.json"), &PortSnapshot { inputs, outputs })?;
    write_json(&dir.join("devices.json"), &devices)?;

    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    let data = serde_json::to_vec_pretty(value).map_err(|e| StorageError::Serde(e.to_string()))?;
    fs::write(path, data).map_err(|e| StorageError::Io(e.to_string()))
}
