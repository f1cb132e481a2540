use padlight_domain_protocol::{Advisory, Identity, InputEvent};
use padlight_ports::storage::SettingsDto;
use padlight_ports::types::{InputFormat, MidiPortInfo, Rotation};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub name: String,
    pub connected: bool,
    pub identity: Option<Identity>,
    pub rotation: Rotation,
    pub input_format: InputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisconnectReason {
    Requested,
    Removed,
    /// Output stopped draining within the liveness timeout.
    Unresponsive,
    /// A send to the device failed.
    TransportError,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Command {
    RefreshDevices,
    ListPorts,
    ConnectDevice { name: String },
    DisconnectDevice { name: String },
    RemoveDevice { name: String },
    ClearDevice { name: String },
    SetRotation { name: String, rotation: Rotation },
    SetInputFormat { name: String, input_format: InputFormat },
    SetAutoConnect { enabled: bool },
    SetMacro { slot: usize, value: u8 },
    ExportDiagnostics { path: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    DevicesUpdated { devices: Vec<DeviceSummary> },
    PortsListed { inputs: Vec<MidiPortInfo>, outputs: Vec<MidiPortInfo> },
    DeviceIdentified { name: String, identity: Identity },
    DeviceDisconnected { name: String, reason: DisconnectReason },
    FirmwareAdvisory { advisory: Advisory, message: String },
    PadInput { name: String, event: InputEvent },
    SettingsUpdated { settings: SettingsDto },
}
