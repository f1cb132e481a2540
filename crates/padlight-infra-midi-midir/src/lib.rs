use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use padlight_ports::midi::{
    MidiError, MidiInputPort, MidiInputStream, MidiOutputPort, MidiOutputStream,
    RawMessageCallback, RawMidiMessage,
};
use padlight_ports::types::{DeviceId, MidiPortInfo};

const UNKNOWN_PORT: &str = "Unknown Port";

fn port_id(direction: &str, index: usize, name: &str) -> DeviceId {
    DeviceId(format!("midir:{direction}:{index}:{name}"))
}

pub struct MidirMidiInputPort {
    client_name: String,
}

impl MidirMidiInputPort {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }

    fn create_midi_in(&self) -> Result<MidiInput, MidiError> {
        MidiInput::new(&self.client_name).map_err(|e| MidiError::Backend(e.to_string()))
    }
}

impl Default for MidirMidiInputPort {
    fn default() -> Self {
        Self::new("Padlight")
    }
}

pub struct MidirMidiInputStream {
    connection: Option<MidiInputConnection<RawMessageCallback>>,
}

impl MidiInputStream for MidirMidiInputStream {
    fn close(mut self: Box<Self>) {
        if let Some(connection) = self.connection.take() {
            let _ = connection.close();
        }
    }
}

impl MidiInputPort for MidirMidiInputPort {
    fn list_inputs(&self) -> Result<Vec<MidiPortInfo>, MidiError> {
        let midi_in = self.create_midi_in()?;
        let devices = midi_in
            .ports()
            .iter()
            .enumerate()
            .map(|(index, port)| {
                let name = midi_in
                    .port_name(port)
                    .unwrap_or_else(|_| UNKNOWN_PORT.to_string());
                MidiPortInfo {
                    id: port_id("in", index, &name),
                    name,
                    is_available: true,
                }
            })
            .collect();
        Ok(devices)
    }

    fn open_input(
        &self,
        device_id: &DeviceId,
        cb: RawMessageCallback,
    ) -> Result<Box<dyn MidiInputStream>, MidiError> {
        let mut midi_in = self.create_midi_in()?;
        // SysEx replies carry the handshake, so nothing is filtered.
        midi_in.ignore(Ignore::None);

        let port = midi_in
            .ports()
            .into_iter()
            .enumerate()
            .find(|(index, port)| {
                let name = midi_in
                    .port_name(port)
                    .unwrap_or_else(|_| UNKNOWN_PORT.to_string());
                &port_id("in", *index, &name) == device_id
            })
            .map(|(_, port)| port)
            .ok_or_else(|| MidiError::DeviceNotFound(device_id.to_string()))?;

        let connection = midi_in
            .connect(
                &port,
                "padlight-input",
                |_stamp, message, callback| {
                    if !message.is_empty() {
                        (callback)(RawMidiMessage::new(message));
                    }
                },
                cb,
            )
            .map_err(|e| MidiError::Backend(e.to_string()))?;

        tracing::debug!(device = %device_id, "midi input opened");
        Ok(Box::new(MidirMidiInputStream {
            connection: Some(connection),
        }))
    }
}

pub struct MidirMidiOutputPort {
    client_name: String,
}

impl MidirMidiOutputPort {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }

    fn create_midi_out(&self) -> Result<MidiOutput, MidiError> {
        MidiOutput::new(&self.client_name).map_err(|e| MidiError::Backend(e.to_string()))
    }
}

impl Default for MidirMidiOutputPort {
    fn default() -> Self {
        Self::new("Padlight")
    }
}

pub struct MidirMidiOutputStream {
    connection: Option<MidiOutputConnection>,
}

impl MidiOutputStream for MidirMidiOutputStream {
    fn send(&mut self, bytes: &[u8]) -> Result<(), MidiError> {
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| MidiError::DeviceUnavailable("output closed".to_string()))?;
        connection
            .send(bytes)
            .map_err(|e| MidiError::Send(e.to_string()))
    }

    fn close(mut self: Box<Self>) {
        if let Some(connection) = self.connection.take() {
            let _ = connection.close();
        }
    }
}

impl MidiOutputPort for MidirMidiOutputPort {
    fn list_outputs(&self) -> Result<Vec<MidiPortInfo>, MidiError> {
        let midi_out = self.create_midi_out()?;
        let devices = midi_out
            .ports()
            .iter()
            .enumerate()
            .map(|(index, port)| {
                let name = midi_out
                    .port_name(port)
                    .unwrap_or_else(|_| UNKNOWN_PORT.to_string());
                MidiPortInfo {
                    id: port_id("out", index, &name),
                    name,
                    is_available: true,
                }
            })
            .collect();
        Ok(devices)
    }

    fn open_output(&self, device_id: &DeviceId) -> Result<Box<dyn MidiOutputStream>, MidiError> {
        let midi_out = self.create_midi_out()?;

        let port = midi_out
            .ports()
            .into_iter()
            .enumerate()
            .find(|(index, port)| {
                let name = midi_out
                    .port_name(port)
                    .unwrap_or_else(|_| UNKNOWN_PORT.to_string());
                &port_id("out", *index, &name) == device_id
            })
            .map(|(_, port)| port)
            .ok_or_else(|| MidiError::DeviceNotFound(device_id.to_string()))?;

        let connection = midi_out
            .connect(&port, "padlight-output")
            .map_err(|e| MidiError::Backend(e.to_string()))?;

        tracing::debug!(device = %device_id, "midi output opened");
        Ok(Box::new(MidirMidiOutputStream {
            connection: Some(connection),
        }))
    }
}
