use crate::device::{DevicePoll, DeviceTimings, PadDevice, PortPair};
use crate::ipc::DeviceSummary;
use crate::timers::Timers;
use padlight_ports::midi::{MidiError, MidiInputPort, MidiOutputPort};
use padlight_ports::storage::{DeviceSettingsDto, SettingsDto};
use padlight_ports::types::MidiPortInfo;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Every known device, keyed by port name.
pub struct DeviceRegistry {
    inputs: Arc<dyn MidiInputPort>,
    outputs: Arc<dyn MidiOutputPort>,
    timers: Arc<Timers>,
    timings: DeviceTimings,
    devices: BTreeMap<String, Arc<PadDevice>>,
}

impl DeviceRegistry {
    pub fn new(
        inputs: Arc<dyn MidiInputPort>,
        outputs: Arc<dyn MidiOutputPort>,
        timers: Arc<Timers>,
        timings: DeviceTimings,
    ) -> Self {
        Self {
            inputs,
            outputs,
            timers,
            timings,
            devices: BTreeMap::new(),
        }
    }

    pub fn list_ports(&self) -> Result<(Vec<MidiPortInfo>, Vec<MidiPortInfo>), MidiError> {
        Ok((self.inputs.list_inputs()?, self.outputs.list_outputs()?))
    }

    /// Pair input and output ports that share a name and register the pairs
    /// not seen before. Returns the names of the new devices.
    pub fn refresh(&mut self, settings: &SettingsDto) -> Result<Vec<String>, MidiError> {
        let (inputs, outputs) = self.list_ports()?;
        let mut added = Vec::new();
        for input in inputs.iter().filter(|port| port.is_available) {
            if self.devices.contains_key(&input.name) {
                continue;
            }
            let Some(output) = outputs
                .iter()
                .find(|port| port.is_available && port.name == input.name)
            else {
                continue;
            };
            let device_settings = settings
                .device(&input.name)
                .cloned()
                .unwrap_or_else(|| DeviceSettingsDto {
                    name: input.name.clone(),
                    rotation: Default::default(),
                    input_format: Default::default(),
                });
            let ports = PortPair {
                input: input.id.clone(),
                output: output.id.clone(),
            };
            self.add(&device_settings, ports);
            added.push(input.name.clone());
        }
        Ok(added)
    }

    /// Register a device, replacing (and disconnecting) any previous entry.
    pub fn add(&mut self, settings: &DeviceSettingsDto, ports: PortPair) -> Arc<PadDevice> {
        let device = Arc::new(PadDevice::new(
            settings,
            ports,
            self.timers.clone(),
            self.timings,
        ));
        if let Some(previous) = self.devices.insert(settings.name.clone(), device.clone()) {
            previous.disconnect();
        }
        tracing::info!(device = %settings.name, "device registered");
        device
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<PadDevice>> {
        let device = self.devices.remove(name)?;
        device.disconnect();
        Some(device)
    }

    pub fn connect(&self, name: &str) -> Result<Arc<PadDevice>, MidiError> {
        let device = self
            .get(name)
            .ok_or_else(|| MidiError::DeviceNotFound(name.to_string()))?;
        if let Err(err) = device.connect(self.inputs.as_ref(), self.outputs.as_ref()) {
            tracing::warn!(device = %name, error = %err, "connect failed");
            return Err(err);
        }
        Ok(device)
    }

    pub fn disconnect(&self, name: &str) -> bool {
        self.get(name).is_some_and(|device| device.disconnect())
    }

    pub fn get(&self, name: &str) -> Option<Arc<PadDevice>> {
        self.devices.get(name).cloned()
    }

    pub fn devices(&self) -> impl Iterator<Item = &Arc<PadDevice>> {
        self.devices.values()
    }

    pub fn list(&self) -> Vec<DeviceSummary> {
        self.devices.values().map(|device| device.summary()).collect()
    }

    /// Drain every connected device's input queue.
    pub fn poll(&self) -> Vec<(Arc<PadDevice>, DevicePoll)> {
        self.devices
            .values()
            .filter(|device| device.is_connected())
            .map(|device| (device.clone(), device.poll()))
            .filter(|(_, poll)| *poll != DevicePoll::default())
            .collect()
    }

    pub fn disconnect_all(&self) {
        for device in self.devices.values() {
            device.disconnect();
        }
    }
}
