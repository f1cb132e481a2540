use crate::advisory::AdvisoryLatch;
use crate::device::{DeviceTimings, PadDevice};
use crate::diagnostics::export_diagnostics;
use crate::heaven::{Heaven, RenderTarget};
use crate::ipc::{Command, DisconnectReason, Event};
use crate::outbound::Liveness;
use crate::pipeline::Pipeline;
use crate::registry::DeviceRegistry;
use crate::router::InputRouter;
use crate::timers::{TimerKind, Timers};
use padlight_ports::midi::{MidiError, MidiInputPort, MidiOutputPort};
use padlight_ports::storage::{SettingsDto, StorageError, StoragePort};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("midi error: {0}")]
    Midi(#[from] MidiError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("unknown device: {0}")]
    UnknownDevice(String),
}

pub struct AppCore {
    storage: Option<Box<dyn StoragePort>>,
    settings: SettingsDto,
    registry: DeviceRegistry,
    heaven: Arc<Heaven>,
    timers: Arc<Timers>,
    router: InputRouter,
    advisories: AdvisoryLatch,
    events: VecDeque<Event>,
}

impl AppCore {
    pub fn new(
        inputs: Arc<dyn MidiInputPort>,
        outputs: Arc<dyn MidiOutputPort>,
        storage: Option<Box<dyn StoragePort>>,
    ) -> Result<Self, AppError> {
        let settings = match storage.as_ref().map(|storage| storage.load_settings()) {
            Some(Ok(settings)) => settings,
            Some(Err(err)) => {
                tracing::warn!(error = %err, "settings unreadable, using defaults");
                SettingsDto::default()
            }
            None => SettingsDto::default(),
        };

        let timers = Arc::new(Timers::new());
        let registry = DeviceRegistry::new(
            inputs,
            outputs,
            timers.clone(),
            DeviceTimings::from_settings(&settings),
        );

        Ok(Self {
            storage,
            settings,
            registry,
            heaven: Arc::new(Heaven::new()),
            timers,
            router: InputRouter::new(),
            advisories: AdvisoryLatch::new(),
            events: VecDeque::new(),
        })
    }

    /// Start the scheduler and timer threads.
    pub fn start(&self) {
        self.heaven.start();
        self.timers.start();
    }

    pub fn shutdown(&mut self) {
        self.registry.disconnect_all();
        self.heaven.stop();
        self.timers.stop();
    }

    pub fn settings(&self) -> &SettingsDto {
        &self.settings
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn heaven(&self) -> Arc<Heaven> {
        self.heaven.clone()
    }

    pub fn timers(&self) -> Arc<Timers> {
        self.timers.clone()
    }

    pub fn router_mut(&mut self) -> &mut InputRouter {
        &mut self.router
    }

    /// A pipeline whose output renders on the named device.
    pub fn pipeline_to(&self, name: &str) -> Result<Pipeline, AppError> {
        let device = self.device(name)?;
        Ok(Pipeline::with_output(
            self.heaven.clone(),
            device as Arc<dyn RenderTarget>,
        ))
    }

    pub fn handle_command(&mut self, cmd: Command) -> Result<(), AppError> {
        match cmd {
            Command::RefreshDevices => {
                self.refresh_devices()?;
            }
            Command::ListPorts => {
                let (inputs, outputs) = self.registry.list_ports()?;
                self.events.push_back(Event::PortsListed { inputs, outputs });
            }
            Command::ConnectDevice { name } => {
                self.device(&name)?;
                self.registry.connect(&name)?;
                self.emit_devices();
            }
            Command::DisconnectDevice { name } => {
                if self.device(&name)?.disconnect() {
                    self.events.push_back(Event::DeviceDisconnected {
                        name,
                        reason: DisconnectReason::Requested,
                    });
                }
                self.emit_devices();
            }
            Command::RemoveDevice { name } => {
                let device = self
                    .registry
                    .remove(&name)
                    .ok_or_else(|| AppError::UnknownDevice(name.clone()))?;
                self.timers.cancel_device(device.id());
                self.events.push_back(Event::DeviceDisconnected {
                    name,
                    reason: DisconnectReason::Removed,
                });
                self.emit_devices();
            }
            Command::ClearDevice { name } => {
                self.device(&name)?.clear();
            }
            Command::SetRotation { name, rotation } => {
                let device = self.device(&name)?;
                device.set_rotation(rotation);
                self.settings.upsert_device(device.settings());
                self.settings_changed();
                self.emit_devices();
            }
            Command::SetInputFormat { name, input_format } => {
                let device = self.device(&name)?;
                device.set_input_format(input_format);
                self.settings.upsert_device(device.settings());
                self.settings_changed();
                self.emit_devices();
            }
            Command::SetAutoConnect { enabled } => {
                self.settings.auto_connect = enabled;
                self.settings_changed();
            }
            Command::SetMacro { slot, value } => {
                self.router.set_macro(slot, value);
            }
            Command::ExportDiagnostics { path } => {
                let (inputs, outputs) = self.registry.list_ports()?;
                let devices: Vec<Arc<PadDevice>> = self.registry.devices().cloned().collect();
                export_diagnostics(Path::new(&path), &self.settings, inputs, outputs, &devices)?;
            }
        }
        Ok(())
    }

    pub fn tick(&mut self) {
        self.process_timers();
        self.process_transport_errors();
        self.process_devices();
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    fn device(&self, name: &str) -> Result<Arc<PadDevice>, AppError> {
        self.registry
            .get(name)
            .ok_or_else(|| AppError::UnknownDevice(name.to_string()))
    }

    fn refresh_devices(&mut self) -> Result<(), AppError> {
        let added = self.registry.refresh(&self.settings)?;
        if self.settings.auto_connect {
            for name in &added {
                // already logged by the registry
                let _ = self.registry.connect(name);
            }
        }
        self.emit_devices();
        Ok(())
    }

    fn process_timers(&mut self) {
        for key in self.timers.take_fired() {
            let Some(device) = self.registry.get(&key.device.0) else {
                continue;
            };
            match key.kind {
                TimerKind::HandshakeRetry => {
                    device.retry_handshake();
                }
                TimerKind::Liveness => {
                    if device.check_liveness() == Liveness::Stalled {
                        tracing::warn!(device = %key.device, "output stalled, disconnecting");
                        device.disconnect();
                        self.events.push_back(Event::DeviceDisconnected {
                            name: device.name().to_string(),
                            reason: DisconnectReason::Unresponsive,
                        });
                        self.emit_devices();
                    }
                }
            }
        }
    }

    fn process_transport_errors(&mut self) {
        let failed: Vec<Arc<PadDevice>> = self
            .registry
            .devices()
            .filter(|device| device.is_unavailable())
            .cloned()
            .collect();
        if failed.is_empty() {
            return;
        }
        for device in failed {
            tracing::warn!(device = %device.id(), "send failed, disconnecting");
            device.disconnect();
            self.events.push_back(Event::DeviceDisconnected {
                name: device.name().to_string(),
                reason: DisconnectReason::TransportError,
            });
        }
        self.emit_devices();
    }

    fn process_devices(&mut self) {
        let mut identified = false;
        for (device, poll) in self.registry.poll() {
            for advisory in poll.advisories {
                if let Some(message) = self.advisories.latch(advisory) {
                    self.events
                        .push_back(Event::FirmwareAdvisory { advisory, message });
                }
            }
            if let Some(identity) = poll.identified {
                identified = true;
                self.events.push_back(Event::DeviceIdentified {
                    name: device.name().to_string(),
                    identity,
                });
            }
            for event in poll.inputs {
                self.events.push_back(Event::PadInput {
                    name: device.name().to_string(),
                    event,
                });
                self.router.route(device.id(), event);
            }
        }
        if identified {
            self.emit_devices();
        }
    }

    fn emit_devices(&mut self) {
        self.events.push_back(Event::DevicesUpdated {
            devices: self.registry.list(),
        });
    }

    fn settings_changed(&mut self) {
        self.save_settings();
        self.events.push_back(Event::SettingsUpdated {
            settings: self.settings.clone(),
        });
    }

    fn save_settings(&self) {
        if let Some(storage) = self.storage.as_ref() {
            if let Err(err) = storage.save_settings(&self.settings) {
                tracing::warn!(error = %err, "failed to save settings");
            }
        }
    }
}
