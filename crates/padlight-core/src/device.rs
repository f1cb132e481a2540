use crate::heaven::RenderTarget;
use crate::ipc::DeviceSummary;
use crate::outbound::{Liveness, Outbound};
use crate::timers::{TimerKey, TimerKind, Timers};
use padlight_domain_protocol::{
    decode_input, Advisory, Framer, Handshake, HandshakeState, HandshakeStep, Identity,
    InputEvent,
};
use padlight_domain_signal::{PadUpdate, Screen, Signal, Snapshot};
use padlight_ports::midi::{
    MidiError, MidiInputPort, MidiInputStream, MidiOutputPort, RawMidiMessage,
};
use padlight_ports::storage::{DeviceSettingsDto, SettingsDto};
use padlight_ports::types::{DeviceId, InputFormat, PadIndex, Rotation};
use parking_lot::Mutex;
use rtrb::{Consumer, RingBuffer};
use std::sync::Arc;
use std::time::Duration;

const INPUT_QUEUE_CAPACITY: usize = 2048;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceTimings {
    pub handshake_retry: Duration,
    pub liveness_timeout: Duration,
}

impl DeviceTimings {
    pub fn from_settings(settings: &SettingsDto) -> Self {
        Self {
            handshake_retry: Duration::from_millis(settings.handshake_retry_ms),
            liveness_timeout: Duration::from_millis(settings.liveness_timeout_ms),
        }
    }
}

impl Default for DeviceTimings {
    fn default() -> Self {
        Self::from_settings(&SettingsDto::default())
    }
}

/// Transport ports that make up one physical device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortPair {
    pub input: DeviceId,
    pub output: DeviceId,
}

/// What one `PadDevice::poll` turned up.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DevicePoll {
    pub inputs: Vec<InputEvent>,
    pub advisories: Vec<Advisory>,
    pub identified: Option<Identity>,
}

struct Link {
    input: Box<dyn MidiInputStream>,
    queue: Consumer<RawMidiMessage>,
    outbound: Outbound,
}

struct Protocol {
    handshake: Handshake,
    rotation: Rotation,
    input_format: InputFormat,
}

/// One grid controller: its screen, its handshake and its transport link.
pub struct PadDevice {
    id: DeviceId,
    ports: PortPair,
    screen: Screen,
    protocol: Mutex<Protocol>,
    link: Mutex<Option<Link>>,
    timers: Arc<Timers>,
    timings: DeviceTimings,
}

impl PadDevice {
    pub fn new(
        settings: &DeviceSettingsDto,
        ports: PortPair,
        timers: Arc<Timers>,
        timings: DeviceTimings,
    ) -> Self {
        Self {
            id: DeviceId::new(settings.name.clone()),
            ports,
            screen: Screen::new(),
            protocol: Mutex::new(Protocol {
                handshake: Handshake::new(),
                rotation: settings.rotation,
                input_format: settings.input_format,
            }),
            link: Mutex::new(None),
            timers,
            timings,
        }
    }

    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.id.0
    }

    pub fn ports(&self) -> &PortPair {
        &self.ports
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn snapshot(&self) -> Snapshot {
        self.screen.snapshot()
    }

    pub fn is_connected(&self) -> bool {
        self.link.lock().is_some()
    }

    /// Connected, but a send failed and the link refuses further output.
    pub fn is_unavailable(&self) -> bool {
        self.link
            .lock()
            .as_ref()
            .is_some_and(|link| link.outbound.is_unavailable())
    }

    pub fn handshake_state(&self) -> HandshakeState {
        self.protocol.lock().handshake.state()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.protocol.lock().handshake.identity()
    }

    pub fn rotation(&self) -> Rotation {
        self.protocol.lock().rotation
    }

    pub fn input_format(&self) -> InputFormat {
        self.protocol.lock().input_format
    }

    pub fn settings(&self) -> DeviceSettingsDto {
        let protocol = self.protocol.lock();
        DeviceSettingsDto {
            name: self.id.0.clone(),
            rotation: protocol.rotation,
            input_format: protocol.input_format,
        }
    }

    pub fn summary(&self) -> DeviceSummary {
        let connected = self.is_connected();
        let protocol = self.protocol.lock();
        DeviceSummary {
            name: self.id.0.clone(),
            connected,
            identity: protocol.handshake.identity(),
            rotation: protocol.rotation,
            input_format: protocol.input_format,
        }
    }

    fn key(&self, kind: TimerKind) -> TimerKey {
        TimerKey::new(self.id.clone(), kind)
    }

    /// Open both ports and start identifying.
    pub fn connect(
        &self,
        inputs: &dyn MidiInputPort,
        outputs: &dyn MidiOutputPort,
    ) -> Result<(), MidiError> {
        let mut link = self.link.lock();
        if link.is_some() {
            return Ok(());
        }

        let output = outputs.open_output(&self.ports.output)?;

        let (producer, queue) = RingBuffer::new(INPUT_QUEUE_CAPACITY);
        let producer = Arc::new(Mutex::new(producer));
        let cb = Arc::new(move |message: RawMidiMessage| {
            if let Some(mut guard) = producer.try_lock() {
                let _ = guard.push(message);
            }
        });
        let input = match inputs.open_input(&self.ports.input, cb) {
            Ok(input) => input,
            Err(err) => {
                output.close();
                return Err(err);
            }
        };

        *link = Some(Link {
            input,
            queue,
            outbound: Outbound::spawn(self.id.clone(), output),
        });
        drop(link);

        let inquiry = self.protocol.lock().handshake.begin();
        tracing::info!(device = %self.id, "connected, identifying");
        self.send(inquiry);
        self.timers
            .schedule(self.key(TimerKind::HandshakeRetry), self.timings.handshake_retry);
        Ok(())
    }

    /// Close the link and forget the identity. Returns false if already closed.
    pub fn disconnect(&self) -> bool {
        let Some(link) = self.link.lock().take() else {
            return false;
        };
        link.input.close();
        link.outbound.close();
        self.timers.cancel_device(&self.id);
        self.protocol.lock().handshake.reset();
        self.screen.clear();
        tracing::info!(device = %self.id, "disconnected");
        true
    }

    /// Queue raw bytes for the device and arm the liveness watchdog.
    pub fn send(&self, bytes: Vec<u8>) -> bool {
        let link = self.link.lock();
        let Some(link) = link.as_ref() else {
            return false;
        };
        if !link.outbound.send(bytes) {
            return false;
        }
        if link.outbound.arm() {
            self.timers
                .schedule(self.key(TimerKind::Liveness), self.timings.liveness_timeout);
        }
        true
    }

    /// Wait for queued output to reach the transport.
    pub fn flush_output(&self, timeout: Duration) -> bool {
        match self.link.lock().as_ref() {
            Some(link) => link.outbound.flush(timeout),
            None => true,
        }
    }

    /// Retry timer fired: re-send the pending inquiry and re-arm.
    pub fn retry_handshake(&self) -> bool {
        let (message, attempts) = {
            let mut protocol = self.protocol.lock();
            let message = protocol.handshake.retry();
            (message, protocol.handshake.attempts())
        };
        let Some(message) = message else {
            return false;
        };
        tracing::debug!(device = %self.id, attempts, "handshake retry");
        self.send(message);
        self.timers
            .schedule(self.key(TimerKind::HandshakeRetry), self.timings.handshake_retry);
        true
    }

    /// Liveness timer fired. `Progressing` re-arms the watchdog.
    pub fn check_liveness(&self) -> Liveness {
        let liveness = match self.link.lock().as_ref() {
            Some(link) => link.outbound.check_liveness(),
            None => return Liveness::Idle,
        };
        if liveness == Liveness::Progressing {
            self.timers
                .schedule(self.key(TimerKind::Liveness), self.timings.liveness_timeout);
        }
        liveness
    }

    /// Drain the input queue: replies feed the handshake, everything after
    /// identification is decoded into pad events.
    pub fn poll(&self) -> DevicePoll {
        let messages: Vec<RawMidiMessage> = {
            let mut link = self.link.lock();
            let Some(link) = link.as_mut() else {
                return DevicePoll::default();
            };
            std::iter::from_fn(|| link.queue.pop().ok()).collect()
        };

        let mut poll = DevicePoll::default();
        for message in messages {
            let mut protocol = self.protocol.lock();
            if protocol.handshake.is_pending() {
                let outcome = protocol.handshake.on_message(&message.bytes);
                drop(protocol);
                poll.advisories.extend(outcome.advisories);
                match outcome.step {
                    HandshakeStep::Send(bytes) => {
                        self.send(bytes);
                    }
                    HandshakeStep::Identified(identity) => {
                        self.on_identified(identity);
                        poll.identified = Some(identity);
                    }
                    HandshakeStep::Unrecognized => {
                        tracing::debug!(device = %self.id, "unrecognized inquiry reply");
                    }
                    HandshakeStep::Ignored => {}
                }
            } else if message.is_channel_message() {
                if let Some(identity) = protocol.handshake.identity() {
                    let event = decode_input(
                        identity.family,
                        protocol.input_format,
                        protocol.rotation,
                        &message.bytes,
                    );
                    poll.inputs.extend(event);
                }
            }
        }
        poll
    }

    fn on_identified(&self, identity: Identity) {
        self.timers.cancel(&self.key(TimerKind::HandshakeRetry));
        self.screen.clear();
        let clear = identity.family.force_clear();
        if !clear.is_empty() {
            self.send(clear);
        }
        tracing::info!(
            device = %self.id,
            family = %identity.family,
            firmware = ?identity.firmware,
            compression = identity.compression,
            "identified"
        );
    }

    /// Blank the device and its screen.
    pub fn clear(&self) {
        self.screen.clear();
        if let Some(identity) = self.identity() {
            let clear = identity.family.force_clear();
            if !clear.is_empty() {
                self.send(clear);
            }
        }
    }

    pub fn set_rotation(&self, rotation: Rotation) {
        let changed = {
            let mut protocol = self.protocol.lock();
            let changed = protocol.rotation != rotation;
            protocol.rotation = rotation;
            changed
        };
        if changed {
            tracing::debug!(device = %self.id, degrees = rotation.degrees(), "rotation changed");
            self.redraw();
        }
    }

    pub fn set_input_format(&self, input_format: InputFormat) {
        self.protocol.lock().input_format = input_format;
    }

    /// Re-send the whole screen, e.g. after the orientation changed.
    pub fn redraw(&self) {
        let Some(framer) = self.framer() else {
            return;
        };
        let clear = framer.identity().family.force_clear();
        if !clear.is_empty() {
            self.send(clear);
        }
        let snapshot = self.screen.snapshot();
        let batch: Vec<PadUpdate> = snapshot
            .iter()
            .enumerate()
            .filter(|(_, color)| color.is_lit())
            .map(|(index, color)| PadUpdate::new(index as PadIndex, *color))
            .collect();
        for message in framer.frame(&batch, Some(&snapshot)) {
            self.send(message);
        }
    }

    fn framer(&self) -> Option<Framer> {
        let protocol = self.protocol.lock();
        let identity = protocol.handshake.identity()?;
        Some(Framer::new(identity, protocol.rotation))
    }
}

impl RenderTarget for PadDevice {
    fn render(&self, signals: Vec<Signal>) {
        let Some(framer) = self.framer() else {
            return;
        };
        for signal in &signals {
            self.screen.enter(signal);
        }
        let batch = self.screen.flush();
        if batch.is_empty() {
            return;
        }
        let snapshot = self.screen.snapshot();
        for message in framer.frame(&batch, Some(&snapshot)) {
            self.send(message);
        }
    }
}
