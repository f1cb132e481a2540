mod support;

use padlight_core::{AppCore, AppError, Command, DisconnectReason, Event};
use padlight_domain_protocol::{AdvisoryKind, Family, InputEvent, DEVICE_INQUIRY};
use padlight_domain_signal::{Color, Signal};
use padlight_ports::types::{Rotation, PAD_COUNT};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::{Duration, Instant};
use support::{novation_reply, MockMidi, MockStorage, Recorder, PRO, WAIT};

const NAME: &str = "Launchpad Pro";

fn app(midi: &MockMidi, storage: &MockStorage) -> AppCore {
    AppCore::new(
        Arc::new(midi.clone()),
        Arc::new(midi.clone()),
        Some(Box::new(storage.clone())),
    )
    .expect("app")
}

fn flush(app: &AppCore) {
    let device = app.registry().get(NAME).expect("device");
    assert!(device.flush_output(WAIT));
}

/// Refresh, answer the inquiry as a stock Pro and drop everything seen so far.
fn identified_app(midi: &MockMidi) -> AppCore {
    let mut app = app(midi, &MockStorage::default());
    app.handle_command(Command::RefreshDevices).expect("refresh");
    midi.inject(NAME, &novation_reply(PRO, [0, 1, 8, 2]));
    app.tick();
    flush(&app);
    midi.clear_sent(NAME);
    app.drain_events();
    app
}

fn fire_timers(app: &AppCore) {
    app.timers().fire_due(Instant::now() + Duration::from_secs(5));
}

#[test]
fn refresh_registers_and_connects_devices() {
    let midi = MockMidi::new(&[NAME]);
    let mut app = app(&midi, &MockStorage::default());
    app.handle_command(Command::RefreshDevices).expect("refresh");

    let events = app.drain_events();
    assert_eq!(events.len(), 1);
    let Event::DevicesUpdated { devices } = &events[0] else {
        panic!("unexpected event {:?}", events[0]);
    };
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name, NAME);
    assert!(devices[0].connected);
    assert_eq!(devices[0].identity, None);

    flush(&app);
    assert_eq!(midi.sent(NAME), vec![DEVICE_INQUIRY.to_vec()]);
}

#[test]
fn refresh_without_auto_connect_only_registers() {
    let midi = MockMidi::new(&[NAME]);
    let mut app = app(&midi, &MockStorage::default());
    app.handle_command(Command::SetAutoConnect { enabled: false })
        .expect("auto connect");
    app.handle_command(Command::RefreshDevices).expect("refresh");

    let device = app.registry().get(NAME).expect("device");
    assert!(!device.is_connected());

    app.handle_command(Command::ConnectDevice { name: NAME.to_string() })
        .expect("connect");
    assert!(device.is_connected());
}

#[test]
fn ports_are_listed() {
    let midi = MockMidi::new(&[NAME, "Other"]);
    let mut app = app(&midi, &MockStorage::default());
    app.handle_command(Command::ListPorts).expect("list");

    let events = app.drain_events();
    let Some(Event::PortsListed { inputs, outputs }) = events.first() else {
        panic!("expected ports");
    };
    assert_eq!(inputs.len(), 2);
    assert_eq!(outputs.len(), 2);
}

#[test]
fn identification_is_reported_and_advisory_latched_once() {
    let midi = MockMidi::new(&[NAME]);
    let mut app = app(&midi, &MockStorage::default());
    app.handle_command(Command::RefreshDevices).expect("refresh");
    app.drain_events();

    midi.inject(NAME, &novation_reply(PRO, [0, 1, 8, 2]));
    app.tick();
    let events = app.drain_events();
    let advisories = events
        .iter()
        .filter(|event| {
            matches!(
                event,
                Event::FirmwareAdvisory { advisory, .. } if advisory.kind == AdvisoryKind::StockFirmware
            )
        })
        .count();
    assert_eq!(advisories, 1);
    assert!(events.iter().any(|event| matches!(
        event,
        Event::DeviceIdentified { identity, .. } if identity.family == Family::Pro
    )));
    assert!(matches!(events.last(), Some(Event::DevicesUpdated { .. })));

    // Reconnect: identified again, but the advisory stays quiet.
    app.handle_command(Command::DisconnectDevice { name: NAME.to_string() })
        .expect("disconnect");
    app.handle_command(Command::ConnectDevice { name: NAME.to_string() })
        .expect("connect");
    app.drain_events();
    midi.inject(NAME, &novation_reply(PRO, [0, 1, 8, 2]));
    app.tick();
    let events = app.drain_events();
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::FirmwareAdvisory { .. })));
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::DeviceIdentified { .. })));
}

#[test]
fn pad_input_is_reported_and_routed() {
    let midi = MockMidi::new(&[NAME]);
    let mut app = identified_app(&midi);
    let recorder = Arc::new(Recorder::default());
    app.router_mut().add_receiver(recorder.clone());
    app.handle_command(Command::SetMacro { slot: 0, value: 30 })
        .expect("macro");

    midi.inject(NAME, &[0x90, 11, 127]);
    app.tick();

    let events = app.drain_events();
    assert!(matches!(
        events.as_slice(),
        [Event::PadInput { event: InputEvent::Pad { index: 11, velocity: 127 }, .. }]
    ));
    let signals = recorder.signals.lock();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].color, Color::gray(63));
    assert_eq!(signals[0].macros.get(0), 30);
}

#[test]
fn rotation_is_saved_and_announced() {
    let midi = MockMidi::new(&[NAME]);
    let storage = MockStorage::default();
    let mut app = app(&midi, &storage);
    app.handle_command(Command::RefreshDevices).expect("refresh");
    app.drain_events();

    app.handle_command(Command::SetRotation {
        name: NAME.to_string(),
        rotation: Rotation::D90,
    })
    .expect("rotate");

    let saved = storage.saved.lock();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].device(NAME).map(|d| d.rotation), Some(Rotation::D90));
    assert_eq!(app.settings().device(NAME).map(|d| d.rotation), Some(Rotation::D90));

    let events = app.drain_events();
    assert!(matches!(
        events.as_slice(),
        [Event::SettingsUpdated { .. }, Event::DevicesUpdated { .. }]
    ));
}

#[test]
fn saved_rotation_is_applied_on_refresh() {
    let midi = MockMidi::new(&[NAME]);
    let mut storage = MockStorage::default();
    storage.initial.upsert_device(padlight_ports::storage::DeviceSettingsDto {
        name: NAME.to_string(),
        rotation: Rotation::D270,
        input_format: Default::default(),
    });
    let mut app = app(&midi, &storage);
    app.handle_command(Command::RefreshDevices).expect("refresh");

    let device = app.registry().get(NAME).expect("device");
    assert_eq!(device.rotation(), Rotation::D270);
}

#[test]
fn unknown_device_is_an_error() {
    let midi = MockMidi::new(&[NAME]);
    let mut app = app(&midi, &MockStorage::default());
    let result = app.handle_command(Command::ClearDevice {
        name: "missing".to_string(),
    });
    assert!(matches!(result, Err(AppError::UnknownDevice(name)) if name == "missing"));
}

#[test]
fn removed_device_is_announced() {
    let midi = MockMidi::new(&[NAME]);
    let mut app = identified_app(&midi);
    app.handle_command(Command::RemoveDevice { name: NAME.to_string() })
        .expect("remove");

    assert!(app.registry().get(NAME).is_none());
    assert!(!midi.is_input_open(NAME));
    let events = app.drain_events();
    assert!(matches!(
        events.first(),
        Some(Event::DeviceDisconnected { reason: DisconnectReason::Removed, .. })
    ));
}

#[test]
fn handshake_retry_resends_the_inquiry() {
    let midi = MockMidi::new(&[NAME]);
    let mut app = app(&midi, &MockStorage::default());
    app.handle_command(Command::RefreshDevices).expect("refresh");
    flush(&app);

    fire_timers(&app);
    app.tick();
    flush(&app);

    assert_eq!(
        midi.sent(NAME),
        vec![DEVICE_INQUIRY.to_vec(), DEVICE_INQUIRY.to_vec()]
    );
    assert!(app.registry().get(NAME).expect("device").is_connected());
}

#[test]
fn stalled_output_disconnects_the_device() {
    let midi = MockMidi::new(&[NAME]);
    midi.set_stalled(true);
    let mut app = app(&midi, &MockStorage::default());
    app.handle_command(Command::RefreshDevices).expect("refresh");
    app.drain_events();

    fire_timers(&app);
    app.tick();
    midi.set_stalled(false);

    let events = app.drain_events();
    assert!(events.iter().any(|event| matches!(
        event,
        Event::DeviceDisconnected { reason: DisconnectReason::Unresponsive, .. }
    )));
    assert!(!app.registry().get(NAME).expect("device").is_connected());
}

#[test]
fn failed_send_disconnects_the_device() {
    let midi = MockMidi::new(&[NAME]);
    midi.set_failing(true);
    let mut app = app(&midi, &MockStorage::default());
    app.handle_command(Command::RefreshDevices).expect("refresh");
    flush(&app);
    app.drain_events();

    app.tick();
    midi.set_failing(false);

    let events = app.drain_events();
    assert!(events.iter().any(|event| matches!(
        event,
        Event::DeviceDisconnected { reason: DisconnectReason::TransportError, .. }
    )));
    let Some(Event::DevicesUpdated { devices }) = events.last() else {
        panic!("unexpected events {events:?}");
    };
    assert!(!devices[0].connected);
    assert!(!app.registry().get(NAME).expect("device").is_connected());
}

#[test]
fn pipeline_output_reaches_the_device() {
    let midi = MockMidi::new(&[NAME]);
    let app = identified_app(&midi);
    let mut pipeline = app.pipeline_to(NAME).expect("pipeline");

    pipeline.send(Signal::new(11, Color::new(63, 0, 0)));
    app.heaven().advance_to(1);
    flush(&app);

    assert_eq!(
        midi.sent(NAME),
        vec![vec![0xF0, 0x00, 0x20, 0x29, 0x02, 0x10, 0x0B, 11, 63, 0, 0, 0xF7]]
    );
}

#[test]
fn diagnostics_are_exported() {
    let midi = MockMidi::new(&[NAME]);
    let mut app = identified_app(&midi);
    let dir = std::env::temp_dir().join(format!("padlight-diagnostics-{}", std::process::id()));

    app.handle_command(Command::ExportDiagnostics {
        path: dir.to_string_lossy().into_owned(),
    })
    .expect("export");

    for file in [
        "app_version.json",
        "platform.json",
        "settings.json",
        "ports.json",
        "devices.json",
    ] {
        assert!(dir.join(file).exists(), "{file} missing");
    }
    let devices: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.join("devices.json")).expect("read"))
            .expect("json");
    assert_eq!(devices[0]["name"], NAME);
    assert_eq!(devices[0]["connected"], true);
    assert_eq!(
        devices[0]["screen"].as_array().map(|screen| screen.len()),
        Some(PAD_COUNT)
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn shutdown_disconnects_every_device() {
    let midi = MockMidi::new(&[NAME, "Matrix"]);
    let mut app = app(&midi, &MockStorage::default());
    app.start();
    app.handle_command(Command::RefreshDevices).expect("refresh");
    assert!(midi.is_input_open(NAME));
    assert!(midi.is_input_open("Matrix"));

    app.shutdown();

    assert!(!midi.is_input_open(NAME));
    assert!(!midi.is_input_open("Matrix"));
    assert!(app.registry().devices().all(|device| !device.is_connected()));
    assert!(!app.heaven().is_running());
}
