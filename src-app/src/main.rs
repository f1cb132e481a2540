use clap::Parser;
use padlight_core::{AppCore, Command, Event};
use padlight_infra_midi_midir::{MidirMidiInputPort, MidirMidiOutputPort};
use padlight_infra_storage_fs::FsStorage;
use padlight_ports::midi::{MidiInputPort, MidiOutputPort};
use padlight_ports::storage::StoragePort;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const TICK_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Parser, Debug)]
#[clap(name = "padlight", version = env!("CARGO_PKG_VERSION"))]
struct Args {
    #[clap(short, long, help = "Settings directory (defaults to the user config dir)")]
    config: Option<PathBuf>,

    #[clap(short, long, help = "List MIDI ports and exit")]
    list: bool,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let storage = match args.config {
        Some(dir) => FsStorage::new(dir),
        None => FsStorage::default(),
    };
    let client_name = storage
        .load_settings()
        .map(|settings| settings.client_name)
        .unwrap_or_else(|_| "Padlight".to_string());

    let inputs: Arc<dyn MidiInputPort> = Arc::new(MidirMidiInputPort::new(client_name.clone()));
    let outputs: Arc<dyn MidiOutputPort> = Arc::new(MidirMidiOutputPort::new(client_name));

    if args.list {
        list_ports(inputs.as_ref(), outputs.as_ref());
        return;
    }

    let storage: Option<Box<dyn StoragePort>> = Some(Box::new(storage));
    let mut core = AppCore::new(inputs, outputs, storage).expect("failed to initialize core");
    core.start();
    if let Err(err) = core.handle_command(Command::RefreshDevices) {
        tracing::warn!(error = %err, "device refresh failed");
    }

    loop {
        core.tick();
        for event in core.drain_events() {
            log_event(&event);
        }

        std::thread::sleep(TICK_INTERVAL);
    }
}

fn list_ports(inputs: &dyn MidiInputPort, outputs: &dyn MidiOutputPort) {
    match inputs.list_inputs() {
        Ok(ports) => {
            println!("inputs:");
            for port in ports {
                println!("  {} ({})", port.name, port.id);
            }
        }
        Err(err) => eprintln!("failed to list inputs: {err}"),
    }
    match outputs.list_outputs() {
        Ok(ports) => {
            println!("outputs:");
            for port in ports {
                println!("  {} ({})", port.name, port.id);
            }
        }
        Err(err) => eprintln!("failed to list outputs: {err}"),
    }
}

fn log_event(event: &Event) {
    match event {
        Event::DevicesUpdated { devices } => {
            tracing::info!(count = devices.len(), "devices updated");
        }
        Event::DeviceIdentified { name, identity } => {
            tracing::info!(device = %name, family = %identity.family, "ready");
        }
        Event::DeviceDisconnected { name, reason } => {
            tracing::info!(device = %name, reason = ?reason, "device gone");
        }
        Event::FirmwareAdvisory { message, .. } => {
            tracing::warn!("{message}");
        }
        other => tracing::debug!(event = ?other, "event"),
    }
}
