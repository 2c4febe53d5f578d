//! RE:Flex pad driver - Entry Point
//!
//! `list` prints attached pads; `run` starts the data process, connects to a
//! pad and logs panel events until Ctrl-C.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reflex_pad::{
    core::{
        config::Config,
        events::{ResponseId, ResponseSender, ResponseValue},
    },
    hid::{DeviceRegistry, HidApiBackend, HidBackend, SimulatedBackend},
    pad::JsonFileStorage,
    router::{Command, DataProcessHandle, PadContext},
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Outbound response channel depth
const RESPONSE_CAPACITY: usize = 256;

#[derive(Parser)]
#[command(name = "reflex-pad", about = "RE:Flex v2 dance pad driver")]
struct Cli {
    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// List attached pads
    List {
        /// Use the built-in simulated pad instead of USB
        #[arg(long)]
        simulate: bool,
    },
    /// Connect to a pad and log panel events
    Run {
        /// Serial of the pad to connect to (first found when omitted)
        #[arg(short, long)]
        serial: Option<String>,
        /// Use the built-in simulated pad instead of USB
        #[arg(long)]
        simulate: bool,
    },
}

fn backend(simulate: bool) -> Result<Arc<dyn HidBackend>> {
    if simulate {
        info!("Using simulated pad");
        return Ok(Arc::new(SimulatedBackend::new()));
    }
    Ok(Arc::new(HidApiBackend::new().context("Failed to initialise HID API")?))
}

fn list(config: &Config, simulate: bool) -> Result<()> {
    let registry = DeviceRegistry::new(backend(simulate)?, config.signature());
    let serials = registry.enumerate()?;
    if serials.is_empty() {
        println!("No pads found");
    }
    for serial in serials {
        println!("{serial}");
    }
    Ok(())
}

async fn run(config: Config, serial: Option<String>, simulate: bool) -> Result<()> {
    let storage = JsonFileStorage::in_dir(config.profiles.directory.as_deref())?;
    info!("Profiles stored in {:?}", storage.path());

    let ctx = PadContext::new(&config, backend(simulate)?, Box::new(storage));
    let (responses, mut rx) = ResponseSender::channel(RESPONSE_CAPACITY);
    let process = DataProcessHandle::spawn(ctx, responses, config.timing.router_poll())
        .context("Failed to start data process")?;

    process.send(&Command::Init);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    // Connect once, on the pad list reported by init.
    let mut connect_sent = false;

    loop {
        tokio::select! {
            response = rx.recv() => {
                let Some(response) = response else { break };
                match (response.id, response.value) {
                    (ResponseId::AllPads, ResponseValue::Serials(serials)) if !connect_sent => {
                        connect_sent = true;
                        let target = match &serial {
                            Some(wanted) if serials.contains(wanted) => Some(wanted.clone()),
                            Some(wanted) => {
                                warn!("Pad {} not found among {:?}", wanted, serials);
                                None
                            }
                            None => serials.first().cloned(),
                        };
                        match target {
                            Some(target) => {
                                process.send(&Command::Connect { serial: target });
                            }
                            None => warn!("No pad to connect to"),
                        }
                    }
                    (ResponseId::PadConnected, ResponseValue::Connected(connected)) => {
                        info!("Pad connected: {}", connected);
                    }
                    (ResponseId::ProfileNames, ResponseValue::ProfileNames(names)) => {
                        info!("Profiles: {:?}", names);
                    }
                    (ResponseId::PanelEvent, ResponseValue::Panel(event)) => {
                        info!("Panel {} {:?}", event.panel, event.edge);
                    }
                    (id, _) => debug!("Response {}", id),
                }
            }
            _ = &mut ctrl_c => {
                info!("Shutting down");
                break;
            }
        }
    }

    process.send(&Command::Quit);
    let stopped = tokio::task::spawn_blocking(move || process.shutdown()).await?;
    if stopped.is_none() {
        bail!("Data process did not stop cleanly");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    debug!("Configuration loaded");

    match cli.command {
        Mode::List { simulate } => list(&config, simulate),
        Mode::Run { serial, simulate } => run(config, serial, simulate).await,
    }
}
