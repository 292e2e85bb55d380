//! Headless polling logger entry point.

use clap::Parser;
use cryolog::{
    catalog::{Catalog, ConsolePrompt, DeviceFamily, Preselected, Selection, SelectionSource},
    config::Settings,
    error::LoggerError,
    instrument::InstrumentSession,
    logger::{PollOptions, PollingLoop},
    store::SampleStore,
};
use log::{error, warn};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "cryolog",
    about = "Poll temperature controllers and log readings to SQLite."
)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the sample store path
    #[arg(long)]
    db: Option<PathBuf>,

    /// Override the poll interval in whole seconds
    #[arg(long)]
    interval: Option<u64>,

    /// Poll this device instead of prompting: ADDRESS[=FAMILY[=LABEL]]
    ///
    /// FAMILY is 330 or 336 and may be omitted where the address pattern
    /// implies it. Repeat the flag for several devices.
    #[arg(long = "device", value_name = "SPEC")]
    devices: Vec<String>,

    /// List visible bus addresses and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        settings.storage.path = db;
    }
    if let Some(seconds) = cli.interval {
        settings.poll.interval = seconds;
    }

    if cli.list {
        let catalog = Catalog::discover();
        if catalog.addresses().is_empty() {
            println!("no instruments visible");
        }
        for address in catalog.addresses() {
            match DeviceFamily::infer(address) {
                Some(family) => println!("{address}  [{family}]"),
                None => println!("{address}"),
            }
        }
        return Ok(());
    }

    let selections = if cli.devices.is_empty() {
        Catalog::discover().select_with(&mut ConsolePrompt)?
    } else {
        let parsed = cli
            .devices
            .iter()
            .map(|spec| parse_device_spec(spec))
            .collect::<Result<Vec<_>, _>>()?;
        Preselected(parsed).select(&[])?
    };

    let mut sessions = Vec::new();
    for selection in &selections {
        match InstrumentSession::connect(selection).await {
            Ok(session) => sessions.push(session),
            Err(e) => warn!("skipping {}: {}", selection.address, e),
        }
    }
    if sessions.is_empty() {
        return Err(LoggerError::NoDevicesFound.into());
    }

    let store = SampleStore::open(&settings.storage.path)?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("Stopping after current poll...");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut logger = PollingLoop::new(sessions, store, PollOptions::new(settings.interval()));
    logger.run(shutdown_rx).await;
    Ok(())
}

/// Parse `ADDRESS[=FAMILY[=LABEL]]`. The label defaults to the address.
fn parse_device_spec(spec: &str) -> Result<Selection, LoggerError> {
    let mut parts = spec.splitn(3, '=');
    let address = parts.next().unwrap_or_default().to_string();
    if address.is_empty() {
        return Err(LoggerError::Selection("empty device address".to_string()));
    }

    let family = match parts.next() {
        Some(name) => DeviceFamily::parse(name)
            .ok_or_else(|| LoggerError::Selection(format!("unknown controller family '{name}'")))?,
        None => DeviceFamily::infer(&address).ok_or_else(|| {
            LoggerError::Selection(format!(
                "cannot infer controller family for '{address}'; use ADDRESS=FAMILY"
            ))
        })?,
    };

    let label = parts
        .next()
        .map(str::to_string)
        .unwrap_or_else(|| address.clone());

    Ok(Selection {
        address,
        family,
        label,
    })
}
