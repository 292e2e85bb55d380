//! Create a synthetic sample database for exercising the exporter.
//!
//! Writes a fixed grid of channel profiles (both controller families,
//! including heater output channels the live logger does not poll) with a
//! linear drift per timestamp plus a little uniform jitter.

use anyhow::{bail, Context};
use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use cryolog::{core::Sample, store::SampleStore};
use rand::Rng;
use std::path::PathBuf;

/// (device, channel, unit, base value, drift per step)
const PROFILES: &[(&str, &str, &str, f64, f64)] = &[
    ("LS330BB", "setpoint", "K", 80.0, 0.05),
    ("LS330BB", "temperature", "K", 79.2, 0.04),
    ("LS330BB", "heater", "%", 42.0, -0.6),
    ("LS330SP", "setpoint", "K", 85.0, 0.03),
    ("LS330SP", "temperature", "K", 84.1, 0.05),
    ("LS330SP", "heater", "%", 48.0, -0.4),
    ("LS336", "A.setpoint", "K", 110.0, 0.02),
    ("LS336", "A.temperature", "K", 108.7, 0.03),
    ("LS336", "B.setpoint", "K", 112.5, -0.01),
    ("LS336", "B.temperature", "K", 111.9, -0.02),
];

#[derive(Parser, Debug)]
#[command(
    name = "cryolog-seed",
    about = "Create a synthetic sample database for testing the exporter."
)]
struct Cli {
    /// Destination SQLite file
    #[arg(default_value = "dummy-logger.sqlite3")]
    path: PathBuf,

    /// First timestamp (RFC 3339; default: two days ago)
    #[arg(long)]
    start: Option<String>,

    /// Number of sample timestamps to generate
    #[arg(long, default_value_t = 8)]
    points: u32,

    /// Hours between timestamps
    #[arg(long, default_value_t = 6.0)]
    interval_hours: f64,

    /// Peak uniform jitter added to each value
    #[arg(long, default_value_t = 0.02)]
    jitter: f64,

    /// Overwrite the destination file if it already exists
    #[arg(long)]
    force: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if cli.path.exists() {
        if cli.force {
            std::fs::remove_file(&cli.path)
                .with_context(|| format!("failed to remove {}", cli.path.display()))?;
        } else {
            bail!(
                "refusing to overwrite {}; pass --force to replace it",
                cli.path.display()
            );
        }
    }

    let start: DateTime<Utc> = match &cli.start {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("could not parse --start value '{raw}'"))?
            .with_timezone(&Utc),
        None => Utc::now() - Duration::days(2),
    };
    let step = Duration::microseconds((cli.interval_hours * 3_600_000_000.0) as i64);

    let mut store = SampleStore::open(&cli.path)?;
    let mut rng = rand::thread_rng();
    let mut rows = 0usize;

    for idx in 0..cli.points {
        let timestamp = start + step * idx as i32;
        for &(device, channel, unit, base, drift) in PROFILES {
            let jitter = rng.gen_range(-cli.jitter..=cli.jitter);
            store.append(&Sample {
                timestamp,
                device: device.to_string(),
                channel: channel.to_string(),
                value: base + drift * f64::from(idx) + jitter,
                unit: unit.to_string(),
            })?;
            rows += 1;
        }
    }
    store.close();

    println!(
        "created {} with {} timestamps and {} sample rows",
        cli.path.display(),
        cli.points,
        rows
    );
    Ok(())
}
