//! Export logged samples to CSV.
//!
//! Reads a time range (or everything) from a sample store and writes a CSV
//! file with the store's column order. Runs against the store file while the
//! logger is not writing; it never mutates the store.

use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::Parser;
use cryolog::{config::Settings, export::write_csv, store::SampleStore};
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "cryolog-export", about = "Export logged samples to CSV.")]
struct Cli {
    /// Sample store to read (defaults to the configured storage path)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Range start, inclusive (RFC 3339, "YYYY-MM-DD HH:MM[:SS]", or
    /// "YYYY-MM-DD", which widens to the start of the day)
    #[arg(long)]
    start: Option<String>,

    /// Range end, inclusive (same formats; a bare date widens to the end of
    /// the day)
    #[arg(long)]
    end: Option<String>,

    /// Output CSV path (defaults next to the database)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Overwrite an existing output file
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
    let settings = Settings::load(cli.config.as_deref())?;
    let db = cli.db.unwrap_or(settings.storage.path);
    if !db.exists() {
        bail!("database not found: {}", db.display());
    }

    let start = cli
        .start
        .as_deref()
        .map(|raw| parse_bound(raw, true))
        .transpose()?;
    let end = cli
        .end
        .as_deref()
        .map(|raw| parse_bound(raw, false))
        .transpose()?;

    let store = SampleStore::open(&db)?;
    let rows = store.read_range(start, end)?;
    if rows.is_empty() {
        println!("no rows matched the requested range; nothing exported");
        return Ok(());
    }

    let output = cli
        .output
        .unwrap_or_else(|| default_output(&db, start.as_ref(), end.as_ref()));
    if output.exists() && !cli.force {
        bail!("{} exists; pass --force to overwrite", output.display());
    }

    let file = File::create(&output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let count = write_csv(&rows, file)?;
    println!("exported {} rows to {}", count, output.display());
    Ok(())
}

/// Parse a range bound. Bare dates widen to the whole day: a start bound
/// becomes 00:00:00.000000, an end bound 23:59:59.999999.
fn parse_bound(raw: &str, is_start: bool) -> anyhow::Result<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let naive = if is_start {
            date.and_hms_micro_opt(0, 0, 0, 0)
        } else {
            date.and_hms_micro_opt(23, 59, 59, 999_999)
        };
        if let Some(naive) = naive {
            return Ok(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }

    bail!("could not parse '{raw}' as a date or timestamp")
}

/// Derive an output name from the database name and the requested range,
/// e.g. `samples_20240301-20240302.csv` next to `samples.sqlite3`.
fn default_output(
    db: &Path,
    start: Option<&DateTime<Utc>>,
    end: Option<&DateTime<Utc>>,
) -> PathBuf {
    let stem = db
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "samples".to_string());

    let suffix = if start.is_some() || end.is_some() {
        let label = |bound: Option<&DateTime<Utc>>, fallback: &str| {
            bound
                .map(|dt| dt.format("%Y%m%d").to_string())
                .unwrap_or_else(|| fallback.to_string())
        };
        format!("_{}-{}", label(start, "start"), label(end, "end"))
    } else {
        String::new()
    };

    db.with_file_name(format!("{stem}{suffix}.csv"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_start_date_widens_to_midnight() {
        let bound = parse_bound("2024-03-01", true).unwrap();
        assert_eq!(bound.to_rfc3339(), "2024-03-01T00:00:00+00:00");
    }

    #[test]
    fn test_bare_end_date_widens_to_end_of_day() {
        let bound = parse_bound("2024-03-01", false).unwrap();
        assert_eq!(
            bound.to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            "2024-03-01T23:59:59.999999Z"
        );
    }

    #[test]
    fn test_rfc3339_bound_passes_through() {
        let bound = parse_bound("2024-03-01T12:30:00Z", true).unwrap();
        assert_eq!(bound.to_rfc3339(), "2024-03-01T12:30:00+00:00");
    }

    #[test]
    fn test_unparseable_bound_is_rejected() {
        assert!(parse_bound("yesterday", true).is_err());
    }

    #[test]
    fn test_default_output_name_carries_range() {
        let start = parse_bound("2024-03-01", true).unwrap();
        let end = parse_bound("2024-03-02", false).unwrap();
        let output = default_output(Path::new("/data/samples.sqlite3"), Some(&start), Some(&end));
        assert_eq!(
            output,
            PathBuf::from("/data/samples_20240301-20240302.csv")
        );

        let unbounded = default_output(Path::new("/data/samples.sqlite3"), None, None);
        assert_eq!(unbounded, PathBuf::from("/data/samples.csv"));
    }
}
