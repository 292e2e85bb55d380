//! Runtime configuration loading.
//!
//! Settings are assembled from three layers, later layers overriding
//! earlier ones:
//!
//! 1. Compiled defaults ([`Settings::default`])
//! 2. A TOML file (`config/default.toml`, or a path given on the command
//!    line)
//! 3. Environment variables prefixed with `CRYOLOG_`
//!
//! # Environment Variable Overrides
//!
//! ```text
//! CRYOLOG_STORAGE_PATH=/var/lib/cryolog/samples.sqlite3
//! CRYOLOG_POLL_INTERVAL=5
//! ```
//!
//! The configuration surface is deliberately small: the store path and the
//! poll interval in whole seconds. Everything device-specific lives in the
//! family table of the catalog, not here.

use crate::error::AppResult;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration file consulted when no explicit path is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Top-level settings for the logger process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub storage: StorageSettings,
    pub poll: PollSettings,
}

/// Sample store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite file the logger appends samples to.
    pub path: PathBuf,
}

/// Polling cadence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSettings {
    /// Whole seconds between polling cycles.
    pub interval: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage: StorageSettings {
                path: PathBuf::from("data/cryolog.sqlite3"),
            },
            poll: PollSettings { interval: 10 },
        }
    }
}

impl Settings {
    /// Load settings, merging defaults, the TOML file, and the environment.
    ///
    /// A missing TOML file is not an error; the defaults simply stand.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let file = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed("CRYOLOG_").split("_"))
            .extract()?;
        Ok(settings)
    }

    /// Poll interval as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.poll.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.poll.interval, 10);
        assert_eq!(settings.storage.path, PathBuf::from("data/cryolog.sqlite3"));
        assert_eq!(settings.interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_env_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("CRYOLOG_POLL_INTERVAL", "3");
            jail.set_env("CRYOLOG_STORAGE_PATH", "/tmp/test.sqlite3");
            let settings = Settings::load(None).expect("load settings");
            assert_eq!(settings.poll.interval, 3);
            assert_eq!(settings.storage.path, PathBuf::from("/tmp/test.sqlite3"));
            Ok(())
        });
    }

    #[test]
    fn test_file_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "cryolog.toml",
                r#"
                [poll]
                interval = 2
                "#,
            )?;
            let settings = Settings::load(Some(Path::new("cryolog.toml"))).expect("load settings");
            assert_eq!(settings.poll.interval, 2);
            // Unmentioned keys keep their defaults
            assert_eq!(settings.storage.path, PathBuf::from("data/cryolog.sqlite3"));
            Ok(())
        });
    }
}
