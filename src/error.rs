//! Custom error types for the application.
//!
//! `LoggerError` is the single error enum for the whole logger, built with
//! `thiserror`. The variants fall into two groups:
//!
//! - **Fatal at startup**: [`LoggerError::NoDevicesFound`] and
//!   [`LoggerError::StorageUnavailable`]. The process reports them and exits
//!   non-zero; there is nothing to poll or nowhere to write.
//! - **Per-tick, per-channel**: [`LoggerError::QueryTimeout`],
//!   [`LoggerError::Parse`] and [`LoggerError::Write`]. The polling loop logs
//!   them and moves on to the next channel; no failure count ever escalates
//!   to a shutdown.
//!
//! [`LoggerError::Connection`] sits in between: during startup it excludes
//! the one device that failed to open (fatal only if no device opens at all),
//! and during steady state it is treated like any other per-channel failure.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, LoggerError>;

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("no instruments visible on the bus")]
    NoDevicesFound,

    #[error("failed to connect to '{address}': {reason}")]
    Connection { address: String, reason: String },

    #[error("{device} {channel}: query timed out")]
    QueryTimeout { device: String, channel: String },

    #[error("{device} {channel}: unparseable reply {raw:?}")]
    Parse {
        device: String,
        channel: String,
        raw: String,
    },

    #[error("storage unavailable at {path}: {reason}")]
    StorageUnavailable { path: PathBuf, reason: String },

    #[error("failed to append sample: {0}")]
    Write(rusqlite::Error),

    #[error("storage query failed: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid selection: {0}")]
    Selection(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LoggerError::QueryTimeout {
            device: "LS336".to_string(),
            channel: "A.temperature".to_string(),
        };
        assert_eq!(err.to_string(), "LS336 A.temperature: query timed out");
    }

    #[test]
    fn test_parse_error_includes_raw_reply() {
        let err = LoggerError::Parse {
            device: "LS330BB".to_string(),
            channel: "temperature".to_string(),
            raw: "OL".to_string(),
        };
        assert!(err.to_string().contains("\"OL\""));
    }
}
