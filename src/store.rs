//! SQLite-backed sample store.
//!
//! One flat `samples` table, append-only from the logger's side. The
//! connection is a process-wide resource: the logger opens it once at
//! startup, writes synchronously from the polling loop, and closes it on
//! graceful shutdown. The exporter opens its own connection in a separate,
//! non-overlapping process; SQLite's file locking covers that split.

use crate::core::{format_timestamp, parse_timestamp, Sample};
use crate::error::{AppResult, LoggerError};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

const SCHEMA_SQL: &str = "\
CREATE TABLE IF NOT EXISTS samples (
    timestamp TEXT NOT NULL,
    device    TEXT NOT NULL,
    channel   TEXT NOT NULL,
    value     REAL NOT NULL,
    unit      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_samples_timestamp ON samples(timestamp);
";

const INSERT_SQL: &str =
    "INSERT INTO samples (timestamp, device, channel, value, unit) VALUES (?1, ?2, ?3, ?4, ?5)";

pub struct SampleStore {
    path: PathBuf,
    conn: Option<Connection>,
}

impl SampleStore {
    /// Open or create the backing file and ensure the schema exists.
    ///
    /// Fails with [`LoggerError::StorageUnavailable`] when the path cannot
    /// be created or written; the logger treats that as fatal at startup.
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let unavailable = |reason: String| LoggerError::StorageUnavailable {
            path: path.clone(),
            reason,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| unavailable(e.to_string()))?;
            }
        }

        let conn = Connection::open(&path).map_err(|e| unavailable(e.to_string()))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| unavailable(e.to_string()))?;

        debug!("sample store open at {}", path.display());
        Ok(Self {
            path,
            conn: Some(conn),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Insert one row. Synchronous; there is no batching at this scale.
    ///
    /// Fails with [`LoggerError::Write`], which the polling loop logs and
    /// skips — a failed append must not disturb later appends.
    pub fn append(&mut self, sample: &Sample) -> AppResult<()> {
        let conn = self.conn.as_ref().ok_or_else(|| LoggerError::StorageUnavailable {
            path: self.path.clone(),
            reason: "store is closed".to_string(),
        })?;

        conn.execute(
            INSERT_SQL,
            rusqlite::params![
                format_timestamp(&sample.timestamp),
                sample.device,
                sample.channel,
                sample.value,
                sample.unit
            ],
        )
        .map_err(LoggerError::Write)?;
        Ok(())
    }

    /// Rows within `[start, end]` (either bound optional), ordered by
    /// timestamp ascending. A fresh call re-queries, so the sequence is
    /// restartable by construction.
    pub fn read_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<Sample>> {
        let conn = self.conn.as_ref().ok_or_else(|| LoggerError::StorageUnavailable {
            path: self.path.clone(),
            reason: "store is closed".to_string(),
        })?;

        let mut sql =
            String::from("SELECT timestamp, device, channel, value, unit FROM samples");
        let mut clauses = Vec::new();
        let mut bounds: Vec<String> = Vec::new();
        if let Some(start) = start {
            clauses.push("timestamp >= ?");
            bounds.push(format_timestamp(&start));
        }
        if let Some(end) = end {
            clauses.push("timestamp <= ?");
            bounds.push(format_timestamp(&end));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY timestamp");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(bounds.iter()), |row| {
            let raw: String = row.get(0)?;
            let timestamp = parse_timestamp(&raw).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            Ok(Sample {
                timestamp,
                device: row.get(1)?,
                channel: row.get(2)?,
                value: row.get(3)?,
                unit: row.get(4)?,
            })
        })?;

        let mut samples = Vec::new();
        for row in rows {
            samples.push(row?);
        }
        Ok(samples)
    }

    /// Flush and release the connection. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_conn, e)) = conn.close() {
                warn!("error closing sample store: {}", e);
            }
            debug!("sample store at {} closed", self.path.display());
        }
    }
}
