//! Core data types shared by the logger, store, and exporter.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A single reading captured from an instrument channel.
///
/// One `Sample` is created per successful query per tick. Samples are
/// immutable and append-only: the logger never updates or deletes a row it
/// has written.
///
/// # Fields
///
/// * `timestamp` - UTC capture time with microsecond precision
/// * `device` - Device label chosen at selection time (e.g. "LS330BB")
/// * `channel` - Channel label from the family table (e.g. "A.temperature")
/// * `value` - Parsed reading
/// * `unit` - Physical unit (e.g. "K")
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub device: String,
    pub channel: String,
    pub value: f64,
    pub unit: String,
}

impl Sample {
    /// Timestamp in the form stored and exported: RFC 3339, microseconds, Z.
    pub fn timestamp_string(&self) -> String {
        format_timestamp(&self.timestamp)
    }

    /// One console line: `<timestamp>  <device>  <channel>[<unit>] = <value>`.
    pub fn display_line(&self) -> String {
        format!(
            "{}  {}  {}[{}] = {}",
            self.timestamp_string(),
            self.device,
            self.channel,
            self.unit,
            self.value
        )
    }
}

/// Format a timestamp the way the store keys rows: RFC 3339 with a fixed
/// six-digit fractional second and a `Z` suffix, so lexicographic order on
/// the stored text equals chronological order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a timestamp previously written by [`format_timestamp`].
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Sample {
        Sample {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap(),
            device: "LS330BB".to_string(),
            channel: "temperature".to_string(),
            value: 77.35,
            unit: "K".to_string(),
        }
    }

    #[test]
    fn test_timestamp_round_trip() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap()
            + chrono::Duration::microseconds(123_456);
        let text = format_timestamp(&ts);
        assert_eq!(text, "2024-03-01T12:30:05.123456Z");
        assert_eq!(parse_timestamp(&text).unwrap(), ts);
    }

    #[test]
    fn test_timestamp_text_orders_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        let later = earlier + chrono::Duration::microseconds(1);
        assert!(format_timestamp(&earlier) < format_timestamp(&later));
    }

    #[test]
    fn test_display_line() {
        let line = sample().display_line();
        assert_eq!(
            line,
            "2024-03-01T12:30:05.000000Z  LS330BB  temperature[K] = 77.35"
        );
    }
}
