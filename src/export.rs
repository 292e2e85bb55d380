//! CSV serialization of stored samples.

use crate::core::Sample;
use crate::error::AppResult;
use std::io::Write;

/// Header row; order matches the store's column order.
pub const CSV_HEADER: [&str; 5] = ["timestamp", "device", "channel", "value", "unit"];

/// Write `samples` as CSV: a header row, then one row per sample in the
/// order given (callers pass the result of a timestamp-ordered
/// `read_range`). Returns the number of data rows written.
pub fn write_csv<W: Write>(samples: &[Sample], writer: W) -> AppResult<usize> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(CSV_HEADER)?;
    for sample in samples {
        writer.write_record(&[
            sample.timestamp_string(),
            sample.device.clone(),
            sample.channel.clone(),
            sample.value.to_string(),
            sample.unit.clone(),
        ])?;
    }
    writer.flush()?;
    Ok(samples.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn sample(offset_us: i64, device: &str, value: f64) -> Sample {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        Sample {
            timestamp: base + Duration::microseconds(offset_us),
            device: device.to_string(),
            channel: "temperature".to_string(),
            value,
            unit: "K".to_string(),
        }
    }

    #[test]
    fn test_header_plus_one_row_per_sample() {
        let samples = vec![sample(0, "LS330BB", 77.0), sample(100, "LS336", 110.5)];
        let mut buf = Vec::new();
        let count = write_csv(&samples, &mut buf).unwrap();
        assert_eq!(count, 2);

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "timestamp,device,channel,value,unit");
        assert_eq!(
            lines[1],
            "2024-03-01T12:00:00.000000Z,LS330BB,temperature,77,K"
        );
        assert_eq!(
            lines[2],
            "2024-03-01T12:00:00.000100Z,LS336,temperature,110.5,K"
        );
    }

    #[test]
    fn test_empty_input_writes_header_only() {
        let mut buf = Vec::new();
        assert_eq!(write_csv(&[], &mut buf).unwrap(), 0);
        assert_eq!(String::from_utf8(buf).unwrap(), "timestamp,device,channel,value,unit\n");
    }
}
