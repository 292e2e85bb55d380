//! Store-to-CSV round trip over a pre-populated database.

use chrono::{Duration, TimeZone, Utc};
use cryolog::{core::Sample, export::write_csv, store::SampleStore};

fn sample(offset_us: i64, device: &str, channel: &str, value: f64) -> Sample {
    let base = Utc
        .with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
        .single()
        .expect("valid base time");
    Sample {
        timestamp: base + Duration::microseconds(offset_us),
        device: device.to_string(),
        channel: channel.to_string(),
        value,
        unit: "K".to_string(),
    }
}

/// Five pre-inserted rows spanning two labels come back in timestamp order,
/// and their CSV rendering is a header plus five data lines.
#[test]
fn five_rows_two_labels_export_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = SampleStore::open(dir.path().join("samples.sqlite3")).expect("open store");

    // Appended out of timestamp order on purpose
    let rows = [
        sample(400, "LS336", "A.temperature", 108.7),
        sample(100, "LS330BB", "setpoint", 80.0),
        sample(300, "LS336", "A.setpoint", 110.0),
        sample(200, "LS330BB", "temperature", 79.2),
        sample(500, "LS330BB", "setpoint", 80.0),
    ];
    for row in &rows {
        store.append(row).expect("append");
    }

    let read_back = store.read_range(None, None).expect("read full span");
    assert_eq!(read_back.len(), 5);
    let offsets: Vec<i64> = read_back
        .iter()
        .map(|s| (s.timestamp - rows[1].timestamp).num_microseconds().unwrap_or(0))
        .collect();
    assert_eq!(offsets, vec![0, 100, 200, 300, 400]);

    let mut csv_bytes = Vec::new();
    let count = write_csv(&read_back, &mut csv_bytes).expect("write csv");
    assert_eq!(count, 5);

    let text = String::from_utf8(csv_bytes).expect("utf-8 csv");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "timestamp,device,channel,value,unit");
    assert_eq!(lines[1], "2024-03-01T12:00:00.000100Z,LS330BB,setpoint,80,K");
    assert_eq!(lines[5], "2024-03-01T12:00:00.000500Z,LS330BB,setpoint,80,K");
}

/// Range bounds are inclusive on both ends and exporting never mutates the
/// store.
#[test]
fn bounded_range_is_inclusive_and_read_only() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = SampleStore::open(dir.path().join("samples.sqlite3")).expect("open store");
    for i in 0..5 {
        store
            .append(&sample(i * 100, "LS330BB", "temperature", f64::from(i as i32)))
            .expect("append");
    }

    let base = Utc
        .with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
        .single()
        .expect("valid base time");
    let start = base + Duration::microseconds(100);
    let end = base + Duration::microseconds(300);

    let bounded = store.read_range(Some(start), Some(end)).expect("read range");
    assert_eq!(bounded.len(), 3);
    assert_eq!(bounded[0].value, 1.0);
    assert_eq!(bounded[2].value, 3.0);

    let mut csv_bytes = Vec::new();
    write_csv(&bounded, &mut csv_bytes).expect("write csv");

    // A fresh read still sees every row: export reads, never writes.
    assert_eq!(store.read_range(None, None).expect("re-read").len(), 5);
}
