use chrono::{DateTime, Utc};

/// Current wall-clock time in milliseconds since the unix epoch.
pub fn time_millis() -> i64 {
    let time: DateTime<chrono::Utc> = Utc::now();
    time.timestamp_millis()
}

/// Elapsed seconds between two millisecond timestamps.
pub fn elapsed_secs(
    from: i64,
    to: i64,
) -> f64 {
    (to - from).max(0) as f64 / 1000.0
}
