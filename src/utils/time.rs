use chrono::Utc;

/// Wall-clock timestamp in milliseconds, used to stamp events and records.
pub fn time_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Milliseconds elapsed since `start` (a value from [`time_millis`]), never negative.
pub fn millis_since(start: i64) -> i64 {
    (time_millis() - start).max(0)
}
