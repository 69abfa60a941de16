//! Conversions between calendar time and Core Data absolute time.
//!
//! Property lists store dates as seconds relative to 2001-01-01T00:00:00Z.
//! Values are kept at millisecond precision.

use chrono::{DateTime, Utc};

/// Milliseconds from the Unix epoch to 2001-01-01T00:00:00Z.
pub const CORE_DATA_EPOCH_MS: i64 = 978_307_200_000;

/// Converts Core Data seconds into a UTC timestamp, rounding to the nearest
/// millisecond. Returns `None` for non-finite or out-of-range input.
pub fn from_core_data_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    let millis = (seconds * 1000.0).round() + CORE_DATA_EPOCH_MS as f64;
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

/// Converts a UTC timestamp into Core Data seconds.
pub fn to_core_data_seconds(date: &DateTime<Utc>) -> f64 {
    (date.timestamp_millis() - CORE_DATA_EPOCH_MS) as f64 / 1000.0
}
