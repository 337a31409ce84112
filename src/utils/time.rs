//! Timestamp helpers
//!
//! All evaluation times are UTC. Durations are `chrono::Duration`, converted
//! to fractional seconds wherever thresholds are configured as plain numbers.

use chrono::{DateTime, Duration, Utc};

pub type Timestamp = DateTime<Utc>;

/// Fractional seconds of a duration.
pub fn seconds(d: Duration) -> f64 {
    match d.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => d.num_milliseconds() as f64 / 1_000.0,
    }
}

/// Duration from fractional seconds, rounded to microseconds.
pub fn span(secs: f64) -> Duration {
    Duration::microseconds((secs * 1_000_000.0).round() as i64)
}

pub fn from_epoch_secs(secs: f64) -> Timestamp {
    DateTime::<Utc>::UNIX_EPOCH + span(secs)
}

pub fn format_time(t: &Timestamp) -> String {
    t.format("%H:%M:%S%.3f").to_string()
}
