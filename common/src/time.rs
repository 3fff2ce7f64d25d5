//! Time utilities and defaults for rate freshness.

use chrono::{DateTime, Duration, Utc};

/// Default timings.
pub mod constants {
    use super::Duration;

    /// How long fetched rates stay fresh (10 minutes).
    pub fn default_time_to_live() -> Duration {
        Duration::minutes(10)
    }

    /// HTTP request timeout (10 seconds).
    pub fn default_request_timeout() -> Duration {
        Duration::seconds(10)
    }
}

/// A timestamp with timezone (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Current time as Unix epoch seconds.
pub fn unix_now() -> i64 {
    now().timestamp()
}

/// Age of an epoch-seconds timestamp relative to now.
///
/// Timestamps that cannot be represented are treated as infinitely old.
pub fn age_of(epoch_seconds: i64) -> Duration {
    match DateTime::from_timestamp(epoch_seconds, 0) {
        Some(at) => now().signed_duration_since(at),
        None => Duration::MAX,
    }
}

/// Whether data stamped at `epoch_seconds` is younger than `ttl`.
pub fn is_within(epoch_seconds: i64, ttl: Duration) -> bool {
    age_of(epoch_seconds) < ttl
}

/// Duration extensions for convenient construction.
pub trait DurationExt {
    fn as_std(&self) -> std::time::Duration;
}

impl DurationExt for Duration {
    fn as_std(&self) -> std::time::Duration {
        self.to_std().unwrap_or(std::time::Duration::ZERO)
    }
}
