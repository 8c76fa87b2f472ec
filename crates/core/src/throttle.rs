use chrono::{DateTime, Utc};

/// Minimum spacing between persisted samples, in seconds.
pub const DEFAULT_LOG_INTERVAL_SECS: i64 = 60;

/// Admission rule guarding the log against over-sampling under fast polling:
/// admit iff nothing was ever logged, or at least `interval_secs` have
/// elapsed since the last logged sample. A `last_logged_at` in the future
/// admits nothing.
pub fn should_log(
    last_logged_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    interval_secs: i64,
) -> bool {
    match last_logged_at {
        None => true,
        Some(last) => now.signed_duration_since(last).num_seconds() >= interval_secs,
    }
}
