// Utility functions for feed-ranking

use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Linear decay from `max` at age 0 to 0.0 at `window_days` and beyond.
pub fn linear_decay(age_days: i64, window_days: i64, max: f64) -> f64 {
    if window_days <= 0 {
        return 0.0;
    }
    let age = age_days.clamp(0, window_days);
    max * (window_days - age) as f64 / window_days as f64
}

/// Linear in `count` up to `cap`.
pub fn capped_linear(count: i64, divisor: f64, cap: f64) -> f64 {
    (count.max(0) as f64 / divisor).min(cap)
}

/// Whole days elapsed between `created_at` and `now`, never negative.
pub fn age_in_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_days().max(0)
}

/// Run a fallible future with a time bound.
///
/// `Ok(None)` means the bound elapsed; errors from the future pass through.
pub async fn within<F, T, E>(duration: Duration, future: F) -> Result<Option<T>, E>
where
    F: Future<Output = Result<T, E>>,
{
    match timeout(duration, future).await {
        Ok(Ok(value)) => Ok(Some(value)),
        Ok(Err(e)) => Err(e),
        Err(_) => Ok(None),
    }
}
