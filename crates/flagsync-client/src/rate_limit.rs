//! Quota-header throttling.
//!
//! The API reports the remaining per-route quota and the epoch-millisecond
//! instant at which it resets. When the remaining quota drops to the low-water
//! mark the client sleeps until the reset, bounded by a throttle budget that
//! is shared across consecutive requests.

use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Remaining route quota header.
pub const REMAINING_HEADER: &str = "X-Ratelimit-Route-Remaining";

/// Quota reset instant header (epoch milliseconds).
pub const RESET_HEADER: &str = "X-Ratelimit-Reset";

/// Rate-limit information extracted from a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaHeaders {
    /// Requests left on this route, if reported.
    pub remaining: Option<u32>,
    /// Reset instant in epoch milliseconds, if reported.
    pub reset_epoch_ms: Option<i64>,
    /// `Retry-After` in seconds, if reported.
    pub retry_after_secs: Option<u64>,
}

impl QuotaHeaders {
    /// Parses the quota headers, ignoring malformed values.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
        };

        Self {
            remaining: read(REMAINING_HEADER).and_then(|v| v.parse().ok()),
            reset_epoch_ms: read(RESET_HEADER).and_then(|v| v.parse().ok()),
            retry_after_secs: headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok()),
        }
    }

    /// Whether the remaining quota is at or below `low_water`.
    #[must_use]
    pub fn is_low(&self, low_water: u32) -> bool {
        self.remaining.is_some_and(|r| r <= low_water)
    }

    /// How long to wait before the next request.
    ///
    /// Prefers the reset instant, then `Retry-After`, never less than `floor`.
    #[must_use]
    pub fn wait(&self, now_epoch_ms: i64, floor: Duration) -> Duration {
        match (self.reset_epoch_ms, self.retry_after_secs) {
            (Some(_), _) => quota_wait(self.reset_epoch_ms, now_epoch_ms, floor),
            (None, Some(secs)) => Duration::from_secs(secs).max(floor),
            (None, None) => floor,
        }
    }
}

/// Delay until `reset_epoch_ms`, floored at `floor`.
#[must_use]
pub fn quota_wait(reset_epoch_ms: Option<i64>, now_epoch_ms: i64, floor: Duration) -> Duration {
    let until_reset = reset_epoch_ms
        .map(|reset| reset.saturating_sub(now_epoch_ms))
        .filter(|ms| *ms > 0)
        .map(|ms| Duration::from_millis(ms.unsigned_abs()))
        .unwrap_or_default();

    until_reset.max(floor)
}

/// Budget of consecutive throttled responses.
#[derive(Debug)]
pub struct QuotaBudget {
    max_tries: u32,
    remaining: AtomicU32,
}

impl QuotaBudget {
    /// Creates a full budget.
    #[must_use]
    pub fn new(max_tries: u32) -> Self {
        let max_tries = max_tries.max(1);
        Self {
            max_tries,
            remaining: AtomicU32::new(max_tries),
        }
    }

    /// Records a throttled response.
    ///
    /// Returns `true` when this exhausted the budget; the budget is refilled
    /// so the next request starts fresh.
    pub fn consume(&self) -> bool {
        let left = self.remaining.load(Ordering::Relaxed).saturating_sub(1);
        if left == 0 {
            self.remaining.store(self.max_tries, Ordering::Relaxed);
            true
        } else {
            self.remaining.store(left, Ordering::Relaxed);
            false
        }
    }

    /// Refills the budget after a healthy response.
    pub fn reset(&self) {
        self.remaining.store(self.max_tries, Ordering::Relaxed);
    }

    /// Tries left before the budget is exhausted.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining.load(Ordering::Relaxed)
    }
}
