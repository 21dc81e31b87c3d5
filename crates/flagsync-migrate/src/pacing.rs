//! Fixed pauses that keep a run under the aggregate rate limits.

use std::time::Duration;

/// Pause after each metric, metric group or segment listing.
pub const ITEM_PAUSE: Duration = Duration::from_millis(500);
/// Pause every [`BATCH_SIZE`] environments or flags.
pub const BATCH_PAUSE: Duration = Duration::from_secs(5);
/// Pause every [`BATCH_SIZE`] segments.
pub const SEGMENT_BATCH_PAUSE: Duration = Duration::from_millis(2_500);
/// Pause after each flag-environment update.
pub const FLAG_RULE_PAUSE: Duration = Duration::from_secs(3);
/// Items per progress batch.
pub const BATCH_SIZE: usize = 10;

/// Sleeps between requests unless pauses are disabled.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    enabled: bool,
}

impl Pacer {
    #[must_use]
    pub fn new(ignore_pauses: bool) -> Self {
        Self {
            enabled: !ignore_pauses,
        }
    }

    /// A pacer that never sleeps.
    #[must_use]
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub async fn pause(&self, duration: Duration) {
        if self.enabled {
            tokio::time::sleep(duration).await;
        }
    }

    /// Pauses for `duration` when `count` closes a batch.
    ///
    /// Returns whether `count` closed a batch, so callers can log progress.
    pub async fn batch(&self, count: usize, duration: Duration) -> bool {
        let boundary = is_batch_boundary(count);
        if boundary {
            self.pause(duration).await;
        }
        boundary
    }
}

fn is_batch_boundary(count: usize) -> bool {
    count > 0 && count % BATCH_SIZE == 0
}
