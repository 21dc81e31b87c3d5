//! Client configuration: account region, endpoint family and timings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hosting region of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    /// Commercial cloud.
    #[default]
    Commercial,
    /// US federal (government) cloud.
    Federal,
}

impl Region {
    /// Region from the per-account "federal" toggle.
    #[must_use]
    pub fn from_federal(federal: bool) -> Self {
        if federal {
            Region::Federal
        } else {
            Region::Commercial
        }
    }

    /// API host for this region.
    #[must_use]
    pub fn host(&self) -> &'static str {
        match self {
            Region::Commercial => "app.launchdarkly.com",
            Region::Federal => "app.launchdarkly.us",
        }
    }

    /// Base URL (scheme + host) for this region.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("https://{}", self.host())
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Region::Commercial => write!(f, "commercial"),
            Region::Federal => write!(f, "federal"),
        }
    }
}

/// Endpoint family a request is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiFamily {
    /// `/api/v2` without version header.
    #[default]
    Stable,
    /// `/api/v2` with the beta version header.
    Beta,
    /// `/internal` with the beta version header.
    InternalBeta,
}

impl ApiFamily {
    /// Whether the beta version header must be sent.
    #[must_use]
    pub fn is_beta(&self) -> bool {
        matches!(self, ApiFamily::Beta | ApiFamily::InternalBeta)
    }

    /// Whether the request goes to the internal endpoint tree.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, ApiFamily::InternalBeta)
    }
}

/// Retry and throttling knobs of an [`crate::ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Connection attempts per request (default: 5).
    pub max_attempts: u32,
    /// Fixed delay between connection attempts (default: 3s).
    pub retry_backoff: Duration,
    /// Remaining-quota value at or below which the client throttles (default: 5).
    pub quota_low_water: u32,
    /// Consecutive throttled responses tolerated before failing (default: 5).
    pub quota_tries: u32,
    /// Minimum wait when throttling (default: 500ms).
    pub min_quota_wait: Duration,
    /// Per-request timeout (default: 30s).
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_backoff: Duration::from_secs(3),
            quota_low_water: 5,
            quota_tries: 5,
            min_quota_wait: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration with all defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration optimized for testing (shorter delays).
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            max_attempts: 5,
            retry_backoff: Duration::from_millis(10),
            quota_low_water: 5,
            quota_tries: 5,
            min_quota_wait: Duration::from_millis(10),
            timeout: Duration::from_secs(5),
        }
    }

    /// Set the minimum throttle wait.
    #[must_use]
    pub fn with_min_quota_wait(mut self, wait: Duration) -> Self {
        self.min_quota_wait = wait;
        self
    }

    /// Set the throttle budget.
    #[must_use]
    pub fn with_quota_tries(mut self, tries: u32) -> Self {
        self.quota_tries = tries;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be > 0".to_string());
        }
        if self.quota_tries == 0 {
            return Err("quota_tries must be > 0".to_string());
        }
        Ok(())
    }
}
