//! # flagsync client
//!
//! HTTP client for the feature-flag management REST API (v2) used by the
//! flagsync migration tool.
//!
//! ## Features
//!
//! - Per-account authorization and region selection (commercial / federal)
//! - Stable, beta and internal-beta endpoint families
//! - Fixed-backoff retry of connection-level failures
//! - Quota-header aware throttling (`X-Ratelimit-Route-Remaining`)
//! - Cursor pagination over `_links.next` collections
//!
//! ## Example
//!
//! ```no_run
//! use flagsync_client::{ApiClient, ApiFamily, ClientConfig, Region};
//! use serde_json::Value;
//!
//! # async fn example() -> Result<(), flagsync_client::ClientError> {
//! let client = ApiClient::new("api-token", Region::Commercial, ClientConfig::default())?;
//! let flags: Vec<Value> = client
//!     .get_collection("/flags/my-project?limit=50", ApiFamily::Stable)
//!     .await?;
//! println!("{} flags", flags.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod pagination;
mod rate_limit;

pub use client::{ApiClient, ApiResponse};
pub use config::{ApiFamily, ClientConfig, Region};
pub use error::{ClientError, ClientResult};
pub use pagination::{Link, Page, PageLinks};
pub use rate_limit::{quota_wait, QuotaBudget, QuotaHeaders, REMAINING_HEADER, RESET_HEADER};
