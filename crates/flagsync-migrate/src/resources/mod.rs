//! Per-resource migrators.
//!
//! Each migrator reads source records through typed structs, writes them to
//! the target project and returns how many items made it across. Failures of
//! individual items are logged and skipped; failing to read a source
//! collection is returned to the caller.

pub mod context_kinds;
pub mod environments;
pub mod flag_environments;
pub mod flag_templates;
pub mod flags;
pub mod metrics;
pub mod payload_filters;
pub mod project;
pub mod segments;

use flagsync_client::{ApiClient, ApiResponse, ClientResult};
use serde::Deserialize;
use tracing::warn;

use crate::pacing::Pacer;

/// Clients, project keys and pacing shared by every migrator.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub source: &'a ApiClient,
    pub target: &'a ApiClient,
    pub source_project: &'a str,
    pub target_project: &'a str,
    pub pacer: Pacer,
}

/// Listing entry carrying only the resource key.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyedItem {
    pub key: String,
}

/// Whether a create call left the item in place (created now or earlier).
pub(crate) fn created_or_exists(kind: &str, key: &str, result: ClientResult<ApiResponse>) -> bool {
    match result {
        Ok(response) if response.is_success() => true,
        Ok(response) if response.is_conflict() => {
            warn!(kind = kind, key = key, "Already exists in target, keeping it");
            true
        }
        Ok(response) => {
            warn!(kind = kind, key = key, status = response.status, body = %response.body, "Create failed");
            false
        }
        Err(e) => {
            warn!(kind = kind, key = key, error = %e, "Create failed");
            false
        }
    }
}

/// Whether an update call succeeded.
pub(crate) fn updated(kind: &str, key: &str, result: ClientResult<ApiResponse>) -> bool {
    match result {
        Ok(response) if response.is_success() => true,
        Ok(response) => {
            warn!(kind = kind, key = key, status = response.status, body = %response.body, "Update failed");
            false
        }
        Err(e) => {
            warn!(kind = kind, key = key, error = %e, "Update failed");
            false
        }
    }
}

/// Reads a record, logging and skipping it on failure.
pub(crate) fn decoded<T: serde::de::DeserializeOwned>(
    kind: &str,
    key: &str,
    result: ClientResult<ApiResponse>,
) -> Option<T> {
    match result.and_then(ApiResponse::error_for_status).and_then(|r| r.json()) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(kind = kind, key = key, error = %e, "Failed to read source record");
            None
        }
    }
}
