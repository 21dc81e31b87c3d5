//! Payload filters.

use flagsync_client::{ApiFamily, ClientResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use super::{created_or_exists, Scope};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadFilter {
    pub name: String,
    pub key: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub rules: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Copies payload filters. Returns the number created.
#[instrument(skip(scope))]
pub async fn migrate_payload_filters(scope: &Scope<'_>) -> ClientResult<usize> {
    let filters: Vec<PayloadFilter> = scope
        .source
        .get_collection(
            &format!("/projects/{}/payload-filters?limit=20", scope.source_project),
            ApiFamily::Beta,
        )
        .await?;

    let path = format!("/projects/{}/payload-filters", scope.target_project);
    let mut count = 0;
    for filter in &filters {
        let result = scope.target.post(&path, filter, ApiFamily::Beta).await;
        if created_or_exists("payload filter", &filter.key, result) {
            count += 1;
        }
    }

    info!(count = count, "Created payload filters");
    Ok(count)
}
