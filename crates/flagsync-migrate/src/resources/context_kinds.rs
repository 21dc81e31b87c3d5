//! Context kinds and experimentation settings.

use flagsync_client::{ApiFamily, ClientResult, Page};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::{updated, Scope};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextKind {
    #[serde(skip_serializing)]
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_in_targeting: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExperimentationSettings {
    #[serde(default)]
    randomization_units: Vec<Value>,
}

/// Copies context kinds, then the experimentation randomization units.
///
/// Returns the number of context kinds written.
#[instrument(skip(scope))]
pub async fn migrate_context_kinds(scope: &Scope<'_>) -> ClientResult<usize> {
    let kinds: Page<ContextKind> = scope
        .source
        .get(
            &format!("/projects/{}/context-kinds", scope.source_project),
            ApiFamily::Stable,
        )
        .await?
        .error_for_status()?
        .json()?;

    let mut count = 0;
    for kind in &kinds.items {
        let path = format!("/projects/{}/context-kinds/{}", scope.target_project, kind.key);
        let result = scope.target.put(&path, kind, ApiFamily::Stable).await;
        if updated("context kind", &kind.key, result) {
            count += 1;
        }
    }
    info!(count = count, "Created context kinds");

    copy_experimentation_settings(scope).await;
    Ok(count)
}

async fn copy_experimentation_settings(scope: &Scope<'_>) {
    let source_path = format!("/projects/{}/experimentation-settings", scope.source_project);
    let settings: ExperimentationSettings = match scope
        .source
        .get(&source_path, ApiFamily::Beta)
        .await
        .and_then(|r| r.error_for_status())
        .and_then(|r| r.json())
    {
        Ok(settings) => settings,
        Err(e) => {
            warn!(error = %e, "Failed to read experimentation settings");
            return;
        }
    };

    let target_path = format!("/projects/{}/experimentation-settings", scope.target_project);
    let result = scope.target.put(&target_path, &settings, ApiFamily::Beta).await;
    if updated("experimentation settings", scope.target_project, result) {
        info!(
            units = settings.randomization_units.len(),
            "Copied experimentation settings"
        );
    }
}
