//! Environments and their approval settings.

use std::collections::HashSet;

use flagsync_client::{ApiFamily, ClientResult};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use super::{created_or_exists, updated, KeyedItem, Scope};
use crate::pacing::{BATCH_PAUSE, ITEM_PAUSE};
use crate::patch::JsonPatch;

/// Attempts at writing approval settings for one environment.
const APPROVAL_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApprovalSettings {
    pub required: bool,
    pub bypass_approvals_for_pending_changes: bool,
    pub min_num_approvals: u32,
    pub can_review_own_request: bool,
    pub can_apply_declined_changes: bool,
    pub required_approval_tags: Vec<String>,
}

impl ApprovalSettings {
    fn append_to(&self, patch: &mut JsonPatch, prefix: &str) {
        patch
            .replace(format!("{prefix}/required"), self.required)
            .replace(
                format!("{prefix}/bypassApprovalsForPendingChanges"),
                self.bypass_approvals_for_pending_changes,
            )
            .replace(format!("{prefix}/minNumApprovals"), self.min_num_approvals)
            .replace(format!("{prefix}/canReviewOwnRequest"), self.can_review_own_request)
            .replace(
                format!("{prefix}/canApplyDeclinedChanges"),
                self.can_apply_declined_changes,
            )
            .replace(
                format!("{prefix}/requiredApprovalTags"),
                self.required_approval_tags.clone(),
            );
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceApprovalSettings {
    pub segment: Option<ApprovalSettings>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub default_ttl: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub secure_mode: bool,
    #[serde(default)]
    pub default_track_events: bool,
    #[serde(default)]
    pub confirm_changes: bool,
    #[serde(default)]
    pub require_comments: bool,
    #[serde(default)]
    pub critical: bool,
    pub approval_settings: Option<ApprovalSettings>,
    pub resource_approval_settings: Option<ResourceApprovalSettings>,
}

impl Environment {
    /// Body creating the environment in the target project.
    #[must_use]
    pub fn creation_payload(&self) -> Value {
        json!({
            "name": self.name,
            "key": self.key,
            "color": self.color,
            "defaultTtl": self.default_ttl,
            "tags": self.tags,
            "secureMode": self.secure_mode,
            "defaultTrackEvents": self.default_track_events,
            "confirmChanges": self.confirm_changes,
            "requireComments": self.require_comments,
            "critical": self.critical,
        })
    }

    /// Patch bringing an existing target environment in line.
    #[must_use]
    pub fn update_patch(&self) -> JsonPatch {
        let mut patch = JsonPatch::new();
        patch
            .replace("/name", self.name.as_str())
            .replace("/color", self.color.as_str())
            .replace("/defaultTtl", self.default_ttl)
            .replace("/tags", self.tags.clone())
            .replace("/secureMode", self.secure_mode)
            .replace("/defaultTrackEvents", self.default_track_events)
            .replace("/confirmChanges", self.confirm_changes)
            .replace("/requireComments", self.require_comments)
            .replace("/critical", self.critical);
        patch
    }

    /// Patch copying flag and segment approval settings, if any are set.
    #[must_use]
    pub fn approvals_patch(&self) -> Option<JsonPatch> {
        let mut patch = JsonPatch::new();
        if let Some(settings) = &self.approval_settings {
            settings.append_to(&mut patch, "/approvalSettings");
        }
        if let Some(segment) = self
            .resource_approval_settings
            .as_ref()
            .and_then(|r| r.segment.as_ref())
        {
            segment.append_to(&mut patch, "/resourceApprovalSettings/segment");
        }
        (!patch.is_empty()).then_some(patch)
    }
}

/// Creates or updates every source environment in the target project.
///
/// Returns the number of environments fully written.
#[instrument(skip(scope))]
pub async fn migrate_environments(scope: &Scope<'_>) -> ClientResult<usize> {
    let environments: Vec<Environment> = scope
        .source
        .get_collection(
            &format!("/projects/{}/environments?limit=20", scope.source_project),
            ApiFamily::Stable,
        )
        .await?;
    let existing: HashSet<String> = scope
        .target
        .get_collection::<KeyedItem>(
            &format!("/projects/{}/environments?limit=20", scope.target_project),
            ApiFamily::Stable,
        )
        .await?
        .into_iter()
        .map(|e| e.key)
        .collect();

    let total = environments.len();
    let mut count = 0;

    for (idx, env) in environments.iter().enumerate() {
        let env_path = format!("/projects/{}/environments/{}", scope.target_project, env.key);

        let written = if existing.contains(&env.key) {
            let result = scope
                .target
                .patch(&env_path, &env.update_patch(), ApiFamily::Stable)
                .await;
            updated("environment", &env.key, result)
        } else {
            let result = scope
                .target
                .post(
                    &format!("/projects/{}/environments", scope.target_project),
                    &env.creation_payload(),
                    ApiFamily::Stable,
                )
                .await;
            created_or_exists("environment", &env.key, result)
        };

        if written && write_approvals(scope, &env_path, env).await {
            count += 1;
        }

        let seen = idx + 1;
        if scope.pacer.batch(seen, BATCH_PAUSE).await {
            info!("Reached {seen} of {total} environments");
        }
    }

    info!(count = count, "Created environments");
    Ok(count)
}

async fn write_approvals(scope: &Scope<'_>, env_path: &str, env: &Environment) -> bool {
    let Some(patch) = env.approvals_patch() else {
        return true;
    };

    for attempt in 1..=APPROVAL_ATTEMPTS {
        match scope.target.patch(env_path, &patch, ApiFamily::Stable).await {
            Ok(response) if response.is_success() => return true,
            Ok(response) => {
                warn!(
                    environment = %env.key,
                    status = response.status,
                    attempt = attempt,
                    "Approval settings update failed"
                );
            }
            Err(e) => {
                warn!(environment = %env.key, error = %e, attempt = attempt, "Approval settings update failed");
            }
        }
        scope.pacer.pause(ITEM_PAUSE).await;
    }

    warn!(environment = %env.key, "Giving up on approval settings");
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment() -> Environment {
        serde_json::from_value(json!({
            "_id": "e1",
            "key": "production",
            "name": "Production",
            "color": "417505",
            "defaultTtl": 0,
            "tags": ["prod"],
            "secureMode": true,
            "defaultTrackEvents": false,
            "confirmChanges": true,
            "requireComments": true,
            "critical": true,
            "approvalSettings": {
                "required": true,
                "bypassApprovalsForPendingChanges": false,
                "minNumApprovals": 2,
                "canReviewOwnRequest": false,
                "canApplyDeclinedChanges": false,
                "requiredApprovalTags": [],
                "serviceKind": "launchdarkly"
            },
            "resourceApprovalSettings": {
                "segment": {"required": false, "minNumApprovals": 1}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_creation_payload() {
        let payload = environment().creation_payload();
        assert_eq!(payload["key"], "production");
        assert_eq!(payload["secureMode"], true);
        assert!(payload.get("approvalSettings").is_none());
        assert!(payload.get("_id").is_none());
    }

    #[test]
    fn test_update_patch_paths() {
        let patch = environment().update_patch();
        let paths: Vec<&str> = patch.ops().iter().map(|op| op.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "/name",
                "/color",
                "/defaultTtl",
                "/tags",
                "/secureMode",
                "/defaultTrackEvents",
                "/confirmChanges",
                "/requireComments",
                "/critical"
            ]
        );
    }

    #[test]
    fn test_approvals_patch() {
        let patch = environment().approvals_patch().unwrap();
        assert_eq!(patch.len(), 12);
        assert_eq!(patch.ops()[2].path, "/approvalSettings/minNumApprovals");
        assert_eq!(patch.ops()[2].value, json!(2));
        assert_eq!(
            patch.ops()[6].path,
            "/resourceApprovalSettings/segment/required"
        );
    }

    #[test]
    fn test_no_approvals_patch_without_settings() {
        let env: Environment =
            serde_json::from_value(json!({"key": "test", "name": "Test"})).unwrap();
        assert!(env.approvals_patch().is_none());
    }
}
