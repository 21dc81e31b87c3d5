//! Per-environment flag targeting.

use std::collections::HashMap;

use flagsync_client::ApiFamily;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::{decoded, Scope};
use crate::pacing::FLAG_RULE_PAUSE;
use crate::patch::JsonPatch;
use crate::rules::{rules_value, without_segment_clauses, Rule};

/// Targeting of one flag in one environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagEnvironment {
    #[serde(default)]
    pub on: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default = "empty_list")]
    pub targets: Value,
    #[serde(default = "empty_list")]
    pub context_targets: Value,
    #[serde(default)]
    pub fallthrough: Value,
    pub off_variation: Option<Value>,
    #[serde(default = "empty_list")]
    pub prerequisites: Value,
    #[serde(default)]
    pub track_events: bool,
    #[serde(default)]
    pub track_events_fallthrough: bool,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

fn empty_list() -> Value {
    Value::Array(Vec::new())
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlagDetails {
    #[serde(default)]
    pub environments: HashMap<String, FlagEnvironment>,
}

impl FlagDetails {
    /// One patch replacing the targeting of every listed environment.
    ///
    /// Environments missing from the flag are skipped. With
    /// `drop_segment_clauses`, clauses on segments are removed, since the
    /// segments do not exist in the target.
    #[must_use]
    pub fn targeting_patch(self, env_keys: &[String], drop_segment_clauses: bool) -> JsonPatch {
        let mut environments = self.environments;
        let mut patch = JsonPatch::new();

        for env in env_keys {
            let Some(details) = environments.remove(env) else {
                debug!(environment = %env, "Flag has no settings for environment");
                continue;
            };
            let base = format!("/environments/{env}");
            let rules = if drop_segment_clauses {
                without_segment_clauses(details.rules)
            } else {
                details.rules
            };

            patch
                .replace(format!("{base}/on"), details.on)
                .replace(format!("{base}/archived"), details.archived)
                .replace(format!("{base}/targets"), details.targets)
                .replace(format!("{base}/contextTargets"), details.context_targets)
                .replace(format!("{base}/fallthrough"), details.fallthrough)
                .replace_opt(format!("{base}/offVariation"), details.off_variation)
                .replace(format!("{base}/prerequisites"), details.prerequisites)
                .replace(format!("{base}/trackEvents"), details.track_events)
                .replace(
                    format!("{base}/trackEventsFallthrough"),
                    details.track_events_fallthrough,
                )
                .replace(format!("{base}/rules"), rules_value(&rules));
        }

        patch
    }
}

/// Writes the targeting of each flag in `flag_keys`, reading fresh source
/// details for every flag.
///
/// Returns the keys of flags that could not be updated.
#[instrument(skip(scope, flag_keys, env_keys), fields(flags = flag_keys.len()))]
pub async fn migrate_flag_environments(
    scope: &Scope<'_>,
    flag_keys: &[String],
    env_keys: &[String],
    drop_segment_clauses: bool,
) -> Vec<String> {
    let mut failed = Vec::new();

    for (idx, key) in flag_keys.iter().enumerate() {
        let result = scope
            .source
            .get(&format!("/flags/{}/{key}", scope.source_project), ApiFamily::Stable)
            .await;
        let Some(details) = decoded::<FlagDetails>("flag", key, result) else {
            failed.push(key.clone());
            scope.pacer.pause(FLAG_RULE_PAUSE).await;
            continue;
        };

        let patch = details.targeting_patch(env_keys, drop_segment_clauses);
        let result = scope
            .target
            .patch(&format!("/flags/{}/{key}", scope.target_project), &patch, ApiFamily::Stable)
            .await;

        match result {
            Ok(response) if response.is_success() => {
                info!(flag = %key, position = idx + 1, "Updated flag environments");
            }
            Ok(response) => {
                warn!(flag = %key, status = response.status, body = %response.body, "Flag environment update failed, will retry");
                failed.push(key.clone());
            }
            Err(e) => {
                warn!(flag = %key, error = %e, "Flag environment update failed, will retry");
                failed.push(key.clone());
            }
        }

        scope.pacer.pause(FLAG_RULE_PAUSE).await;
    }

    failed
}
