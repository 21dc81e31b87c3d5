//! Segments, per environment.
//!
//! A segment whose rules match on other segments can only be written once
//! those segments exist. Such rules are held back and patched after every
//! segment of the environment has been created.

use flagsync_client::{ApiFamily, ClientResult};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use super::{created_or_exists, decoded, updated, KeyedItem, Scope};
use crate::pacing::{ITEM_PAUSE, SEGMENT_BATCH_PAUSE};
use crate::patch::JsonPatch;
use crate::rules::{rules_value, Rule};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub included: Vec<String>,
    #[serde(default)]
    pub excluded: Vec<String>,
    #[serde(default)]
    pub included_contexts: Vec<Value>,
    #[serde(default)]
    pub excluded_contexts: Vec<Value>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// Patches produced for one segment.
#[derive(Debug, Clone)]
pub struct SegmentPatches {
    /// Applied right after creation.
    pub immediate: JsonPatch,
    /// Rules held back until the environment's other segments exist.
    pub deferred: Option<JsonPatch>,
}

impl Segment {
    /// Body creating the segment. Only standard (bounded) segments are created.
    #[must_use]
    pub fn creation_payload(&self) -> Value {
        json!({
            "key": self.key,
            "name": self.name,
            "tags": self.tags,
            "unbounded": false,
        })
    }

    /// Splits the follow-up writes into immediate and deferred patches.
    #[must_use]
    pub fn patches(&self) -> SegmentPatches {
        let mut immediate = JsonPatch::new();
        if let Some(description) = &self.description {
            immediate.add("/description", description.as_str());
        }
        immediate
            .replace("/included", self.included.clone())
            .replace("/excluded", self.excluded.clone())
            .replace("/includedContexts", self.included_contexts.clone())
            .replace("/excludedContexts", self.excluded_contexts.clone());

        let rules = rules_value(&self.rules);
        let deferred = if self.rules.iter().any(Rule::references_segments) {
            let mut patch = JsonPatch::new();
            patch.replace("/rules", rules);
            Some(patch)
        } else {
            immediate.replace("/rules", rules);
            None
        };

        SegmentPatches { immediate, deferred }
    }
}

/// Copies the segments of every environment. Returns the number written.
#[instrument(skip(scope, env_keys))]
pub async fn migrate_segments(scope: &Scope<'_>, env_keys: &[String]) -> ClientResult<usize> {
    let mut count = 0;

    for env in env_keys {
        let listed: Vec<KeyedItem> = scope
            .source
            .get_collection(
                &format!("/segments/{}/{env}?limit=20", scope.source_project),
                ApiFamily::Stable,
            )
            .await?;
        scope.pacer.pause(ITEM_PAUSE).await;
        debug!(environment = %env, segments = listed.len(), "Listed source segments");

        let mut deferred = Vec::new();

        for item in &listed {
            let result = scope
                .source
                .get(
                    &format!("/segments/{}/{env}/{}", scope.source_project, item.key),
                    ApiFamily::Stable,
                )
                .await;
            let Some(segment) = decoded::<Segment>("segment", &item.key, result) else {
                continue;
            };

            let result = scope
                .target
                .post(
                    &format!("/segments/{}/{env}", scope.target_project),
                    &segment.creation_payload(),
                    ApiFamily::Stable,
                )
                .await;
            if !created_or_exists("segment", &segment.key, result) {
                continue;
            }

            let patches = segment.patches();
            let segment_path = format!("/segments/{}/{env}/{}", scope.target_project, segment.key);
            // Queued once the segment exists, whatever the patch below returns.
            if let Some(patch) = patches.deferred {
                deferred.push((segment_path.clone(), segment.key.clone(), patch));
            }

            let result = scope
                .target
                .patch(&segment_path, &patches.immediate, ApiFamily::Stable)
                .await;
            if !updated("segment", &segment.key, result) {
                continue;
            }

            count += 1;
            if scope.pacer.batch(count, SEGMENT_BATCH_PAUSE).await {
                info!("Reached {count} segments");
            }
        }

        for (path, key, patch) in &deferred {
            debug!(environment = %env, segment = %key, "Applying deferred segment rules");
            let result = scope.target.patch(path, patch, ApiFamily::Stable).await;
            updated("segment rules", key, result);
        }
    }

    info!(count = count, "Created segments");
    Ok(count)
}
