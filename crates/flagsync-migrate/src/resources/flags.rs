//! Flag creation.
//!
//! Per-environment targeting is written later by
//! [`super::flag_environments`], once every flag exists.

use flagsync_client::{ApiFamily, ClientResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use super::{created_or_exists, updated, Scope};
use crate::members::{MaintainerRef, MemberIdentityMap};
use crate::pacing::BATCH_PAUSE;
use crate::patch::JsonPatch;
use crate::settings::FlagSelection;

/// A flag as listed in the source project and created in the target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flag {
    pub key: String,
    pub name: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_side_availability: Option<Value>,
    #[serde(default)]
    pub variations: Vec<Value>,
    #[serde(default)]
    pub temporary: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_properties: Option<Value>,
    #[serde(
        rename(deserialize = "_purpose", serialize = "purpose"),
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub purpose: Option<String>,
    #[serde(rename = "_maintainer", default, skip_serializing)]
    pub maintainer: Option<MaintainerRef>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub maintainer_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub archived: Option<bool>,
    #[serde(default, skip_serializing)]
    pub deprecated: Option<bool>,
    #[serde(default, skip_serializing)]
    pub migration_settings: Option<Value>,
}

impl Flag {
    /// Resolves the source maintainer to a target member.
    pub fn translate_maintainer(&mut self, members: &MemberIdentityMap) {
        self.maintainer_id = self.maintainer.as_ref().and_then(|m| members.resolve(m));
    }

    /// Fields the API does not accept at creation time.
    #[must_use]
    pub fn update_patch(&self) -> JsonPatch {
        let mut patch = JsonPatch::new();
        patch
            .replace_opt("/archived", self.archived)
            .replace_opt("/deprecated", self.deprecated)
            .replace_opt("/migrationSettings", self.migration_settings.clone());
        patch
    }
}

/// Source flags matching `selection`, in listing order.
pub async fn fetch_flags(
    scope: &Scope<'_>,
    selection: &FlagSelection,
) -> ClientResult<Vec<Flag>> {
    let flags: Vec<Flag> = scope
        .source
        .get_collection(
            &format!("/flags/{}?limit=50", scope.source_project),
            ApiFamily::Stable,
        )
        .await?;
    Ok(flags
        .into_iter()
        .filter(|f| selection.includes(&f.key))
        .collect())
}

/// Creates the selected flags. Returns the number fully written.
#[instrument(skip(scope, selection, members))]
pub async fn migrate_flags(
    scope: &Scope<'_>,
    selection: &FlagSelection,
    members: &MemberIdentityMap,
) -> ClientResult<usize> {
    let flags = fetch_flags(scope, selection).await?;
    let total = flags.len();
    let create_path = format!("/flags/{}", scope.target_project);
    let mut count = 0;

    for (idx, mut flag) in flags.into_iter().enumerate() {
        flag.translate_maintainer(members);

        let result = scope.target.post(&create_path, &flag, ApiFamily::Stable).await;
        let mut written = created_or_exists("flag", &flag.key, result);

        let patch = flag.update_patch();
        if written && !patch.is_empty() {
            let result = scope
                .target
                .patch(&format!("{create_path}/{}", flag.key), &patch, ApiFamily::Stable)
                .await;
            written = updated("flag", &flag.key, result);
        }
        if written {
            count += 1;
        }

        let seen = idx + 1;
        if scope.pacer.batch(seen, BATCH_PAUSE).await {
            info!("Reached {seen} of {total} flags");
        }
    }

    info!(count = count, "Created flags");
    Ok(count)
}
