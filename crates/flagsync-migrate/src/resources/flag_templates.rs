//! Flag template updates.
//!
//! Templates are predefined by the target project; they are patched, never
//! created.

use flagsync_client::{ApiFamily, ClientResult, Page};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::{updated, Scope};
use crate::patch::JsonPatch;

/// Templates that cannot be edited through the API.
const SKIPPED_TEMPLATES: [&str; 2] = ["ai-prompt", "ai-model"];
/// Templates whose only editable field is their tags.
const TAGS_ONLY_TEMPLATES: [&str; 2] = ["experiment", "migration"];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagTemplate {
    pub key: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub temporary: Option<bool>,
    pub default_variations: Option<DefaultVariations>,
    #[serde(default)]
    pub variations: Vec<TemplateVariation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultVariations {
    pub on_variation: Value,
    pub off_variation: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateVariation {
    pub name: Option<String>,
}

impl FlagTemplate {
    /// Patch applied to the matching target template, `None` for skipped templates.
    #[must_use]
    pub fn patch(&self) -> Option<JsonPatch> {
        if SKIPPED_TEMPLATES.contains(&self.key.as_str()) {
            return None;
        }

        let mut patch = JsonPatch::new();
        if TAGS_ONLY_TEMPLATES.contains(&self.key.as_str()) {
            patch.replace("/tags", self.tags.clone());
            return Some(patch);
        }

        patch.replace_opt("/temporary", self.temporary);
        if let Some(defaults) = &self.default_variations {
            patch
                .replace("/defaultVariations/onVariation", defaults.on_variation.clone())
                .replace("/defaultVariations/offVariation", defaults.off_variation.clone());
        }
        patch.replace("/tags", self.tags.clone());
        for (idx, variation) in self.variations.iter().enumerate() {
            if let Some(name) = &variation.name {
                patch.add(format!("/variations/{idx}/name"), name.as_str());
            }
        }
        Some(patch)
    }
}

/// Copies flag template settings. Returns the number of templates updated.
#[instrument(skip(scope))]
pub async fn migrate_flag_templates(scope: &Scope<'_>) -> ClientResult<usize> {
    let templates: Page<FlagTemplate> = scope
        .source
        .get(
            &format!("/projects/{}/flag-templates", scope.source_project),
            ApiFamily::InternalBeta,
        )
        .await?
        .error_for_status()?
        .json()?;

    let mut count = 0;
    for template in &templates.items {
        let Some(patch) = template.patch() else {
            debug!(template = %template.key, "Skipping template");
            continue;
        };

        let path = format!(
            "/projects/{}/flag-templates/{}",
            scope.target_project, template.key
        );
        let result = scope.target.patch(&path, &patch, ApiFamily::InternalBeta).await;
        if updated("flag template", &template.key, result) {
            count += 1;
        }
    }

    info!(count = count, "Updated flag templates");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template(value: Value) -> FlagTemplate {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_ai_templates_skipped() {
        assert!(template(json!({"key": "ai-prompt"})).patch().is_none());
        assert!(template(json!({"key": "ai-model"})).patch().is_none());
    }

    #[test]
    fn test_tags_only_templates() {
        let patch = template(json!({"key": "experiment", "tags": ["exp"], "temporary": true}))
            .patch()
            .unwrap();
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!([{"op": "replace", "path": "/tags", "value": ["exp"]}])
        );
    }

    #[test]
    fn test_full_template_patch() {
        let patch = template(json!({
            "key": "release",
            "tags": ["release"],
            "temporary": true,
            "defaultVariations": {"onVariation": 0, "offVariation": 1},
            "variations": [{"value": true, "name": "Available"}, {"value": false}]
        }))
        .patch()
        .unwrap();

        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!([
                {"op": "replace", "path": "/temporary", "value": true},
                {"op": "replace", "path": "/defaultVariations/onVariation", "value": 0},
                {"op": "replace", "path": "/defaultVariations/offVariation", "value": 1},
                {"op": "replace", "path": "/tags", "value": ["release"]},
                {"op": "add", "path": "/variations/0/name", "value": "Available"}
            ])
        );
    }
}
