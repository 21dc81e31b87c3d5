//! Metrics and metric groups.

use flagsync_client::{ApiFamily, ClientResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use super::{created_or_exists, decoded, KeyedItem, Scope};
use crate::members::{MaintainerRef, MemberIdentityMap};
use crate::pacing::ITEM_PAUSE;

/// A metric as read from the source and written to the target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub key: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_numeric: Option<bool>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub randomization_units: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_aggregation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentile_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_criteria: Option<String>,
    #[serde(rename = "_maintainer", default, skip_serializing)]
    pub maintainer: Option<MaintainerRef>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub maintainer_id: Option<String>,
}

impl Metric {
    /// Resolves the source maintainer to a target member.
    pub fn translate_maintainer(&mut self, members: &MemberIdentityMap) {
        self.maintainer_id = self.maintainer.as_ref().and_then(|m| members.resolve(m));
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricGroup {
    pub key: String,
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<GroupMetric>,
    pub maintainer: Option<MaintainerRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMetric {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_in_group: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewMetricGroup<'a> {
    key: &'a str,
    name: &'a str,
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    tags: &'a [String],
    metrics: &'a [GroupMetric],
    #[serde(skip_serializing_if = "Option::is_none")]
    maintainer_id: Option<String>,
}

impl MetricGroup {
    fn payload(&self, members: &MemberIdentityMap) -> NewMetricGroup<'_> {
        NewMetricGroup {
            key: &self.key,
            name: &self.name,
            kind: &self.kind,
            description: self.description.as_deref(),
            tags: &self.tags,
            metrics: &self.metrics,
            maintainer_id: self.maintainer.as_ref().and_then(|m| members.resolve(m)),
        }
    }
}

/// Copies metrics. Returns the number created.
#[instrument(skip(scope, members))]
pub async fn migrate_metrics(scope: &Scope<'_>, members: &MemberIdentityMap) -> ClientResult<usize> {
    let listed: Vec<KeyedItem> = scope
        .source
        .get_collection(
            &format!("/metrics/{}?limit=20", scope.source_project),
            ApiFamily::Stable,
        )
        .await?;

    let target_path = format!("/metrics/{}", scope.target_project);
    let mut count = 0;

    for item in &listed {
        let result = scope
            .source
            .get(
                &format!("/metrics/{}/{}", scope.source_project, item.key),
                ApiFamily::Stable,
            )
            .await;
        scope.pacer.pause(ITEM_PAUSE).await;
        let Some(mut metric) = decoded::<Metric>("metric", &item.key, result) else {
            continue;
        };

        metric.translate_maintainer(members);
        let result = scope.target.post(&target_path, &metric, ApiFamily::Stable).await;
        if created_or_exists("metric", &metric.key, result) {
            count += 1;
        }
        scope.pacer.pause(ITEM_PAUSE).await;
    }

    info!(count = count, "Created metrics");
    Ok(count)
}

/// Copies metric groups. Returns the number created.
#[instrument(skip(scope, members))]
pub async fn migrate_metric_groups(
    scope: &Scope<'_>,
    members: &MemberIdentityMap,
) -> ClientResult<usize> {
    let groups: Vec<MetricGroup> = scope
        .source
        .get_collection(
            &format!("/projects/{}/metric-groups?limit=20", scope.source_project),
            ApiFamily::Beta,
        )
        .await?;

    let target_path = format!("/projects/{}/metric-groups", scope.target_project);
    let mut count = 0;

    for group in &groups {
        let result = scope
            .target
            .post(&target_path, &group.payload(members), ApiFamily::Beta)
            .await;
        if created_or_exists("metric group", &group.key, result) {
            count += 1;
        }
        scope.pacer.pause(ITEM_PAUSE).await;
    }

    info!(count = count, "Created metric groups");
    Ok(count)
}
