//! Target project creation.

use flagsync_client::{ApiFamily, ClientResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use super::Scope;

/// Suffix appended to the project name when copying within one account.
pub const COPY_SUFFIX: &str = " (copy)";

/// Outcome of creating the target project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectOutcome {
    Created,
    AlreadyExists,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamingConvention {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectRecord {
    name: String,
    #[serde(default)]
    default_client_side_availability: Value,
    #[serde(default)]
    tags: Vec<String>,
    naming_convention: Option<NamingConvention>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewProject<'a> {
    key: &'a str,
    name: String,
    default_client_side_availability: Value,
    tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    naming_convention: Option<NamingConvention>,
}

impl ProjectRecord {
    fn into_payload(self, key: &str, same_account: bool) -> NewProject<'_> {
        let name = if same_account {
            format!("{}{COPY_SUFFIX}", self.name)
        } else {
            self.name
        };
        NewProject {
            key,
            name,
            default_client_side_availability: self.default_client_side_availability,
            tags: self.tags,
            naming_convention: self.naming_convention,
        }
    }
}

/// Creates the target project from the source project's settings.
///
/// A conflict is reported as [`ProjectOutcome::AlreadyExists`]; any other
/// failure is an error.
#[instrument(skip(scope), fields(project = scope.target_project))]
pub async fn create_project(scope: &Scope<'_>, same_account: bool) -> ClientResult<ProjectOutcome> {
    let source: ProjectRecord = scope
        .source
        .get(&format!("/projects/{}", scope.source_project), ApiFamily::Stable)
        .await?
        .error_for_status()?
        .json()?;

    let payload = source.into_payload(scope.target_project, same_account);
    let response = scope
        .target
        .post("/projects", &payload, ApiFamily::Stable)
        .await?;

    if response.is_conflict() {
        return Ok(ProjectOutcome::AlreadyExists);
    }
    response.error_for_status()?;

    info!(name = %payload.name, "Created target project");
    Ok(ProjectOutcome::Created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> ProjectRecord {
        serde_json::from_value(json!({
            "_id": "abc",
            "key": "checkout",
            "name": "Checkout",
            "defaultClientSideAvailability": {"usingMobileKey": true, "usingEnvironmentId": false},
            "tags": ["team-payments"],
            "namingConvention": {"case": "kebabCase"}
        }))
        .unwrap()
    }

    #[test]
    fn test_payload_fields() {
        let payload = serde_json::to_value(record().into_payload("checkout-eu", false)).unwrap();
        assert_eq!(
            payload,
            json!({
                "key": "checkout-eu",
                "name": "Checkout",
                "defaultClientSideAvailability": {"usingMobileKey": true, "usingEnvironmentId": false},
                "tags": ["team-payments"],
                "namingConvention": {"case": "kebabCase"}
            })
        );
    }

    #[test]
    fn test_same_account_name_suffix() {
        let payload = record().into_payload("checkout-2", true);
        assert_eq!(payload.name, "Checkout (copy)");
    }

    #[test]
    fn test_naming_convention_omitted_when_absent() {
        let record: ProjectRecord =
            serde_json::from_value(json!({"name": "Bare", "tags": []})).unwrap();
        let payload = serde_json::to_value(record.into_payload("bare", false)).unwrap();
        assert!(payload.get("namingConvention").is_none());
    }
}
