//! Common test utilities for flagsync-migrate integration tests.

#![allow(dead_code)]

use flagsync_client::{ApiClient, ClientConfig, Region};
use flagsync_migrate::{
    AccountSettings, FlagSelection, MigrationMode, MigrationSettings, Migrator, ResourceToggles,
};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const PROJECT: &str = "proj";

/// Wraps items in a single collection page.
pub fn page(items: Vec<Value>) -> Value {
    let total = items.len();
    json!({ "items": items, "totalCount": total, "_links": {} })
}

pub fn create_flag(key: &str) -> Value {
    json!({
        "_id": format!("id-{key}"),
        "key": key,
        "name": format!("Flag {key}"),
        "kind": "boolean",
        "clientSideAvailability": {"usingMobileKey": false, "usingEnvironmentId": true},
        "variations": [{"value": true}, {"value": false}],
        "temporary": false,
        "tags": [],
        "_maintainer": {"_id": "src-ana", "email": "ana@example.com"}
    })
}

pub fn create_flag_details(key: &str) -> Value {
    json!({
        "key": key,
        "environments": {
            "production": {
                "on": true,
                "archived": false,
                "targets": [],
                "contextTargets": [],
                "fallthrough": {"variation": 0},
                "offVariation": 1,
                "prerequisites": [],
                "trackEvents": false,
                "trackEventsFallthrough": false,
                "rules": [{"_id": "r1", "variation": 0, "clauses": [
                    {"_id": "c1", "attribute": "country", "op": "in", "values": ["NZ"], "negate": false}
                ]}]
            }
        }
    })
}

pub fn create_environment(key: &str) -> Value {
    json!({
        "_id": format!("env-{key}"),
        "key": key,
        "name": key,
        "color": "417505",
        "defaultTtl": 0,
        "tags": [],
        "secureMode": false,
        "defaultTrackEvents": false,
        "confirmChanges": false,
        "requireComments": false,
        "critical": false
    })
}

pub fn create_segment(key: &str, rules: Value) -> Value {
    json!({
        "_id": format!("seg-{key}"),
        "key": key,
        "name": format!("Segment {key}"),
        "tags": [],
        "included": [],
        "excluded": [],
        "includedContexts": [],
        "excludedContexts": [],
        "rules": rules
    })
}

/// Client for a mock account with shortened retry timings.
pub fn client(server: &MockServer) -> ApiClient {
    ApiClient::with_base_url(&server.uri(), "api-test", ClientConfig::for_testing())
        .expect("test client")
}

/// Settings copying only the required stages, without pauses.
pub fn settings(mode: MigrationMode) -> MigrationSettings {
    MigrationSettings {
        source: AccountSettings {
            api_token: "api-source".into(),
            region: Region::Commercial,
        },
        target: AccountSettings {
            api_token: "api-target".into(),
            region: Region::Commercial,
        },
        source_project: PROJECT.into(),
        target_project: PROJECT.into(),
        toggles: ResourceToggles {
            flag_templates: false,
            context_kinds: false,
            payload_filters: false,
            segments: false,
            metrics: false,
        },
        flags: FlagSelection::All,
        mode,
        ignore_pauses: true,
    }
}

/// Source and target accounts backed by mock servers.
pub struct Accounts {
    pub source: MockServer,
    pub target: MockServer,
}

impl Accounts {
    pub async fn start() -> Self {
        Self {
            source: MockServer::start().await,
            target: MockServer::start().await,
        }
    }

    pub fn migrator(&self, settings: MigrationSettings) -> Migrator {
        let source = ApiClient::with_base_url(
            &self.source.uri(),
            &settings.source.api_token,
            ClientConfig::for_testing(),
        )
        .expect("source client");
        let target = ApiClient::with_base_url(
            &self.target.uri(),
            &settings.target.api_token,
            ClientConfig::for_testing(),
        )
        .expect("target client");
        Migrator::with_clients(settings, source, target)
    }

    /// Mounts the source project, its flags, one `production` environment
    /// and members.
    pub async fn mount_source(&self, flags: &[&str]) {
        let server = &self.source;

        get(server, "/api/v2/projects/proj", json!({
            "key": PROJECT,
            "name": "Project",
            "defaultClientSideAvailability": {"usingMobileKey": false, "usingEnvironmentId": true},
            "tags": []
        }))
        .await;
        get(
            server,
            "/api/v2/flags/proj",
            page(flags.iter().map(|k| create_flag(k)).collect()),
        )
        .await;
        get(
            server,
            "/api/v2/projects/proj/environments",
            page(vec![create_environment("production")]),
        )
        .await;
        get(
            server,
            "/api/v2/members",
            page(vec![json!({"_id": "src-ana", "email": "ana@example.com"})]),
        )
        .await;

        for key in flags {
            get(server, &format!("/api/v2/flags/proj/{key}"), create_flag_details(key)).await;
        }
    }

    /// Mounts the target account with `production` already present.
    ///
    /// Flag creation succeeds; flag patches are left to the test.
    pub async fn mount_target(&self, project_status: u16) {
        let server = &self.target;

        let project_body = if project_status == 409 {
            json!({"code": "conflict", "message": "Project already exists"})
        } else {
            json!({"key": PROJECT})
        };
        Mock::given(method("POST"))
            .and(path("/api/v2/projects"))
            .respond_with(ResponseTemplate::new(project_status).set_body_json(project_body))
            .mount(server)
            .await;

        get(
            server,
            "/api/v2/members",
            page(vec![json!({"_id": "tgt-ana", "email": "ana@example.com"})]),
        )
        .await;
        get(
            server,
            "/api/v2/projects/proj/environments",
            page(vec![create_environment("production")]),
        )
        .await;
        respond(server, "PATCH", "/api/v2/projects/proj/environments/production", 200).await;
        respond(server, "POST", "/api/v2/flags/proj", 201).await;
    }
}

/// Mounts a GET returning `body`.
pub async fn get(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mounts a write answering `status` with an empty object.
pub async fn respond(server: &MockServer, verb: &str, route: &str, status: u16) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({})))
        .mount(server)
        .await;
}

/// Requests received by `server` with the given method and path.
pub async fn requests_to(server: &MockServer, verb: &str, route: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == verb && r.url.path() == route)
        .collect()
}

/// Keys of the JSON bodies posted to `route`.
pub async fn posted_keys(server: &MockServer, route: &str) -> Vec<String> {
    requests_to(server, "POST", route)
        .await
        .iter()
        .filter_map(|r| r.body_json::<Value>().ok())
        .filter_map(|body| body["key"].as_str().map(str::to_string))
        .collect()
}
