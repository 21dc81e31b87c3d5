//! Common test utilities for flagsync-client integration tests.

#![allow(dead_code)]

use flagsync_client::{ApiClient, ClientConfig};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use wiremock::{Request, Respond, ResponseTemplate};

/// Creates a client against a mock server with short test delays.
pub fn test_client(server_uri: &str) -> ApiClient {
    ApiClient::with_base_url(server_uri, "api-test-token", ClientConfig::for_testing())
        .expect("client should build")
}

/// Creates a client with an explicit configuration.
pub fn client_with_config(server_uri: &str, config: ClientConfig) -> ApiClient {
    ApiClient::with_base_url(server_uri, "api-test-token", config).expect("client should build")
}

/// Test data factory for keyed collection items.
pub fn create_item(key: &str) -> Value {
    json!({
        "_id": format!("id-{key}"),
        "key": key,
        "name": format!("Item {key}")
    })
}

/// Wraps items in a collection page.
pub fn create_page(items: Vec<Value>, next_href: Option<&str>) -> Value {
    let mut page = json!({ "items": items, "_links": { "self": { "href": "/api/v2/self" } } });
    if let Some(href) = next_href {
        page["_links"]["next"] = json!({ "href": href });
    }
    page
}

/// Serves a fixed sequence of responses, then repeats the last one.
pub struct SequenceResponder {
    responses: Vec<ResponseTemplate>,
    calls: Arc<AtomicU32>,
}

impl SequenceResponder {
    pub fn new(responses: Vec<ResponseTemplate>) -> Self {
        Self {
            responses,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Shared counter of requests served.
    pub fn calls(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.calls)
    }
}

impl Respond for SequenceResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let idx = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
        let idx = idx.min(self.responses.len() - 1);
        self.responses[idx].clone()
    }
}
