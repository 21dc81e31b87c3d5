//! Cursor pagination over `_links.next` collections.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::client::ApiClient;
use crate::config::ApiFamily;
use crate::error::ClientResult;

/// Path prefix carried by `next` links that the client adds itself.
const API_PREFIX: &str = "/api/v2";

/// A hypermedia link.
#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,
}

/// Links section of a collection page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageLinks {
    pub next: Option<Link>,
}

/// One page of a collection response.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(rename = "_links", default)]
    pub links: PageLinks,
    #[serde(rename = "totalCount")]
    pub total_count: Option<u64>,
}

impl<T> Page<T> {
    /// Path of the next page relative to the API base, if any.
    #[must_use]
    pub fn next_path(&self) -> Option<String> {
        self.links
            .next
            .as_ref()
            .map(|link| relative_path(&link.href))
    }
}

/// Strips everything up to and including the API prefix from a link.
fn relative_path(href: &str) -> String {
    match href.find(API_PREFIX) {
        Some(idx) => href[idx + API_PREFIX.len()..].to_string(),
        None => href.to_string(),
    }
}

impl ApiClient {
    /// Fetches every page of a collection, starting at `first_path`.
    ///
    /// A page without `items` counts as empty. Any failed page aborts the
    /// fetch with its error.
    #[instrument(skip(self))]
    pub async fn get_collection<T: DeserializeOwned>(
        &self,
        first_path: &str,
        family: ApiFamily,
    ) -> ClientResult<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(first_path.to_string());
        let mut pages = 0u32;

        while let Some(path) = next {
            let page: Page<T> = self.get(&path, family).await?.error_for_status()?.json()?;
            pages += 1;
            debug!(path = %path, count = page.items.len(), total = ?page.total_count, "Fetched page");

            next = page.next_path();
            items.extend(page.items);
        }

        debug!(pages = pages, items = items.len(), "Collection fetched");
        Ok(items)
    }
}
