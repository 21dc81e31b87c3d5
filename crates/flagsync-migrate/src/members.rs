//! Member identity translation between accounts.
//!
//! Maintainers are referenced by member id, which differs between accounts.
//! Members are matched across accounts by email.

use std::collections::HashMap;

use flagsync_client::{ApiClient, ApiFamily, ClientResult};
use serde::Deserialize;
use tracing::debug;

const MEMBERS_PATH: &str = "/members?limit=100";

/// An account member as listed by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
}

/// Reference to a maintainer embedded in a source record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MaintainerRef {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub key: Option<String>,
    pub email: Option<String>,
}

/// Source member id → email and target email → target member id.
#[derive(Debug, Clone, Default)]
pub struct MemberIdentityMap {
    source_emails: HashMap<String, String>,
    target_ids: HashMap<String, String>,
}

impl MemberIdentityMap {
    /// Builds the map from both member lists.
    #[must_use]
    pub fn from_members(source: Vec<Member>, target: Vec<Member>) -> Self {
        Self {
            source_emails: source.into_iter().map(|m| (m.id, m.email)).collect(),
            target_ids: target.into_iter().map(|m| (m.email, m.id)).collect(),
        }
    }

    /// Loads the member lists of both accounts.
    pub async fn load(source: &ApiClient, target: &ApiClient) -> ClientResult<Self> {
        let source_members: Vec<Member> =
            source.get_collection(MEMBERS_PATH, ApiFamily::Stable).await?;
        let target_members: Vec<Member> =
            target.get_collection(MEMBERS_PATH, ApiFamily::Stable).await?;

        debug!(
            source = source_members.len(),
            target = target_members.len(),
            "Loaded account members"
        );

        Ok(Self::from_members(source_members, target_members))
    }

    /// Target member id for an email.
    #[must_use]
    pub fn translate_email(&self, email: &str) -> Option<&str> {
        self.target_ids.get(email).map(String::as_str)
    }

    /// Target member id for a source member id.
    #[must_use]
    pub fn translate_source_id(&self, id: &str) -> Option<&str> {
        self.source_emails
            .get(id)
            .and_then(|email| self.translate_email(email))
    }

    /// Target member id for a maintainer reference.
    ///
    /// The email wins when present; otherwise the source id (`_id` or `key`).
    #[must_use]
    pub fn resolve(&self, maintainer: &MaintainerRef) -> Option<String> {
        if let Some(email) = &maintainer.email {
            return self.translate_email(email).map(str::to_string);
        }
        maintainer
            .id
            .as_deref()
            .or(maintainer.key.as_deref())
            .and_then(|id| self.translate_source_id(id))
            .map(str::to_string)
    }

    /// Number of target members known by email.
    #[must_use]
    pub fn target_len(&self) -> usize {
        self.target_ids.len()
    }
}
