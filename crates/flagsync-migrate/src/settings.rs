//! Migration settings and their validation.

use std::collections::BTreeSet;
use std::str::FromStr;

use flagsync_client::Region;
use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, MigrateResult};

/// Policy applied when the target project already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationMode {
    /// Fresh migration; an existing target project aborts the run.
    #[default]
    Migrate,
    /// Resume a previous, partially completed run.
    Retry,
    /// Layer the source onto an existing target project.
    Merge,
}

impl FromStr for MigrationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "migrate" => Ok(MigrationMode::Migrate),
            "retry" => Ok(MigrationMode::Retry),
            "merge" => Ok(MigrationMode::Merge),
            other => Err(format!(
                "Unknown migration mode '{other}' (expected migrate, retry or merge)"
            )),
        }
    }
}

impl std::fmt::Display for MigrationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationMode::Migrate => write!(f, "migrate"),
            MigrationMode::Retry => write!(f, "retry"),
            MigrationMode::Merge => write!(f, "merge"),
        }
    }
}

/// Which flags take part in the migration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "selection", content = "keys", rename_all = "lowercase")]
pub enum FlagSelection {
    /// Every flag in the source project.
    #[default]
    All,
    /// Only the listed flags.
    Only(BTreeSet<String>),
    /// Every flag except the listed ones.
    Except(BTreeSet<String>),
}

impl FlagSelection {
    /// Builds a selection from an allow-list and a deny-list.
    ///
    /// Empty lists mean "not given". Giving both is an error.
    pub fn from_lists(allow: Vec<String>, deny: Vec<String>) -> Result<Self, String> {
        let allow: BTreeSet<String> = normalize_keys(allow);
        let deny: BTreeSet<String> = normalize_keys(deny);

        match (allow.is_empty(), deny.is_empty()) {
            (true, true) => Ok(FlagSelection::All),
            (false, true) => Ok(FlagSelection::Only(allow)),
            (true, false) => Ok(FlagSelection::Except(deny)),
            (false, false) => Err(
                "flags_to_migrate and flags_to_ignore cannot both be set".to_string(),
            ),
        }
    }

    /// Whether the flag `key` is selected.
    #[must_use]
    pub fn includes(&self, key: &str) -> bool {
        match self {
            FlagSelection::All => true,
            FlagSelection::Only(keys) => keys.contains(key),
            FlagSelection::Except(keys) => !keys.contains(key),
        }
    }
}

fn normalize_keys(keys: Vec<String>) -> BTreeSet<String> {
    keys.into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Credentials and region of one account.
#[derive(Clone, PartialEq, Eq)]
pub struct AccountSettings {
    pub api_token: String,
    pub region: Region,
}

impl std::fmt::Debug for AccountSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountSettings")
            .field("api_token", &"[REDACTED]")
            .field("region", &self.region)
            .finish()
    }
}

/// Optional resource kinds. All are migrated unless switched off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceToggles {
    pub flag_templates: bool,
    pub context_kinds: bool,
    pub payload_filters: bool,
    pub segments: bool,
    pub metrics: bool,
}

impl Default for ResourceToggles {
    fn default() -> Self {
        Self {
            flag_templates: true,
            context_kinds: true,
            payload_filters: true,
            segments: true,
            metrics: true,
        }
    }
}

/// Validated settings of a migration run.
#[derive(Debug, Clone)]
pub struct MigrationSettings {
    pub source: AccountSettings,
    pub target: AccountSettings,
    pub source_project: String,
    pub target_project: String,
    pub toggles: ResourceToggles,
    pub flags: FlagSelection,
    pub mode: MigrationMode,
    pub ignore_pauses: bool,
}

impl MigrationSettings {
    /// Whether source and target use the same access token.
    #[must_use]
    pub fn same_account(&self) -> bool {
        self.source.api_token == self.target.api_token
    }
}

/// Raw, unvalidated settings as read from configuration.
#[derive(Debug, Clone, Default)]
pub struct SettingsInput {
    pub source_project_key: Option<String>,
    pub source_api_token: Option<String>,
    pub source_federal: bool,
    pub target_project_key: Option<String>,
    pub target_api_token: Option<String>,
    pub target_federal: bool,
    pub toggles: ResourceToggles,
    pub flags_to_migrate: Vec<String>,
    pub flags_to_ignore: Vec<String>,
    pub migration_mode: Option<String>,
    pub ignore_pauses: bool,
}

impl SettingsInput {
    /// Validates the input, reporting every problem at once.
    pub fn validate(self) -> MigrateResult<MigrationSettings> {
        let mut errors = Vec::new();

        let source_project = required(self.source_project_key, "source.project_key", &mut errors);
        let source_token = required(self.source_api_token, "source.api_token", &mut errors);
        let target_token = required(self.target_api_token, "target.api_token", &mut errors);

        let flags = FlagSelection::from_lists(self.flags_to_migrate, self.flags_to_ignore)
            .unwrap_or_else(|e| {
                errors.push(e);
                FlagSelection::All
            });

        let mode = match self.migration_mode.as_deref().map(str::trim) {
            None | Some("") => MigrationMode::default(),
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                errors.push(e);
                MigrationMode::default()
            }),
        };

        if !errors.is_empty() {
            return Err(MigrateError::Config(errors));
        }

        let target_project = self
            .target_project_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| source_project.clone());

        Ok(MigrationSettings {
            source: AccountSettings {
                api_token: source_token,
                region: Region::from_federal(self.source_federal),
            },
            target: AccountSettings {
                api_token: target_token,
                region: Region::from_federal(self.target_federal),
            },
            source_project,
            target_project,
            toggles: self.toggles,
            flags,
            mode,
            ignore_pauses: self.ignore_pauses,
        })
    }
}

fn required(value: Option<String>, name: &str, errors: &mut Vec<String>) -> String {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => v,
        Some(_) => {
            errors.push(format!("{name} cannot be empty"));
            String::new()
        }
        None => {
            errors.push(format!("{name} is required"));
            String::new()
        }
    }
}
