//! Configuration file loading.
//!
//! The file is TOML with a `[source]` and a `[target]` section and an
//! optional `[options]` section:
//!
//! ```toml
//! [source]
//! project_key = "checkout"
//! api_token = "api-..."
//! federal = false
//!
//! [target]
//! project_key = "checkout-copy"
//! api_token = "api-..."
//!
//! [options]
//! migrate_segments = true
//! flags_to_ignore = "old-banner, legacy-cart"
//! migration_mode = "merge"
//! ```
//!
//! Tokens may also come from `FLAGSYNC_SOURCE_API_TOKEN` and
//! `FLAGSYNC_TARGET_API_TOKEN`, which take precedence over the file.

use std::env::VarError;
use std::path::{Path, PathBuf};

use flagsync_migrate::{ResourceToggles, SettingsInput};
use serde::Deserialize;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "app.toml";

/// Environment variable overriding the source account token.
pub const SOURCE_TOKEN_VAR: &str = "FLAGSYNC_SOURCE_API_TOKEN";

/// Environment variable overriding the target account token.
pub const TARGET_TOKEN_VAR: &str = "FLAGSYNC_TARGET_API_TOKEN";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing required section(s): {}", .0.join(", "))]
    MissingSections(Vec<&'static str>),
}

/// One account section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountSection {
    pub project_key: Option<String>,
    pub api_token: Option<String>,
    #[serde(default)]
    pub federal: bool,
}

/// A list of flag keys, written either as a TOML array or a
/// comma-separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum KeyList {
    List(Vec<String>),
    Csv(String),
}

impl Default for KeyList {
    fn default() -> Self {
        KeyList::List(Vec::new())
    }
}

impl KeyList {
    /// The keys, trimmed, without empty entries.
    pub fn into_keys(self) -> Vec<String> {
        let keys = match self {
            KeyList::List(keys) => keys,
            KeyList::Csv(raw) => raw.split(',').map(str::to_string).collect(),
        };
        keys.into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect()
    }
}

fn enabled() -> bool {
    true
}

/// The `[options]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct OptionsSection {
    #[serde(default = "enabled")]
    pub migrate_flag_templates: bool,
    #[serde(default = "enabled")]
    pub migrate_context_kinds: bool,
    #[serde(default = "enabled")]
    pub migrate_payload_filters: bool,
    #[serde(default = "enabled")]
    pub migrate_segments: bool,
    #[serde(default = "enabled")]
    pub migrate_metrics: bool,
    #[serde(default)]
    pub flags_to_migrate: KeyList,
    #[serde(default)]
    pub flags_to_ignore: KeyList,
    pub migration_mode: Option<String>,
    #[serde(default)]
    pub ignore_pauses: bool,
}

impl Default for OptionsSection {
    fn default() -> Self {
        Self {
            migrate_flag_templates: true,
            migrate_context_kinds: true,
            migrate_payload_filters: true,
            migrate_segments: true,
            migrate_metrics: true,
            flags_to_migrate: KeyList::default(),
            flags_to_ignore: KeyList::default(),
            migration_mode: None,
            ignore_pauses: false,
        }
    }
}

/// The configuration file as written.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub source: Option<AccountSection>,
    pub target: Option<AccountSection>,
    #[serde(default)]
    pub options: OptionsSection,
}

impl FileConfig {
    /// Parse a configuration document.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a configuration file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Build raw migration settings, applying token overrides from the process
    /// environment.
    pub fn into_settings(self) -> Result<SettingsInput, ConfigError> {
        self.into_settings_with(|key| std::env::var(key))
    }

    /// Build raw migration settings, applying token overrides from a custom
    /// variable reader.
    ///
    /// This allows tests to supply variables without mutating process-global
    /// environment state.
    pub fn into_settings_with<F>(self, reader: F) -> Result<SettingsInput, ConfigError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let (source, target) = match (self.source, self.target) {
            (Some(source), Some(target)) => (source, target),
            (source, target) => {
                let mut missing = Vec::new();
                if source.is_none() {
                    missing.push("[source]");
                }
                if target.is_none() {
                    missing.push("[target]");
                }
                return Err(ConfigError::MissingSections(missing));
            }
        };

        let override_token = |var: &str, file: Option<String>| {
            reader(var)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .or(file)
        };

        let options = self.options;
        Ok(SettingsInput {
            source_project_key: source.project_key,
            source_api_token: override_token(SOURCE_TOKEN_VAR, source.api_token),
            source_federal: source.federal,
            target_project_key: target.project_key,
            target_api_token: override_token(TARGET_TOKEN_VAR, target.api_token),
            target_federal: target.federal,
            toggles: ResourceToggles {
                flag_templates: options.migrate_flag_templates,
                context_kinds: options.migrate_context_kinds,
                payload_filters: options.migrate_payload_filters,
                segments: options.migrate_segments,
                metrics: options.migrate_metrics,
            },
            flags_to_migrate: options.flags_to_migrate.into_keys(),
            flags_to_ignore: options.flags_to_ignore.into_keys(),
            migration_mode: options.migration_mode,
            ignore_pauses: options.ignore_pauses,
        })
    }
}

/// Load `path` and resolve it into raw migration settings.
pub fn load(path: &Path) -> Result<SettingsInput, ConfigError> {
    FileConfig::from_path(path)?.into_settings()
}
