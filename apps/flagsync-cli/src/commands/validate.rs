//! Validate command - check a configuration file offline

use std::path::PathBuf;

use clap::Args;
use flagsync_migrate::{AccountSettings, MigrationSettings};
use serde::Serialize;
use serde_json::Value;

use crate::config::{self, DEFAULT_CONFIG_FILE};
use crate::error::CliResult;

/// Arguments for the validate command
#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Path to the TOML configuration file
    #[arg(long, short, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
}

/// Resolved settings with tokens masked.
#[derive(Debug, Serialize)]
pub struct SettingsView {
    pub source: AccountView,
    pub target: AccountView,
    pub source_project: String,
    pub target_project: String,
    pub same_account: bool,
    pub mode: String,
    pub ignore_pauses: bool,
    pub resources: Value,
    pub flags: Value,
}

#[derive(Debug, Serialize)]
pub struct AccountView {
    pub api_token: String,
    pub region: String,
    pub host: &'static str,
}

impl From<&AccountSettings> for AccountView {
    fn from(account: &AccountSettings) -> Self {
        Self {
            api_token: mask_token(&account.api_token),
            region: account.region.to_string(),
            host: account.region.host(),
        }
    }
}

impl SettingsView {
    pub fn new(settings: &MigrationSettings) -> CliResult<Self> {
        Ok(Self {
            source: (&settings.source).into(),
            target: (&settings.target).into(),
            source_project: settings.source_project.clone(),
            target_project: settings.target_project.clone(),
            same_account: settings.same_account(),
            mode: settings.mode.to_string(),
            ignore_pauses: settings.ignore_pauses,
            resources: serde_json::to_value(settings.toggles)?,
            flags: serde_json::to_value(&settings.flags)?,
        })
    }
}

/// Keeps the last four characters of a token.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "[REDACTED]".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

/// Execute the validate command
pub fn execute(args: ValidateArgs) -> CliResult<()> {
    let settings = config::load(&args.config)?.validate()?;
    let view = SettingsView::new(&settings)?;
    println!("{}", serde_json::to_string_pretty(&view)?);
    eprintln!("Configuration is valid.");
    Ok(())
}
