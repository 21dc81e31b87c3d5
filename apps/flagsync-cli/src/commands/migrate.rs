//! Migrate command - copy a project between accounts

use std::path::PathBuf;

use clap::Args;
use flagsync_client::ClientConfig;
use flagsync_migrate::{MigrationMode, MigrationSettings, Migrator};
use tracing::{info, warn};

use crate::config::{self, DEFAULT_CONFIG_FILE};
use crate::error::CliResult;
use crate::logging;

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Path to the TOML configuration file
    #[arg(long, short, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Policy for an existing target project (migrate, retry or merge)
    #[arg(long)]
    pub mode: Option<MigrationMode>,

    /// Skip the pauses between batches of requests
    #[arg(long)]
    pub ignore_pauses: bool,

    /// Log request-level detail
    #[arg(long, short)]
    pub verbose: bool,

    /// Write logs as JSON objects
    #[arg(long)]
    pub log_json: bool,
}

impl MigrateArgs {
    /// Load the configuration file and apply command-line overrides.
    pub fn resolve(&self) -> CliResult<MigrationSettings> {
        let mut input = config::load(&self.config)?;
        if let Some(mode) = self.mode {
            input.migration_mode = Some(mode.to_string());
        }
        if self.ignore_pauses {
            input.ignore_pauses = true;
        }
        Ok(input.validate()?)
    }
}

/// Execute the migrate command
pub async fn execute(args: MigrateArgs) -> CliResult<()> {
    logging::init_logging(args.verbose, args.log_json);

    let settings = args.resolve()?;
    info!(
        source = %settings.source_project,
        target = %settings.target_project,
        mode = %settings.mode,
        "Configuration loaded"
    );

    let migrator = Migrator::new(settings, ClientConfig::default())?;
    let summary = migrator.run().await?;

    if !summary.failed_flags.is_empty() {
        warn!(
            count = summary.failed_flags.len(),
            flags = ?summary.failed_flags,
            "Some flags could not have their environment rules copied"
        );
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
