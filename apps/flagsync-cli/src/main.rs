//! flagsync - copy a feature-flag project from one account to another
//!
//! The CLI can:
//! - Validate a configuration file without touching the network
//! - Migrate a project with its environments, segments, flags and rules

use clap::{Parser, Subcommand};

use flagsync_cli::commands;
use flagsync_cli::error::CliResult;

/// flagsync - feature-flag project migration
#[derive(Parser)]
#[command(name = "flagsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy a project from the source account to the target account
    Migrate(commands::migrate::MigrateArgs),

    /// Check a configuration file and print the resolved settings
    Validate(commands::validate::ValidateArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Migrate(args) => commands::migrate::execute(args).await,
        Commands::Validate(args) => commands::validate::execute(args),
    }
}
