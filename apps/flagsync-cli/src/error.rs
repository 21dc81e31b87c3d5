//! CLI error types and exit codes

use flagsync_client::ClientError;
use flagsync_migrate::MigrateError;
use thiserror::Error;

use crate::config::ConfigError;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: Configuration error
/// - 3: Network error
/// - 4: Target project already exists (migrate mode)
/// - 5: API error
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Target project '{0}' already exists")]
    ProjectExists(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Output error: {0}")]
    Output(String),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Output(_) => 1,
            CliError::Network(_) => 3,
            CliError::ProjectExists(_) => 4,
            CliError::Api(_) => 5,
        }
    }

    /// Print the error to stderr with appropriate formatting
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {}", self);
        } else {
            eprintln!("Error: {}", self);
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {}", suggestion);
            } else {
                eprintln!("\nSuggestion: {}", suggestion);
            }
        }
    }

    /// Get a suggested action for this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::ProjectExists(_) => {
                Some("Rerun with '--mode retry' to resume or '--mode merge' to merge into it.")
            }
            CliError::Network(_) => Some("Check your network connection and try again."),
            CliError::Config(_) => {
                Some("Run 'flagsync validate' to check the configuration file.")
            }
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<ClientError> for CliError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::InvalidConfig(msg) => CliError::Config(msg),
            e if e.is_network() => CliError::Network(e.to_string()),
            e => CliError::Api(e.to_string()),
        }
    }
}

impl From<MigrateError> for CliError {
    fn from(e: MigrateError) -> Self {
        match e {
            MigrateError::Config(messages) => CliError::Config(messages.join("; ")),
            MigrateError::TargetProjectExists { project } => CliError::ProjectExists(project),
            MigrateError::Client(source) => source.into(),
            e if e.is_network() => CliError::Network(e.to_string()),
            e => CliError::Api(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Output(format!("JSON error: {}", e))
    }
}
