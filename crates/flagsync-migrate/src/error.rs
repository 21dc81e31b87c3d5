//! Error types for migration runs.

use flagsync_client::ClientError;
use thiserror::Error;

use crate::orchestrator::Stage;

/// Result type alias using `MigrateError`.
pub type MigrateResult<T> = Result<T, MigrateError>;

/// Errors that end a migration run.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Settings failed validation. Every problem found is listed.
    #[error("Invalid configuration: {}", .0.join("; "))]
    Config(Vec<String>),

    /// The target project already exists and the mode forbids reusing it.
    #[error("Target project '{project}' already exists")]
    TargetProjectExists { project: String },

    /// A client could not be built or a request failed outside any stage.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A stage could not fetch the data it depends on.
    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: ClientError,
    },
}

impl MigrateError {
    /// Wraps a client error as a failure of `stage`.
    pub(crate) fn stage(stage: Stage) -> impl FnOnce(ClientError) -> Self {
        move |source| MigrateError::Stage { stage, source }
    }

    /// The underlying client error, if any.
    #[must_use]
    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            MigrateError::Client(e) | MigrateError::Stage { source: e, .. } => Some(e),
            _ => None,
        }
    }

    /// Whether the run ended because the API could not be reached.
    #[must_use]
    pub fn is_network(&self) -> bool {
        self.client_error().is_some_and(ClientError::is_network)
    }
}
