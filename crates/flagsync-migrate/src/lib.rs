//! # flagsync migrate
//!
//! Copies a feature-flag project (environments, flag templates, context
//! kinds, payload filters, metrics, metric groups, segments, flags and their
//! per-environment targeting) from a source account to a target account.
//!
//! Stages run strictly in dependency order; see [`Stage`].
//!
//! ## Example
//!
//! ```no_run
//! use flagsync_client::ClientConfig;
//! use flagsync_migrate::{Migrator, SettingsInput};
//!
//! # async fn example() -> Result<(), flagsync_migrate::MigrateError> {
//! let settings = SettingsInput {
//!     source_project_key: Some("checkout".into()),
//!     source_api_token: Some("api-source".into()),
//!     target_api_token: Some("api-target".into()),
//!     ..Default::default()
//! }
//! .validate()?;
//!
//! let summary = Migrator::new(settings, ClientConfig::default())?.run().await?;
//! println!("{}", serde_json::to_string(&summary).unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod members;
pub mod orchestrator;
pub mod pacing;
pub mod patch;
pub mod resources;
pub mod rules;
pub mod settings;

pub use error::{MigrateError, MigrateResult};
pub use members::{MaintainerRef, MemberIdentityMap};
pub use orchestrator::{MigrationContext, MigrationSummary, Migrator, Stage};
pub use pacing::Pacer;
pub use patch::{JsonPatch, PatchOp};
pub use settings::{
    AccountSettings, FlagSelection, MigrationMode, MigrationSettings, ResourceToggles,
    SettingsInput,
};
