//! Migration orchestration.
//!
//! A run is a fixed sequence of [`Stage`]s. Keys and members gathered up
//! front are threaded through every stage in a [`MigrationContext`]; each
//! stage reports its counts as a partial [`MigrationSummary`] that is merged
//! into the run's summary.

use flagsync_client::{ApiClient, ApiFamily, ClientConfig, ClientResult};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::error::{MigrateError, MigrateResult};
use crate::members::MemberIdentityMap;
use crate::pacing::Pacer;
use crate::resources::project::ProjectOutcome;
use crate::resources::{
    context_kinds, environments, flag_environments, flag_templates, flags, metrics,
    payload_filters, project, segments, KeyedItem, Scope,
};
use crate::settings::{FlagSelection, MigrationMode, MigrationSettings, ResourceToggles};

/// Passes over flags whose environment targeting could not be written.
pub const FLAG_RULE_PASSES: usize = 5;

/// Steps of a migration run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    FetchKeys,
    CreateProject,
    FlagTemplates,
    ContextKinds,
    PayloadFilters,
    Environments,
    Metrics,
    Segments,
    Flags,
    FlagEnvironmentRules,
}

impl Stage {
    /// Every stage, in execution order.
    pub const ALL: [Stage; 10] = [
        Stage::FetchKeys,
        Stage::CreateProject,
        Stage::FlagTemplates,
        Stage::ContextKinds,
        Stage::PayloadFilters,
        Stage::Environments,
        Stage::Metrics,
        Stage::Segments,
        Stage::Flags,
        Stage::FlagEnvironmentRules,
    ];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Stage::FetchKeys => "fetch-keys",
            Stage::CreateProject => "create-project",
            Stage::FlagTemplates => "flag-templates",
            Stage::ContextKinds => "context-kinds",
            Stage::PayloadFilters => "payload-filters",
            Stage::Environments => "environments",
            Stage::Metrics => "metrics",
            Stage::Segments => "segments",
            Stage::Flags => "flags",
            Stage::FlagEnvironmentRules => "flag-environment-rules",
        }
    }

    /// Whether the stage runs under `toggles`. Required stages always run.
    #[must_use]
    pub fn is_enabled(&self, toggles: &ResourceToggles) -> bool {
        match self {
            Stage::FlagTemplates => toggles.flag_templates,
            Stage::ContextKinds => toggles.context_kinds,
            Stage::PayloadFilters => toggles.payload_filters,
            Stage::Metrics => toggles.metrics,
            Stage::Segments => toggles.segments,
            Stage::FetchKeys
            | Stage::CreateProject
            | Stage::Environments
            | Stage::Flags
            | Stage::FlagEnvironmentRules => true,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Source data every later stage depends on.
#[derive(Debug, Clone, Default)]
pub struct MigrationContext {
    /// Selected flag keys, in listing order.
    pub flag_keys: Vec<String>,
    /// Source environment keys.
    pub env_keys: Vec<String>,
    pub members: MemberIdentityMap,
}

impl MigrationContext {
    /// Gathers flag keys, environment keys and members of both accounts.
    pub async fn fetch(scope: &Scope<'_>, selection: &FlagSelection) -> ClientResult<Self> {
        let flag_keys: Vec<String> = scope
            .source
            .get_collection::<KeyedItem>(
                &format!("/flags/{}?limit=50", scope.source_project),
                ApiFamily::Stable,
            )
            .await?
            .into_iter()
            .map(|f| f.key)
            .filter(|key| selection.includes(key))
            .collect();
        info!(count = flag_keys.len(), "Fetched flag keys");

        let env_keys: Vec<String> = scope
            .source
            .get_collection::<KeyedItem>(
                &format!("/projects/{}/environments?limit=20", scope.source_project),
                ApiFamily::Stable,
            )
            .await?
            .into_iter()
            .map(|e| e.key)
            .collect();
        info!(count = env_keys.len(), "Fetched environment keys");

        let members = MemberIdentityMap::load(scope.source, scope.target).await?;

        Ok(Self {
            flag_keys,
            env_keys,
            members,
        })
    }
}

/// Counts of what a run wrote, printed as the run's final output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationSummary {
    pub total_context_kinds: usize,
    pub total_payload_filters: usize,
    pub total_environments: usize,
    pub total_metrics: usize,
    pub total_metric_groups: usize,
    pub total_segments: usize,
    pub total_flags: usize,
    pub total_target_rules: usize,
    /// Flags whose environment targeting could not be written.
    pub failed_flags: Vec<String>,
}

impl MigrationSummary {
    /// Adds the counts of a stage's partial summary.
    pub fn merge(&mut self, other: MigrationSummary) {
        self.total_context_kinds += other.total_context_kinds;
        self.total_payload_filters += other.total_payload_filters;
        self.total_environments += other.total_environments;
        self.total_metrics += other.total_metrics;
        self.total_metric_groups += other.total_metric_groups;
        self.total_segments += other.total_segments;
        self.total_flags += other.total_flags;
        self.total_target_rules += other.total_target_rules;
        self.failed_flags.extend(other.failed_flags);
    }
}

/// Runs a migration between two accounts.
#[derive(Debug)]
pub struct Migrator {
    settings: MigrationSettings,
    source: ApiClient,
    target: ApiClient,
}

impl Migrator {
    /// Creates a migrator with clients for both accounts.
    pub fn new(settings: MigrationSettings, config: ClientConfig) -> MigrateResult<Self> {
        let source = ApiClient::new(&settings.source.api_token, settings.source.region, config.clone())?;
        let target = ApiClient::new(&settings.target.api_token, settings.target.region, config)?;
        Ok(Self::with_clients(settings, source, target))
    }

    /// Creates a migrator from existing clients.
    #[must_use]
    pub fn with_clients(settings: MigrationSettings, source: ApiClient, target: ApiClient) -> Self {
        Self {
            settings,
            source,
            target,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &MigrationSettings {
        &self.settings
    }

    fn scope(&self) -> Scope<'_> {
        Scope {
            source: &self.source,
            target: &self.target,
            source_project: &self.settings.source_project,
            target_project: &self.settings.target_project,
            pacer: Pacer::new(self.settings.ignore_pauses),
        }
    }

    /// Runs every enabled stage in order.
    #[instrument(skip(self), fields(
        source = %self.settings.source_project,
        target = %self.settings.target_project,
        mode = %self.settings.mode,
    ))]
    pub async fn run(&self) -> MigrateResult<MigrationSummary> {
        let scope = self.scope();

        info!(stage = %Stage::FetchKeys, "Starting stage");
        let context = MigrationContext::fetch(&scope, &self.settings.flags)
            .await
            .map_err(MigrateError::stage(Stage::FetchKeys))?;

        let mut summary = MigrationSummary::default();
        for stage in Stage::ALL.into_iter().skip(1) {
            if !stage.is_enabled(&self.settings.toggles) {
                info!(stage = %stage, "Skipping disabled stage");
                continue;
            }
            info!(stage = %stage, "Starting stage");
            summary.merge(self.run_stage(stage, &scope, &context).await?);
        }

        info!("Migration complete");
        Ok(summary)
    }

    async fn run_stage(
        &self,
        stage: Stage,
        scope: &Scope<'_>,
        context: &MigrationContext,
    ) -> MigrateResult<MigrationSummary> {
        let failed = MigrateError::stage(stage);
        let mut partial = MigrationSummary::default();

        match stage {
            Stage::FetchKeys => {}
            Stage::CreateProject => {
                let outcome = project::create_project(scope, self.settings.same_account())
                    .await
                    .map_err(failed)?;
                self.handle_project_outcome(outcome)?;
            }
            Stage::FlagTemplates => {
                flag_templates::migrate_flag_templates(scope)
                    .await
                    .map_err(failed)?;
            }
            Stage::ContextKinds => {
                partial.total_context_kinds = context_kinds::migrate_context_kinds(scope)
                    .await
                    .map_err(failed)?;
            }
            Stage::PayloadFilters => {
                partial.total_payload_filters = payload_filters::migrate_payload_filters(scope)
                    .await
                    .map_err(failed)?;
            }
            Stage::Environments => {
                partial.total_environments = environments::migrate_environments(scope)
                    .await
                    .map_err(failed)?;
            }
            Stage::Metrics => {
                let result: ClientResult<(usize, usize)> = async {
                    let created = metrics::migrate_metrics(scope, &context.members).await?;
                    let grouped = metrics::migrate_metric_groups(scope, &context.members).await?;
                    Ok((created, grouped))
                }
                .await;
                let (created, grouped) = result.map_err(failed)?;
                partial.total_metrics = created;
                partial.total_metric_groups = grouped;
            }
            Stage::Segments => {
                partial.total_segments = segments::migrate_segments(scope, &context.env_keys)
                    .await
                    .map_err(failed)?;
            }
            Stage::Flags => {
                partial.total_flags =
                    flags::migrate_flags(scope, &self.settings.flags, &context.members)
                        .await
                        .map_err(failed)?;
            }
            Stage::FlagEnvironmentRules => {
                partial = self.flag_environment_rules(scope, context).await;
            }
        }

        Ok(partial)
    }

    fn handle_project_outcome(&self, outcome: ProjectOutcome) -> MigrateResult<()> {
        match (outcome, self.settings.mode) {
            (ProjectOutcome::Created, _) => Ok(()),
            (ProjectOutcome::AlreadyExists, MigrationMode::Migrate) => {
                error!(
                    project = %self.settings.target_project,
                    "Target project already exists; use retry or merge mode to continue"
                );
                Err(MigrateError::TargetProjectExists {
                    project: self.settings.target_project.clone(),
                })
            }
            (ProjectOutcome::AlreadyExists, MigrationMode::Retry) => {
                info!("Target project exists, resuming previous migration");
                Ok(())
            }
            (ProjectOutcome::AlreadyExists, MigrationMode::Merge) => {
                info!("Target project exists, merging into it");
                Ok(())
            }
        }
    }

    /// Writes flag targeting in up to [`FLAG_RULE_PASSES`] passes, each pass
    /// retrying the previous pass's failures.
    async fn flag_environment_rules(
        &self,
        scope: &Scope<'_>,
        context: &MigrationContext,
    ) -> MigrationSummary {
        let drop_segment_clauses = !self.settings.toggles.segments;
        let mut pending = context.flag_keys.clone();

        for pass in 1..=FLAG_RULE_PASSES {
            if pending.is_empty() {
                break;
            }
            info!(pass = pass, flags = pending.len(), "Updating flag environments");
            pending = flag_environments::migrate_flag_environments(
                scope,
                &pending,
                &context.env_keys,
                drop_segment_clauses,
            )
            .await;
        }

        if !pending.is_empty() {
            warn!(flags = ?pending, "Environments of these flags could not be updated");
        }

        MigrationSummary {
            total_target_rules: context.flag_keys.len() - pending.len(),
            failed_flags: pending,
            ..Default::default()
        }
    }
}
