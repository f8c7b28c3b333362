//! The three ways the engine is driven.
//!
//! - `initialize`: bring a fresh or existing target up to the catalog and
//!   snapshot it.
//! - `deploy`: promote the draft, apply it, snapshot.
//! - `validate`: apply the catalog and exercise the draft without
//!   promoting it.
//!
//! Creating the target database itself happens before a target can be
//! connected; see [`crate::db::create_database_if_missing`].

use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use tidemark_core::error::{Result, TidemarkError};
use tidemark_core::TidemarkConfig;

use crate::db::SchemaTarget;
use crate::migrations::{
    DraftMode, DraftStage, MigrationCatalog, MigrationExecutor, Promoter, Promotion, RunReport,
    VersionStore,
};
use crate::snapshot::SchemaSnapshotter;

/// Filesystem side of a project: catalog, draft, and snapshot location.
#[derive(Debug, Clone)]
pub struct Project {
    pub catalog: MigrationCatalog,
    pub draft: DraftStage,
    pub snapshot_path: PathBuf,
}

impl Project {
    pub fn new(catalog: MigrationCatalog, draft: DraftStage, snapshot_path: PathBuf) -> Self {
        Self {
            catalog,
            draft,
            snapshot_path,
        }
    }

    pub fn from_config(config: &TidemarkConfig) -> Self {
        Self {
            catalog: MigrationCatalog::new(
                config.migrations.dir.clone(),
                config.migrations.extension.clone(),
            ),
            draft: DraftStage::new(config.migrations.draft.clone()),
            snapshot_path: config.snapshot.output.clone(),
        }
    }

    fn executor<'a>(&'a self, target: &'a dyn SchemaTarget) -> MigrationExecutor<'a> {
        MigrationExecutor::new(target, &self.catalog, &self.draft)
    }
}

/// Outcome of a deploy.
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub promoted_version: u32,
    pub promoted_path: PathBuf,
    pub run: RunReport,
}

impl DeployReport {
    fn new(promotion: Promotion, run: RunReport) -> Self {
        Self {
            promoted_version: promotion.version,
            promoted_path: promotion.path,
            run,
        }
    }
}

/// Initialize version tracking, apply the catalog, snapshot the schema.
pub async fn initialize(
    target: &dyn SchemaTarget,
    project: &Project,
    snapshotter: &dyn SchemaSnapshotter,
) -> Result<RunReport> {
    VersionStore::new(target).ensure_initialized().await?;
    let report = project.executor(target).run(DraftMode::Ignore).await?;
    snapshotter.dump(&project.snapshot_path).await?;
    Ok(report)
}

/// Promote the draft, apply it with anything else pending, snapshot.
///
/// Refuses to start unless a snapshot from an earlier `initialize` exists
/// and the target's version tracking is reachable, so nothing is promoted
/// toward a target that cannot take it.
pub async fn deploy(
    target: &dyn SchemaTarget,
    project: &Project,
    snapshotter: &dyn SchemaSnapshotter,
) -> Result<DeployReport> {
    if !project.snapshot_path.exists() {
        return Err(TidemarkError::MissingSnapshot(project.snapshot_path.clone()));
    }
    VersionStore::new(target).get_version().await?;

    let promotion = Promoter::new(&project.catalog, &project.draft).promote()?;
    let run = project.executor(target).run(DraftMode::Ignore).await?;
    snapshotter.dump(&project.snapshot_path).await?;

    info!(
        "Deployed migration {} to {}",
        promotion.version,
        target.database_name()
    );
    Ok(DeployReport::new(promotion, run))
}

/// Initialize, apply the catalog, then execute the draft transiently.
pub async fn validate(target: &dyn SchemaTarget, project: &Project) -> Result<RunReport> {
    VersionStore::new(target).ensure_initialized().await?;
    project.executor(target).run(DraftMode::Transient).await
}
