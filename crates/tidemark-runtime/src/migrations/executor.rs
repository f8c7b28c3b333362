//! Applies pending catalog entries to a target database.
//!
//! Each entry runs in its own transaction and the stored version advances
//! only after that transaction commits, so a failed or aborted run resumes
//! from the last committed entry. Runs take no cross-process lock: two
//! concurrent runs against one target can race on the same entry, so only
//! one executor may run against a target at a time.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use tidemark_core::error::{Result, TidemarkError};
use tidemark_core::Version;

use super::catalog::{CatalogEntry, MigrationCatalog};
use super::draft::DraftStage;
use super::sql;
use super::version::VersionStore;
use crate::db::SchemaTarget;

/// Whether a run also executes the unpromoted draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftMode {
    /// Leave the draft alone (initialize and deploy).
    Ignore,
    /// Execute the draft once after the catalog, without recording a version
    /// (validation only).
    Transient,
}

/// What happened to the draft during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftOutcome {
    NotRequested,
    NoPendingChange,
    Applied,
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub from_version: Version,
    pub to_version: Version,
    pub applied: Vec<Version>,
    pub draft: DraftOutcome,
}

/// Executes migrations against a database.
pub struct MigrationExecutor<'a> {
    target: &'a dyn SchemaTarget,
    catalog: &'a MigrationCatalog,
    draft: &'a DraftStage,
}

impl<'a> MigrationExecutor<'a> {
    /// Create a new migration executor.
    pub fn new(
        target: &'a dyn SchemaTarget,
        catalog: &'a MigrationCatalog,
        draft: &'a DraftStage,
    ) -> Self {
        Self {
            target,
            catalog,
            draft,
        }
    }

    /// Apply every pending entry in ascending order, then optionally the draft.
    ///
    /// Stops at the first failing entry with `MigrationFailed`; later entries
    /// are not attempted.
    pub async fn run(&self, mode: DraftMode) -> Result<RunReport> {
        let store = VersionStore::new(self.target);
        let from_version = store.get_version().await?;
        info!("Current database migration version: {}", from_version);

        let entries = self.catalog.list_ordered()?;
        let pending = pending_entries(&entries, from_version);

        let mut current = from_version;
        let mut applied = Vec::with_capacity(pending.len());
        for entry in pending {
            self.apply(entry).await?;

            store.set_version(entry.version).await.map_err(|e| {
                TidemarkError::MigrationFailed {
                    version: entry.version,
                    cause: format!(
                        "committed but the version could not be recorded: {}",
                        cause_of(&e)
                    ),
                }
            })?;
            current = entry.version;
            applied.push(entry.version);
        }

        if applied.is_empty() {
            info!("No pending migrations; database is at version {}", current);
        } else {
            info!(
                "Migrated {} from version {} to {}",
                self.target.database_name(),
                from_version,
                current
            );
        }

        let draft = match mode {
            DraftMode::Ignore => DraftOutcome::NotRequested,
            DraftMode::Transient => self.apply_draft().await?,
        };

        Ok(RunReport {
            from_version,
            to_version: current,
            applied,
            draft,
        })
    }

    async fn apply(&self, entry: &CatalogEntry) -> Result<()> {
        let body = entry.read().map_err(|e| TidemarkError::MigrationFailed {
            version: entry.version,
            cause: cause_of(&e),
        })?;

        if !sql::has_statements(&body) {
            info!("Migration {} has no statements; recording as applied", entry.version);
            return Ok(());
        }

        info!("Applying migration version {}...", entry.version);
        let start = Instant::now();
        self.target
            .execute_in_transaction(&body)
            .await
            .map_err(|e| TidemarkError::MigrationFailed {
                version: entry.version,
                cause: cause_of(&e),
            })?;

        debug!(
            "Migration {} ran {} statements in {:?}",
            entry.version,
            sql::statement_count(&body),
            start.elapsed()
        );
        info!("Migration to version {} applied successfully", entry.version);
        Ok(())
    }

    async fn apply_draft(&self) -> Result<DraftOutcome> {
        let body = self.draft.read()?;
        if !sql::has_statements(&body) {
            debug!("Draft {} is empty; nothing to validate", self.draft.path().display());
            return Ok(DraftOutcome::NoPendingChange);
        }

        self.target
            .execute_in_transaction(&body)
            .await
            .map_err(|e| TidemarkError::DraftValidationFailed { cause: cause_of(&e) })?;

        info!(
            "Draft {} applied transiently; version not recorded",
            self.draft.path().display()
        );
        Ok(DraftOutcome::Applied)
    }
}

/// Entries that directly continue the sequence after `current`.
///
/// Stops at the first gap: applying past it would run an entry before its
/// predecessor exists.
pub(crate) fn pending_entries(entries: &[CatalogEntry], current: Version) -> &[CatalogEntry] {
    let start = entries.partition_point(|e| e.version <= current);
    let later = &entries[start..];

    let contiguous = later
        .iter()
        .zip(current as u64 + 1..)
        .take_while(|(entry, expected)| entry.version as u64 == *expected)
        .count();

    if contiguous < later.len() {
        warn!(
            "Catalog gap: migration {} is missing; {} later migration(s) not applied",
            current as u64 + contiguous as u64 + 1,
            later.len() - contiguous
        );
    }
    if let Some(last) = entries.last() {
        if last.version < current {
            warn!(
                "Database is at version {} but the catalog ends at {}",
                current, last.version
            );
        }
    }

    &later[..contiguous]
}

/// The underlying failure text, without the wrapper's prefix.
fn cause_of(err: &TidemarkError) -> String {
    match err {
        TidemarkError::Sql(e) => e.to_string(),
        TidemarkError::Io(e) => e.to_string(),
        other => other.to_string(),
    }
}
