use serde::Serialize;

use tidemark_core::error::Result;
use tidemark_core::Version;

use super::catalog::MigrationCatalog;
use super::draft::DraftStage;
use super::executor::pending_entries;
use super::version::VersionStore;
use crate::db::SchemaTarget;

/// Read-only view of where a target stands against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    /// Applied version, `None` if version tracking is not initialized.
    pub current_version: Option<Version>,
    /// Highest version in the catalog.
    pub latest_version: Option<Version>,
    /// Versions the next run would apply, in order.
    pub pending: Vec<Version>,
    /// Whether the draft holds an unpromoted change.
    pub draft_pending: bool,
}

/// Compare the target's stored version with the catalog and draft.
pub async fn status(
    target: &dyn SchemaTarget,
    catalog: &MigrationCatalog,
    draft: &DraftStage,
) -> Result<MigrationStatus> {
    let store = VersionStore::new(target);
    let current_version = if store.is_initialized().await? {
        target.fetch_version().await?
    } else {
        None
    };

    let entries = catalog.list_ordered()?;
    let pending = pending_entries(&entries, current_version.unwrap_or(0))
        .iter()
        .map(|e| e.version)
        .collect();

    Ok(MigrationStatus {
        current_version,
        latest_version: entries.last().map(|e| e.version),
        pending,
        draft_pending: draft.has_pending_change()?,
    })
}
