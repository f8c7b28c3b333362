use tracing::{debug, info};

use tidemark_core::error::{Result, TidemarkError};
use tidemark_core::{Version, VERSION_TABLE};

use crate::db::SchemaTarget;

const CREATE_VERSION_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS `migration_state` (\
     `id` TINYINT UNSIGNED NOT NULL PRIMARY KEY, \
     `version` INT UNSIGNED NOT NULL)";

const INSERT_VERSION_ROW_SQL: &str =
    "INSERT INTO `migration_state` (`id`, `version`) VALUES (1, 0)";

/// The single persisted "current applied version" of a target database.
///
/// The store does no sequencing of its own; the executor decides which
/// version is written and when.
pub struct VersionStore<'a> {
    target: &'a dyn SchemaTarget,
}

impl<'a> VersionStore<'a> {
    pub fn new(target: &'a dyn SchemaTarget) -> Self {
        Self { target }
    }

    /// Create the version table and its row at version 0 if absent.
    ///
    /// Calling this on an initialized target changes nothing.
    pub async fn ensure_initialized(&self) -> Result<()> {
        self.target
            .execute(CREATE_VERSION_TABLE_SQL)
            .await
            .map_err(|e| {
                TidemarkError::Database(format!("Failed to create {}: {}", VERSION_TABLE, e))
            })?;

        if self.target.fetch_version().await?.is_none() {
            self.target.execute(INSERT_VERSION_ROW_SQL).await.map_err(|e| {
                TidemarkError::Database(format!(
                    "Failed to seed {} row: {}",
                    VERSION_TABLE, e
                ))
            })?;
            info!(
                "Initialized version tracking in {} at version 0",
                self.target.database_name()
            );
        } else {
            debug!("Version tracking already initialized");
        }

        Ok(())
    }

    /// Whether the version table exists at all.
    pub async fn is_initialized(&self) -> Result<bool> {
        self.target.table_exists(VERSION_TABLE).await
    }

    /// Current applied version.
    pub async fn get_version(&self) -> Result<Version> {
        if !self.is_initialized().await? {
            return Err(TidemarkError::StoreUnavailable(format!(
                "table {} does not exist in {}",
                VERSION_TABLE,
                self.target.database_name()
            )));
        }

        self.target.fetch_version().await?.ok_or_else(|| {
            TidemarkError::StoreUnavailable(format!("table {} has no version row", VERSION_TABLE))
        })
    }

    /// Overwrite the stored version.
    pub async fn set_version(&self, version: Version) -> Result<()> {
        self.target.store_version(version).await
    }
}
