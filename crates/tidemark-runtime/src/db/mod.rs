//! Database targets the migration engine runs against.
//!
//! The engine only ever talks to a database through [`SchemaTarget`]; the
//! MySQL target is the production backend, the SQLite target serves local
//! development and tests.

mod mysql;
pub(crate) mod sqlite;

pub use mysql::MySqlTarget;
pub use sqlite::SqliteTarget;

use std::future::Future;
use std::pin::Pin;

use tidemark_core::config::DatabaseConfig;
use tidemark_core::{Backend, Result, Version};

// Both backends accept backtick-quoted identifiers and `?` placeholders.
const SELECT_VERSION_SQL: &str = "SELECT `version` FROM `migration_state` WHERE `id` = 1";
const UPDATE_VERSION_SQL: &str = "UPDATE `migration_state` SET `version` = ? WHERE `id` = 1";

/// Boxed future returned by [`SchemaTarget`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A connected target database.
///
/// The target owns the persisted version row; the engine decides when it is
/// read and written.
pub trait SchemaTarget: Send + Sync {
    /// Engine behind this target.
    fn backend(&self) -> Backend;

    /// Name of the target database.
    fn database_name(&self) -> &str;

    /// Whether a table with this name exists in the target database.
    fn table_exists<'a>(&'a self, table: &'a str) -> BoxFuture<'a, Result<bool>>;

    /// Run SQL outside an explicit transaction.
    fn execute<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<()>>;

    /// Run a batch of statements inside one transaction.
    ///
    /// The transaction is committed only if every statement succeeds and is
    /// rolled back otherwise.
    fn execute_in_transaction<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<()>>;

    /// Read the version row, `None` if the row is missing.
    fn fetch_version(&self) -> BoxFuture<'_, Result<Option<Version>>>;

    /// Overwrite the version row.
    fn store_version(&self, version: Version) -> BoxFuture<'_, Result<()>>;

    /// Close all connections gracefully.
    fn close(&self) -> BoxFuture<'_, ()>;
}

/// Connect to the configured target database.
pub async fn connect(config: &DatabaseConfig) -> Result<Box<dyn SchemaTarget>> {
    config.validate()?;
    match config {
        DatabaseConfig::Mysql(cfg) => Ok(Box::new(MySqlTarget::connect(cfg).await?)),
        DatabaseConfig::Sqlite(cfg) => Ok(Box::new(SqliteTarget::connect(cfg).await?)),
    }
}

/// Create the target database if it does not exist yet.
pub async fn create_database_if_missing(config: &DatabaseConfig) -> Result<()> {
    config.validate()?;
    match config {
        DatabaseConfig::Mysql(cfg) => mysql::create_database(cfg).await,
        DatabaseConfig::Sqlite(cfg) => sqlite::create_database(cfg).await,
    }
}

/// Drop the target database if it exists.
pub async fn drop_database(config: &DatabaseConfig) -> Result<()> {
    config.validate()?;
    match config {
        DatabaseConfig::Mysql(cfg) => mysql::drop_database(cfg).await,
        DatabaseConfig::Sqlite(cfg) => sqlite::drop_database(cfg),
    }
}
