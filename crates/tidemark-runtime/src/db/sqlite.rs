use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Connection;
use tracing::{debug, info, warn};

use tidemark_core::config::SqliteConfig;
use tidemark_core::error::{Result, TidemarkError};
use tidemark_core::{Backend, Version};

use super::{BoxFuture, SchemaTarget, SELECT_VERSION_SQL, UPDATE_VERSION_SQL};

/// SQLite target backed by a database file.
#[derive(Clone)]
pub struct SqliteTarget {
    pool: SqlitePool,
    name: String,
}

impl SqliteTarget {
    /// Open a pool on an existing database file.
    pub async fn connect(config: &SqliteConfig) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.pool_timeout_secs))
            .connect_with(connect_options(&config.path))
            .await
            .map_err(|e| {
                TidemarkError::Database(format!(
                    "Failed to open {}: {}",
                    config.path.display(),
                    e
                ))
            })?;

        let name = config
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("main")
            .to_string();

        Ok(Self { pool, name })
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl SchemaTarget for SqliteTarget {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    fn database_name(&self) -> &str {
        &self.name
    }

    fn table_exists<'a>(&'a self, table: &'a str) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
            )
            .bind(table)
            .fetch_one(&self.pool)
            .await?;
            Ok(count > 0)
        })
    }

    fn execute<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            sqlx::raw_sql(sql).execute(&self.pool).await?;
            Ok(())
        })
    }

    fn execute_in_transaction<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await?;
            if let Err(e) = sqlx::Executor::execute(&mut *tx, sqlx::raw_sql(sql)).await {
                // The statement error is the one reported; the connection
                // rolls back on drop if this fails.
                if let Err(rollback) = tx.rollback().await {
                    warn!("Rollback after failed batch also failed: {}", rollback);
                }
                return Err(e.into());
            }
            tx.commit().await?;
            Ok(())
        })
    }

    fn fetch_version(&self) -> BoxFuture<'_, Result<Option<Version>>> {
        Box::pin(async move {
            let version = sqlx::query_scalar::<_, u32>(SELECT_VERSION_SQL)
                .fetch_optional(&self.pool)
                .await?;
            Ok(version)
        })
    }

    fn store_version(&self, version: Version) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            sqlx::query(UPDATE_VERSION_SQL)
                .bind(version)
                .execute(&self.pool)
                .await?;
            Ok(())
        })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.pool.close())
    }
}

pub(crate) fn connect_options(path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(false)
}

pub(super) async fn create_database(config: &SqliteConfig) -> Result<()> {
    if let Some(parent) = config.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = SqliteConnection::connect_with(&connect_options(&config.path).create_if_missing(true))
        .await
        .map_err(|e| {
            TidemarkError::Database(format!(
                "Failed to create {}: {}",
                config.path.display(),
                e
            ))
        })?;
    conn.close().await?;
    debug!("Ensured database file {} exists", config.path.display());
    Ok(())
}

pub(super) fn drop_database(config: &SqliteConfig) -> Result<()> {
    for path in database_files(&config.path) {
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    info!("Dropped database {}", config.path.display());
    Ok(())
}

/// The database file and the journal files SQLite keeps beside it.
fn database_files(path: &Path) -> Vec<PathBuf> {
    let mut files = vec![path.to_path_buf()];
    for suffix in ["-wal", "-shm", "-journal"] {
        let mut name = path.as_os_str().to_os_string();
        name.push(suffix);
        files.push(PathBuf::from(name));
    }
    files
}
