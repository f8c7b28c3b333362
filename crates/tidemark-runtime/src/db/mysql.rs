use std::time::Duration;

use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlPool, MySqlPoolOptions};
use sqlx::Connection;
use tracing::{debug, info, warn};

use tidemark_core::config::MySqlConfig;
use tidemark_core::error::{Result, TidemarkError};
use tidemark_core::{Backend, Version};

use super::{BoxFuture, SchemaTarget, SELECT_VERSION_SQL, UPDATE_VERSION_SQL};

/// MySQL / MariaDB target.
#[derive(Clone)]
pub struct MySqlTarget {
    pool: MySqlPool,
    name: String,
}

impl MySqlTarget {
    /// Connect a pool to the configured database.
    pub async fn connect(config: &MySqlConfig) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.pool_timeout_secs))
            .connect_with(server_options(config).database(&config.name))
            .await
            .map_err(|e| {
                TidemarkError::Database(format!(
                    "Failed to connect to {}@{}:{}/{}: {}",
                    config.user, config.host, config.port, config.name, e
                ))
            })?;

        Ok(Self {
            pool,
            name: config.name.clone(),
        })
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

impl SchemaTarget for MySqlTarget {
    fn backend(&self) -> Backend {
        Backend::MySql
    }

    fn database_name(&self) -> &str {
        &self.name
    }

    fn table_exists<'a>(&'a self, table: &'a str) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_name = ?",
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

/// Options for the server itself, without a default schema selected.
fn server_options(config: &MySqlConfig) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
}

async fn server_connection(config: &MySqlConfig) -> Result<MySqlConnection> {
    MySqlConnection::connect_with(&server_options(config))
        .await
        .map_err(|e| {
            TidemarkError::Database(format!(
                "Failed to connect to {}:{}: {}",
                config.host, config.port, e
            ))
        })
}

pub(super) async fn create_database(config: &MySqlConfig) -> Result<()> {
    let mut conn = server_connection(config).await?;
    let sql = format!("CREATE DATABASE IF NOT EXISTS `{}`", config.name);
    sqlx::raw_sql(&sql)
        .execute(&mut conn)
        .await
        .map_err(|e| {
            TidemarkError::Database(format!("Failed to create database {}: {}", config.name, e))
        })?;
    conn.close().await?;
    debug!("Ensured database {} exists", config.name);
    Ok(())
}

pub(super) async fn drop_database(config: &MySqlConfig) -> Result<()> {
    let mut conn = server_connection(config).await?;
    let sql = format!("DROP DATABASE IF EXISTS `{}`", config.name);
    sqlx::raw_sql(&sql)
        .execute(&mut conn)
        .await
        .map_err(|e| {
            TidemarkError::Database(format!("Failed to drop database {}: {}", config.name, e))
        })?;
    conn.close().await?;
    info!("Dropped database {}", config.name);
    Ok(())
}
