use std::path::{Path, PathBuf};

use sqlx::{Connection, SqliteConnection};
use tracing::info;

use tidemark_core::error::{Result, TidemarkError};
use tidemark_core::VERSION_TABLE;

use super::{write_atomically, SchemaSnapshotter};
use crate::db::sqlite::connect_options;
use crate::db::BoxFuture;

/// Dumps the `sqlite_master` definitions of a SQLite database file.
pub struct SqliteSnapshotter {
    path: PathBuf,
}

impl SqliteSnapshotter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn definitions(&self) -> Result<Vec<(String, String)>> {
        let mut conn = SqliteConnection::connect_with(&connect_options(&self.path))
            .await
            .map_err(|e| {
                TidemarkError::Snapshot(format!("cannot open {}: {}", self.path.display(), e))
            })?;

        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT name, sql FROM sqlite_master
            WHERE sql IS NOT NULL
              AND name NOT LIKE 'sqlite_%'
              AND tbl_name <> ?
            ORDER BY CASE type
                WHEN 'table' THEN 0
                WHEN 'view' THEN 1
                WHEN 'index' THEN 2
                ELSE 3
            END, name
            "#,
        )
        .bind(VERSION_TABLE)
        .fetch_all(&mut conn)
        .await?;

        conn.close().await?;
        Ok(rows)
    }
}

impl SchemaSnapshotter for SqliteSnapshotter {
    fn dump<'a>(&'a self, output: &'a Path) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let definitions = self.definitions().await?;

            let mut text = format!("-- Schema of {}\n", self.path.display());
            for (name, sql) in &definitions {
                text.push_str(&format!("\n-- {}\n{};\n", name, sql.trim_end()));
            }

            write_atomically(output, text.as_bytes())?;
            info!(
                "Schema snapshot of {} objects written to {}",
                definitions.len(),
                output.display()
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SchemaTarget;
    use crate::migrations::VersionStore;
    use crate::testing::Fixture;

    #[tokio::test]
    async fn test_dump_excludes_version_table() {
        let fx = Fixture::new().await;
        VersionStore::new(&fx.target).ensure_initialized().await.unwrap();
        fx.target
            .execute(
                "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);\
                 CREATE INDEX users_name ON users (name);\
                 CREATE VIEW user_names AS SELECT name FROM users;",
            )
            .await
            .unwrap();

        let output = fx.root().join("schema.sql");
        SqliteSnapshotter::new(fx.db_path())
            .dump(&output)
            .await
            .unwrap();

        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.contains("CREATE TABLE users"));
        assert!(text.contains("CREATE INDEX users_name"));
        assert!(text.contains("CREATE VIEW user_names"));
        assert!(!text.contains(VERSION_TABLE));

        let table = text.find("CREATE TABLE users").unwrap();
        let view = text.find("CREATE VIEW").unwrap();
        let index = text.find("CREATE INDEX").unwrap();
        assert!(table < view && view < index);

        assert!(text.starts_with("-- Schema of "));
        assert!(text.contains("\n-- users\nCREATE TABLE users"));
        assert!(text.ends_with(";\n"));
    }

    #[tokio::test]
    async fn test_dump_missing_database_fails() {
        let fx = Fixture::new().await;
        let output = fx.root().join("schema.sql");

        let result = SqliteSnapshotter::new(fx.root().join("absent.db"))
            .dump(&output)
            .await;
        assert!(matches!(result, Err(TidemarkError::Snapshot(_))));
        assert!(!output.exists());
    }
}
