//! Shared fixtures for runtime tests.
//!
//! Every fixture owns a temporary directory holding a SQLite database, a
//! migrations catalog and a draft file, laid out like a real project.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::TempDir;

use tidemark_core::config::{DatabaseConfig, SqliteConfig};
use tidemark_core::error::{Result, TidemarkError};
use tidemark_core::Version;

use crate::db::{self, BoxFuture, SqliteTarget};
use crate::migrations::{DraftStage, MigrationCatalog, MigrationExecutor, VersionStore};
use crate::snapshot::{self, SchemaSnapshotter};
use crate::workflows::Project;

pub(crate) struct Fixture {
    dir: TempDir,
    pub target: SqliteTarget,
    pub catalog: MigrationCatalog,
    pub draft: DraftStage,
}

impl Fixture {
    /// Fresh database file without version tracking.
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = SqliteConfig::new(dir.path().join("app.db"));
        db::create_database_if_missing(&DatabaseConfig::Sqlite(config.clone()))
            .await
            .unwrap();
        let target = SqliteTarget::connect(&config).await.unwrap();

        let catalog = MigrationCatalog::new(dir.path().join("migrations"), "sql");
        let draft = DraftStage::new(dir.path().join("test.sql"));

        Self {
            dir,
            target,
            catalog,
            draft,
        }
    }

    /// Fresh database with the version table at 0.
    pub async fn initialized() -> Self {
        let fx = Self::new().await;
        fx.store().ensure_initialized().await.unwrap();
        fx
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn db_path(&self) -> PathBuf {
        self.root().join("app.db")
    }

    pub fn project(&self) -> Project {
        Project::new(
            self.catalog.clone(),
            self.draft.clone(),
            self.root().join("schema.sql"),
        )
    }

    pub fn write_migration(&self, version: Version, sql: &str) {
        self.catalog.ensure_dir().unwrap();
        std::fs::write(self.catalog.path_for(version), sql).unwrap();
    }

    pub fn write_draft(&self, sql: &str) {
        std::fs::write(self.draft.path(), sql).unwrap();
    }

    /// Leave a snapshot behind as an earlier initialize would.
    pub fn write_snapshot(&self) {
        std::fs::write(self.project().snapshot_path, "-- previous snapshot\n").unwrap();
    }

    pub fn executor(&self) -> MigrationExecutor<'_> {
        MigrationExecutor::new(&self.target, &self.catalog, &self.draft)
    }

    pub fn store(&self) -> VersionStore<'_> {
        VersionStore::new(&self.target)
    }

    pub async fn version(&self) -> Version {
        self.store().get_version().await.unwrap()
    }
}

/// Snapshotter that counts calls instead of dumping a real schema.
#[derive(Default)]
pub(crate) struct RecordingSnapshotter {
    calls: AtomicUsize,
    fail: bool,
}

impl RecordingSnapshotter {
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SchemaSnapshotter for RecordingSnapshotter {
    fn dump<'a>(&'a self, output: &'a Path) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TidemarkError::Snapshot("dump tool exited with 2".into()));
            }
            snapshot::write_atomically(output, b"-- recorded snapshot\n")
        })
    }
}
