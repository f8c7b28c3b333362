//! Structure-only dumps of a migrated database.
//!
//! A snapshot is review evidence, never reloaded by the engine. It excludes
//! the version table and is only taken after a run completes.

mod mysqldump;
mod sqlite;

pub use mysqldump::MySqlDumpSnapshotter;
pub use sqlite::SqliteSnapshotter;

use std::io::Write;
use std::path::Path;

use tidemark_core::config::{DatabaseConfig, SnapshotConfig};
use tidemark_core::error::{Result, TidemarkError};

use crate::db::BoxFuture;

/// Produces the schema definition text of a target database.
pub trait SchemaSnapshotter: Send + Sync {
    /// Write the structure-only dump to `output`, replacing any previous one.
    fn dump<'a>(&'a self, output: &'a Path) -> BoxFuture<'a, Result<()>>;
}

/// Snapshotter matching the configured backend.
pub fn for_config(
    database: &DatabaseConfig,
    snapshot: &SnapshotConfig,
) -> Box<dyn SchemaSnapshotter> {
    match database {
        DatabaseConfig::Mysql(cfg) => {
            Box::new(MySqlDumpSnapshotter::new(snapshot.dump_tool.clone(), cfg.clone()))
        }
        DatabaseConfig::Sqlite(cfg) => Box::new(SqliteSnapshotter::new(cfg.path.clone())),
    }
}

/// Replace `path` with `bytes` through a temporary sibling file.
///
/// A failed dump never leaves a truncated snapshot behind.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| {
        TidemarkError::Snapshot(format!("cannot write {}: {}", path.display(), e.error))
    })?;
    Ok(())
}
