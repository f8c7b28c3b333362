use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use tidemark_core::error::{Result, TidemarkError};
use tidemark_core::Version;

/// A numbered migration file in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub version: Version,
    pub path: PathBuf,
}

impl CatalogEntry {
    /// Read the migration body.
    pub fn read(&self) -> Result<String> {
        Ok(std::fs::read_to_string(&self.path)?)
    }
}

/// The append-only directory of numbered migrations.
///
/// Files are named `<version>.<extension>` where the version is a positive
/// integer written without sign or leading zeros. Anything else in the
/// directory is ignored.
#[derive(Debug, Clone)]
pub struct MigrationCatalog {
    dir: PathBuf,
    extension: String,
}

impl MigrationCatalog {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `version`.
    pub fn path_for(&self, version: Version) -> PathBuf {
        self.dir.join(format!("{}.{}", version, self.extension))
    }

    /// All entries, ascending by version. A missing directory is empty.
    pub fn list_ordered(&self) -> Result<Vec<CatalogEntry>> {
        if !self.dir.exists() {
            debug!("Migrations directory does not exist: {:?}", self.dir);
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(version) = file_name.to_str().and_then(|n| self.parse_version(n)) else {
                continue;
            };
            entries.push(CatalogEntry {
                version,
                path: entry.path(),
            });
        }

        entries.sort_by_key(|e| e.version);
        debug!("Catalog holds {} migrations", entries.len());
        Ok(entries)
    }

    /// Smallest positive version with no file, scanning upward from 1.
    ///
    /// On a contiguous catalog this is `len + 1`; after external tampering it
    /// lands in the first gap rather than past a stray high-numbered file.
    pub fn next_free_version(&self) -> Result<Version> {
        let taken: HashSet<Version> = self
            .list_ordered()?
            .into_iter()
            .map(|e| e.version)
            .collect();

        let mut version: Version = 1;
        while taken.contains(&version) {
            version = version.checked_add(1).ok_or_else(|| {
                TidemarkError::PromotionIOFailure("catalog version space exhausted".to_string())
            })?;
        }
        Ok(version)
    }

    /// Create the catalog directory if it is missing.
    pub fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    fn parse_version(&self, file_name: &str) -> Option<Version> {
        let stem = file_name
            .strip_suffix(self.extension.as_str())?
            .strip_suffix('.')?;

        let canonical = !stem.is_empty()
            && !stem.starts_with('0')
            && stem.bytes().all(|b| b.is_ascii_digit());
        if !canonical {
            return None;
        }
        stem.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn catalog(dir: &TempDir) -> MigrationCatalog {
        MigrationCatalog::new(dir.path().join("migrations"), "sql")
    }

    fn write(catalog: &MigrationCatalog, name: &str, sql: &str) {
        fs::create_dir_all(catalog.dir()).unwrap();
        fs::write(catalog.dir().join(name), sql).unwrap();
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);
        assert!(catalog.list_ordered().unwrap().is_empty());
        assert_eq!(catalog.next_free_version().unwrap(), 1);
    }

    #[test]
    fn test_sorted_numerically_not_lexically() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);
        for v in [10, 2, 1, 9, 3] {
            write(&catalog, &format!("{}.sql", v), "SELECT 1;");
        }

        let versions: Vec<Version> = catalog
            .list_ordered()
            .unwrap()
            .into_iter()
            .map(|e| e.version)
            .collect();
        assert_eq!(versions, vec![1, 2, 3, 9, 10]);
    }

    #[test]
    fn test_ignores_non_conforming_names() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);
        write(&catalog, "1.sql", "SELECT 1;");
        write(&catalog, "0.sql", "zero");
        write(&catalog, "02.sql", "leading zero");
        write(&catalog, "-3.sql", "negative");
        write(&catalog, "4.txt", "wrong extension");
        write(&catalog, "5.sql.bak", "backup");
        write(&catalog, "0001_create_users.sql", "named");
        write(&catalog, "readme.md", "docs");
        write(&catalog, "99999999999.sql", "overflow");
        fs::create_dir_all(catalog.dir().join("7.sql")).unwrap();

        let entries = catalog.list_ordered().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].version, 1);
        assert_eq!(entries[0].read().unwrap(), "SELECT 1;");
    }

    #[test]
    fn test_next_free_version_contiguous() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);
        for v in 1..=4 {
            write(&catalog, &format!("{}.sql", v), "SELECT 1;");
        }
        assert_eq!(catalog.next_free_version().unwrap(), 5);
    }

    #[test]
    fn test_next_free_version_fills_first_gap() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);
        for v in [1, 2, 4, 40] {
            write(&catalog, &format!("{}.sql", v), "SELECT 1;");
        }
        assert_eq!(catalog.next_free_version().unwrap(), 3);
    }

    #[test]
    fn test_path_for() {
        let catalog = MigrationCatalog::new("db/migrations", "sql");
        assert_eq!(catalog.path_for(12), PathBuf::from("db/migrations/12.sql"));
    }
}
