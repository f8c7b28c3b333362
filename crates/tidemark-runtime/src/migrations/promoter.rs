use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use tidemark_core::error::{Result, TidemarkError};
use tidemark_core::Version;

use super::catalog::MigrationCatalog;
use super::draft::DraftStage;
use super::sql;

/// Result of a successful promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
    pub version: Version,
    pub path: PathBuf,
}

/// Turns the draft into the next numbered catalog entry.
///
/// The draft file itself is renamed into the catalog. A rename within one
/// filesystem is atomic, so at every instant the body lives in exactly one
/// place: before the rename it is the draft, after it the numbered file and
/// the draft path is absent (which reads as empty). Recreating the empty
/// draft afterwards is cosmetic. The draft and catalog must therefore share
/// a filesystem; a cross-device rename fails before anything changes.
///
/// The numbered path is reserved as an empty file before the rename. A
/// crash between the two leaves that empty entry behind (a no-op migration)
/// while the draft keeps its content for the next promotion.
pub struct Promoter<'a> {
    catalog: &'a MigrationCatalog,
    draft: &'a DraftStage,
}

impl<'a> Promoter<'a> {
    pub fn new(catalog: &'a MigrationCatalog, draft: &'a DraftStage) -> Self {
        Self { catalog, draft }
    }

    /// Promote the draft to the first free catalog version.
    pub fn promote(&self) -> Result<Promotion> {
        let content = self.draft.read()?;
        if !sql::has_statements(&content) {
            return Err(TidemarkError::EmptyDraft(self.draft.path().to_path_buf()));
        }

        let version = self.catalog.next_free_version()?;
        let path = self.relocate(version)?;

        if let Err(e) = self.draft.clear() {
            // The draft path is already gone and reads as empty; only the
            // placeholder file is missing.
            warn!(
                "Promoted draft to {} but could not recreate {}: {}",
                path.display(),
                self.draft.path().display(),
                e
            );
        }

        info!(
            "Promoted {} to migration {} ({} statements)",
            self.draft.path().display(),
            version,
            sql::statement_count(&content)
        );
        Ok(Promotion { version, path })
    }

    /// Move the draft file to `version` in the catalog.
    ///
    /// This is the only step that changes the catalog; the draft is not
    /// recreated here.
    pub(crate) fn relocate(&self, version: Version) -> Result<PathBuf> {
        self.catalog.ensure_dir().map_err(|e| {
            TidemarkError::PromotionIOFailure(format!(
                "cannot create {}: {}",
                self.catalog.dir().display(),
                e
            ))
        })?;

        let target = self.catalog.path_for(version);
        // Reserve the slot first: `create_new` fails if anything is already
        // there, and the rename below then only ever replaces our own empty
        // placeholder.
        if let Err(e) = OpenOptions::new().write(true).create_new(true).open(&target) {
            let reason = if e.kind() == ErrorKind::AlreadyExists {
                "appeared while promoting; catalog changed concurrently".to_string()
            } else {
                format!("cannot be created: {}", e)
            };
            return Err(TidemarkError::PromotionIOFailure(format!(
                "{} {}",
                target.display(),
                reason
            )));
        }

        if let Err(e) = std::fs::rename(self.draft.path(), &target) {
            if let Err(cleanup) = std::fs::remove_file(&target) {
                warn!(
                    "Could not remove placeholder {}: {}",
                    target.display(),
                    cleanup
                );
            }
            return Err(TidemarkError::PromotionIOFailure(format!(
                "cannot move {} to {}: {} (draft and catalog must be on one filesystem)",
                self.draft.path().display(),
                target.display(),
                e
            )));
        }

        sync_dir(self.catalog.dir()).map_err(|e| {
            TidemarkError::PromotionIOFailure(format!(
                "moved draft to {} but could not sync {}: {}",
                target.display(),
                self.catalog.dir().display(),
                e
            ))
        })?;

        Ok(target)
    }
}

/// Flush a directory entry change to disk.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}
