use std::path::{Path, PathBuf};

use tidemark_core::error::Result;

use super::sql;

/// The single unnumbered migration under development.
///
/// A missing draft file reads as empty: after a promotion the draft may be
/// gone until it is recreated, and it must never look like a pending change.
#[derive(Debug, Clone)]
pub struct DraftStage {
    path: PathBuf,
}

impl DraftStage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Draft content, empty if there is no draft file.
    pub fn read(&self) -> Result<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether the draft holds anything besides comments and whitespace.
    pub fn has_pending_change(&self) -> Result<bool> {
        Ok(sql::has_statements(&self.read()?))
    }

    /// Reset the draft to an empty file.
    ///
    /// Written through a temporary file in the same directory so readers see
    /// either the old draft or an empty one.
    pub fn clear(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_draft_reads_empty() {
        let dir = TempDir::new().unwrap();
        let draft = DraftStage::new(dir.path().join("test.sql"));
        assert_eq!(draft.read().unwrap(), "");
        assert!(!draft.has_pending_change().unwrap());
    }

    #[test]
    fn test_comment_only_draft_has_no_pending_change() {
        let dir = TempDir::new().unwrap();
        let draft = DraftStage::new(dir.path().join("test.sql"));
        fs::write(draft.path(), "-- index on author, later\n/* later */\n;\n").unwrap();
        assert!(!draft.has_pending_change().unwrap());
    }

    #[test]
    fn test_statement_is_pending_change() {
        let dir = TempDir::new().unwrap();
        let draft = DraftStage::new(dir.path().join("test.sql"));
        fs::write(draft.path(), "CREATE TABLE t (id INT);").unwrap();
        assert!(draft.has_pending_change().unwrap());
    }

    #[test]
    fn test_clear_truncates() {
        let dir = TempDir::new().unwrap();
        let draft = DraftStage::new(dir.path().join("test.sql"));
        fs::write(draft.path(), "CREATE TABLE t (id INT);").unwrap();

        draft.clear().unwrap();
        assert!(draft.path().exists());
        assert_eq!(fs::read_to_string(draft.path()).unwrap(), "");
        assert!(!draft.has_pending_change().unwrap());
    }

    #[test]
    fn test_clear_recreates_missing_draft() {
        let dir = TempDir::new().unwrap();
        let draft = DraftStage::new(dir.path().join("test.sql"));
        draft.clear().unwrap();
        assert!(draft.path().exists());
    }
}
