use std::path::PathBuf;

use thiserror::Error;

use crate::Version;

/// Core error type for tidemark operations.
#[derive(Error, Debug)]
pub enum TidemarkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    /// The version table (or its single row) does not exist yet.
    #[error("Version store unavailable: {0} (initialize the database first)")]
    StoreUnavailable(String),

    /// Promotion was attempted with nothing staged in the draft.
    #[error("Draft {} contains no migration statements", .0.display())]
    EmptyDraft(PathBuf),

    /// A numbered migration's transaction failed. The stored version is left
    /// at the last migration that committed.
    #[error("Migration {version} failed: {cause}")]
    MigrationFailed { version: Version, cause: String },

    /// Transient execution of the draft failed. Persisted state is untouched.
    #[error("Draft validation failed: {cause}")]
    DraftValidationFailed { cause: String },

    /// The draft could not be relocated into the catalog as one step.
    #[error("Promotion failed: {0}")]
    PromotionIOFailure(String),

    #[error("Schema snapshot failed: {0}")]
    Snapshot(String),

    #[error("Schema snapshot {} not found; run `tidemark initialize` first", .0.display())]
    MissingSnapshot(PathBuf),
}

/// Result type alias using TidemarkError.
pub type Result<T> = std::result::Result<T, TidemarkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_failed_reports_version_and_cause() {
        let err = TidemarkError::MigrationFailed {
            version: 3,
            cause: "Table 'users' already exists".into(),
        };
        assert_eq!(
            err.to_string(),
            "Migration 3 failed: Table 'users' already exists"
        );
    }

    #[test]
    fn test_empty_draft_names_the_file() {
        let err = TidemarkError::EmptyDraft(PathBuf::from("test.sql"));
        assert_eq!(
            err.to_string(),
            "Draft test.sql contains no migration statements"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: TidemarkError = io.into();
        assert!(matches!(err, TidemarkError::Io(_)));
    }
}
