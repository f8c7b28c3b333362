//! Core types for tidemark: configuration, the error type, and the values
//! shared between the migration engine and its callers.

pub mod config;
pub mod error;

pub use config::TidemarkConfig;
pub use error::{Result, TidemarkError};

use serde::{Deserialize, Serialize};

/// A catalog entry number, and the persisted progress marker.
///
/// Catalog entries start at 1; a stored version of 0 means nothing has been
/// applied yet.
pub type Version = u32;

/// Name of the table holding the single version row.
pub const VERSION_TABLE: &str = "migration_state";

/// Database engines a target can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    MySql,
    Sqlite,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::MySql => write!(f, "mysql"),
            Backend::Sqlite => write!(f, "sqlite"),
        }
    }
}
