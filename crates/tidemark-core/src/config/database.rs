use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TidemarkError};
use crate::Backend;

/// Target database configuration, selected by the `backend` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum DatabaseConfig {
    Mysql(MySqlConfig),
    Sqlite(SqliteConfig),
}

impl DatabaseConfig {
    /// The backend this configuration connects to.
    pub fn backend(&self) -> Backend {
        match self {
            DatabaseConfig::Mysql(_) => Backend::MySql,
            DatabaseConfig::Sqlite(_) => Backend::Sqlite,
        }
    }

    /// Name identifying the target database in logs and snapshots.
    pub fn database_name(&self) -> &str {
        match self {
            DatabaseConfig::Mysql(cfg) => &cfg.name,
            DatabaseConfig::Sqlite(cfg) => cfg
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("main"),
        }
    }

    /// Check the settings that are interpolated into SQL or paths.
    pub fn validate(&self) -> Result<()> {
        match self {
            DatabaseConfig::Mysql(cfg) => validate_identifier(&cfg.name),
            DatabaseConfig::Sqlite(cfg) => {
                if cfg.path.as_os_str().is_empty() {
                    return Err(TidemarkError::Config(
                        "database.path must not be empty".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// MySQL / MariaDB server connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MySqlConfig {
    /// Server host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Login user.
    pub user: String,

    /// Login password.
    #[serde(default)]
    pub password: String,

    /// Database (schema) the migrations target.
    pub name: String,

    /// Connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Pool checkout timeout in seconds.
    #[serde(default = "default_pool_timeout")]
    pub pool_timeout_secs: u64,
}

/// SQLite database file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Path of the database file.
    pub path: PathBuf,

    /// Connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Pool checkout timeout in seconds.
    #[serde(default = "default_pool_timeout")]
    pub pool_timeout_secs: u64,
}

impl SqliteConfig {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            pool_size: default_pool_size(),
            pool_timeout_secs: default_pool_timeout(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_pool_size() -> u32 {
    5
}

fn default_pool_timeout() -> u64 {
    30
}

/// Database names are spliced into `CREATE DATABASE` and dump arguments, so
/// only plain identifiers are accepted.
pub fn validate_identifier(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if valid {
        Ok(())
    } else {
        Err(TidemarkError::Config(format!(
            "Invalid database name '{}': use letters, digits, '_' or '$'",
            name
        )))
    }
}
