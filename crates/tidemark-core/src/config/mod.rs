mod database;

pub use database::{validate_identifier, DatabaseConfig, MySqlConfig, SqliteConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, TidemarkError};

/// Root configuration for tidemark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TidemarkConfig {
    /// Target database configuration.
    pub database: DatabaseConfig,

    /// Catalog and draft locations.
    #[serde(default)]
    pub migrations: MigrationsConfig,

    /// Schema snapshot configuration.
    #[serde(default)]
    pub snapshot: SnapshotConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TidemarkConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| TidemarkError::Config(format!("Failed to read config file: {}", e)))?;

        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let content = substitute_env_vars(content)?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| TidemarkError::Config(format!("Failed to parse config: {}", e)))?;
        config.database.validate()?;
        Ok(config)
    }

    /// Configuration with defaults for everything but the database.
    pub fn with_database(database: DatabaseConfig) -> Self {
        Self {
            database,
            migrations: MigrationsConfig::default(),
            snapshot: SnapshotConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Where the numbered catalog and the draft live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationsConfig {
    /// Directory holding `<version>.<extension>` files.
    #[serde(default = "default_migrations_dir")]
    pub dir: PathBuf,

    /// The single unnumbered draft file.
    #[serde(default = "default_draft")]
    pub draft: PathBuf,

    /// Extension of catalog files, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            dir: default_migrations_dir(),
            draft: default_draft(),
            extension: default_extension(),
        }
    }
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_draft() -> PathBuf {
    PathBuf::from("test.sql")
}

fn default_extension() -> String {
    "sql".to_string()
}

/// Schema snapshot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// File the structure-only dump is written to.
    #[serde(default = "default_snapshot_output")]
    pub output: PathBuf,

    /// Dump executable used for MySQL targets.
    #[serde(default = "default_dump_tool")]
    pub dump_tool: PathBuf,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            output: default_snapshot_output(),
            dump_tool: default_dump_tool(),
        }
    }
}

fn default_snapshot_output() -> PathBuf {
    PathBuf::from("schema.sql")
}

fn default_dump_tool() -> PathBuf {
    PathBuf::from("mysqldump")
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output JSON format.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Substitute environment variables in the format ${VAR_NAME}.
///
/// Every referenced variable must be set. Placeholders on `#` comment lines
/// are left alone.
fn substitute_env_vars(content: &str) -> Result<String> {
    let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| TidemarkError::Config(format!("Invalid placeholder pattern: {}", e)))?;

    let mut result = String::with_capacity(content.len());
    let mut missing = Vec::new();

    for line in content.split_inclusive('\n') {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            continue;
        }

        let mut substituted = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => substituted = substituted.replace(&cap[0], &value),
                Err(_) => missing.push(var_name.to_string()),
            }
        }
        result.push_str(&substituted);
    }

    if !missing.is_empty() {
        missing.sort();
        missing.dedup();
        return Err(TidemarkError::Config(format!(
            "Unset environment variables: {}",
            missing.join(", ")
        )));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Backend;

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
            [database]
            backend = "sqlite"
            path = "app.db"
        "#;

        let config = TidemarkConfig::parse_toml(toml).unwrap();
        assert_eq!(config.database.backend(), Backend::Sqlite);
        assert_eq!(config.migrations.dir, PathBuf::from("migrations"));
        assert_eq!(config.migrations.draft, PathBuf::from("test.sql"));
        assert_eq!(config.migrations.extension, "sql");
        assert_eq!(config.snapshot.output, PathBuf::from("schema.sql"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [database]
            backend = "mysql"
            host = "localhost"
            port = 3307
            user = "root"
            password = "pw"
            name = "chat"
            pool_size = 2

            [migrations]
            dir = "db/migrations"
            draft = "db/next.sql"

            [snapshot]
            output = "db/schema.sql"
            dump_tool = "/usr/bin/mariadb-dump"

            [logging]
            level = "debug"
            json = true
        "#;

        let config = TidemarkConfig::parse_toml(toml).unwrap();
        assert_eq!(config.database.database_name(), "chat");
        assert_eq!(config.migrations.dir, PathBuf::from("db/migrations"));
        assert_eq!(config.migrations.draft, PathBuf::from("db/next.sql"));
        assert_eq!(
            config.snapshot.dump_tool,
            PathBuf::from("/usr/bin/mariadb-dump")
        );
        assert!(config.logging.json);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TIDEMARK_TEST_DB_NAME", "chat_test");
        std::env::set_var("TIDEMARK_TEST_DB_PORT", "3310");

        let toml = r#"
            [database]
            backend = "mysql"
            user = "root"
            name = "${TIDEMARK_TEST_DB_NAME}"
            port = ${TIDEMARK_TEST_DB_PORT}
        "#;

        let config = TidemarkConfig::parse_toml(toml).unwrap();
        assert_eq!(config.database.database_name(), "chat_test");
        match config.database {
            DatabaseConfig::Mysql(cfg) => assert_eq!(cfg.port, 3310),
            DatabaseConfig::Sqlite(_) => panic!("expected mysql"),
        }

        std::env::remove_var("TIDEMARK_TEST_DB_NAME");
        std::env::remove_var("TIDEMARK_TEST_DB_PORT");
    }

    #[test]
    fn test_unset_env_var_is_an_error() {
        let toml = r#"
            [database]
            backend = "mysql"
            user = "root"
            name = "${TIDEMARK_TEST_NEVER_SET}"
        "#;

        let err = TidemarkConfig::parse_toml(toml).unwrap_err();
        assert!(err.to_string().contains("TIDEMARK_TEST_NEVER_SET"));
    }

    #[test]
    fn test_placeholders_in_comments_are_ignored() {
        let toml = r#"
            # host = "${TIDEMARK_TEST_NEVER_SET}"
            [database]
            backend = "sqlite"
            path = "data/app.db"
        "#;

        let config = TidemarkConfig::parse_toml(toml).unwrap();
        assert_eq!(config.database.backend(), Backend::Sqlite);
    }

    #[test]
    fn test_shipped_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../tidemark.toml");
        let config = TidemarkConfig::from_file(path).unwrap();
        assert_eq!(config.database.backend(), Backend::Sqlite);
        assert_eq!(config.migrations.dir, PathBuf::from("migrations"));
    }

    #[test]
    fn test_invalid_database_name_rejected() {
        let toml = r#"
            [database]
            backend = "mysql"
            user = "root"
            name = "bad name"
        "#;

        assert!(matches!(
            TidemarkConfig::parse_toml(toml),
            Err(TidemarkError::Config(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tidemark.toml");
        std::fs::write(
            &path,
            "[database]\nbackend = \"sqlite\"\npath = \"local.db\"\n",
        )
        .unwrap();

        let config = TidemarkConfig::from_file(&path).unwrap();
        assert_eq!(config.database.database_name(), "local");
    }
}
