use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use tidemark_core::config::MySqlConfig;
use tidemark_core::error::{Result, TidemarkError};
use tidemark_core::VERSION_TABLE;

use super::{write_atomically, SchemaSnapshotter};
use crate::db::BoxFuture;

/// Runs `mysqldump` (or `mariadb-dump`) for a structure-only dump.
pub struct MySqlDumpSnapshotter {
    tool: PathBuf,
    config: MySqlConfig,
}

impl MySqlDumpSnapshotter {
    pub fn new(tool: impl Into<PathBuf>, config: MySqlConfig) -> Self {
        Self {
            tool: tool.into(),
            config,
        }
    }

    /// Arguments passed to the dump tool. The password travels in the
    /// environment so it never shows up in the process list.
    fn args(&self) -> Vec<String> {
        let db = &self.config.name;
        vec![
            "-h".to_string(),
            self.config.host.clone(),
            "-P".to_string(),
            self.config.port.to_string(),
            "-u".to_string(),
            self.config.user.clone(),
            "--no-data".to_string(),
            "--routines".to_string(),
            "--triggers".to_string(),
            "--events".to_string(),
            "--skip-dump-date".to_string(),
            format!("--ignore-table={}.{}", db, VERSION_TABLE),
            db.clone(),
        ]
    }
}

impl SchemaSnapshotter for MySqlDumpSnapshotter {
    fn dump<'a>(&'a self, output: &'a Path) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            debug!("Running {} for {}", self.tool.display(), self.config.name);

            let result = Command::new(&self.tool)
                .args(self.args())
                .env("MYSQL_PWD", &self.config.password)
                .stdin(Stdio::null())
                .output()
                .await
                .map_err(|e| {
                    TidemarkError::Snapshot(format!(
                        "failed to run {}: {}",
                        self.tool.display(),
                        e
                    ))
                })?;

            if !result.status.success() {
                let code = result
                    .status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                return Err(TidemarkError::Snapshot(format!(
                    "{} failed with exit code {}: {}",
                    self.tool.display(),
                    code,
                    String::from_utf8_lossy(&result.stderr).trim()
                )));
            }

            write_atomically(output, &result.stdout)?;
            info!("Schema snapshot written to {}", output.display());
            Ok(())
        })
    }
}
