use anyhow::Result;
use clap::Parser;
use console::style;

use tidemark_core::TidemarkConfig;
use tidemark_runtime::db;
use tidemark_runtime::migrations::{self, MigrationStatus};
use tidemark_runtime::workflows::Project;

use super::print_header;

/// Show where the database stands against the catalog.
#[derive(Parser)]
pub struct StatusCommand {
    /// Print the status as JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusCommand {
    pub async fn execute(self, config: &TidemarkConfig) -> Result<()> {
        let target = db::connect(&config.database).await?;
        let project = Project::from_config(config);

        let result = migrations::status(target.as_ref(), &project.catalog, &project.draft).await;
        target.close().await;
        let status = result?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&status)?);
            return Ok(());
        }

        print_header("Migration Status");
        print_status(&status, &project);
        Ok(())
    }
}

fn print_status(status: &MigrationStatus, project: &Project) {
    match status.current_version {
        Some(v) => println!("  {} Current version: {}", style("✓").green(), v),
        None => println!(
            "  {} Not initialized; run `tidemark initialize`",
            style("○").yellow()
        ),
    }

    match status.latest_version {
        Some(v) => println!("  {} Latest in catalog: {}", style("ℹ").blue(), v),
        None => println!(
            "  {} No migrations found in {}",
            style("ℹ").blue(),
            project.catalog.dir().display()
        ),
    }

    if !status.pending.is_empty() {
        println!();
        println!("  {} Pending:", style("○").yellow());
        for version in &status.pending {
            println!(
                "    {} {}",
                style("→").dim(),
                style(project.catalog.path_for(*version).display()).yellow()
            );
        }
    }

    println!();
    if status.draft_pending {
        println!(
            "  {} {} holds an unpromoted change",
            style("○").yellow(),
            project.draft.path().display()
        );
    } else {
        println!(
            "  {} {} is empty",
            style("ℹ").blue(),
            project.draft.path().display()
        );
    }
    println!();
}
