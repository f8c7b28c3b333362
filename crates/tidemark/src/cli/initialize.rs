use anyhow::Result;
use clap::Parser;
use console::style;

use tidemark_core::TidemarkConfig;
use tidemark_runtime::workflows::{self, Project};
use tidemark_runtime::{db, snapshot};

use super::print_header;

/// Bring the database up to the catalog and write the schema snapshot.
#[derive(Parser)]
pub struct InitializeCommand {}

impl InitializeCommand {
    pub async fn execute(self, config: &TidemarkConfig) -> Result<()> {
        print_header("Initialize");

        db::create_database_if_missing(&config.database).await?;
        let target = db::connect(&config.database).await?;
        let project = Project::from_config(config);
        let snapshotter = snapshot::for_config(&config.database, &config.snapshot);

        println!(
            "  {} Applying {} to {}",
            style("→").dim(),
            project.catalog.dir().display(),
            style(target.database_name()).cyan()
        );
        let result = workflows::initialize(target.as_ref(), &project, snapshotter.as_ref()).await;
        target.close().await;
        let report = result?;

        super::print_applied(&report.applied);
        println!(
            "  {} Database at version {}",
            style("✓").green(),
            report.to_version
        );
        println!(
            "  {} Snapshot written to {}",
            style("✓").green(),
            project.snapshot_path.display()
        );
        println!();
        Ok(())
    }
}
