use anyhow::Result;
use clap::Parser;
use console::style;

use tidemark_core::TidemarkConfig;
use tidemark_runtime::workflows::{self, Project};
use tidemark_runtime::{db, snapshot};

use super::print_header;

/// Promote the draft and apply it.
#[derive(Parser)]
pub struct DeployCommand {}

impl DeployCommand {
    pub async fn execute(self, config: &TidemarkConfig) -> Result<()> {
        print_header("Deploy");

        let target = db::connect(&config.database).await?;
        let project = Project::from_config(config);
        let snapshotter = snapshot::for_config(&config.database, &config.snapshot);

        let result = workflows::deploy(target.as_ref(), &project, snapshotter.as_ref()).await;
        target.close().await;
        let report = result?;

        println!(
            "  {} Promoted {} to {}",
            style("✓").green(),
            project.draft.path().display(),
            style(report.promoted_path.display()).cyan()
        );
        super::print_applied(&report.run.applied);
        println!(
            "  {} Database at version {}",
            style("✓").green(),
            report.run.to_version
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
