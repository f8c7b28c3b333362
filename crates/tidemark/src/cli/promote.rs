use anyhow::Result;
use clap::Parser;
use console::style;

use tidemark_core::TidemarkConfig;
use tidemark_runtime::workflows::Project;
use tidemark_runtime::Promoter;

use super::print_header;

/// Stage the draft as the next numbered migration without touching a database.
#[derive(Parser)]
pub struct PromoteCommand {}

impl PromoteCommand {
    pub fn execute(self, config: &TidemarkConfig) -> Result<()> {
        print_header("Promote");

        let project = Project::from_config(config);
        let promotion = Promoter::new(&project.catalog, &project.draft).promote()?;

        println!(
            "  {} Promoted {} to {}",
            style("✓").green(),
            project.draft.path().display(),
            style(promotion.path.display()).cyan()
        );
        println!(
            "  {} Run `tidemark initialize` or `tidemark deploy` to apply it",
            style("ℹ").blue()
        );
        println!();
        Ok(())
    }
}
