use anyhow::Result;
use clap::Parser;
use console::style;

use tidemark_core::TidemarkConfig;
use tidemark_runtime::RunReport;
use tidemark_runtime::db;
use tidemark_runtime::migrations::DraftOutcome;
use tidemark_runtime::workflows::{self, Project};

use super::print_header;

/// Apply the catalog, then execute the draft without promoting it.
#[derive(Parser)]
pub struct ValidateCommand {
    /// Drop the database afterwards, whether validation passed or not.
    #[arg(long)]
    pub drop: bool,
}

impl ValidateCommand {
    pub async fn execute(self, config: &TidemarkConfig) -> Result<()> {
        print_header("Validate");

        db::create_database_if_missing(&config.database).await?;
        let target = db::connect(&config.database).await?;
        let project = Project::from_config(config);

        let result = workflows::validate(target.as_ref(), &project).await;
        target.close().await;

        let dropped = if self.drop {
            let dropped = db::drop_database(&config.database).await;
            if dropped.is_ok() {
                println!(
                    "  {} Dropped {}",
                    style("ℹ").blue(),
                    config.database.database_name()
                );
            }
            Some(dropped)
        } else {
            None
        };

        let report = settle(result, dropped)?;
        super::print_applied(&report.applied);
        match report.draft {
            DraftOutcome::Applied => println!(
                "  {} {} executed cleanly",
                style("✓").green(),
                project.draft.path().display()
            ),
            _ => println!(
                "  {} {} holds no pending change",
                style("ℹ").blue(),
                project.draft.path().display()
            ),
        }
        println!();
        Ok(())
    }
}

/// The validation outcome wins over a teardown failure.
fn settle(
    validation: tidemark_core::Result<RunReport>,
    dropped: Option<tidemark_core::Result<()>>,
) -> Result<RunReport> {
    match (validation, dropped) {
        (Err(e), Some(Err(drop_err))) => {
            tracing::warn!("Could not drop the validation database: {}", drop_err);
            Err(e.into())
        }
        (Err(e), _) => Err(e.into()),
        (Ok(_), Some(Err(drop_err))) => Err(drop_err.into()),
        (Ok(report), _) => Ok(report),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidemark_core::TidemarkError;

    fn report() -> RunReport {
        RunReport {
            from_version: 0,
            to_version: 1,
            applied: vec![1],
            draft: DraftOutcome::Applied,
        }
    }

    #[test]
    fn test_validation_failure_outranks_drop_failure() {
        let validation = Err(TidemarkError::DraftValidationFailed {
            cause: "no such table: missing".into(),
        });
        let dropped = Some(Err(TidemarkError::Database("drop refused".into())));

        let err = settle(validation, dropped).unwrap_err();
        assert!(err.to_string().contains("Draft validation failed"));
    }

    #[test]
    fn test_drop_failure_reported_after_clean_validation() {
        let dropped = Some(Err(TidemarkError::Database("drop refused".into())));
        let err = settle(Ok(report()), dropped).unwrap_err();
        assert!(err.to_string().contains("drop refused"));
    }

    #[test]
    fn test_clean_validation_without_drop() {
        let settled = settle(Ok(report()), None).unwrap();
        assert_eq!(settled.applied, vec![1]);
        assert!(settle(Ok(report()), Some(Ok(()))).is_ok());
    }
}
