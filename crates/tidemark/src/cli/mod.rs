mod deploy;
mod initialize;
mod promote;
mod status;
mod validate;

pub use deploy::DeployCommand;
pub use initialize::InitializeCommand;
pub use promote::PromoteCommand;
pub use status::StatusCommand;
pub use validate::ValidateCommand;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

use tidemark_core::config::LoggingConfig;
use tidemark_core::TidemarkConfig;

/// Tidemark - versioned schema migrations with a staged draft.
#[derive(Parser)]
#[command(name = "tidemark")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path.
    #[arg(short, long, default_value = "tidemark.toml", global = true)]
    pub config: PathBuf,

    /// Log at debug level regardless of configuration.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Create the database if needed, apply the catalog, write the snapshot.
    Initialize(InitializeCommand),

    /// Promote the draft, apply it, refresh the snapshot.
    Deploy(DeployCommand),

    /// Apply the catalog and execute the draft without promoting it.
    Validate(ValidateCommand),

    /// Show applied, pending and staged migrations.
    Status(StatusCommand),

    /// Promote the draft to the next numbered migration only.
    Promote(PromoteCommand),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        dotenvy::dotenv().ok();

        let config = load_config(&self.config)?;
        init_tracing(&config.logging, self.verbose);
        tracing::debug!(
            "Loaded {} ({} backend)",
            self.config.display(),
            config.database.backend()
        );

        match self.command {
            Commands::Initialize(cmd) => cmd.execute(&config).await,
            Commands::Deploy(cmd) => cmd.execute(&config).await,
            Commands::Validate(cmd) => cmd.execute(&config).await,
            Commands::Status(cmd) => cmd.execute(&config).await,
            Commands::Promote(cmd) => cmd.execute(&config),
        }
    }
}

fn load_config(path: &Path) -> Result<TidemarkConfig> {
    if !path.exists() {
        anyhow::bail!(
            "Configuration file not found: {}\nCreate one with a [database] section or pass --config.",
            path.display()
        );
    }
    Ok(TidemarkConfig::from_file(path)?)
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    // A subscriber may already be installed when embedded; keep it.
    let _ = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn print_header(title: &str) {
    println!();
    println!(
        "  {}  {} {}",
        style("≋").bold().cyan(),
        style("Tidemark").bold().cyan(),
        title
    );
    println!();
}

fn print_applied(applied: &[tidemark_core::Version]) {
    if applied.is_empty() {
        println!("  {} No pending migrations", style("ℹ").blue());
        return;
    }
    for version in applied {
        println!("  {} Applied migration {}", style("✓").green(), version);
    }
}
