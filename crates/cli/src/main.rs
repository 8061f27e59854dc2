//! polwatch - new-PDF alerts for a watched folder

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod logging;
mod system_config;
mod util;

use system_config::Overrides;

/// Watch a folder tree and send one alert per new PDF content
#[derive(Parser)]
#[command(name = "polwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ./polwatch.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Folder to watch (overrides watch.root)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// State database (overrides storage.db_path)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the folder and send alerts until interrupted
    Watch {
        /// Log alerts instead of mailing them (still recorded)
        #[arg(long)]
        dry_run: bool,

        /// Process files already in the folder before watching
        #[arg(long)]
        scan: bool,
    },
    /// Show the most recent alerts
    Alerts {
        /// Number of alerts to show
        #[arg(long, default_value_t = polwatch_journal::DEFAULT_RECENT_LIMIT)]
        limit: usize,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show watched folder and state summary
    Status,
    /// Run one file through the pipeline now
    Check {
        /// PDF file to process
        file: PathBuf,

        /// Log the alert instead of mailing it (still recorded)
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the effective configuration
    Config {
        /// Print a commented sample config file instead
        #[arg(long)]
        example: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { example: true } = cli.command {
        return cmd::config::run_example();
    }

    let settings = system_config::load(&Overrides {
        config_file: cli.config,
        root: cli.root,
        db_path: cli.db,
    })?;

    match cli.command {
        Commands::Watch { dry_run, scan } => {
            let _guard = logging::init_with_file(&settings.log, &settings.log_dir())?;
            cmd::watch::run(&settings, dry_run, scan).await
        }
        Commands::Check { file, dry_run } => {
            logging::init_stderr(&settings.log)?;
            cmd::check::run(&settings, &file, dry_run).await
        }
        Commands::Alerts { limit, json } => {
            logging::init_stderr(&settings.log)?;
            cmd::alerts::run(&settings, limit, json).await
        }
        Commands::Status => {
            logging::init_stderr(&settings.log)?;
            cmd::status::run(&settings).await
        }
        Commands::Config { .. } => cmd::config::run_show(&settings),
    }
}
