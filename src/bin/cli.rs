//! Scroll Harvest CLI
//!
//! Local execution entry point. Drives a WebDriver session against the
//! configured site and keeps its progress under the data directory.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};
use scroll_harvest::{
    error::Result,
    models::{Config, Credentials},
    pipeline,
    storage::LocalStorage,
    surface::WebDriverSurface,
};

/// Scroll Harvest - incremental infinite-scroll table collector
#[derive(Parser, Debug)]
#[command(
    name = "harvest",
    version,
    about = "Incremental infinite-scroll table harvester"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "harvest.toml")]
    config: PathBuf,

    /// Override the data directory from the configuration
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in, harvest from the last checkpoint, and finalize
    Run {
        /// Start even if the job file says another run is active
        #[arg(long)]
        force: bool,

        /// Discard the checkpoint and pending batches before starting
        #[arg(long)]
        fresh: bool,
    },

    /// Merge pending batches and rewrite the final dataset, no browser
    Finalize,

    /// Show checkpoint, store sizes and job state
    Status,

    /// Validate the configuration file
    Validate,
}

/// Initialize logging from the verbosity flag or the configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Mark `cancel` and report whether it was already set.
fn repeat_interrupt(cancel: &AtomicBool) -> bool {
    cancel.swap(true, Ordering::SeqCst)
}

/// Set `cancel` on the first Ctrl-C and exit immediately on the second.
fn watch_interrupt(cancel: Arc<AtomicBool>) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if repeat_interrupt(&cancel) {
                log::error!("Second interrupt, exiting without cleanup");
                std::process::exit(130);
            }
            log::warn!("Interrupt received, stopping after the current step (Ctrl-C again to quit)");
        }
    });
}

/// Main entry point for the CLI application.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let env_file = dotenvy::dotenv().ok();

    let level = Config::load(&cli.config)
        .map(|c| c.logging.level)
        .unwrap_or_else(|_| "info".to_string());
    init_logging(cli.verbose, &level);

    log::info!("Scroll harvest starting...");
    if let Some(path) = env_file {
        log::debug!("Loaded environment from {}", path.display());
    }

    let mut config = Config::load_or_default(&cli.config);
    if let Some(dir) = cli.data_dir {
        config.paths.data_dir = dir;
    }
    log::info!("Data directory: {}", config.paths.data_dir.display());

    let store = LocalStorage::from_config(&config.paths);

    match cli.command {
        Command::Run { force, fresh } => {
            config.validate()?;
            let credentials = Credentials::from_env()?;

            let cancel = Arc::new(AtomicBool::new(false));
            watch_interrupt(Arc::clone(&cancel));

            let surface = WebDriverSurface::connect(&config.surface).await?;
            let options = pipeline::RunOptions { force, fresh };
            let report =
                pipeline::run_job(&config, &credentials, &surface, &store, cancel, options).await?;

            if report.interrupted() {
                log::warn!(
                    "Run interrupted. Progress kept at {}px; run again to resume.",
                    report.harvest.checkpoint
                );
            } else {
                log::info!("Harvest complete!");
            }
        }

        Command::Finalize => {
            let summary = pipeline::finalize(&config, &store).await?;
            log::info!(
                "Finalized {} record(s) from {} master row(s)",
                summary.records,
                summary.merge.master_rows
            );
        }

        Command::Status => {
            pipeline::run_status(&store).await?;
        }

        Command::Validate => {
            pipeline::run_validate(&config)?;
            log::info!("All validations passed!");
        }
    }

    log::info!("Done!");

    Ok(())
}
