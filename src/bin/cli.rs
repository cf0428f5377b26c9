//! DICIA Announcement Monitor CLI
//!
//! One invocation performs one monitoring pass; schedule it externally
//! (cron, CI schedule) and never run two passes at once.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dicia_monitor::{
    error::Result,
    models::Config,
    pipeline::{self, HttpPageSource, RunState},
    services::DeliveryOutcome,
    storage::SeenStore,
};

/// dicia-monitor - DICIA grant announcement watcher
#[derive(Parser, Debug)]
#[command(
    name = "dicia-monitor",
    version,
    about = "Reports new DICIA grant announcements to Slack"
)]

struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Slack incoming-webhook URL; without it new announcements are printed
    #[arg(long, env = "SLACK_WEBHOOK_URL", global = true)]
    webhook_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the listing once and report new announcements
    Run,

    /// Validate the configuration file
    Validate,

    /// Show configuration and seen store info
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_or_default(&cli.config).with_webhook_url(cli.webhook_url);

    match cli.command {
        Command::Run => {
            log::info!(
                "DICIA announcement monitor - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
            );
            config.validate()?;
            if let Err(e) = config.validate_webhook() {
                log::warn!("Webhook URL is invalid ({}); delivery will fail", e);
            }

            let source = HttpPageSource::from_config(&config)?;
            let report = pipeline::run_monitor(&config, &source).await?;

            if report.state == RunState::Aborted {
                log::warn!("Run aborted; seen store left untouched");
                return Ok(());
            }

            match &report.delivery {
                Some(DeliveryOutcome::LocalReport(lines)) => {
                    for line in lines {
                        println!("  {line}");
                    }
                }
                Some(DeliveryOutcome::Delivered) => log::info!("Delivery: sent"),
                Some(outcome) => log::warn!("Delivery: failed ({outcome:?})"),
                None => {}
            }

            log::info!(
                "Done: {} fetched, {} new, {} priority, {} remembered",
                report.fetched,
                report.new_count(),
                report.priority_count(),
                report.persisted
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate().and_then(|()| config.validate_webhook()) {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }

        Command::Info => {
            let store = SeenStore::new(&config.storage.seen_file, config.storage.capacity);
            log::info!("Listing page: {}", config.source.url);
            log::info!(
                "Webhook: {}",
                if config.notifier.webhook_url.is_some() {
                    "configured"
                } else {
                    "not configured (local report)"
                }
            );
            log::info!("Seen store: {}", store.path().display());

            if store.path().exists() {
                let seen = store.load().await;
                log::info!("Remembered identities: {} / {}", seen.len(), store.capacity());
            } else {
                log::info!("No seen store yet.");
            }
        }
    }

    Ok(())
}
