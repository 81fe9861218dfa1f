//! # BrandPulse Orchestrator
//!
//! Periodic runner for user-defined brand-monitoring automations.
//!
//! Usage:
//!   brandpulse                       # Poll loop (default: every 5 minutes)
//!   brandpulse --once                # Single pass, summary as JSON on stdout
//!   brandpulse --interval 60         # Custom polling interval

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use brandpulse_core::BrandPulseConfig;
use brandpulse_orchestrator::{Orchestrator, OrchestratorDb};

#[derive(Parser)]
#[command(
    name = "brandpulse",
    version,
    about = "📡 BrandPulse — brand-monitoring automation orchestrator"
)]
struct Cli {
    /// Config file path (default: ~/.brandpulse/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// SQLite database path (overrides config)
    #[arg(long)]
    db_path: Option<String>,

    /// Polling interval in seconds (overrides config)
    #[arg(long)]
    interval: Option<u64>,

    /// Run a single pass and print the summary as JSON
    #[arg(long)]
    once: bool,

    /// Write a default config file to ~/.brandpulse/config.toml and exit
    #[arg(long)]
    init_config: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "brandpulse=debug,brandpulse_orchestrator=debug,brandpulse_services=debug"
    } else {
        "brandpulse=info,brandpulse_orchestrator=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    // --init-config: write the defaults and exit
    if cli.init_config {
        let path = BrandPulseConfig::default_path();
        if path.exists() {
            println!("⚠️  Config already exists at {}", path.display());
        } else {
            BrandPulseConfig::default().save()?;
            println!("📝 Wrote default config to {}", path.display());
        }
        return Ok(());
    }

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => BrandPulseConfig::load_from(std::path::Path::new(&expand_path(path)))?,
        None => BrandPulseConfig::load()?,
    };
    if let Some(db_path) = &cli.db_path {
        config.scheduler.db_path = db_path.clone();
    }
    if let Some(interval) = cli.interval {
        config.scheduler.poll_interval_secs = interval;
    }

    // Open the database
    let db_path = expand_path(&config.scheduler.db_path);
    if let Some(parent) = std::path::Path::new(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = Arc::new(OrchestratorDb::open(std::path::Path::new(&db_path))?);

    // Wire the engine against the backend services
    let collaborators = brandpulse_services::collaborators(&config.services)?;
    let orchestrator = Orchestrator::new(db, collaborators, &config.scheduler);

    if cli.once {
        let summary = orchestrator.run_once(chrono::Utc::now()).await?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    tracing::info!(
        "⏰ Orchestrator started (poll every {}s, {} workers, db: {db_path})",
        config.scheduler.poll_interval_secs,
        config.scheduler.workers
    );

    let mut interval = tokio::time::interval(std::time::Duration::from_secs(
        config.scheduler.poll_interval_secs.max(1),
    ));
    loop {
        interval.tick().await;
        match orchestrator.run_once(chrono::Utc::now()).await {
            Ok(summary) => {
                if summary.processed > 0 || summary.skipped > 0 {
                    tracing::info!(
                        "📣 Pass: {} processed ({} ok, {} failed), {} skipped",
                        summary.processed,
                        summary.succeeded(),
                        summary.failed(),
                        summary.skipped
                    );
                }
            }
            // A failed pass (store unreachable before the due set could be
            // fetched) is logged and retried at the next tick.
            Err(e) => tracing::error!("💥 Orchestration pass failed: {e}"),
        }
    }
}
