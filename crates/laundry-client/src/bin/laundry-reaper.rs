//! laundry-reaper - Auto-release scheduler
//!
//! Completes overdue cycles and frees machines whose pickup window has run
//! out, so the room keeps moving when nobody's client is open.

use anyhow::{bail, Context, Result};
use clap::Parser;
use laundry_config::load_config_or_default;
use laundry_core::{reap, ReservationEngine};
use laundry_store::{MachineStore, SqliteMachineStore};
use laundry_util::{default_config_path, now};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "laundry-reaper")]
#[command(about = "Auto-release finished laundry machines", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/laundry/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Shared store override (or set LAUNDRY_STORE env var)
    #[arg(short, long, env = "LAUNDRY_STORE")]
    store: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Run a single pass and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config_or_default(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    let store_path = args.store.unwrap_or(config.client.store_path);
    let store: Arc<dyn MachineStore> = Arc::new(
        SqliteMachineStore::open(&store_path)
            .with_context(|| format!("Failed to open store {:?}", store_path))?,
    );

    let mut engine = ReservationEngine::new(
        store,
        config.reservations,
        &config.notifications,
        None,
    );

    if args.once {
        let report = reap(&mut engine, now(), Instant::now()).context("Scheduler pass failed")?;
        for machine in &report.released {
            println!("released {machine}");
        }
        for machine in &report.completed {
            println!("completed {machine}");
        }
        if !report.failed.is_empty() {
            bail!("{} write(s) failed: {:?}", report.failed.len(), report.failed);
        }
        return Ok(());
    }

    info!(
        store_path = %store_path.display(),
        interval_secs = config.reaper.interval.as_secs(),
        "laundry-reaper running"
    );

    let mut sigterm = signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;

    let mut timer = tokio::time::interval(config.reaper.interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
                break;
            }
            _ = timer.tick() => match reap(&mut engine, now(), Instant::now()) {
                Ok(report) if report.is_empty() => debug!("Nothing to reap"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Scheduler pass failed"),
            },
        }
    }

    Ok(())
}
