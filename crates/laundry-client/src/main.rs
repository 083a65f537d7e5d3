//! laundry - Terminal client for the shared washer and dryer
//!
//! Wires together:
//! - Configuration loading
//! - Local identity
//! - Shared store and change feed
//! - Reservation engine and 1 Hz countdown
//! - Alert delivery (desktop notifications or in-process)

use anyhow::{Context, Result};
use clap::Parser;
use laundry_client::{ClientSession, Command, Outcome};
use laundry_config::{load_config_or_default, LaundryConfig};
use laundry_core::ReservationEngine;
use laundry_notify::{AlertCenter, AlertQueue, NotifySendNotifier, SystemNotifier};
use laundry_store::{
    FeedWatcher, FileIdentityProvider, IdentityProvider, MachineStore, SqliteMachineStore,
};
use laundry_util::{default_config_path, now};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// laundry - Reserve the shared washer and dryer
#[derive(Parser, Debug)]
#[command(name = "laundry")]
#[command(about = "Reserve the shared washer and dryer", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/laundry/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Shared store override (or set LAUNDRY_STORE env var)
    #[arg(short, long, env = "LAUNDRY_STORE")]
    store: Option<PathBuf>,

    /// Data directory override (or set LAUNDRY_DATA_DIR env var)
    #[arg(short, long, env = "LAUNDRY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Display name to use on first run instead of asking
    #[arg(short, long)]
    name: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Keep alerts in the terminal even if desktop notifications work
    #[arg(long)]
    no_system_notifications: bool,
}

/// Interactive client state
struct Client {
    session: ClientSession,
    store: Arc<dyn MachineStore>,
    feed_poll_interval: Duration,
}

impl Client {
    async fn new(args: Args) -> Result<Self> {
        let config = load_config_or_default(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        let LaundryConfig {
            client,
            reservations,
            notifications,
            ..
        } = config;

        let store_path = args.store.unwrap_or(client.store_path);
        let data_dir = args.data_dir.unwrap_or(client.data_dir);

        // Identity may prompt on stdin, so resolve it before the loop reads lines
        let provider = FileIdentityProvider::in_data_dir(&data_dir, prompt_for_name)
            .with_name_override(args.name);
        let identity = tokio::task::spawn_blocking(move || provider.get_or_create_identity())
            .await
            .context("Identity task panicked")?
            .with_context(|| format!("Failed to load identity from {:?}", data_dir))?;

        info!(user_id = %identity.id, name = %identity.name, "Identity ready");

        let store: Arc<dyn MachineStore> = Arc::new(
            SqliteMachineStore::open(&store_path)
                .with_context(|| format!("Failed to open store {:?}", store_path))?,
        );

        info!(store_path = %store_path.display(), "Store opened");

        let mut engine = ReservationEngine::new(
            store.clone(),
            reservations,
            &notifications,
            Some(identity.id.clone()),
        );
        let loaded = engine
            .load(now())
            .context("Cannot show machine state without the shared store")?;

        let notifier = if notifications.system && !args.no_system_notifications {
            NotifySendNotifier::detect("laundry").map(|n| Arc::new(n) as Arc<dyn SystemNotifier>)
        } else {
            None
        };
        if notifier.is_none() {
            info!("Desktop notifications unavailable, alerts stay in the terminal");
        }

        let queue = AlertQueue::new(notifications.alert_capacity, notifications.alert_dismiss_after);
        let alerts = AlertCenter::select(notifier, queue).await;

        let mut session = ClientSession::new(engine, identity, alerts);
        print_lines(&session.dispatch(loaded, Instant::now()).await);

        Ok(Self {
            session,
            store,
            feed_poll_interval: client.feed_poll_interval,
        })
    }

    async fn run(self) -> Result<()> {
        let Self {
            mut session,
            store,
            feed_poll_interval,
        } = self;

        // Subscribe before the watcher starts so no record is missed
        let mut changes = store.subscribe();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let watcher = FeedWatcher::new(store.clone(), feed_poll_interval).spawn(shutdown_rx);

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;

        let mut commands = BufReader::new(tokio::io::stdin()).lines();

        let mut tick_timer = tokio::time::interval(Duration::from_secs(1));
        tick_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        println!("Hello, {}.", session.identity().name);
        print_lines(&session.status_lines(now()));
        println!("Type 'help' for commands.");

        info!(alerts = session.alerts().strategy_name(), "Client running");

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

                // Countdown, threshold alerts, heartbeat and alert pruning
                _ = tick_timer.tick() => {
                    print_lines(&session.tick(now(), Instant::now()).await);
                }

                change = changes.recv() => match change {
                    Ok(record) => {
                        print_lines(&session.apply_remote(&record, now(), Instant::now()).await);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Change feed lagged, reloading");
                        match session.reload(now(), Instant::now()).await {
                            Ok(lines) => print_lines(&lines),
                            Err(e) => warn!(error = %e, "Reload failed"),
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        error!("Change feed closed");
                        break;
                    }
                },

                line = commands.next_line() => match line {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => match line.parse::<Command>() {
                        Ok(command) => {
                            debug!(?command, "Command");
                            match session.execute(command, now(), Instant::now()).await {
                                Outcome::Continue(lines) => print_lines(&lines),
                                Outcome::Quit => break,
                            }
                        }
                        Err(e) => println!("{e}"),
                    },
                    Ok(None) => {
                        info!("Input closed, shutting down");
                        break;
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to read input");
                        break;
                    }
                },
            }
        }

        info!("Stopping change feed");
        let _ = shutdown_tx.send(true);
        if let Err(e) = watcher.await {
            warn!(error = %e, "Feed watcher did not stop cleanly");
        }

        info!("Shutdown complete");
        Ok(())
    }
}

fn prompt_for_name() -> Option<String> {
    print!("Your name: ");
    std::io::stdout().flush().ok()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line).ok()?;
    Some(line.trim().to_string()).filter(|name| !name.is_empty())
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so status output stays readable
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "laundry starting");

    let client = Client::new(args).await?;
    client.run().await
}
