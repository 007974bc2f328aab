use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use notify_relay::app::Config;
use notify_relay::notify::{
    self, termination_signal, Event, ReconnectDriver, ShutdownCoordinator, SocketSession,
};
use notify_relay::sink;

/// Notify Relay - show events from a TCP producer as desktop notifications
#[derive(Parser)]
#[command(name = "notify-relay")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Config file (defaults to ~/.config/notify-relay/config.toml)
    #[arg(long, env = "NOTIFY_RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// TCP address of the event producer
    #[arg(long, global = true)]
    address: Option<String>,

    /// Notification icon path
    #[arg(long, global = true)]
    icon: Option<PathBuf>,

    /// Tray icon name
    #[arg(long, global = true)]
    name: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Relay events to desktop notifications (default)
    Watch,
    /// Serve a single event to the next consumer that connects
    Send {
        #[arg(long, default_value = "")]
        tooltip: String,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        info: String,
    },
    /// Run a producer that sends the current time at a fixed interval
    Demo {
        #[arg(long, default_value_t = 1500)]
        interval_ms: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level);

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(address) = cli.address {
        config.address = address;
    }
    if let Some(icon) = cli.icon {
        config.icon = icon;
    }
    if let Some(name) = cli.name {
        config.name = name;
    }

    let runtime = tokio::runtime::Runtime::new()?;
    match cli.command {
        Some(Commands::Send { tooltip, title, info }) => {
            let event = Event::new(tooltip, title, info);
            runtime.block_on(notify::send_once(&config.address, &event))
        }
        Some(Commands::Demo { interval_ms }) => runtime.block_on(notify::run_demo_producer(
            &config.address,
            Duration::from_millis(interval_ms),
        )),
        Some(Commands::Watch) | None => runtime.block_on(watch(config)),
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn watch(config: Config) -> Result<()> {
    let mut sink = sink::build(&config.sink, &config.icon)?;
    sink.add_notify_icon(
        &config.name,
        &format!("{} started.", config.name),
        &format!("{} is listening for events.", config.name),
    )
    .context("Failed to show startup notification")?;

    let session = Arc::new(SocketSession::new());
    let shutdown = CancellationToken::new();

    let coordinator = ShutdownCoordinator::new(session.clone(), shutdown.clone());
    let signals = tokio::spawn(coordinator.run(termination_signal()));

    let driver = ReconnectDriver::new(session, shutdown, config.retry_delay());
    let stopped = {
        let mut handler = sink::forward_to(sink.as_mut());
        let relay = driver.run(&config.address, &mut handler);
        tokio::pin!(relay);
        let mut signals = signals;

        tokio::select! {
            _ = &mut relay => signals.await.context("Shutdown task panicked")?,
            joined = &mut signals => {
                let stopped = joined.context("Shutdown task panicked")?;
                // A failed stop may leave the read blocked; do not wait on it
                if stopped.is_ok() {
                    relay.await;
                }
                stopped
            }
        }
    };

    if let Err(e) = sink.close() {
        tracing::warn!("Failed to close notification: {}", e);
    }
    info!("{} stopped", config.name);
    stopped
}
