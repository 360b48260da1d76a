use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use autotrader::api::{BybitClient, VenueClient};
use autotrader::config::{AppConfig, DEFAULT_CONFIG_PATH};
use autotrader::engine::{BotEvent, CycleController};
use autotrader::execution::{ConnectivityManager, Mode, OrderExecutor};
use autotrader::features::FeatureExtractor;
use autotrader::risk::RiskGuard;
use autotrader::sentiment::SimulatedSentiment;
use autotrader::strategy::SignalFusionEngine;
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "autotrader", about = "Autonomous spot trading loop")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Produce signals without placing orders
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = AppConfig::load(&args.config)
        .with_context(|| format!("failed to load configuration from {}", args.config.display()))?;
    if args.dry_run {
        config.trading.dry_run = true;
    }

    setup_logging(&config.logging.filter);

    config.validate().context("invalid configuration")?;
    config.require_credentials().context("venue credentials")?;

    tracing::info!(
        pairs = ?config.trading.pairs,
        timeframe = %config.trading.timeframe,
        model = config.strategy.model.name(),
        dry_run = config.trading.dry_run,
        endpoints = ?config.venue.endpoints(),
        "🚀 Autotrader starting"
    );

    let client = BybitClient::new(&config.venue).context("failed to build venue client")?;
    let venue: Arc<dyn VenueClient> = Arc::new(client.clone());

    let mut conn = ConnectivityManager::new(venue, config.connectivity.clone());
    if conn.connect().await == Mode::Offline {
        tracing::warn!("⚠️  Starting OFFLINE, signals will use simulated data until the venue answers");
    } else {
        tracing::info!(endpoint = client.base_url(), "✅ Venue reachable");
    }
    let reconnect_task = conn.spawn_reconnect_task();

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let notifier = tokio::spawn(log_events(event_rx));

    let mut controller = CycleController::new(
        conn,
        FeatureExtractor::new(config.features.clone()),
        SignalFusionEngine::new(config.strategy.clone()),
        OrderExecutor::new(RiskGuard::new(config.risk.clone())),
        Arc::new(SimulatedSentiment::new()),
        config.trading.clone(),
    )
    .with_events(event_tx);

    if args.once {
        let summary = controller.run_once().await.context("cycle failed")?;
        tracing::info!(
            cycle = summary.cycle,
            signals = summary.signals.len(),
            executed = summary.executed.len(),
            rejected = summary.rejected.len(),
            "✅ Single cycle complete"
        );
    } else {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("⚠️  Received Ctrl+C, shutting down...");
            }
            _ = controller.run() => {}
        }
    }

    let report = controller.performance().report(controller.connectivity().mode());
    tracing::info!(
        cycles = report.cycles,
        executed = report.executed_orders,
        win_rate = report.win_rate,
        "👋 Final performance"
    );

    drop(controller);
    reconnect_task.abort();
    let _ = notifier.await;
    Ok(())
}

/// Notification consumer; the loop never waits on it
async fn log_events(mut rx: mpsc::UnboundedReceiver<BotEvent>) {
    while let Some(event) = rx.recv().await {
        match &event {
            BotEvent::OrderRejected { .. } => tracing::warn!(event = event.name(), "{}", event.message()),
            BotEvent::SignalProduced(_) => tracing::debug!(event = event.name(), "{}", event.message()),
            _ => tracing::info!(event = event.name(), "{}", event.message()),
        }
    }
}

fn setup_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
