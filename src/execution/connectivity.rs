use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::market_data::{LiveMarketData, MarketDataSource, SimulatedMarketData};
use crate::api::VenueClient;
use crate::config::ConnectivityConfig;
use crate::error::{ConnectivityError, SubmitError};
use crate::models::{CandleWindow, MarketRules, OrderRequest, Timeframe, VenueOrder};

// Probe reports waiting to be drained; the task blocks when this is full
const PROBE_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Mode {
    Online,
    Offline,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Online => f.write_str("ONLINE"),
            Mode::Offline => f.write_str("OFFLINE"),
        }
    }
}

/// Connection state as seen by the main cycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectivityState {
    pub mode: Mode,
    pub last_probe_time: Option<DateTime<Utc>>,
    pub last_transition: Option<DateTime<Utc>>,
    pub reconnect_in_progress: bool,
}

impl ConnectivityState {
    pub fn online() -> Self {
        Self {
            mode: Mode::Online,
            last_probe_time: None,
            last_transition: None,
            reconnect_in_progress: false,
        }
    }

    pub fn is_online(&self) -> bool {
        self.mode == Mode::Online
    }
}

/// Inputs to the connectivity state machine
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectivityEvent {
    /// A venue call from the main cycle failed
    CallFailed(ConnectivityError),
    ProbeStarted,
    ProbeSucceeded,
    ProbeFailed(ConnectivityError),
}

/// Message posted by the reconnection task
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub event: ConnectivityEvent,
    pub at: DateTime<Utc>,
}

/// Pure state transition
pub fn transition(state: &ConnectivityState, event: &ConnectivityEvent, now: DateTime<Utc>) -> ConnectivityState {
    let mut next = state.clone();

    match event {
        ConnectivityEvent::CallFailed(_) => {
            next.mode = Mode::Offline;
        }
        ConnectivityEvent::ProbeStarted => {
            next.reconnect_in_progress = true;
            next.last_probe_time = Some(now);
        }
        ConnectivityEvent::ProbeSucceeded => {
            next.mode = Mode::Online;
            next.reconnect_in_progress = false;
        }
        ConnectivityEvent::ProbeFailed(_) => {
            next.mode = Mode::Offline;
            next.reconnect_in_progress = false;
        }
    }

    if next.mode != state.mode {
        next.last_transition = Some(now);
    }
    next
}

/// Run `fut` with a deadline; expiry is reported as a timeout for `op`
pub async fn with_timeout<T, E, F>(limit: Duration, op: &str, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<ConnectivityError>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ConnectivityError::Timeout(op.to_string()).into()),
    }
}

/// Owns the venue connection and the ONLINE/OFFLINE state
///
/// Only the main cycle holds this value. The reconnection task reports back
/// through a channel that is drained at the top of every cycle, and learns the
/// current mode through a watch channel.
pub struct ConnectivityManager {
    venue: Arc<dyn VenueClient>,
    live: LiveMarketData,
    simulated: SimulatedMarketData,
    state: ConnectivityState,
    config: ConnectivityConfig,
    probe_tx: mpsc::Sender<ProbeReport>,
    probe_rx: mpsc::Receiver<ProbeReport>,
    mode_tx: watch::Sender<Mode>,
    rules_cache: HashMap<String, MarketRules>,
    transitions: Vec<ConnectivityState>,
}

impl ConnectivityManager {
    pub fn new(venue: Arc<dyn VenueClient>, config: ConnectivityConfig) -> Self {
        let (probe_tx, probe_rx) = mpsc::channel(PROBE_CHANNEL_CAPACITY);
        let (mode_tx, _) = watch::channel(Mode::Online);

        Self {
            live: LiveMarketData::new(Arc::clone(&venue)),
            venue,
            simulated: SimulatedMarketData::default(),
            state: ConnectivityState::online(),
            config,
            probe_tx,
            probe_rx,
            mode_tx,
            rules_cache: HashMap::new(),
            transitions: Vec::new(),
        }
    }

    /// Replace the simulated generator (tests use fixed seeds)
    pub fn with_simulated(mut self, simulated: SimulatedMarketData) -> Self {
        self.simulated = simulated;
        self
    }

    /// Startup probe; a failure starts the bot OFFLINE instead of aborting
    pub async fn connect(&mut self) -> Mode {
        let venue = Arc::clone(&self.venue);
        let result = with_timeout(self.config.probe_timeout(), "startup probe", venue.probe()).await;

        match result {
            Ok(()) => info!(mode = %self.state.mode, "Venue reachable"),
            Err(e) => {
                warn!(error = %e, "Venue unreachable at startup, continuing offline");
                self.apply(ConnectivityEvent::CallFailed(e), Utc::now());
            }
        }
        self.state.mode
    }

    pub fn state(&self) -> &ConnectivityState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn is_online(&self) -> bool {
        self.state.is_online()
    }

    pub fn venue(&self) -> Arc<dyn VenueClient> {
        Arc::clone(&self.venue)
    }

    pub fn config(&self) -> &ConnectivityConfig {
        &self.config
    }

    pub fn subscribe_mode(&self) -> watch::Receiver<Mode> {
        self.mode_tx.subscribe()
    }

    pub fn probe_sender(&self) -> mpsc::Sender<ProbeReport> {
        self.probe_tx.clone()
    }

    /// Apply every probe report posted since the last call
    pub fn drain_probe_reports(&mut self) -> usize {
        let mut drained = 0;
        while let Ok(report) = self.probe_rx.try_recv() {
            self.apply(report.event, report.at);
            drained += 1;
        }
        drained
    }

    /// States entered since the last call, oldest first
    pub fn take_transitions(&mut self) -> Vec<ConnectivityState> {
        std::mem::take(&mut self.transitions)
    }

    pub fn apply(&mut self, event: ConnectivityEvent, at: DateTime<Utc>) {
        let next = transition(&self.state, &event, at);

        if next.mode != self.state.mode {
            match (&event, next.mode) {
                (_, Mode::Online) => info!("Venue connection restored, back ONLINE"),
                (ConnectivityEvent::CallFailed(e), _) | (ConnectivityEvent::ProbeFailed(e), _) => {
                    warn!(error = %e, "Venue unreachable, switching OFFLINE")
                }
                _ => warn!("Switching OFFLINE"),
            }
            self.mode_tx.send_replace(next.mode);
            self.transitions.push(next.clone());
        } else if let ConnectivityEvent::ProbeFailed(e) = &event {
            debug!(error = %e, "Reconnection probe failed");
        }

        self.state = next;
    }

    fn record_failure(&mut self, err: &ConnectivityError) {
        self.apply(ConnectivityEvent::CallFailed(err.clone()), Utc::now());
    }

    /// Candle window for `pair`, live when possible, simulated otherwise
    ///
    /// A live failure switches the manager OFFLINE and the same call is served
    /// from the simulated source. The returned window is tagged accordingly.
    pub async fn candles(&mut self, pair: &str, timeframe: Timeframe, limit: usize) -> CandleWindow {
        if self.is_online() {
            let result = with_timeout(
                self.config.call_timeout(),
                "fetch candles",
                self.live.candles(pair, timeframe, limit),
            )
            .await;

            match result {
                Ok(candles) => {
                    return CandleWindow::from_candles(pair, timeframe, self.live.source(), limit, candles)
                }
                Err(e) => {
                    warn!(pair = %pair, error = %e, "Live candles unavailable, using simulated data");
                    self.apply(ConnectivityEvent::CallFailed(e), Utc::now());
                }
            }
        }

        let candles = self
            .simulated
            .candles(pair, timeframe, limit)
            .await
            .unwrap_or_default();
        CandleWindow::from_candles(pair, timeframe, self.simulated.source(), limit, candles)
    }

    pub async fn price(&mut self, pair: &str) -> Result<f64, ConnectivityError> {
        let result = with_timeout(self.config.call_timeout(), "fetch ticker", self.venue.fetch_ticker(pair)).await;
        if let Err(e) = &result {
            self.record_failure(e);
        }
        result
    }

    pub async fn balance(&mut self) -> Result<f64, ConnectivityError> {
        let result = with_timeout(self.config.call_timeout(), "fetch balance", self.venue.fetch_balance()).await;
        if let Err(e) = &result {
            self.record_failure(e);
        }
        result
    }

    /// Lot-size rules, fetched once per pair
    pub async fn market_rules(&mut self, pair: &str) -> Result<MarketRules, ConnectivityError> {
        if let Some(rules) = self.rules_cache.get(pair) {
            return Ok(rules.clone());
        }

        let result = with_timeout(
            self.config.call_timeout(),
            "fetch market rules",
            self.venue.fetch_market_rules(pair),
        )
        .await;
        if let Err(e) = &result {
            self.record_failure(e);
        }

        let rules = result?;
        self.rules_cache.insert(pair.to_string(), rules.clone());
        Ok(rules)
    }

    pub async fn submit(&mut self, order: &OrderRequest) -> Result<VenueOrder, SubmitError> {
        let result = with_timeout(
            self.config.call_timeout(),
            "submit order",
            self.venue.submit_market_order(order),
        )
        .await;
        // A venue refusal says nothing about reachability
        if let Err(SubmitError::Connectivity(e)) = &result {
            self.record_failure(e);
        }
        result
    }
}
