use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::events::BotEvent;
use super::history::OperationHistory;
use super::performance::PerformanceCounters;
use crate::config::TradingConfig;
use crate::error::{BotError, TradeError};
use crate::execution::{ConnectivityManager, OrderExecutor};
use crate::features::FeatureExtractor;
use crate::models::{CandleWindow, DataSource, OrderReceipt, Side, Signal};
use crate::sentiment::{MarketMood, SentimentSource};
use crate::strategy::SignalFusionEngine;
use crate::Result;

/// What one cycle did
#[derive(Debug, Clone, Default)]
pub struct CycleSummary {
    pub cycle: u64,
    pub signals: Vec<Signal>,
    pub executed: Vec<OrderReceipt>,
    pub rejected: Vec<(String, TradeError)>,
}

/// Runs the decision loop: sentiment -> data -> features -> fusion -> guarded execution -> report
///
/// Owns every piece of mutable state used by the loop, so nothing here needs
/// a lock. The reconnection task talks to the connectivity manager through
/// its channel only.
pub struct CycleController {
    conn: ConnectivityManager,
    extractor: FeatureExtractor,
    fusion: SignalFusionEngine,
    executor: OrderExecutor,
    sentiment: Arc<dyn SentimentSource>,
    trading: TradingConfig,
    history: OperationHistory,
    counters: PerformanceCounters,
    events: Option<mpsc::UnboundedSender<BotEvent>>,
}

impl CycleController {
    pub fn new(
        conn: ConnectivityManager,
        extractor: FeatureExtractor,
        fusion: SignalFusionEngine,
        executor: OrderExecutor,
        sentiment: Arc<dyn SentimentSource>,
        trading: TradingConfig,
    ) -> Self {
        Self {
            conn,
            extractor,
            fusion,
            executor,
            sentiment,
            trading,
            history: OperationHistory::new(),
            counters: PerformanceCounters::default(),
            events: None,
        }
    }

    /// Send every event to `tx`
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<BotEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn performance(&self) -> &PerformanceCounters {
        &self.counters
    }

    pub fn history(&self) -> &OperationHistory {
        &self.history
    }

    pub fn connectivity(&self) -> &ConnectivityManager {
        &self.conn
    }

    fn emit(&self, event: BotEvent) {
        debug!(event = event.name(), "{}", event.message());
        if let Some(tx) = &self.events {
            // Nobody listening is fine
            let _ = tx.send(event);
        }
    }

    fn emit_transitions(&mut self) {
        for state in self.conn.take_transitions() {
            self.emit(BotEvent::ConnectivityChanged(state));
        }
    }

    /// Analysis half of a cycle: sentiment, data collection, features and fusion
    ///
    /// Holds no venue-side effects, so it is safe to cancel at the cycle deadline.
    async fn analyze(&mut self, summary: &mut CycleSummary) -> MarketMood {
        let cycle = summary.cycle;

        self.conn.drain_probe_reports();
        self.emit_transitions();

        info!(cycle, mode = %self.conn.mode(), pairs = self.trading.pairs.len(), "🔄 Cycle started");
        self.emit(BotEvent::CycleStarted {
            cycle,
            mode: self.conn.mode(),
            at: Utc::now(),
        });

        let mood = self.sentiment.score_market().await;
        self.counters.last_mood = Some(mood.score);
        debug!(score = mood.score, simulated = mood.simulated, "Market mood");

        let windows = self.collect_windows().await;
        let features = self.extractor.extract_batch(windows.iter());

        for window in &windows {
            let signal = self.fusion.fuse(&window.pair, &features, mood.usable_score(), window.source);
            info!(
                pair = %signal.pair,
                direction = %signal.direction,
                confidence = signal.confidence,
                buy_votes = signal.buy_votes,
                sell_votes = signal.sell_votes,
                quality = signal.data_quality,
                simulated = window.is_simulated(),
                "Signal"
            );
            self.counters.signals += 1;
            self.emit(BotEvent::SignalProduced(signal.clone()));
            summary.signals.push(signal);
        }

        mood
    }

    async fn collect_windows(&mut self) -> Vec<CandleWindow> {
        let mut windows = Vec::with_capacity(self.trading.pairs.len());
        for pair in self.trading.pairs.clone() {
            let window = self
                .conn
                .candles(&pair, self.trading.timeframe, self.trading.candle_limit)
                .await;
            debug!(pair = %pair, bars = window.len(), source = ?window.source, "Collected candles");
            windows.push(window);
            self.emit_transitions();
        }
        windows
    }

    /// Orders are started only before `deadline`; one already running is never cut short
    async fn execute_signals(&mut self, summary: &mut CycleSummary, deadline: Instant) {
        let actionable: Vec<Signal> = summary
            .signals
            .iter()
            .filter(|s| self.executor.guard().admits(s))
            .cloned()
            .collect();

        if actionable.is_empty() {
            return;
        }
        if self.trading.dry_run {
            for signal in &actionable {
                info!(pair = %signal.pair, direction = %signal.direction, "Signal-only mode, order not sent");
            }
            return;
        }

        for (i, signal) in actionable.iter().enumerate() {
            let Some(side) = signal.direction.side() else {
                continue;
            };

            if i > 0 {
                tokio::time::sleep(self.trading.inter_order_delay()).await;
            }

            let result = if signal.source == DataSource::Simulated {
                Err(TradeError::SimulatedData {
                    pair: signal.pair.clone(),
                })
            } else if Instant::now() >= deadline {
                Err(TradeError::DeadlineExceeded {
                    pair: signal.pair.clone(),
                })
            } else {
                self.executor
                    .execute(&mut self.conn, &signal.pair, side, self.trading.notional_per_trade)
                    .await
            };
            self.emit_transitions();

            match result {
                Ok(receipt) => {
                    self.counters.executed_orders += 1;
                    self.counters.balance = self.counters.balance.map(|b| match side {
                        Side::Buy => b - receipt.cost,
                        Side::Sell => b + receipt.cost,
                    });
                    if self.history.record(receipt.clone()).is_some() {
                        self.counters.realized_trades = self.history.realized().len() as u64;
                        self.counters.realized_wins = self.history.realized_wins() as u64;
                        self.counters.realized_pnl = self.history.realized_pnl();
                    }
                    self.emit(BotEvent::OrderExecuted(receipt.clone()));
                    summary.executed.push(receipt);
                }
                Err(e) => {
                    warn!(
                        pair = %signal.pair,
                        direction = %signal.direction,
                        reason = e.kind(),
                        error = %e,
                        "Trade abandoned"
                    );
                    self.counters.rejected_orders += 1;
                    self.emit(BotEvent::OrderRejected {
                        pair: signal.pair.clone(),
                        direction: signal.direction,
                        error: e.clone(),
                    });
                    summary.rejected.push((signal.pair.clone(), e));
                }
            }
        }
    }

    async fn maybe_report(&mut self, mood: &MarketMood) {
        if self.counters.cycles % self.trading.report_every_cycles.max(1) != 0 {
            return;
        }

        if self.conn.is_online() {
            match self.conn.balance().await {
                Ok(balance) => self.counters.balance = Some(balance),
                Err(e) => warn!(error = %e, "Balance unavailable for report"),
            }
            self.emit_transitions();
        }

        let report = self.counters.report(self.conn.mode());
        info!(
            cycles = report.cycles,
            executed = report.executed_orders,
            wins = report.realized_wins,
            win_rate = report.win_rate,
            pnl = report.realized_pnl,
            mood = mood.score,
            "📈 Periodic report"
        );
        self.emit(BotEvent::PeriodicReport(report));
    }

    /// One cycle bounded by the configured cycle timeout
    ///
    /// The deadline cancels analysis only. Past it no new order is started,
    /// but an order already submitted always completes and is recorded.
    pub async fn run_once(&mut self) -> Result<CycleSummary> {
        let limit = self.trading.cycle_timeout();
        let deadline = Instant::now() + limit;

        self.counters.cycles += 1;
        let cycle = self.counters.cycles;
        let mut summary = CycleSummary {
            cycle,
            ..Default::default()
        };

        let mood = match tokio::time::timeout_at(deadline, self.analyze(&mut summary)).await {
            Ok(mood) => mood,
            Err(_) => return Err(BotError::CycleTimeout(limit.as_secs())),
        };

        self.execute_signals(&mut summary, deadline).await;
        self.maybe_report(&mood).await;

        info!(
            cycle,
            executed = summary.executed.len(),
            rejected = summary.rejected.len(),
            mode = %self.conn.mode(),
            "Cycle finished"
        );
        Ok(summary)
    }

    /// Run forever; a failed cycle is logged and the next one starts on schedule
    pub async fn run(&mut self) {
        let interval = self.trading.interval();
        let mut ticker = interval_at(Instant::now(), interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(interval_secs = interval.as_secs(), "💹 Decision loop starting");

        loop {
            ticker.tick().await;

            if let Err(e) = self.run_once().await {
                let failure = BotError::UnhandledCycleFailure(e.to_string());
                error!(cycle = self.counters.cycles, error = %failure, "Cycle aborted");
            }
        }
    }
}
