use chrono::{DateTime, Utc};

use super::performance::PerformanceReport;
use crate::error::TradeError;
use crate::execution::{ConnectivityState, Mode};
use crate::models::{Direction, OrderReceipt, Signal};

/// Notifications emitted by the decision loop
#[derive(Debug, Clone, PartialEq)]
pub enum BotEvent {
    CycleStarted {
        cycle: u64,
        mode: Mode,
        at: DateTime<Utc>,
    },
    SignalProduced(Signal),
    OrderExecuted(OrderReceipt),
    OrderRejected {
        pair: String,
        direction: Direction,
        error: TradeError,
    },
    /// Exactly one per ONLINE/OFFLINE transition
    ConnectivityChanged(ConnectivityState),
    PeriodicReport(PerformanceReport),
}

impl BotEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BotEvent::CycleStarted { .. } => "cycle_started",
            BotEvent::SignalProduced(_) => "signal_produced",
            BotEvent::OrderExecuted(_) => "order_executed",
            BotEvent::OrderRejected { .. } => "order_rejected",
            BotEvent::ConnectivityChanged(_) => "connectivity_changed",
            BotEvent::PeriodicReport(_) => "periodic_report",
        }
    }

    /// Human-readable notification text
    pub fn message(&self) -> String {
        match self {
            BotEvent::CycleStarted { cycle, mode, .. } => {
                format!("🔄 Cycle #{} started ({})", cycle, mode)
            }
            BotEvent::SignalProduced(signal) => format!(
                "📊 {} {} confidence {:.1}% (buy {:.1} / sell {:.1} / hold {:.1}){}",
                signal.pair,
                signal.direction,
                signal.confidence,
                signal.probabilities.buy,
                signal.probabilities.sell,
                signal.probabilities.hold,
                if signal.source == crate::models::DataSource::Simulated {
                    " [simulated data]"
                } else {
                    ""
                }
            ),
            BotEvent::OrderExecuted(receipt) => format!(
                "✅ {} {} {} @ {:.6} (cost {:.2}, order {})",
                receipt.side, receipt.quantity, receipt.pair, receipt.price, receipt.cost, receipt.id
            ),
            BotEvent::OrderRejected { pair, direction, error } => {
                format!("❌ {} {} not executed: {}", direction, pair, error)
            }
            BotEvent::ConnectivityChanged(state) => match state.mode {
                Mode::Online => "🎉 Venue reconnected, real trading resumed".to_string(),
                Mode::Offline => "⚠️ Venue unreachable, running on simulated data".to_string(),
            },
            BotEvent::PeriodicReport(report) => format!(
                "📈 Report: {} cycles, {} orders, {} wins ({:.1}%), PnL {:+.2}, balance {}, {}{}",
                report.cycles,
                report.executed_orders,
                report.realized_wins,
                report.win_rate,
                report.realized_pnl,
                report
                    .balance
                    .map(|b| format!("{:.2}", b))
                    .unwrap_or_else(|| "unknown".to_string()),
                report.mode,
                report
                    .mood
                    .map(|m| format!(", mood {:+.3}", m))
                    .unwrap_or_default()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_message_names_pair_direction_reason() {
        let event = BotEvent::OrderRejected {
            pair: "XRP/USDT".to_string(),
            direction: Direction::Buy,
            error: TradeError::InsufficientBalance { balance: 40.0, required: 50.0 },
        };

        let message = event.message();
        assert!(message.contains("XRP/USDT"));
        assert!(message.contains("BUY"));
        assert!(message.contains("Insufficient balance"));
        assert_eq!(event.name(), "order_rejected");
    }

    #[test]
    fn test_connectivity_messages() {
        let mut state = ConnectivityState::online();
        assert!(BotEvent::ConnectivityChanged(state.clone()).message().contains("reconnected"));

        state.mode = Mode::Offline;
        assert!(BotEvent::ConnectivityChanged(state).message().contains("simulated"));
    }
}
