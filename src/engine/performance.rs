use serde::{Deserialize, Serialize};

use crate::execution::Mode;

/// Running counters exposed to the notification side
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceCounters {
    pub cycles: u64,
    pub signals: u64,
    pub executed_orders: u64,
    pub rejected_orders: u64,
    pub realized_trades: u64,
    pub realized_wins: u64,
    pub realized_pnl: f64,
    /// Last known free quote balance
    pub balance: Option<f64>,
    /// Market mood of the latest cycle
    pub last_mood: Option<f64>,
}

impl PerformanceCounters {
    /// Realized wins over realized trades, in percent
    pub fn win_rate(&self) -> f64 {
        if self.realized_trades == 0 {
            return 0.0;
        }
        self.realized_wins as f64 / self.realized_trades as f64 * 100.0
    }

    pub fn report(&self, mode: Mode) -> PerformanceReport {
        PerformanceReport {
            cycles: self.cycles,
            executed_orders: self.executed_orders,
            realized_wins: self.realized_wins,
            realized_pnl: self.realized_pnl,
            win_rate: self.win_rate(),
            balance: self.balance,
            mode,
            mood: self.last_mood,
        }
    }
}

/// Snapshot sent with every periodic report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub cycles: u64,
    pub executed_orders: u64,
    pub realized_wins: u64,
    pub realized_pnl: f64,
    pub win_rate: f64,
    pub balance: Option<f64>,
    pub mode: Mode,
    pub mood: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_rate() {
        let mut counters = PerformanceCounters::default();
        assert_eq!(counters.win_rate(), 0.0);

        counters.realized_trades = 4;
        counters.realized_wins = 3;
        assert_eq!(counters.win_rate(), 75.0);
    }

    #[test]
    fn test_report_snapshot() {
        let counters = PerformanceCounters {
            cycles: 10,
            executed_orders: 2,
            balance: Some(95.5),
            ..Default::default()
        };
        let report = counters.report(Mode::Offline);
        assert_eq!(report.cycles, 10);
        assert_eq!(report.mode, Mode::Offline);
        assert_eq!(report.balance, Some(95.5));
    }
}
