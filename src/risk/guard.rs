use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::TradeError;
use crate::models::{MarketRules, Signal};

/// Per-trade limits, loaded once at startup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskLimits {
    pub max_notional_per_trade: f64,
    /// Share of the free balance a single trade may commit, in (0, 1]
    pub max_fraction_of_balance: f64,
    /// Signals below this confidence are never executed
    pub min_confidence: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_notional_per_trade: 100.0,
            max_fraction_of_balance: 0.5,
            min_confidence: 75.0,
        }
    }
}

/// Pre-trade checks run before anything reaches the venue
///
/// Sizing policy: quantities are rounded down to the venue step and a result
/// below the venue minimum is rejected, never clamped up.
#[derive(Debug, Clone, Default)]
pub struct RiskGuard {
    limits: RiskLimits,
}

impl RiskGuard {
    pub fn new(limits: RiskLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Signal is directional and confident enough to trade
    pub fn admits(&self, signal: &Signal) -> bool {
        signal.is_actionable(self.limits.min_confidence)
    }

    pub fn check_balance(&self, balance: f64, notional: f64) -> Result<(), TradeError> {
        if balance < notional {
            return Err(TradeError::InsufficientBalance {
                balance,
                required: notional,
            });
        }
        Ok(())
    }

    pub fn check_exposure(&self, balance: f64, notional: f64) -> Result<(), TradeError> {
        if notional > self.limits.max_notional_per_trade {
            return Err(TradeError::ExposureLimitExceeded {
                notional,
                limit: self.limits.max_notional_per_trade,
            });
        }

        let limit = balance * self.limits.max_fraction_of_balance;
        if notional > limit {
            return Err(TradeError::ExposureLimitExceeded { notional, limit });
        }
        Ok(())
    }

    pub fn check_quote(&self, pair: &str, price: f64) -> Result<(), TradeError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(TradeError::BadQuote {
                pair: pair.to_string(),
                price,
            });
        }
        Ok(())
    }

    /// `notional / price`, rounded down to the venue step
    pub fn size(&self, notional: f64, price: f64, rules: &MarketRules) -> Result<Decimal, TradeError> {
        let bad_quote = || TradeError::BadQuote {
            pair: rules.pair.clone(),
            price,
        };

        let notional = Decimal::from_f64(notional).ok_or_else(bad_quote)?;
        let price_dec = Decimal::from_f64(price).ok_or_else(bad_quote)?;
        let raw = notional.checked_div(price_dec).ok_or_else(bad_quote)?;

        let quantity = if rules.qty_step > Decimal::ZERO {
            (raw / rules.qty_step).floor() * rules.qty_step
        } else {
            raw
        };

        if quantity <= Decimal::ZERO || quantity < rules.min_qty {
            return Err(TradeError::MinimumSizeViolation {
                quantity,
                minimum: rules.min_qty,
            });
        }

        Ok(quantity.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataSource, Direction, Probabilities};
    use chrono::Utc;
    use std::str::FromStr;

    fn rules(step: &str, min: &str) -> MarketRules {
        MarketRules {
            pair: "BTC/USDT".to_string(),
            qty_step: Decimal::from_str(step).unwrap(),
            min_qty: Decimal::from_str(min).unwrap(),
        }
    }

    fn signal(direction: Direction, confidence: f64) -> Signal {
        Signal {
            pair: "BTC/USDT".to_string(),
            direction,
            confidence,
            probabilities: Probabilities::equal_split(),
            buy_votes: 0,
            sell_votes: 0,
            data_quality: 1.0,
            model: "class_vote".to_string(),
            source: DataSource::Live,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_insufficient_balance() {
        let guard = RiskGuard::default();
        assert_eq!(
            guard.check_balance(40.0, 50.0),
            Err(TradeError::InsufficientBalance { balance: 40.0, required: 50.0 })
        );
        assert!(guard.check_balance(50.0, 50.0).is_ok());
    }

    #[test]
    fn test_exposure_fraction() {
        let guard = RiskGuard::default();
        // 50% of 100 = 50
        assert!(guard.check_exposure(100.0, 50.0).is_ok());
        assert!(matches!(
            guard.check_exposure(100.0, 60.0),
            Err(TradeError::ExposureLimitExceeded { limit, .. }) if limit == 50.0
        ));
    }

    #[test]
    fn test_exposure_absolute_cap() {
        let guard = RiskGuard::new(RiskLimits {
            max_notional_per_trade: 20.0,
            max_fraction_of_balance: 1.0,
            min_confidence: 75.0,
        });
        assert!(matches!(
            guard.check_exposure(1_000.0, 25.0),
            Err(TradeError::ExposureLimitExceeded { limit, .. }) if limit == 20.0
        ));
    }

    #[test]
    fn test_bad_quote() {
        let guard = RiskGuard::default();
        assert!(matches!(guard.check_quote("BTC/USDT", 0.0), Err(TradeError::BadQuote { .. })));
        assert!(matches!(guard.check_quote("BTC/USDT", -1.0), Err(TradeError::BadQuote { .. })));
        assert!(matches!(guard.check_quote("BTC/USDT", f64::NAN), Err(TradeError::BadQuote { .. })));
        assert!(guard.check_quote("BTC/USDT", 0.5).is_ok());
    }

    #[test]
    fn test_size_rounds_down_to_step() {
        let guard = RiskGuard::default();
        // 10 / 3 = 3.333.. -> 3.33
        let qty = guard.size(10.0, 3.0, &rules("0.01", "0.01")).unwrap();
        assert_eq!(qty, Decimal::from_str("3.33").unwrap());

        // 10 / 0.7 = 14.28.. -> 14 with whole-unit step
        let qty = guard.size(10.0, 0.7, &rules("1", "1")).unwrap();
        assert_eq!(qty, Decimal::from(14));
    }

    #[test]
    fn test_size_below_minimum_is_rejected() {
        let guard = RiskGuard::default();
        // 10 / 50000 = 0.0002 < 0.001
        let err = guard.size(10.0, 50_000.0, &rules("0.000001", "0.001")).unwrap_err();
        assert!(matches!(err, TradeError::MinimumSizeViolation { .. }));

        // Rounds to zero
        let err = guard.size(10.0, 50_000.0, &rules("0.01", "0")).unwrap_err();
        assert!(matches!(err, TradeError::MinimumSizeViolation { .. }));
    }

    #[test]
    fn test_admits_requires_direction_and_confidence() {
        let guard = RiskGuard::default();
        assert!(guard.admits(&signal(Direction::Buy, 80.0)));
        assert!(guard.admits(&signal(Direction::Sell, 75.0)));
        assert!(!guard.admits(&signal(Direction::Buy, 74.9)));
        assert!(!guard.admits(&signal(Direction::Hold, 85.0)));
    }
}
