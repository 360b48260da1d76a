/// Rule-based vote aggregation shared by every model
///
/// Feature names are grouped into classes by substring, each class votes from
/// the mean of its finite members, and the tally is turned into a direction,
/// a confidence and a probability triple summing to 100.

use serde::{Deserialize, Serialize};

use crate::features::FeatureVector;
use crate::models::{Direction, Probabilities};

/// Confidence of the zero-vote fallback signal
pub const FALLBACK_CONFIDENCE: f64 = 50.0;

/// Tunable thresholds for signal fusion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FusionConfig {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    /// RSI at or below this (but not oversold) adds one buy vote
    pub rsi_buy_bias: f64,
    /// RSI at or above this (but not overbought) adds one sell vote
    pub rsi_sell_bias: f64,
    /// Trend class thresholds, in percent
    pub trend_weak_pct: f64,
    pub trend_strong_pct: f64,
    /// Volume ratio above which volume reinforces the leading direction
    pub volume_surge: f64,
    /// Absolute market mood needed for a vote
    pub mood_threshold: f64,
    pub min_votes: u32,
    pub base_confidence: f64,
    pub confidence_per_vote: f64,
    pub confidence_floor: f64,
    pub confidence_ceiling: f64,
    /// Share of the non-winning mass given to the opposite direction
    pub opposite_share: f64,
    pub feature_vote: FeatureVoteConfig,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            rsi_buy_bias: 45.0,
            rsi_sell_bias: 55.0,
            trend_weak_pct: 0.1,
            trend_strong_pct: 0.5,
            volume_surge: 1.5,
            mood_threshold: 0.1,
            min_votes: 2,
            base_confidence: 50.0,
            confidence_per_vote: 8.0,
            confidence_floor: 40.0,
            confidence_ceiling: 85.0,
            opposite_share: 0.4,
            feature_vote: FeatureVoteConfig::default(),
        }
    }
}

/// Thresholds for the per-feature voting model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeatureVoteConfig {
    pub rsi_strong_buy: f64,
    pub rsi_buy: f64,
    pub rsi_strong_sell: f64,
    pub rsi_sell: f64,
    /// Distance from the moving average that votes for reversion
    pub sma_deviation: f64,
    /// Per-bar trend slope (fraction of price)
    pub trend_slope: f64,
    /// Distance to support/resistance that counts as "near"
    pub range_proximity: f64,
    pub min_votes: u32,
    pub base_confidence: f64,
    pub confidence_per_vote: f64,
    pub confidence_cap: f64,
}

impl Default for FeatureVoteConfig {
    fn default() -> Self {
        Self {
            rsi_strong_buy: 35.0,
            rsi_buy: 45.0,
            rsi_strong_sell: 65.0,
            rsi_sell: 55.0,
            sma_deviation: 0.02,
            trend_slope: 0.001,
            range_proximity: 0.02,
            min_votes: 3,
            base_confidence: 60.0,
            confidence_per_vote: 6.0,
            confidence_cap: 80.0,
        }
    }
}

/// Feature classes used by the class-vote model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureClass {
    Rsi,
    Volume,
    Trend,
}

impl FeatureClass {
    pub fn of(name: &str) -> Option<Self> {
        if name.contains("rsi") {
            Some(FeatureClass::Rsi)
        } else if name.contains("volume") {
            Some(FeatureClass::Volume)
        } else if name.contains("trend") || name.starts_with("ret_") || name.contains("momentum") {
            Some(FeatureClass::Trend)
        } else {
            None
        }
    }
}

/// Mean of the finite values whose name matches `filter`, None when there are none
pub fn mean_where(features: &FeatureVector, pair: &str, filter: impl Fn(&str) -> bool) -> Option<f64> {
    let values: Vec<f64> = features
        .for_pair(pair)
        .filter(|(name, value)| value.is_finite() && filter(name))
        .map(|(_, value)| value)
        .collect();

    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn class_mean(features: &FeatureVector, pair: &str, class: FeatureClass) -> Option<f64> {
    mean_where(features, pair, |name| FeatureClass::of(name) == Some(class))
}

/// Buy and sell votes for one pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteTally {
    pub buy: u32,
    pub sell: u32,
}

impl VoteTally {
    pub fn total(&self) -> u32 {
        self.buy + self.sell
    }

    /// Direction that strictly leads and has at least `min_votes`
    pub fn winner(&self, min_votes: u32) -> Direction {
        if self.buy > self.sell && self.buy >= min_votes {
            Direction::Buy
        } else if self.sell > self.buy && self.sell >= min_votes {
            Direction::Sell
        } else {
            Direction::Hold
        }
    }

    /// Add one vote to whichever side leads; ties get nothing
    pub fn reinforce_leader(&mut self) {
        if self.buy > self.sell {
            self.buy += 1;
        } else if self.sell > self.buy {
            self.sell += 1;
        }
    }
}

/// Winning class gets `confidence`; the rest is split and renormalized to exactly 100
pub fn probabilities_for(direction: Direction, confidence: f64, opposite_share: f64) -> Probabilities {
    let remainder = 100.0 - confidence;
    let round = |v: f64| (v * 10.0).round() / 10.0;

    match direction {
        Direction::Buy => {
            let buy = round(confidence);
            let sell = round(remainder * opposite_share);
            Probabilities { buy, sell, hold: 100.0 - buy - sell }
        }
        Direction::Sell => {
            let sell = round(confidence);
            let buy = round(remainder * opposite_share);
            Probabilities { buy, sell, hold: 100.0 - buy - sell }
        }
        Direction::Hold => {
            let hold = round(confidence);
            let buy = round((100.0 - hold) / 2.0);
            Probabilities { buy, sell: 100.0 - hold - buy, hold }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_classes() {
        assert_eq!(FeatureClass::of("rsi_14"), Some(FeatureClass::Rsi));
        assert_eq!(FeatureClass::of("volume_ratio_20"), Some(FeatureClass::Volume));
        assert_eq!(FeatureClass::of("trend_10"), Some(FeatureClass::Trend));
        assert_eq!(FeatureClass::of("ret_5"), Some(FeatureClass::Trend));
        assert_eq!(FeatureClass::of("bb_position_20"), None);
    }

    #[test]
    fn test_class_mean_ignores_nan() {
        let mut features = FeatureVector::new();
        features.insert("BTC/USDT", "ret_1", 0.01);
        features.insert("BTC/USDT", "ret_5", f64::NAN);
        features.insert("BTC/USDT", "trend_10", 0.03);
        features.insert("ETH/USDT", "trend_10", 9.0);

        let mean = class_mean(&features, "BTC/USDT", FeatureClass::Trend).unwrap();
        assert!((mean - 0.02).abs() < 1e-12);
        assert!(class_mean(&features, "BTC/USDT", FeatureClass::Rsi).is_none());
    }

    #[test]
    fn test_winner_needs_lead_and_minimum() {
        assert_eq!(VoteTally { buy: 3, sell: 1 }.winner(2), Direction::Buy);
        assert_eq!(VoteTally { buy: 1, sell: 0 }.winner(2), Direction::Hold);
        assert_eq!(VoteTally { buy: 2, sell: 2 }.winner(2), Direction::Hold);
        assert_eq!(VoteTally { buy: 0, sell: 4 }.winner(3), Direction::Sell);
    }

    #[test]
    fn test_reinforce_leader() {
        let mut tally = VoteTally { buy: 2, sell: 1 };
        tally.reinforce_leader();
        assert_eq!(tally, VoteTally { buy: 3, sell: 1 });

        let mut tied = VoteTally { buy: 1, sell: 1 };
        tied.reinforce_leader();
        assert_eq!(tied, VoteTally { buy: 1, sell: 1 });
    }

    #[test]
    fn test_probabilities_sum_to_100() {
        for direction in [Direction::Buy, Direction::Sell, Direction::Hold] {
            for confidence in [40.0, 47.3, 50.0, 66.0, 72.45, 85.0] {
                let p = probabilities_for(direction, confidence, 0.4);
                assert!((p.sum() - 100.0).abs() < 1e-9, "{:?} {} -> {:?}", direction, confidence, p);
            }
        }
    }

    #[test]
    fn test_winner_gets_confidence() {
        let p = probabilities_for(Direction::Sell, 66.0, 0.4);
        assert_eq!(p.sell, 66.0);
        assert!((p.buy - 13.6).abs() < 1e-9);
        assert!((p.hold - 20.4).abs() < 1e-9);
    }
}
