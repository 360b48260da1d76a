// Signal fusion: feature vector (+ market mood) -> Signal
pub mod fusion;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::features::FeatureVector;
use crate::models::{DataSource, Direction, Probabilities, Signal};
use fusion::{class_mean, mean_where, probabilities_for, FeatureClass, VoteTally};

pub use fusion::{FeatureVoteConfig, FusionConfig, FALLBACK_CONFIDENCE};

/// Available decision models
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Model {
    /// Votes from class means (RSI, trend, volume) plus market mood
    #[default]
    ClassVote,
    /// Votes from individual features (RSI, price vs SMA, trend, support/resistance)
    FeatureVote,
}

impl Model {
    pub fn name(&self) -> &'static str {
        match self {
            Model::ClassVote => "class_vote",
            Model::FeatureVote => "feature_vote",
        }
    }

    /// Produce exactly one signal for `pair`
    ///
    /// `mood` is only passed when it came from a live sentiment source.
    pub fn predict(
        &self,
        config: &FusionConfig,
        pair: &str,
        features: &FeatureVector,
        mood: Option<f64>,
        source: DataSource,
    ) -> Signal {
        let tally = match self {
            Model::ClassVote => class_vote(config, pair, features, mood),
            Model::FeatureVote => feature_vote(&config.feature_vote, pair, features),
        };
        let data_quality = features.data_quality(pair);

        let mut signal = Signal {
            pair: pair.to_string(),
            direction: Direction::Hold,
            confidence: FALLBACK_CONFIDENCE,
            probabilities: Probabilities::equal_split(),
            buy_votes: tally.buy,
            sell_votes: tally.sell,
            data_quality,
            model: self.name().to_string(),
            source,
            timestamp: Utc::now(),
        };

        if tally.total() == 0 {
            return signal;
        }

        let direction = tally.winner(self.min_votes(config));
        let raw = match direction {
            Direction::Hold => config.base_confidence,
            _ => self.directional_confidence(config, tally),
        };
        let confidence = (raw * data_quality).clamp(config.confidence_floor, config.confidence_ceiling);

        signal.direction = direction;
        signal.confidence = confidence;
        signal.probabilities = probabilities_for(direction, confidence, config.opposite_share);
        signal
    }

    fn min_votes(&self, config: &FusionConfig) -> u32 {
        match self {
            Model::ClassVote => config.min_votes,
            Model::FeatureVote => config.feature_vote.min_votes,
        }
    }

    fn directional_confidence(&self, config: &FusionConfig, tally: VoteTally) -> f64 {
        match self {
            Model::ClassVote => {
                let margin = tally.buy.abs_diff(tally.sell) as f64;
                config.base_confidence + margin * config.confidence_per_vote
            }
            Model::FeatureVote => {
                let fv = &config.feature_vote;
                let votes = tally.buy.max(tally.sell) as f64;
                (fv.base_confidence + votes * fv.confidence_per_vote).min(fv.confidence_cap)
            }
        }
    }
}

fn class_vote(config: &FusionConfig, pair: &str, features: &FeatureVector, mood: Option<f64>) -> VoteTally {
    let mut tally = VoteTally::default();

    if let Some(rsi) = class_mean(features, pair, FeatureClass::Rsi) {
        if rsi < config.rsi_oversold {
            tally.buy += 2;
        } else if rsi > config.rsi_overbought {
            tally.sell += 2;
        } else if rsi > config.rsi_oversold && rsi <= config.rsi_buy_bias {
            // (oversold, buy_bias]
            tally.buy += 1;
        } else if rsi >= config.rsi_sell_bias && rsi < config.rsi_overbought {
            // [sell_bias, overbought)
            tally.sell += 1;
        }
    }

    if let Some(trend) = class_mean(features, pair, FeatureClass::Trend) {
        let trend_pct = trend * 100.0;
        if trend_pct > config.trend_strong_pct {
            tally.buy += 2;
        } else if trend_pct > config.trend_weak_pct {
            tally.buy += 1;
        } else if trend_pct < -config.trend_strong_pct {
            tally.sell += 2;
        } else if trend_pct < -config.trend_weak_pct {
            tally.sell += 1;
        }
    }

    if let Some(mood) = mood {
        if mood > config.mood_threshold {
            tally.buy += 1;
        } else if mood < -config.mood_threshold {
            tally.sell += 1;
        }
    }

    // Volume never starts a direction, it only confirms one
    if let Some(volume) = class_mean(features, pair, FeatureClass::Volume) {
        if volume > config.volume_surge {
            tally.reinforce_leader();
        }
    }

    tally
}

fn feature_vote(config: &FeatureVoteConfig, pair: &str, features: &FeatureVector) -> VoteTally {
    let mut tally = VoteTally::default();

    for (name, value) in features.for_pair(pair) {
        if !value.is_finite() {
            continue;
        }

        if name.contains("rsi") {
            if value < config.rsi_strong_buy {
                tally.buy += 2;
            } else if value < config.rsi_buy {
                tally.buy += 1;
            } else if value > config.rsi_strong_sell {
                tally.sell += 2;
            } else if value > config.rsi_sell {
                tally.sell += 1;
            }
        } else if name.starts_with("price_vs_sma") {
            if value < -config.sma_deviation {
                tally.buy += 1;
            } else if value > config.sma_deviation {
                tally.sell += 1;
            }
        } else if name.starts_with("trend") {
            if value > config.trend_slope {
                tally.buy += 1;
            } else if value < -config.trend_slope {
                tally.sell += 1;
            }
        } else if name.starts_with("dist_sup") && value < config.range_proximity {
            tally.buy += 1;
        } else if name.starts_with("dist_res") && value < config.range_proximity {
            tally.sell += 1;
        }
    }

    debug!(
        pair = %pair,
        buy = tally.buy,
        sell = tally.sell,
        mean_rsi = ?mean_where(features, pair, |n| n.contains("rsi")),
        "Feature votes"
    );
    tally
}

/// Strategy section of the configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StrategyConfig {
    pub model: Model,
    pub fusion: FusionConfig,
}

/// Fuses features into signals with one configured model
#[derive(Debug, Clone, Default)]
pub struct SignalFusionEngine {
    model: Model,
    config: FusionConfig,
}

impl SignalFusionEngine {
    pub fn new(config: StrategyConfig) -> Self {
        Self {
            model: config.model,
            config: config.fusion,
        }
    }

    pub fn fuse(&self, pair: &str, features: &FeatureVector, mood: Option<f64>, source: DataSource) -> Signal {
        self.model.predict(&self.config, pair, features, mood, source)
    }
}
