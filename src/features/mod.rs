// Feature extraction: candle window -> named scalar indicators per pair

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::BotError;
use crate::indicators::{
    calculate_adx, calculate_atr_pct, calculate_bollinger_position, calculate_linear_trend,
    calculate_macd_pct, calculate_range_distances, calculate_return, calculate_rsi,
    calculate_sma, calculate_stochastic_k, calculate_volatility, calculate_volume_ratio,
    calculate_williams_r,
};
use crate::models::CandleWindow;

// Neutral values used when the window is too short for an indicator
pub const NEUTRAL_RSI: f64 = 50.0;
pub const NEUTRAL_BB_POSITION: f64 = 0.5;
pub const NEUTRAL_ADX: f64 = 25.0;
pub const NEUTRAL_MACD: f64 = 0.0;
pub const NEUTRAL_ATR_PCT: f64 = 0.0;
pub const NEUTRAL_TREND: f64 = 0.0;

/// Indicator periods used by the extractor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeatureConfig {
    pub return_horizons: Vec<usize>,
    pub volatility_windows: Vec<usize>,
    pub rsi_period: usize,
    pub atr_period: usize,
    pub adx_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub bollinger_period: usize,
    pub bollinger_k: f64,
    pub stochastic_period: usize,
    pub volume_period: usize,
    pub trend_period: usize,
    pub range_period: usize,
    pub sma_periods: Vec<usize>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            return_horizons: vec![1, 5, 10, 15],
            volatility_windows: vec![5, 10, 15],
            rsi_period: 14,
            atr_period: 14,
            adx_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            bollinger_period: 20,
            bollinger_k: 2.0,
            stochastic_period: 14,
            volume_period: 20,
            trend_period: 10,
            range_period: 10,
            sma_periods: vec![10, 20],
        }
    }
}

impl FeatureConfig {
    /// Bars needed for every indicator to be computed from real data
    pub fn longest_lookback(&self) -> usize {
        let horizons = self.return_horizons.iter().map(|h| h + 1);
        let vol_windows = self.volatility_windows.iter().map(|w| w + 1);
        let smas = self.sma_periods.iter().copied();

        [
            self.rsi_period,
            self.atr_period + 1,
            2 * self.adx_period + 1,
            self.macd_slow,
            self.bollinger_period,
            self.stochastic_period,
            self.volume_period,
            self.trend_period,
            self.range_period,
        ]
        .into_iter()
        .chain(horizons)
        .chain(vol_windows)
        .chain(smas)
        .max()
        .unwrap_or(0)
    }
}

/// Indicator values keyed by `{pair}_{indicator}`
///
/// Entries may be `NaN` when an indicator had too little history; those
/// entries count towards the total but not towards the valid features.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    values: BTreeMap<String, f64>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(pair: &str, name: &str) -> String {
        format!("{}_{}", pair, name)
    }

    pub fn insert(&mut self, pair: &str, name: &str, value: f64) {
        self.values.insert(Self::key(pair, name), value);
    }

    pub fn get(&self, pair: &str, name: &str) -> Option<f64> {
        self.values.get(&Self::key(pair, name)).copied()
    }

    /// Indicators for one pair, with the pair prefix stripped from the names
    pub fn for_pair<'a>(&'a self, pair: &str) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        let prefix = format!("{}_", pair);
        self.values
            .iter()
            .filter_map(move |(key, value)| key.strip_prefix(prefix.as_str()).map(|name| (name, *value)))
    }

    pub fn total_count(&self, pair: &str) -> usize {
        self.for_pair(pair).count()
    }

    pub fn valid_count(&self, pair: &str) -> usize {
        self.for_pair(pair).filter(|(_, v)| v.is_finite()).count()
    }

    /// `valid_features / total_features` for one pair, 0 when nothing was extracted
    pub fn data_quality(&self, pair: &str) -> f64 {
        let total = self.total_count(pair);
        if total == 0 {
            return 0.0;
        }
        self.valid_count(pair) as f64 / total as f64
    }

    pub fn merge(&mut self, other: FeatureVector) {
        self.values.extend(other.values);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Converts candle windows into feature vectors
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: FeatureConfig,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Extract every indicator for one window
    ///
    /// Never fails: an unusable window yields an empty vector, which fusion
    /// turns into a HOLD.
    pub fn extract(&self, window: &CandleWindow) -> FeatureVector {
        match self.try_extract(window) {
            Ok(features) => {
                debug!(
                    pair = %window.pair,
                    bars = window.len(),
                    valid = features.valid_count(&window.pair),
                    total = features.total_count(&window.pair),
                    "Extracted features"
                );
                features
            }
            Err(e) => {
                warn!(pair = %window.pair, error = %e, "Feature extraction skipped");
                FeatureVector::new()
            }
        }
    }

    /// Extract several windows into one vector; one bad window does not affect the others
    pub fn extract_batch<'a>(&self, windows: impl IntoIterator<Item = &'a CandleWindow>) -> FeatureVector {
        let mut features = FeatureVector::new();
        for window in windows {
            features.merge(self.extract(window));
        }
        features
    }

    fn try_extract(&self, window: &CandleWindow) -> Result<FeatureVector, BotError> {
        let pair = window.pair.as_str();
        let unavailable = |reason: &str| BotError::DataUnavailable {
            pair: pair.to_string(),
            reason: reason.to_string(),
        };

        if window.len() < 2 {
            return Err(unavailable("fewer than 2 bars"));
        }

        let closes = window.closes();
        if closes.iter().any(|c| !c.is_finite() || *c <= 0.0) {
            return Err(unavailable("non-positive or non-finite close"));
        }

        let candles = window.candles();
        let cfg = &self.config;
        let mut features = FeatureVector::new();
        let mut put = |name: String, value: Option<f64>, neutral: f64| {
            features.insert(pair, &name, value.unwrap_or(neutral));
        };

        for &horizon in &cfg.return_horizons {
            put(format!("ret_{}", horizon), calculate_return(&closes, horizon), f64::NAN);
        }
        for &w in &cfg.volatility_windows {
            put(format!("vol_{}", w), calculate_volatility(&closes, w), f64::NAN);
        }

        put(format!("rsi_{}", cfg.rsi_period), calculate_rsi(&closes, cfg.rsi_period), NEUTRAL_RSI);
        put(
            format!("atr_pct_{}", cfg.atr_period),
            calculate_atr_pct(candles, cfg.atr_period),
            NEUTRAL_ATR_PCT,
        );
        put(
            format!("adx_{}", cfg.adx_period),
            calculate_adx(candles, cfg.adx_period).map(|r| r.adx),
            NEUTRAL_ADX,
        );
        put(
            "macd".to_string(),
            calculate_macd_pct(&closes, cfg.macd_fast, cfg.macd_slow),
            NEUTRAL_MACD,
        );
        put(
            format!("bb_position_{}", cfg.bollinger_period),
            calculate_bollinger_position(&closes, cfg.bollinger_period, cfg.bollinger_k),
            NEUTRAL_BB_POSITION,
        );
        put(
            format!("stoch_k_{}", cfg.stochastic_period),
            calculate_stochastic_k(candles, cfg.stochastic_period),
            f64::NAN,
        );
        put(
            format!("williams_r_{}", cfg.stochastic_period),
            calculate_williams_r(candles, cfg.stochastic_period),
            f64::NAN,
        );
        put(
            format!("volume_ratio_{}", cfg.volume_period),
            calculate_volume_ratio(candles, cfg.volume_period),
            f64::NAN,
        );
        put(
            format!("trend_{}", cfg.trend_period),
            calculate_linear_trend(&closes, cfg.trend_period),
            NEUTRAL_TREND,
        );

        let (resistance, support) = match calculate_range_distances(candles, cfg.range_period) {
            Some((r, s)) => (Some(r), Some(s)),
            None => (None, None),
        };
        put(format!("dist_res_{}", cfg.range_period), resistance, f64::NAN);
        put(format!("dist_sup_{}", cfg.range_period), support, f64::NAN);

        let last_close = closes[closes.len() - 1];
        for &period in &cfg.sma_periods {
            let vs_sma = calculate_sma(&closes, period).map(|sma| last_close / sma - 1.0);
            put(format!("price_vs_sma_{}", period), vs_sma, f64::NAN);
        }

        Ok(features)
    }
}
