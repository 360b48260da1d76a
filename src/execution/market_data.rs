use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, DurationRound, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::api::VenueClient;
use crate::error::ConnectivityError;
use crate::models::{Candle, DataSource, Timeframe};

/// Where candle windows come from
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Tag carried by every window built from this source
    fn source(&self) -> DataSource;

    async fn candles(
        &self,
        pair: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, ConnectivityError>;
}

/// Candles straight from the venue
pub struct LiveMarketData {
    venue: Arc<dyn VenueClient>,
}

impl LiveMarketData {
    pub fn new(venue: Arc<dyn VenueClient>) -> Self {
        Self { venue }
    }
}

#[async_trait]
impl MarketDataSource for LiveMarketData {
    fn source(&self) -> DataSource {
        DataSource::Live
    }

    async fn candles(
        &self,
        pair: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, ConnectivityError> {
        self.venue.fetch_candles(pair, timeframe, limit).await
    }
}

/// Random-walk candles used while the venue is unreachable
///
/// Each pair starts from a plausible base price. Every call advances an epoch
/// so consecutive windows differ, while the same (pair, epoch) is reproducible.
pub struct SimulatedMarketData {
    seed: u64,
    epoch: AtomicU64,
    base_volume: f64,
}

impl SimulatedMarketData {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            epoch: AtomicU64::new(0),
            base_volume: 1_000_000.0,
        }
    }

    /// Reference price for well-known bases, 1.0 otherwise
    pub fn base_price(pair: &str) -> f64 {
        let base = pair.split('/').next().unwrap_or(pair).to_uppercase();
        match base.as_str() {
            "BTC" => 50_000.0,
            "ETH" => 3_000.0,
            "SOL" => 150.0,
            "BNB" => 300.0,
            "XRP" => 0.5,
            "ADA" => 0.4,
            "MATIC" => 0.8,
            "DOGE" => 0.08,
            "SHIB" => 0.00001,
            _ => 1.0,
        }
    }

    /// Generate `limit` bars ending at the current bar of `timeframe`
    pub fn generate(&self, pair: &str, timeframe: Timeframe, limit: usize, epoch: u64) -> Vec<Candle> {
        let mut rng = StdRng::seed_from_u64(self.seed ^ pair_hash(pair) ^ epoch.rotate_left(32));
        let base_price = Self::base_price(pair);
        let step = timeframe.duration();

        let now = Utc::now();
        let last_open = now.duration_trunc(step).unwrap_or(now);
        let start = last_open - step * (limit.saturating_sub(1) as i32);

        let mut candles = Vec::with_capacity(limit);
        let mut price = base_price;
        for i in 0..limit {
            // Mean-reverting walk around the base price
            let reversion = (base_price - price) * 0.05;
            let noise = price * rng.gen_range(-0.005..0.005);
            price = (price + reversion + noise).max(base_price * 0.5);

            let timestamp = start + Duration::seconds(step.num_seconds() * i as i64);
            candles.push(self.create_candle(&mut rng, price, timestamp));
        }

        candles
    }

    fn create_candle(&self, rng: &mut StdRng, price: f64, timestamp: DateTime<Utc>) -> Candle {
        // ±0.2% intrabar movement
        let noise_pct = 0.002;

        let high = price * (1.0 + rng.gen_range(0.0..noise_pct));
        let low = price * (1.0 - rng.gen_range(0.0..noise_pct));
        let open = (price * (1.0 + rng.gen_range(-noise_pct..noise_pct))).clamp(low, high);
        let volume = self.base_volume * rng.gen_range(0.7..1.3);

        Candle {
            timestamp,
            open,
            high,
            low,
            close: price,
            volume,
        }
    }
}

impl Default for SimulatedMarketData {
    fn default() -> Self {
        Self::new(0x5EED)
    }
}

#[async_trait]
impl MarketDataSource for SimulatedMarketData {
    fn source(&self) -> DataSource {
        DataSource::Simulated
    }

    async fn candles(
        &self,
        pair: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, ConnectivityError> {
        let epoch = self.epoch.fetch_add(1, Ordering::Relaxed);
        Ok(self.generate(pair, timeframe, limit, epoch))
    }
}

// FNV-1a, stable across runs and platforms
fn pair_hash(pair: &str) -> u64 {
    pair.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x0000_0100_0000_01b3)
    })
}
