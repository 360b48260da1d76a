// Venue access
pub mod bybit;

use async_trait::async_trait;

use crate::error::{ConnectivityError, SubmitError};
use crate::models::{Candle, MarketRules, OrderRequest, Timeframe, VenueOrder};

pub use bybit::BybitClient;

/// Everything the bot needs from a trading venue
///
/// Each call either succeeds or reports a `ConnectivityError`; callers decide
/// what a failure means for the connection state. Implementations never retry.
#[async_trait]
pub trait VenueClient: Send + Sync {
    /// Most recent `limit` closed and open bars, oldest first
    async fn fetch_candles(
        &self,
        pair: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, ConnectivityError>;

    /// Last traded price
    async fn fetch_ticker(&self, pair: &str) -> Result<f64, ConnectivityError>;

    /// Free balance of the quote currency
    async fn fetch_balance(&self) -> Result<f64, ConnectivityError>;

    async fn fetch_market_rules(&self, pair: &str) -> Result<MarketRules, ConnectivityError>;

    async fn submit_market_order(&self, order: &OrderRequest) -> Result<VenueOrder, SubmitError>;

    /// Cheap reachability check
    async fn probe(&self) -> Result<(), ConnectivityError>;
}

/// Venue symbol for a `BASE/QUOTE` pair (e.g. `BTC/USDT` -> `BTCUSDT`)
pub fn venue_symbol(pair: &str) -> String {
    pair.chars().filter(|c| *c != '/').collect::<String>().to_uppercase()
}
