use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// OHLCV candlestick for one bar
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Where a candle window came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DataSource {
    Live,
    Simulated,
}

/// Candle interval
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[default]
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    pub fn minutes(&self) -> i64 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::H1 => 60,
            Timeframe::H4 => 240,
            Timeframe::D1 => 1440,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(self.minutes())
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        };
        f.write_str(label)
    }
}

/// Ordered, bounded candle history for one pair/timeframe
///
/// Candles are only ever appended; once `max_len` is reached the oldest bar is dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandleWindow {
    pub pair: String,
    pub timeframe: Timeframe,
    pub source: DataSource,
    max_len: usize,
    candles: Vec<Candle>,
}

impl CandleWindow {
    pub fn new(pair: impl Into<String>, timeframe: Timeframe, source: DataSource, max_len: usize) -> Self {
        Self {
            pair: pair.into(),
            timeframe,
            source,
            max_len: max_len.max(1),
            candles: Vec::new(),
        }
    }

    /// Build a window from one fetch, keeping only the newest `max_len` bars
    pub fn from_candles(
        pair: impl Into<String>,
        timeframe: Timeframe,
        source: DataSource,
        max_len: usize,
        candles: Vec<Candle>,
    ) -> Self {
        let mut window = Self::new(pair, timeframe, source, max_len);
        window.append(candles);
        window
    }

    /// Append bars in timestamp order
    ///
    /// Bars that are not strictly newer than the last stored bar are skipped.
    /// Returns the number of bars accepted.
    pub fn append(&mut self, candles: impl IntoIterator<Item = Candle>) -> usize {
        let mut accepted = 0;
        for candle in candles {
            if let Some(last) = self.candles.last() {
                if candle.timestamp <= last.timestamp {
                    continue;
                }
            }
            self.candles.push(candle);
            accepted += 1;
        }

        if self.candles.len() > self.max_len {
            let excess = self.candles.len() - self.max_len;
            self.candles.drain(..excess);
        }

        accepted
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn is_simulated(&self) -> bool {
        self.source == DataSource::Simulated
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }
}

/// Fused trade direction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Direction {
    Buy,
    Sell,
    Hold,
}

impl Direction {
    /// Order side for an actionable direction
    pub fn side(&self) -> Option<Side> {
        match self {
            Direction::Buy => Some(Side::Buy),
            Direction::Sell => Some(Side::Sell),
            Direction::Hold => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => f.write_str("BUY"),
            Direction::Sell => f.write_str("SELL"),
            Direction::Hold => f.write_str("HOLD"),
        }
    }
}

/// Order side
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("BUY"),
            Side::Sell => f.write_str("SELL"),
        }
    }
}

/// Probability triple in percent, always summing to 100
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Probabilities {
    pub buy: f64,
    pub sell: f64,
    pub hold: f64,
}

impl Probabilities {
    pub fn equal_split() -> Self {
        Self {
            buy: 33.3,
            sell: 33.3,
            hold: 33.4,
        }
    }

    pub fn sum(&self) -> f64 {
        self.buy + self.sell + self.hold
    }
}

/// Trade recommendation for one pair, produced once per cycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Signal {
    pub pair: String,
    pub direction: Direction,
    pub confidence: f64,
    pub probabilities: Probabilities,
    pub buy_votes: u32,
    pub sell_votes: u32,
    pub data_quality: f64,
    pub model: String,
    pub source: DataSource,
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    pub fn is_actionable(&self, min_confidence: f64) -> bool {
        self.direction != Direction::Hold && self.confidence >= min_confidence
    }
}

/// Venue lot-size rules for one pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketRules {
    pub pair: String,
    /// Smallest quantity increment (e.g. 0.0001)
    pub qty_step: Decimal,
    pub min_qty: Decimal,
}

/// Market order as sent to the venue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderRequest {
    pub pair: String,
    pub side: Side,
    pub quantity: Decimal,
    pub client_order_id: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderStatus {
    Accepted,
    Filled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Accepted => f.write_str("accepted"),
            OrderStatus::Filled => f.write_str("filled"),
        }
    }
}

/// Venue acknowledgement of a submitted order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VenueOrder {
    pub order_id: String,
    pub status: OrderStatus,
    /// Average fill price, when the venue reports one
    pub fill_price: Option<f64>,
}

/// Normalized record of a successfully submitted order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderReceipt {
    pub id: String,
    pub client_order_id: String,
    pub pair: String,
    pub side: Side,
    pub price: f64,
    pub quantity: Decimal,
    pub cost: f64,
    pub timestamp: DateTime<Utc>,
    pub status: OrderStatus,
}
