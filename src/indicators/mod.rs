// Technical indicators module
// Pure functions over price series and candles; None means "not enough data"

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod macd;
pub mod market_analysis;
pub mod moving_average;
pub mod oscillators;
pub mod rsi;

pub use adx::{calculate_adx, AdxReading};
pub use atr::{calculate_atr, calculate_atr_pct};
pub use bollinger::{calculate_bollinger_bands, calculate_bollinger_position, BollingerBands};
pub use macd::calculate_macd_pct;
pub use market_analysis::{
    calculate_average_volume, calculate_linear_trend, calculate_range_distances,
    calculate_return, calculate_volatility, calculate_volume_ratio,
};
pub use moving_average::{calculate_ema, calculate_sma, calculate_std_dev};
pub use oscillators::{calculate_stochastic_k, calculate_williams_r};
pub use rsi::calculate_rsi;
