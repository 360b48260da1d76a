/// Bollinger Bands position
///
/// Bands are `SMA(period) ± k * stddev(period)` using the sample standard
/// deviation. The position of the last price inside the bands is
/// `(close - lower) / (upper - lower)`, clamped to [0, 1]:
/// - 0.0: at or below the lower band
/// - 0.5: on the moving average
/// - 1.0: at or above the upper band

use super::moving_average::{calculate_sma, calculate_std_dev};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

pub fn calculate_bollinger_bands(prices: &[f64], period: usize, k: f64) -> Option<BollingerBands> {
    let middle = calculate_sma(prices, period)?;
    let std_dev = calculate_std_dev(prices, period)?;

    Some(BollingerBands {
        upper: middle + k * std_dev,
        middle,
        lower: middle - k * std_dev,
    })
}

/// Position of the last price within the bands
///
/// Returns 0.5 when the bands coincide (zero variance).
pub fn calculate_bollinger_position(prices: &[f64], period: usize, k: f64) -> Option<f64> {
    let bands = calculate_bollinger_bands(prices, period, k)?;
    let close = *prices.last()?;

    if bands.upper == bands.lower {
        return Some(0.5);
    }

    let position = (close - bands.lower) / (bands.upper - bands.lower);
    Some(position.clamp(0.0, 1.0))
}
