/// Price structure and volume analysis
///
/// Returns, realized volatility, least-squares trend, distance to the recent
/// range extremes and relative volume.

use super::moving_average::calculate_std_dev;
use crate::models::Candle;

/// Simple return over `horizon` bars: `close[t] / close[t - horizon] - 1`
pub fn calculate_return(prices: &[f64], horizon: usize) -> Option<f64> {
    if horizon == 0 || prices.len() < horizon + 1 {
        return None;
    }

    let last = prices[prices.len() - 1];
    let base = prices[prices.len() - 1 - horizon];
    if base == 0.0 {
        return None;
    }

    Some(last / base - 1.0)
}

/// Sample standard deviation of the last `window` simple returns
pub fn calculate_volatility(prices: &[f64], window: usize) -> Option<f64> {
    if window < 2 || prices.len() < window + 1 {
        return None;
    }

    let tail = &prices[prices.len() - window - 1..];
    let returns: Vec<f64> = tail.windows(2).map(|w| w[1] / w[0] - 1.0).collect();

    calculate_std_dev(&returns, window)
}

/// Least-squares slope of the last `period` prices, divided by the last price
///
/// Expressed as a fraction of price per bar.
pub fn calculate_linear_trend(prices: &[f64], period: usize) -> Option<f64> {
    if period < 2 || prices.len() < period {
        return None;
    }

    let window = &prices[prices.len() - period..];
    let n = period as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = window.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut variance_x = 0.0;
    for (i, y) in window.iter().enumerate() {
        let dx = i as f64 - mean_x;
        covariance += dx * (y - mean_y);
        variance_x += dx * dx;
    }

    let last = *window.last()?;
    if last == 0.0 {
        return None;
    }

    Some(covariance / variance_x / last)
}

/// Distance from the last close to the rolling high and rolling low
///
/// Returns `(resistance, support)` where
/// `resistance = (max(high) - close) / close` and
/// `support = (close - min(low)) / close` over the last `period` bars.
pub fn calculate_range_distances(candles: &[Candle], period: usize) -> Option<(f64, f64)> {
    if period == 0 || candles.len() < period {
        return None;
    }

    let window = &candles[candles.len() - period..];
    let close = window.last()?.close;
    if close == 0.0 {
        return None;
    }

    let highest = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let lowest = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);

    Some(((highest - close) / close, (close - lowest) / close))
}

/// Calculate average volume over a period
pub fn calculate_average_volume(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period {
        return None;
    }

    let start_idx = candles.len().saturating_sub(period);
    let recent_candles = &candles[start_idx..];

    let total_volume: f64 = recent_candles.iter().map(|c| c.volume).sum();
    Some(total_volume / period as f64)
}

/// Last volume over the rolling mean volume (mean includes the last bar)
///
/// A window with no traded volume at all reads as neutral 1.0.
pub fn calculate_volume_ratio(candles: &[Candle], period: usize) -> Option<f64> {
    let average = calculate_average_volume(candles, period)?;
    let current = candles.last()?.volume;

    if average == 0.0 {
        return Some(1.0);
    }

    Some(current / average)
}
