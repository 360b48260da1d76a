/// Range oscillators: Stochastic %K and Williams %R
///
/// Both compare the last close to the highest high / lowest low of the last
/// `period` bars. When that range is zero they return their midpoint
/// (%K = 50, %R = -50).

use crate::models::Candle;

fn range_extremes(candles: &[Candle], period: usize) -> Option<(f64, f64, f64)> {
    if period == 0 || candles.len() < period {
        return None;
    }

    let window = &candles[candles.len() - period..];
    let highest = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let lowest = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
    let close = window.last()?.close;

    Some((highest, lowest, close))
}

/// Stochastic %K in [0, 100]
pub fn calculate_stochastic_k(candles: &[Candle], period: usize) -> Option<f64> {
    let (highest, lowest, close) = range_extremes(candles, period)?;
    let range = highest - lowest;
    if range == 0.0 {
        return Some(50.0);
    }

    Some(((close - lowest) / range * 100.0).clamp(0.0, 100.0))
}

/// Williams %R in [-100, 0]
pub fn calculate_williams_r(candles: &[Candle], period: usize) -> Option<f64> {
    let (highest, lowest, close) = range_extremes(candles, period)?;
    let range = highest - lowest;
    if range == 0.0 {
        return Some(-50.0);
    }

    Some(((highest - close) / range * -100.0).clamp(-100.0, 0.0))
}
