/// MACD proxy: `(EMA_fast - EMA_slow) / close * 100`
///
/// Positive values mean short-term momentum is above the longer trend.

use super::moving_average::calculate_ema;

pub fn calculate_macd_pct(prices: &[f64], fast: usize, slow: usize) -> Option<f64> {
    if fast == 0 || slow <= fast || prices.len() < slow {
        return None;
    }

    let ema_fast = calculate_ema(prices, fast)?;
    let ema_slow = calculate_ema(prices, slow)?;
    let close = *prices.last()?;
    if close == 0.0 {
        return None;
    }

    Some((ema_fast - ema_slow) / close * 100.0)
}
