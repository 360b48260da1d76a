/// Average Directional Index (ADX) - Measures trend strength
///
/// ADX ranges from 0 to 100:
/// - ADX > 25: Strong trend (bull or bear)
/// - ADX 20-25: Moderate trend
/// - ADX < 20: Weak trend / choppy / ranging market

use crate::models::Candle;

/// ADX together with the directional indicators
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdxReading {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

/// Calculate ADX, +DI and -DI
///
/// +DI/-DI use Wilder-smoothed true range and directional movement. ADX is
/// the Wilder-smoothed DX series, which needs `2 * period` bars of movement;
/// with fewer bars (but at least `period`) the latest DX is returned instead.
pub fn calculate_adx(candles: &[Candle], period: usize) -> Option<AdxReading> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }

    let mut true_ranges = Vec::with_capacity(candles.len() - 1);
    let mut plus_dms = Vec::with_capacity(candles.len() - 1);
    let mut minus_dms = Vec::with_capacity(candles.len() - 1);

    for pair in candles.windows(2) {
        let (prev, bar) = (&pair[0], &pair[1]);

        let tr = (bar.high - bar.low)
            .max((bar.high - prev.close).abs())
            .max((bar.low - prev.close).abs());
        true_ranges.push(tr);

        let up_move = bar.high - prev.high;
        let down_move = prev.low - bar.low;

        plus_dms.push(if up_move > down_move && up_move > 0.0 { up_move } else { 0.0 });
        minus_dms.push(if down_move > up_move && down_move > 0.0 { down_move } else { 0.0 });
    }

    let smoothed_tr = wilder_series(&true_ranges, period);
    let smoothed_plus = wilder_series(&plus_dms, period);
    let smoothed_minus = wilder_series(&minus_dms, period);

    let mut dx_series = Vec::with_capacity(smoothed_tr.len());
    let mut last_di = (0.0, 0.0);
    for ((tr, plus), minus) in smoothed_tr.iter().zip(&smoothed_plus).zip(&smoothed_minus) {
        let (plus_di, minus_di) = if *tr > 0.0 {
            (plus / tr * 100.0, minus / tr * 100.0)
        } else {
            (0.0, 0.0)
        };

        let di_sum = plus_di + minus_di;
        let dx = if di_sum > 0.0 {
            (plus_di - minus_di).abs() / di_sum * 100.0
        } else {
            0.0
        };

        dx_series.push(dx);
        last_di = (plus_di, minus_di);
    }

    let adx = match wilder_series(&dx_series, period).last() {
        Some(adx) => *adx,
        None => *dx_series.last()?,
    };

    Some(AdxReading {
        adx: adx.clamp(0.0, 100.0),
        plus_di: last_di.0,
        minus_di: last_di.1,
    })
}

/// Wilder's smoothing, one value per input from index `period - 1` onwards
fn wilder_series(values: &[f64], period: usize) -> Vec<f64> {
    if values.len() < period {
        return Vec::new();
    }

    // First smoothed value is simple average of first 'period' values
    let mut smoothed = values[..period].iter().sum::<f64>() / period as f64;
    let mut series = Vec::with_capacity(values.len() - period + 1);
    series.push(smoothed);

    for value in &values[period..] {
        smoothed = (smoothed * (period as f64 - 1.0) + value) / period as f64;
        series.push(smoothed);
    }

    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn create_candle(high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp: Utc::now(),
            open: close,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn test_adx_strong_uptrend() {
        let candles: Vec<Candle> = (0..40)
            .map(|i| {
                let base = 100.0 + i as f64 * 2.0;
                create_candle(base + 1.0, base - 1.0, base + 0.5)
            })
            .collect();

        let reading = calculate_adx(&candles, 14).unwrap();
        assert!(reading.plus_di > reading.minus_di);
        assert!(reading.adx > 25.0, "ADX should signal a strong trend: {}", reading.adx);
    }

    #[test]
    fn test_adx_flat_market() {
        let candles = vec![create_candle(101.0, 99.0, 100.0); 40];

        let reading = calculate_adx(&candles, 14).unwrap();
        assert_eq!(reading.adx, 0.0);
        assert_eq!(reading.plus_di, 0.0);
        assert_eq!(reading.minus_di, 0.0);
    }

    #[test]
    fn test_adx_insufficient_data() {
        let candles = vec![create_candle(101.0, 99.0, 100.0); 10];
        assert!(calculate_adx(&candles, 14).is_none());
    }

    #[test]
    fn test_adx_short_history_falls_back_to_dx() {
        // period + 1 candles: one smoothed value, no smoothed DX yet
        let candles: Vec<Candle> = (0..15)
            .map(|i| {
                let base = 100.0 + i as f64;
                create_candle(base + 1.0, base - 1.0, base)
            })
            .collect();

        let reading = calculate_adx(&candles, 14).unwrap();
        assert!(reading.adx >= 0.0 && reading.adx <= 100.0);
    }
}
