/// Average True Range (ATR) indicator
///
/// Measures market volatility by averaging true ranges over a period.
/// True Range is the greatest of:
/// - Current High - Current Low
/// - Abs(Current High - Previous Close)
/// - Abs(Current Low - Previous Close)

use crate::models::Candle;

/// True range of each bar that has a predecessor (first bar is skipped)
pub fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    candles
        .windows(2)
        .map(|pair| {
            let high = pair[1].high;
            let low = pair[1].low;
            let prev_close = pair[0].close;

            (high - low)
                .max((high - prev_close).abs())
                .max((low - prev_close).abs())
        })
        .collect()
}

/// Simple mean of the last `period` true ranges
///
/// Returns None if fewer than `period + 1` candles are available.
pub fn calculate_atr(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }

    let ranges = true_ranges(candles);
    let sum: f64 = ranges.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

/// ATR expressed as a percentage of the last close
pub fn calculate_atr_pct(candles: &[Candle], period: usize) -> Option<f64> {
    let atr = calculate_atr(candles, period)?;
    let last_close = candles.last()?.close;
    if last_close <= 0.0 {
        return None;
    }
    Some(atr / last_close * 100.0)
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
    fn test_true_range_uses_previous_close() {
        let candles = vec![
            create_candle(101.0, 99.0, 100.0),
            // Gap up: high - prev_close dominates
            create_candle(110.0, 108.0, 109.0),
        ];

        assert_eq!(true_ranges(&candles), vec![10.0]);
    }

    #[test]
    fn test_atr_simple_mean() {
        let candles = vec![
            create_candle(101.0, 99.0, 100.0),
            create_candle(102.0, 100.0, 101.0), // TR = 2
            create_candle(105.0, 101.0, 104.0), // TR = 4
            create_candle(104.0, 103.0, 103.0), // TR = 1
        ];

        // Last two true ranges: (4 + 1) / 2
        assert_eq!(calculate_atr(&candles, 2), Some(2.5));
    }

    #[test]
    fn test_atr_pct() {
        let candles = vec![
            create_candle(101.0, 99.0, 100.0),
            create_candle(101.0, 99.0, 100.0),
            create_candle(101.0, 99.0, 100.0),
        ];

        let pct = calculate_atr_pct(&candles, 2).unwrap();
        assert!((pct - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_atr_insufficient_data() {
        let candles = vec![create_candle(101.0, 99.0, 100.0); 14];
        assert!(calculate_atr(&candles, 14).is_none());
        assert!(calculate_atr_pct(&candles, 14).is_none());
    }
}
