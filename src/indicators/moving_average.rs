/// Calculate Simple Moving Average (SMA)
pub fn calculate_sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let sum: f64 = prices.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

/// Calculate Exponential Moving Average (EMA) over the whole series
///
/// Uses adjusted weights: the value at lag `i` is weighted `(1 - alpha)^i`
/// with `alpha = 2 / (span + 1)`, normalized by the sum of weights. This
/// keeps early values from being dominated by the first price.
pub fn calculate_ema(prices: &[f64], span: usize) -> Option<f64> {
    if span == 0 || prices.is_empty() {
        return None;
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let decay = 1.0 - alpha;

    let mut weight = 1.0;
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for price in prices.iter().rev() {
        weighted_sum += price * weight;
        weight_total += weight;
        weight *= decay;
    }

    Some(weighted_sum / weight_total)
}

/// Sample standard deviation (n - 1) of the last `period` values
pub fn calculate_std_dev(values: &[f64], period: usize) -> Option<f64> {
    if period < 2 || values.len() < period {
        return None;
    }

    let window = &values[values.len() - period..];
    let mean = window.iter().sum::<f64>() / period as f64;
    let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (period - 1) as f64;

    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma() {
        let prices = vec![100.0, 102.0, 104.0, 106.0, 108.0];
        let sma = calculate_sma(&prices, 5);
        assert_eq!(sma, Some(104.0));
    }

    #[test]
    fn test_sma_insufficient_data() {
        let prices = vec![100.0, 102.0];
        let sma = calculate_sma(&prices, 5);
        assert!(sma.is_none());
    }

    #[test]
    fn test_ema() {
        let prices = vec![100.0, 102.0, 104.0, 106.0, 108.0, 110.0];
        let ema = calculate_ema(&prices, 5);
        assert!(ema.is_some());
        // Recent prices weigh more than the plain average
        assert!(ema.unwrap() > 105.0);
        assert!(ema.unwrap() < 110.0);
    }

    #[test]
    fn test_ema_two_values() {
        // span 3 -> alpha 0.5: (2 * 1 + 1 * 0.5) / 1.5
        let ema = calculate_ema(&[1.0, 2.0], 3).unwrap();
        assert!((ema - 2.5 / 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_ema_constant_series() {
        let ema = calculate_ema(&[42.0; 30], 12).unwrap();
        assert!((ema - 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_std_dev() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let std = calculate_std_dev(&values, 8).unwrap();
        // Sample variance = 32 / 7
        assert!((std - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert!(calculate_std_dev(&values, 9).is_none());
    }
}
