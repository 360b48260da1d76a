/// Calculate Relative Strength Index (RSI)
///
/// RSI measures the magnitude of recent price changes to evaluate
/// overbought or oversold conditions.
///
/// Values:
/// - RSI > 70: Overbought
/// - RSI < 30: Oversold
///
/// Average gain and average loss are taken over the last `period` price
/// changes. A window of exactly `period` prices has one change fewer; the
/// missing leading change counts as flat. When the average loss is zero the
/// result is 100 if anything was gained and 50 otherwise.
pub fn calculate_rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let start = (prices.len() - period).max(1);

    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;
    for i in start..prices.len() {
        let change = prices[i] - prices[i - 1];
        if change > 0.0 {
            gain_sum += change;
        } else {
            loss_sum += change.abs();
        }
    }

    let avg_gain = gain_sum / period as f64;
    let avg_loss = loss_sum / period as f64;

    if avg_loss == 0.0 {
        return Some(if avg_gain != 0.0 { 100.0 } else { 50.0 });
    }

    let rs = avg_gain / avg_loss;
    let rsi = 100.0 - (100.0 / (1.0 + rs));

    Some(rsi.clamp(0.0, 100.0))
}
