/// Substituted for a zero average loss so flat or all-gain windows divide cleanly
const ZERO_LOSS_EPSILON: f64 = 0.001;

/// Calculate the latest Relative Strength Index (RSI) reading
///
/// RSI measures the magnitude of recent price changes to evaluate
/// overbought or oversold conditions. The averages are simple rolling
/// means over the most recent `period` price changes.
///
/// Returns `None` below two closes. With fewer changes than `period`
/// the window shrinks to whatever history exists; the reading is
/// low-confidence but never a failure.
pub fn calculate_rsi(prices: &[f64], period: usize) -> Option<f64> {
    if prices.len() < 2 || period == 0 {
        return None;
    }

    let mut gains = Vec::new();
    let mut losses = Vec::new();

    // Calculate price changes
    for i in 1..prices.len() {
        let change = prices[i] - prices[i - 1];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(change.abs());
        }
    }

    let window = period.min(gains.len());
    let avg_gain: f64 = gains.iter().rev().take(window).sum::<f64>() / window as f64;
    let mut avg_loss: f64 = losses.iter().rev().take(window).sum::<f64>() / window as f64;

    if avg_loss == 0.0 {
        avg_loss = ZERO_LOSS_EPSILON;
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - (100.0 / (1.0 + rs)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_calculation() {
        // Test with known values
        let prices = vec![
            44.0, 44.25, 44.5, 43.75, 44.0, 44.5, 45.0, 45.5, 45.25, 45.5,
            46.0, 46.5, 46.25, 46.0, 46.5,
        ];

        let rsi = calculate_rsi(&prices, 14);
        assert!(rsi.is_some());

        let rsi_value = rsi.unwrap();
        assert!(rsi_value > 0.0 && rsi_value < 100.0);
    }

    #[test]
    fn test_rsi_all_gains_stays_below_ceiling() {
        let prices = vec![100.0, 101.0, 102.0, 103.0, 104.0, 105.0];
        let rsi = calculate_rsi(&prices, 5).unwrap();

        // avg_gain 1.0 against the epsilon loss: high but finite
        assert!(rsi.is_finite());
        assert!(rsi > 99.0);
        assert!(rsi < 100.0);
    }

    #[test]
    fn test_rsi_all_losses() {
        let prices = vec![105.0, 104.0, 103.0, 102.0, 101.0, 100.0];
        let rsi = calculate_rsi(&prices, 5).unwrap();
        assert!(rsi.abs() < 1e-9);
    }

    #[test]
    fn test_rsi_flat_series() {
        let prices = vec![50.0; 20];
        let rsi = calculate_rsi(&prices, 14).unwrap();
        assert!(rsi.abs() < 1e-9);
    }

    #[test]
    fn test_rsi_short_history_shrinks_window() {
        // Three closes against a 14 period still answers
        let prices = vec![100.0, 99.0, 99.5];
        let rsi = calculate_rsi(&prices, 14);
        assert!(rsi.is_some());

        let rsi_value = rsi.unwrap();
        assert!(rsi_value > 0.0 && rsi_value < 100.0);
    }

    #[test]
    fn test_rsi_insufficient_data() {
        assert!(calculate_rsi(&[100.0], 14).is_none());
        assert!(calculate_rsi(&[], 14).is_none());
    }
}
