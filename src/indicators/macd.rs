/// Full MACD decomposition over a price series
///
/// `histogram[i] = macd[i] - signal[i]`; a sign flip from one slot to
/// the next is the momentum crossover the entry logic looks for.
#[derive(Debug, Clone)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl MacdSeries {
    pub fn latest_histogram(&self) -> Option<f64> {
        self.histogram.last().copied()
    }

    pub fn previous_histogram(&self) -> Option<f64> {
        let n = self.histogram.len();
        if n < 2 {
            return None;
        }
        Some(self.histogram[n - 2])
    }
}

/// Calculate MACD line, signal line and histogram for the whole series
///
/// All three EMAs are seeded with the first value they see, so the
/// output has one slot per input price and short histories still
/// produce a (low-confidence) reading.
pub fn calculate_macd(prices: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let fast_ema = ema_series(prices, fast);
    let slow_ema = ema_series(prices, slow);

    let macd: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(fast, slow)| fast - slow)
        .collect();

    let signal_line = ema_series(&macd, signal);
    let histogram = macd
        .iter()
        .zip(&signal_line)
        .map(|(macd, signal)| macd - signal)
        .collect();

    MacdSeries {
        macd,
        signal: signal_line,
        histogram,
    }
}

/// Exponential moving average over the full series, seeded with the first value
fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut series = Vec::with_capacity(values.len());
    let mut ema = 0.0;

    for (i, value) in values.iter().enumerate() {
        ema = if i == 0 {
            *value
        } else {
            (value - ema) * multiplier + ema
        };
        series.push(ema);
    }

    series
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macd_output_lengths_match_input() {
        let prices: Vec<f64> = (0..50).map(|i| 100.0 + i as f64 * 0.1).collect();
        let result = calculate_macd(&prices, 12, 26, 9);

        assert_eq!(result.macd.len(), 50);
        assert_eq!(result.signal.len(), 50);
        assert_eq!(result.histogram.len(), 50);
    }

    #[test]
    fn test_macd_flat_series_is_zero() {
        let prices = vec![100.0; 40];
        let result = calculate_macd(&prices, 12, 26, 9);

        for value in result.histogram {
            assert!(value.abs() < 1e-12);
        }
        for value in result.macd {
            assert!(value.abs() < 1e-12);
        }
    }

    #[test]
    fn test_macd_rising_series_turns_positive() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let result = calculate_macd(&prices, 12, 26, 9);

        // Fast EMA hugs the climb more tightly than the slow one
        assert!(result.macd.last().unwrap() > &0.0);
    }

    #[test]
    fn test_macd_single_bump_crosses_histogram() {
        // Flat forever, then one up-close: the histogram flips from
        // exactly zero to positive on the final slot.
        let mut prices = vec![100.0; 40];
        prices.push(101.0);
        let result = calculate_macd(&prices, 12, 26, 9);

        assert!(result.previous_histogram().unwrap().abs() < 1e-12);
        assert!(result.latest_histogram().unwrap() > 0.0);
    }

    #[test]
    fn test_macd_empty_input() {
        let result = calculate_macd(&[], 12, 26, 9);
        assert!(result.latest_histogram().is_none());
        assert!(result.previous_histogram().is_none());
    }

    #[test]
    fn test_macd_previous_needs_two_slots() {
        let result = calculate_macd(&[100.0], 12, 26, 9);
        assert!(result.latest_histogram().is_some());
        assert!(result.previous_histogram().is_none());
    }
}
