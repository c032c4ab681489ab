use crate::config::BotConfig;
use crate::error::{BotError, Result};
use crate::indicators::{calculate_macd, calculate_rsi};
use crate::models::{Candle, IndicatorSnapshot};

/// Outcome of evaluating one symbol's candle history for an entry
#[derive(Debug, Clone)]
pub struct EntryEvaluation {
    pub entry_signal: bool,
    pub conditions: IndicatorSnapshot,
}

/// Evaluate the dip-reversal entry for a candle history
///
/// The signal wants a beaten-down symbol whose momentum just flipped:
/// RSI below the oversold threshold AND the MACD histogram crossing
/// from non-positive to positive on the latest candle. A histogram
/// that is already positive does not fire again; the cross itself is
/// the trigger.
///
/// Anything under two candles is unanswerable. Short histories beyond
/// that produce low-confidence readings rather than failures.
pub fn evaluate_entry(candles: &[Candle], config: &BotConfig) -> Result<EntryEvaluation> {
    if candles.len() < 2 {
        return Err(BotError::DataUnavailable(format!(
            "need at least 2 candles for an entry decision, got {}",
            candles.len()
        )));
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let price = closes[closes.len() - 1];

    let rsi = calculate_rsi(&closes, config.rsi_period).ok_or_else(|| {
        BotError::DataUnavailable("RSI unavailable for candle history".to_string())
    })?;

    let macd = calculate_macd(&closes, config.macd_fast, config.macd_slow, config.macd_signal);
    let histogram = macd.latest_histogram().ok_or_else(|| {
        BotError::DataUnavailable("MACD unavailable for candle history".to_string())
    })?;
    let prev_histogram = macd.previous_histogram().ok_or_else(|| {
        BotError::DataUnavailable("MACD history too short for crossover check".to_string())
    })?;

    let rsi_condition = rsi < config.rsi_oversold;
    let macd_condition = prev_histogram <= 0.0 && histogram > 0.0;
    let entry_signal = rsi_condition && macd_condition;

    tracing::debug!(
        "🔍 Indicators: price={:.4}, RSI={:.1} (<{}={}), hist={:.5} prev={:.5} (cross={})",
        price,
        rsi,
        config.rsi_oversold,
        rsi_condition,
        histogram,
        prev_histogram,
        macd_condition
    );

    Ok(EntryEvaluation {
        entry_signal,
        conditions: IndicatorSnapshot {
            price,
            rsi,
            macd_histogram: histogram,
            prev_histogram,
            rsi_condition,
            macd_condition,
        },
    })
}

/// Unrealized profit of a holding, as a percentage of the entry price
pub fn profit_pct(entry_price: f64, current_price: f64) -> f64 {
    (current_price / entry_price - 1.0) * 100.0
}

/// Whether an open position should be closed at this profit level
pub fn should_exit(profit_pct: f64, config: &BotConfig) -> bool {
    profit_pct >= config.take_profit_pct || profit_pct <= config.stop_loss_pct
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        let start = Utc::now() - Duration::minutes(5 * closes.len() as i64);
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                open_time: start + Duration::minutes(5 * i as i64),
                close_time: start + Duration::minutes(5 * (i + 1) as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    /// Steady slide from 100 to 73, then four gentle green candles.
    /// RSI sits near 7 and the histogram flips positive on the last close.
    fn dip_reversal_closes() -> Vec<f64> {
        let mut closes: Vec<f64> = (0..28).map(|i| 100.0 - i as f64).collect();
        closes.extend([73.2, 73.4, 73.6, 73.8]);
        closes
    }

    #[test]
    fn test_entry_fires_on_oversold_crossover() {
        let candles = candles_from_closes(&dip_reversal_closes());
        let eval = evaluate_entry(&candles, &BotConfig::default()).unwrap();

        assert!(eval.conditions.rsi < 40.0);
        assert!(eval.conditions.prev_histogram <= 0.0);
        assert!(eval.conditions.macd_histogram > 0.0);
        assert!(eval.entry_signal);
    }

    #[test]
    fn test_no_entry_without_crossover() {
        // Pure decline: deeply oversold but momentum never turns
        let closes: Vec<f64> = (0..31).map(|i| 100.0 - i as f64).collect();
        let candles = candles_from_closes(&closes);
        let eval = evaluate_entry(&candles, &BotConfig::default()).unwrap();

        assert!(eval.conditions.rsi_condition);
        assert!(!eval.conditions.macd_condition);
        assert!(!eval.entry_signal);
    }

    #[test]
    fn test_no_refire_after_histogram_turns_positive() {
        // Keep rallying past the crossover: still oversold, but the
        // histogram was already positive on the previous candle
        let mut closes = dip_reversal_closes();
        closes.extend((0..6).map(|i| 74.0 + 0.25 * i as f64));
        let candles = candles_from_closes(&closes);
        let eval = evaluate_entry(&candles, &BotConfig::default()).unwrap();

        assert!(eval.conditions.rsi_condition);
        assert!(eval.conditions.prev_histogram > 0.0);
        assert!(!eval.entry_signal);
    }

    #[test]
    fn test_high_rsi_blocks_crossover() {
        // Long climb, shallow three-candle dip, sharp bounce: the
        // histogram crosses positive but RSI is nowhere near oversold
        let mut closes: Vec<f64> = (0..30).map(|i| 100.0 + 0.5 * i as f64).collect();
        let top = closes[closes.len() - 1];
        closes.extend((1..=3).map(|i| top - i as f64));
        let bottom = closes[closes.len() - 1];
        closes.extend((1..=3).map(|i| bottom + 2.0 * i as f64));

        let candles = candles_from_closes(&closes);
        let eval = evaluate_entry(&candles, &BotConfig::default()).unwrap();

        assert!(eval.conditions.macd_condition);
        assert!(eval.conditions.rsi > 40.0);
        assert!(!eval.entry_signal);
    }

    #[test]
    fn test_insufficient_candles() {
        let candles = candles_from_closes(&[100.0]);
        let result = evaluate_entry(&candles, &BotConfig::default());
        assert!(matches!(result, Err(BotError::DataUnavailable(_))));
    }

    #[test]
    fn test_two_candles_still_answer() {
        let candles = candles_from_closes(&[100.0, 99.0]);
        let eval = evaluate_entry(&candles, &BotConfig::default()).unwrap();
        assert!(!eval.entry_signal);
        assert!(eval.conditions.rsi.is_finite());
    }

    #[test]
    fn test_profit_pct() {
        assert!((profit_pct(100.0, 102.0) - 2.0).abs() < 1e-9);
        assert!((profit_pct(100.0, 99.0) + 1.0).abs() < 1e-9);
        assert!(profit_pct(50.0, 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_exit_boundaries() {
        let config = BotConfig::default();

        // Take-profit is inclusive at exactly +2%
        assert!(should_exit(profit_pct(100.0, 102.0), &config));
        assert!(!should_exit(profit_pct(100.0, 101.99), &config));

        // Stop-loss is inclusive at exactly -1%
        assert!(should_exit(profit_pct(100.0, 99.0), &config));
        assert!(!should_exit(profit_pct(100.0, 99.01), &config));
    }

    #[test]
    fn test_exit_respects_custom_thresholds() {
        let config = BotConfig {
            take_profit_pct: 5.0,
            stop_loss_pct: -3.0,
            ..BotConfig::default()
        };

        assert!(!should_exit(2.0, &config));
        assert!(!should_exit(-1.0, &config));
        assert!(should_exit(5.0, &config));
        assert!(should_exit(-3.0, &config));
    }
}
