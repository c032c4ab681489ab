use std::collections::VecDeque;

use crate::models::{EntryConditionSample, PerformanceStats, TradeRecord};

/// Completed trades plus a bounded ring of entry-condition diagnostics
///
/// Counters update in the same step as the trade is stored, so a
/// reader never sees a trade without its stats. The sample ring evicts
/// oldest-first and never grows past its capacity; samples are for
/// inspection only and feed nothing back into trading decisions.
pub struct PerformanceTracker {
    history: Vec<TradeRecord>,
    winning_trades: usize,
    losing_trades: usize,
    total_profit_pct: f64,
    samples: VecDeque<EntryConditionSample>,
    sample_capacity: usize,
}

impl PerformanceTracker {
    pub fn new(sample_capacity: usize) -> Self {
        Self {
            history: Vec::new(),
            winning_trades: 0,
            losing_trades: 0,
            total_profit_pct: 0.0,
            samples: VecDeque::with_capacity(sample_capacity),
            sample_capacity,
        }
    }

    /// Record a settled trade. Break-even counts as a loss.
    pub fn record_trade(&mut self, trade: TradeRecord) {
        if trade.profit_pct > 0.0 {
            self.winning_trades += 1;
        } else {
            self.losing_trades += 1;
        }
        self.total_profit_pct += trade.profit_pct;
        self.history.push(trade);
    }

    /// Push one evaluation snapshot, evicting the oldest when full
    pub fn record_sample(&mut self, sample: EntryConditionSample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.sample_capacity {
            self.samples.pop_front();
        }
    }

    pub fn stats(&self) -> PerformanceStats {
        let total_trades = self.history.len();
        let win_rate = if total_trades == 0 {
            0.0
        } else {
            self.winning_trades as f64 / total_trades as f64 * 100.0
        };
        let average_profit_pct = self.total_profit_pct / total_trades.max(1) as f64;

        PerformanceStats {
            total_trades,
            winning_trades: self.winning_trades,
            losing_trades: self.losing_trades,
            win_rate,
            total_profit_pct: self.total_profit_pct,
            average_profit_pct,
        }
    }

    pub fn history(&self) -> &[TradeRecord] {
        &self.history
    }

    /// Diagnostics ring contents, oldest first
    pub fn samples(&self) -> Vec<EntryConditionSample> {
        self.samples.iter().cloned().collect()
    }
}
