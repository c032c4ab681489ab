use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{BotError, Result};
use crate::models::{Position, TradeRecord};
use crate::strategy::signals;

/// Open positions keyed by symbol
///
/// One position per symbol, and at most `max_positions` in total.
/// Closing removes the position and hands back the completed trade;
/// the book itself keeps no history.
pub struct PositionBook {
    positions: HashMap<String, Position>,
    max_positions: usize,
}

impl PositionBook {
    pub fn new(max_positions: usize) -> Self {
        Self {
            positions: HashMap::new(),
            max_positions,
        }
    }

    /// Open a position, enforcing the per-symbol and total caps
    pub fn open(
        &mut self,
        symbol: &str,
        entry_price: f64,
        quantity: f64,
        entry_time: DateTime<Utc>,
    ) -> Result<Position> {
        if self.positions.contains_key(symbol) {
            return Err(BotError::AlreadyOpen(symbol.to_string()));
        }
        if self.positions.len() >= self.max_positions {
            return Err(BotError::CapacityExceeded(self.positions.len()));
        }

        let position = Position {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            entry_price,
            quantity,
            entry_time,
        };
        self.positions.insert(symbol.to_string(), position.clone());
        Ok(position)
    }

    /// Close the position for a symbol and settle it into a trade record
    pub fn close(
        &mut self,
        symbol: &str,
        exit_price: f64,
        exit_time: DateTime<Utc>,
    ) -> Result<TradeRecord> {
        let position = self
            .positions
            .remove(symbol)
            .ok_or_else(|| BotError::NotFound(symbol.to_string()))?;

        let profit_pct = signals::profit_pct(position.entry_price, exit_price);
        let profit_amount = (exit_price - position.entry_price) * position.quantity;

        Ok(TradeRecord {
            id: position.id,
            symbol: position.symbol,
            entry_price: position.entry_price,
            exit_price,
            quantity: position.quantity,
            entry_time: position.entry_time,
            exit_time,
            profit_pct,
            profit_amount,
        })
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.positions.len() >= self.max_positions
    }

    pub fn max_positions(&self) -> usize {
        self.max_positions
    }

    /// Copy of all open positions, oldest entry first
    pub fn snapshot(&self) -> Vec<Position> {
        let mut positions: Vec<Position> = self.positions.values().cloned().collect();
        positions.sort_by(|a, b| {
            a.entry_time
                .cmp(&b.entry_time)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        positions
    }
}
