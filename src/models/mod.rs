use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Candle widths the bot understands
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum KlineInterval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "3m")]
    ThreeMinutes,
    #[default]
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
}

impl KlineInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            KlineInterval::OneMinute => "1m",
            KlineInterval::ThreeMinutes => "3m",
            KlineInterval::FiveMinutes => "5m",
            KlineInterval::FifteenMinutes => "15m",
        }
    }

    /// Width of one candle bucket
    pub fn duration(&self) -> chrono::Duration {
        match self {
            KlineInterval::OneMinute => chrono::Duration::minutes(1),
            KlineInterval::ThreeMinutes => chrono::Duration::minutes(3),
            KlineInterval::FiveMinutes => chrono::Duration::minutes(5),
            KlineInterval::FifteenMinutes => chrono::Duration::minutes(15),
        }
    }
}

impl std::fmt::Display for KlineInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OHLCV candlestick data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Latest quote for a symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub last_price: f64,
    pub bid_price: f64,
    pub ask_price: f64,
}

/// An open holding in a symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub symbol: String,
    pub entry_price: f64,
    pub quantity: f64,
    pub entry_time: DateTime<Utc>,
}

/// A completed round trip, written once on exit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: Uuid,
    pub symbol: String,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub profit_pct: f64,
    pub profit_amount: f64,
}

/// Indicator readings behind one entry decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub price: f64,
    pub rsi: f64,
    pub macd_histogram: f64,
    pub prev_histogram: f64,
    pub rsi_condition: bool,
    pub macd_condition: bool,
}

/// Diagnostic record of one symbol evaluation during a scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryConditionSample {
    pub time: DateTime<Utc>,
    pub symbol: String,
    pub entry_signal: bool,
    pub conditions: IndicatorSnapshot,
}

/// Aggregate trading results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceStats {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub total_profit_pct: f64,
    pub average_profit_pct: f64,
}

/// Open position enriched with a live price for reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenPosition {
    pub symbol: String,
    pub entry_price: f64,
    pub current_price: f64,
    pub profit_pct: f64,
    pub quantity: f64,
    pub entry_time: DateTime<Utc>,
}
