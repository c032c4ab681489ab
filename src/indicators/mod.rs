// Technical indicators module
// Implements RSI and MACD for entry analysis

pub mod macd;
pub mod rsi;

pub use macd::{calculate_macd, MacdSeries};
pub use rsi::calculate_rsi;
