//! Error types shared across the bot.

use thiserror::Error;

/// Everything that can go wrong while scanning, entering or exiting trades.
#[derive(Debug, Error)]
pub enum BotError {
    /// Market data could not be fetched or was too thin to act on.
    #[error("market data unavailable: {0}")]
    DataUnavailable(String),

    /// A position for the symbol is already open.
    #[error("position already open for {0}")]
    AlreadyOpen(String),

    /// No open position exists for the symbol.
    #[error("no open position for {0}")]
    NotFound(String),

    /// The configured position cap is already filled.
    #[error("position cap reached ({0} open)")]
    CapacityExceeded(usize),

    /// Bad settings or watch-list input.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<config::ConfigError> for BotError {
    fn from(err: config::ConfigError) -> Self {
        BotError::InvalidConfiguration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = BotError::AlreadyOpen("BTCUSDT".to_string());
        assert_eq!(err.to_string(), "position already open for BTCUSDT");

        let err = BotError::CapacityExceeded(2);
        assert_eq!(err.to_string(), "position cap reached (2 open)");

        let err = BotError::DataUnavailable("klines timed out".to_string());
        assert!(err.to_string().contains("klines timed out"));
    }
}
