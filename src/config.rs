//! Runtime settings, layered from defaults, an optional TOML file and
//! `DIPBOT_`-prefixed environment variables.

use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};
use crate::models::KlineInterval;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Quote currency spent per entry, in USDT
    pub usdt_per_trade: f64,
    /// Maximum simultaneously open positions
    pub max_positions: usize,
    /// Exit when unrealized profit reaches this percentage
    pub take_profit_pct: f64,
    /// Exit when unrealized profit falls to this percentage (negative)
    pub stop_loss_pct: f64,
    /// Candle width used for indicator history
    pub timeframe: KlineInterval,
    /// Lookback window for the RSI rolling averages
    pub rsi_period: usize,
    /// RSI level below which a symbol counts as oversold
    pub rsi_oversold: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    /// Seconds between entry scans over the watch-list
    pub scan_interval_secs: u64,
    /// Seconds between exit checks on open positions
    pub exit_interval_secs: u64,
    /// Candles requested per indicator evaluation
    pub kline_limit: usize,
    /// Ring capacity for entry-condition diagnostics
    pub sample_capacity: usize,
    /// Per-request timeout on market data calls
    pub data_timeout_secs: u64,
    /// Quantity decimals used when the venue exposes no step size
    pub default_precision: u32,
    /// Trade against the real exchange instead of the simulator
    pub live: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            usdt_per_trade: 100.0,
            max_positions: 2,
            take_profit_pct: 2.0,
            stop_loss_pct: -1.0,
            timeframe: KlineInterval::FiveMinutes,
            rsi_period: 14,
            rsi_oversold: 40.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            scan_interval_secs: 10,
            exit_interval_secs: 1,
            kline_limit: 100,
            sample_capacity: 100,
            data_timeout_secs: 5,
            default_precision: 5,
            live: false,
        }
    }
}

impl BotConfig {
    /// Load settings: defaults, then the config file, then `DIPBOT_*` env vars.
    ///
    /// Without an explicit path, `dipbot.toml` in the working directory is
    /// used when present and silently skipped otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&BotConfig::default())?;

        let mut builder = Config::builder().add_source(defaults);
        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name("dipbot").required(false)),
        };

        let settings = builder
            .add_source(Environment::with_prefix("DIPBOT").try_parsing(true))
            .build()?;

        let config: BotConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the trading loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.usdt_per_trade <= 0.0 {
            return Err(invalid("usdt_per_trade must be positive"));
        }
        if self.max_positions == 0 {
            return Err(invalid("max_positions must be at least 1"));
        }
        if self.take_profit_pct <= 0.0 {
            return Err(invalid("take_profit_pct must be positive"));
        }
        if self.stop_loss_pct >= 0.0 {
            return Err(invalid("stop_loss_pct must be negative"));
        }
        if !(0.0..=100.0).contains(&self.rsi_oversold) {
            return Err(invalid("rsi_oversold must be between 0 and 100"));
        }
        if self.rsi_period < 2 {
            return Err(invalid("rsi_period must be at least 2"));
        }
        if self.macd_fast < 2 || self.macd_signal < 1 {
            return Err(invalid("macd periods must be at least 2/2/1"));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(invalid("macd_fast must be shorter than macd_slow"));
        }
        if self.kline_limit < 2 {
            return Err(invalid("kline_limit must be at least 2"));
        }
        if self.sample_capacity == 0 {
            return Err(invalid("sample_capacity must be at least 1"));
        }
        if self.scan_interval_secs == 0 || self.exit_interval_secs == 0 {
            return Err(invalid("scan and exit intervals must be at least 1s"));
        }
        if self.data_timeout_secs == 0 {
            return Err(invalid("data_timeout_secs must be at least 1s"));
        }
        Ok(())
    }

    /// Tag prepended to trade logs so simulated fills are never mistaken for real ones.
    pub fn mode_tag(&self) -> &'static str {
        if self.live {
            "[LIVE]"
        } else {
            "[SIM]"
        }
    }
}

fn invalid(msg: &str) -> BotError {
    BotError::InvalidConfiguration(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = BotConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_positions, 2);
        assert_eq!(config.take_profit_pct, 2.0);
        assert_eq!(config.stop_loss_pct, -1.0);
        assert_eq!(config.timeframe, KlineInterval::FiveMinutes);
        assert!(!config.live);
        assert_eq!(config.mode_tag(), "[SIM]");
    }

    #[test]
    fn test_rejects_zero_positions() {
        let config = BotConfig {
            max_positions: 0,
            ..BotConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BotError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_rejects_positive_stop_loss() {
        let config = BotConfig {
            stop_loss_pct: 1.0,
            ..BotConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_macd_periods() {
        let config = BotConfig {
            macd_fast: 26,
            macd_slow: 12,
            ..BotConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_thin_kline_limit() {
        let config = BotConfig {
            kline_limit: 1,
            ..BotConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_live_mode_tag() {
        let config = BotConfig {
            live: true,
            ..BotConfig::default()
        };
        assert_eq!(config.mode_tag(), "[LIVE]");
    }

    #[test]
    fn test_defaults_survive_config_layering() {
        let defaults = Config::try_from(&BotConfig::default()).unwrap();
        let settings = Config::builder().add_source(defaults).build().unwrap();
        let config: BotConfig = settings.try_deserialize().unwrap();

        assert_eq!(config.rsi_period, 14);
        assert_eq!(config.timeframe, KlineInterval::FiveMinutes);
    }
}
