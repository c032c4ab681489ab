// Core modules
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod market;
pub mod models;
pub mod strategy;

// Re-export commonly used types
pub use config::BotConfig;
pub use engine::TradingBot;
pub use market::MarketData;
pub use models::*;

// Error handling
pub use error::{BotError, Result};
