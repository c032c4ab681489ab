// Market data sources
pub mod simulator;

pub use simulator::MarketSimulator;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Candle, KlineInterval, Ticker};

/// Stablecoin bases excluded from volume rankings
pub(crate) const STABLECOINS: &[&str] = &["USDC", "BUSD", "TUSD", "DAI", "USDP"];

/// Everything the trading engine needs from a market data source
///
/// Implemented by the live exchange client and the simulator; the
/// engine decides which one it is talking to exactly once, at startup.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Latest quote for a symbol
    async fn ticker(&self, symbol: &str) -> Result<Ticker>;

    /// Most recent candles, oldest first, at most `limit` of them
    async fn klines(
        &self,
        symbol: &str,
        interval: KlineInterval,
        limit: usize,
    ) -> Result<Vec<Candle>>;

    /// Quantity decimals accepted for orders in this symbol
    async fn sizing_precision(&self, symbol: &str) -> Result<u32>;

    /// Highest-volume bases, ranked by notional volume, quote suffix stripped
    async fn top_symbols(&self, limit: usize) -> Result<Vec<String>>;
}
