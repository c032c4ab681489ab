//! Binance spot REST client, public market-data endpoints only.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{BotError, Result};
use crate::market::{MarketData, STABLECOINS};
use crate::models::{Candle, KlineInterval, Ticker};

const BINANCE_API_BASE: &str = "https://api.binance.com";
const RATE_LIMIT_RPM: u32 = 1100; // Binance allows 1200 request weight/min
const MAX_RETRIES: u32 = 3;
const HTTP_TIMEOUT_SECS: u64 = 10;

/// Watch-list used when the volume ranking cannot be fetched
const DEFAULT_TOP_COINS: &[&str] = &[
    "BTC", "ETH", "BNB", "XRP", "ADA", "SOL", "DOT", "DOGE", "AVAX", "SHIB",
];

// Type alias for the rate limiter to simplify signatures
type BinanceRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Binance REST client with rate limiting and retry on transient errors
///
/// Cloneable; all clones share the same rate limiter.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
    rate_limiter: Arc<BinanceRateLimiter>,
}

/// Response from /api/v3/ticker/24hr
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24hr {
    symbol: String,
    last_price: String,
    bid_price: String,
    ask_price: String,
    quote_volume: String,
}

/// One row from /api/v3/klines; Binance sends mixed-type arrays
type KlineRow = (
    i64,    // open time (ms)
    String, // open
    String, // high
    String, // low
    String, // close
    String, // volume
    i64,    // close time (ms)
    String, // quote asset volume
    u64,    // number of trades
    String, // taker buy base volume
    String, // taker buy quote volume
    String, // unused
);

/// Response from /api/v3/exchangeInfo
#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
    symbol: String,
    filters: Vec<SymbolFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
enum SymbolFilter {
    #[serde(rename = "LOT_SIZE")]
    LotSize {
        #[serde(rename = "stepSize")]
        step_size: String,
    },
    #[serde(other)]
    Other,
}

impl BinanceClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(BINANCE_API_BASE)
    }

    /// Point the client at a different host (used by tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| BotError::DataUnavailable(format!("failed to build HTTP client: {e}")))?;

        let quota = Quota::per_minute(NonZeroU32::new(RATE_LIMIT_RPM).unwrap());

        Ok(Self {
            client,
            base_url: base_url.into(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    /// Make a rate-limited request, retrying 429s and 5xx with backoff
    async fn make_request(&self, url: &str) -> Result<reqwest::Response> {
        for attempt in 1..=MAX_RETRIES {
            self.rate_limiter.until_ready().await;

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let backoff_secs = 2u64.pow(attempt);
                        tracing::warn!(
                            "Binance returned {}, backing off {}s (attempt {}/{})",
                            status,
                            backoff_secs,
                            attempt,
                            MAX_RETRIES
                        );
                        tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                        continue;
                    }

                    // Other 4xx - not retryable
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "unknown error".to_string());
                    return Err(BotError::DataUnavailable(format!(
                        "Binance API error ({status}): {body}"
                    )));
                }
                Err(e) if attempt < MAX_RETRIES => {
                    let backoff_secs = 2u64.pow(attempt);
                    tracing::warn!(
                        "Network error: {}, retrying in {}s (attempt {}/{})",
                        e,
                        backoff_secs,
                        attempt,
                        MAX_RETRIES
                    );
                    tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                }
                Err(e) => {
                    return Err(BotError::DataUnavailable(format!(
                        "network error after {MAX_RETRIES} attempts: {e}"
                    )))
                }
            }
        }

        Err(BotError::DataUnavailable(format!(
            "request failed after {MAX_RETRIES} attempts: {url}"
        )))
    }

    async fn fetch_all_tickers(&self) -> Result<Vec<Ticker24hr>> {
        let url = format!("{}/api/v3/ticker/24hr", self.base_url);
        let response = self.make_request(&url).await?;
        response
            .json()
            .await
            .map_err(|e| BotError::DataUnavailable(format!("failed to parse ticker list: {e}")))
    }
}

#[async_trait]
impl MarketData for BinanceClient {
    async fn ticker(&self, symbol: &str) -> Result<Ticker> {
        let url = format!("{}/api/v3/ticker/24hr?symbol={}", self.base_url, symbol);
        let response = self.make_request(&url).await?;

        let raw: Ticker24hr = response.json().await.map_err(|e| {
            BotError::DataUnavailable(format!("failed to parse ticker for {symbol}: {e}"))
        })?;

        Ok(Ticker {
            symbol: raw.symbol,
            last_price: parse_f64(&raw.last_price, "lastPrice")?,
            bid_price: parse_f64(&raw.bid_price, "bidPrice")?,
            ask_price: parse_f64(&raw.ask_price, "askPrice")?,
        })
    }

    async fn klines(
        &self,
        symbol: &str,
        interval: KlineInterval,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url, symbol, interval, limit
        );
        let response = self.make_request(&url).await?;

        let rows: Vec<KlineRow> = response.json().await.map_err(|e| {
            BotError::DataUnavailable(format!("failed to parse klines for {symbol}: {e}"))
        })?;

        let mut candles = Vec::with_capacity(rows.len());
        for row in rows {
            candles.push(Candle {
                open_time: timestamp_ms(row.0)?,
                close_time: timestamp_ms(row.6)?,
                open: parse_f64(&row.1, "open")?,
                high: parse_f64(&row.2, "high")?,
                low: parse_f64(&row.3, "low")?,
                close: parse_f64(&row.4, "close")?,
                volume: parse_f64(&row.5, "volume")?,
            });
        }

        Ok(candles)
    }

    async fn sizing_precision(&self, symbol: &str) -> Result<u32> {
        let url = format!("{}/api/v3/exchangeInfo?symbol={}", self.base_url, symbol);
        let response = self.make_request(&url).await?;

        let info: ExchangeInfo = response.json().await.map_err(|e| {
            BotError::DataUnavailable(format!("failed to parse exchange info for {symbol}: {e}"))
        })?;

        let entry = info
            .symbols
            .into_iter()
            .find(|s| s.symbol == symbol)
            .ok_or_else(|| BotError::DataUnavailable(format!("no exchange info for {symbol}")))?;

        for filter in entry.filters {
            if let SymbolFilter::LotSize { step_size } = filter {
                return Ok(decimals_from_step(&step_size));
            }
        }

        Err(BotError::DataUnavailable(format!(
            "no LOT_SIZE filter for {symbol}"
        )))
    }

    /// Rank USDT pairs by 24h notional volume. Falls back to a fixed
    /// coin list when the exchange cannot be reached.
    async fn top_symbols(&self, limit: usize) -> Result<Vec<String>> {
        let tickers = match self.fetch_all_tickers().await {
            Ok(tickers) => tickers,
            Err(e) => {
                tracing::warn!("⚠️  Volume ranking unavailable ({}), using default coin list", e);
                return Ok(DEFAULT_TOP_COINS
                    .iter()
                    .take(limit)
                    .map(|s| s.to_string())
                    .collect());
            }
        };

        let mut usdt_pairs: Vec<(String, f64)> = tickers
            .into_iter()
            .filter(|t| t.symbol.ends_with("USDT"))
            .filter_map(|t| {
                t.quote_volume
                    .parse::<f64>()
                    .ok()
                    .map(|volume| (t.symbol, volume))
            })
            .collect();
        usdt_pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(usdt_pairs
            .into_iter()
            .map(|(symbol, _)| {
                symbol
                    .strip_suffix("USDT")
                    .unwrap_or(symbol.as_str())
                    .to_string()
            })
            .filter(|base| !STABLECOINS.contains(&base.as_str()))
            .take(limit)
            .collect())
    }
}

fn parse_f64(value: &str, field: &str) -> Result<f64> {
    value
        .parse()
        .map_err(|_| BotError::DataUnavailable(format!("unparseable {field}: {value}")))
}

fn timestamp_ms(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| BotError::DataUnavailable(format!("invalid timestamp: {ms}")))
}

/// Decimal places implied by a step size string: "0.00100000" allows 3
fn decimals_from_step(step: &str) -> u32 {
    match step.find('.') {
        Some(dot) => step[dot + 1..].trim_end_matches('0').len() as u32,
        None => 0,
    }
}
