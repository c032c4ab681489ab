//! The trading bot itself: one background loop, two cadences.
//!
//! The fast cadence re-checks exit conditions on open positions; the
//! slow cadence scans the watch-list for entries. Both tick bodies are
//! public so tests can drive them without the loop.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::BotConfig;
use crate::engine::clock::Clock;
use crate::engine::performance::PerformanceTracker;
use crate::engine::positions::PositionBook;
use crate::error::{BotError, Result};
use crate::market::MarketData;
use crate::models::{
    Candle, EntryConditionSample, OpenPosition, PerformanceStats, Position, Ticker, TradeRecord,
};
use crate::strategy::signals;

/// Result of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartStatus {
    Started,
    AlreadyRunning,
}

/// Result of a stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopStatus {
    Stopped,
    NotRunning,
}

/// What happened to one watched symbol during an entry scan
#[derive(Debug)]
pub enum ScanOutcome {
    Entered(Position),
    NoSignal,
    Failed(BotError),
}

#[derive(Debug)]
pub struct SymbolScan {
    pub symbol: String,
    pub outcome: ScanOutcome,
}

// ============================================================================
// TradingBot
// ============================================================================

/// Dip-reversal trading engine
///
/// Holds all mutable state behind per-resource locks so any task with
/// an `Arc<TradingBot>` can issue commands or read views while the
/// scheduling loop runs. Locks are never held across an await.
pub struct TradingBot {
    config: BotConfig,
    market: Arc<dyn MarketData>,
    clock: Arc<dyn Clock>,
    book: Mutex<PositionBook>,
    tracker: Mutex<PerformanceTracker>,
    watch_list: RwLock<Vec<String>>,
    running: AtomicBool,
    loop_task: Mutex<Option<JoinHandle<()>>>,
}

impl TradingBot {
    pub fn new(config: BotConfig, market: Arc<dyn MarketData>, clock: Arc<dyn Clock>) -> Self {
        let book = PositionBook::new(config.max_positions);
        let tracker = PerformanceTracker::new(config.sample_capacity);

        Self {
            config,
            market,
            clock,
            book: Mutex::new(book),
            tracker: Mutex::new(tracker),
            watch_list: RwLock::new(Vec::new()),
            running: AtomicBool::new(false),
            loop_task: Mutex::new(None),
        }
    }

    // ========================================================================
    // Control surface
    // ========================================================================

    /// Start scanning the given symbols. No-op if already running: the
    /// existing watch-list is kept and `AlreadyRunning` is reported.
    pub fn start(self: Arc<Self>, symbols: Vec<String>) -> Result<StartStatus> {
        let watch = normalize_watch_list(&symbols)?;

        if self.running.swap(true, Ordering::SeqCst) {
            tracing::info!("Bot already running, ignoring start request");
            return Ok(StartStatus::AlreadyRunning);
        }

        *self.watch_list.write().unwrap() = watch.clone();

        let bot = Arc::clone(&self);
        let task = tokio::spawn(async move {
            bot.run_loop().await;
        });
        *self.loop_task.lock().unwrap() = Some(task);

        tracing::info!(
            "🚀 {} Bot started, watching {} symbols: {}",
            self.config.mode_tag(),
            watch.len(),
            watch.join(", ")
        );
        Ok(StartStatus::Started)
    }

    /// Stop the loop. Waits for any in-flight tick to finish; safe to
    /// call at any time, reports `NotRunning` when there is nothing to do.
    pub async fn stop(&self) -> StopStatus {
        if !self.running.swap(false, Ordering::SeqCst) {
            return StopStatus::NotRunning;
        }

        let task = self.loop_task.lock().unwrap().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!("Trading loop task failed: {}", e);
            }
        }

        tracing::info!("🛑 Bot stopped");
        StopStatus::Stopped
    }

    /// Replace the watch-list. The next scan picks up the new list; a
    /// tick already in flight finishes against its own snapshot.
    pub fn set_watch_list(&self, symbols: Vec<String>) -> Result<()> {
        let watch = normalize_watch_list(&symbols)?;
        tracing::info!("📋 Watch-list updated: {}", watch.join(", "));
        *self.watch_list.write().unwrap() = watch;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn watch_list(&self) -> Vec<String> {
        self.watch_list.read().unwrap().clone()
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Open positions with live prices. A symbol whose price cannot be
    /// fetched right now is logged and omitted from the view.
    pub async fn open_positions(&self) -> Vec<OpenPosition> {
        let snapshot = self.book.lock().unwrap().snapshot();
        let mut rows = Vec::with_capacity(snapshot.len());

        for position in snapshot {
            let ticker = match self.fetch_ticker(&position.symbol).await {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!("  ✗ No current price for {}: {}", position.symbol, e);
                    continue;
                }
            };

            rows.push(OpenPosition {
                symbol: position.symbol,
                entry_price: position.entry_price,
                current_price: ticker.last_price,
                profit_pct: signals::profit_pct(position.entry_price, ticker.last_price),
                quantity: position.quantity,
                entry_time: position.entry_time,
            });
        }

        rows
    }

    pub fn performance_stats(&self) -> PerformanceStats {
        self.tracker.lock().unwrap().stats()
    }

    pub fn trade_history(&self) -> Vec<TradeRecord> {
        self.tracker.lock().unwrap().history().to_vec()
    }

    /// Recorded entry evaluations, oldest first
    pub fn entry_samples(&self) -> Vec<EntryConditionSample> {
        self.tracker.lock().unwrap().samples()
    }

    /// Log open positions and running stats (the periodic 📊 block)
    pub async fn log_summary(&self) {
        let positions = self.open_positions().await;
        let stats = self.performance_stats();
        let max = self.book.lock().unwrap().max_positions();

        tracing::info!("📊 Positions: {}/{} open", positions.len(), max);
        for p in &positions {
            tracing::info!(
                "  {} @ ${:.4} → ${:.4} ({:+.2}%)",
                p.symbol,
                p.entry_price,
                p.current_price,
                p.profit_pct
            );
        }
        tracing::info!(
            "📊 Closed: {} trades, {:.0}% wins, {:+.2}% cumulative",
            stats.total_trades,
            stats.win_rate,
            stats.total_profit_pct
        );
    }

    // ========================================================================
    // Scheduling loop
    // ========================================================================

    async fn run_loop(self: Arc<Self>) {
        tracing::info!(
            "🔄 Trading loop starting (exits every {}s, scans every {}s)",
            self.config.exit_interval_secs,
            self.config.scan_interval_secs
        );

        let mut ticker =
            tokio::time::interval(std::time::Duration::from_secs(self.config.exit_interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut last_scan: Option<DateTime<Utc>> = None;

        loop {
            ticker.tick().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            self.check_exits().await;

            let now = self.clock.now();
            let scan_due = match last_scan {
                None => true,
                Some(at) => (now - at).num_seconds() >= self.config.scan_interval_secs as i64,
            };
            if scan_due {
                self.scan_entries().await;
                last_scan = Some(now);
            }
        }

        tracing::info!("🔄 Trading loop finished");
    }

    /// Fast tick: close any open position whose exit condition has
    /// triggered. Returns the completed trades.
    pub async fn check_exits(&self) -> Vec<TradeRecord> {
        let open = self.book.lock().unwrap().snapshot();
        if open.is_empty() {
            return Vec::new();
        }

        let mut closed = Vec::new();

        for position in open {
            let ticker = match self.fetch_ticker(&position.symbol).await {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!("  ✗ {} exit check skipped: {}", position.symbol, e);
                    continue;
                }
            };

            let profit_pct = signals::profit_pct(position.entry_price, ticker.last_price);
            if !signals::should_exit(profit_pct, &self.config) {
                continue;
            }

            let record = {
                let mut book = self.book.lock().unwrap();
                match book.close(&position.symbol, ticker.last_price, self.clock.now()) {
                    Ok(record) => record,
                    Err(e) => {
                        // Position vanished between snapshot and close
                        tracing::error!("  ✗ Could not close {}: {}", position.symbol, e);
                        continue;
                    }
                }
            };

            self.tracker.lock().unwrap().record_trade(record.clone());
            tracing::info!(
                "✓ {} Closed {} @ ${:.4} ({:+.2}%)",
                self.config.mode_tag(),
                record.symbol,
                record.exit_price,
                record.profit_pct
            );
            closed.push(record);
        }

        closed
    }

    /// Slow tick: evaluate every watched symbol without an open
    /// position. Held symbols are skipped without an outcome; once the
    /// position cap is hit mid-scan the next symbol records
    /// `CapacityExceeded` and the rest of the tick is abandoned.
    pub async fn scan_entries(&self) -> Vec<SymbolScan> {
        let mut results = Vec::new();

        if self.book.lock().unwrap().is_full() {
            tracing::debug!("Position cap reached, skipping entry scan");
            return results;
        }

        let watch = self.watch_list.read().unwrap().clone();
        tracing::info!(
            "🔍 [SCAN] Evaluating {} symbols at {}",
            watch.len(),
            self.clock.now().format("%H:%M:%S")
        );

        for symbol in watch {
            if self.book.lock().unwrap().contains(&symbol) {
                continue;
            }

            {
                let book = self.book.lock().unwrap();
                if book.is_full() {
                    results.push(SymbolScan {
                        symbol,
                        outcome: ScanOutcome::Failed(BotError::CapacityExceeded(book.len())),
                    });
                    break;
                }
            }

            let outcome = self.evaluate_symbol(&symbol).await;
            match &outcome {
                ScanOutcome::Entered(position) => {
                    tracing::info!(
                        "  ✓ {} entered @ ${:.4} (qty {})",
                        symbol,
                        position.entry_price,
                        position.quantity
                    );
                }
                ScanOutcome::NoSignal => {
                    tracing::debug!("  {} no entry signal", symbol);
                }
                ScanOutcome::Failed(e) => {
                    tracing::warn!("  ✗ {} scan failed: {}", symbol, e);
                }
            }
            results.push(SymbolScan { symbol, outcome });
        }

        results
    }

    async fn evaluate_symbol(&self, symbol: &str) -> ScanOutcome {
        let candles = match self.fetch_klines(symbol).await {
            Ok(candles) => candles,
            Err(e) => return ScanOutcome::Failed(e),
        };

        let eval = match signals::evaluate_entry(&candles, &self.config) {
            Ok(eval) => eval,
            Err(e) => return ScanOutcome::Failed(e),
        };

        // Every completed evaluation lands in the diagnostic ring,
        // signal or not
        self.tracker.lock().unwrap().record_sample(EntryConditionSample {
            time: self.clock.now(),
            symbol: symbol.to_string(),
            entry_signal: eval.entry_signal,
            conditions: eval.conditions.clone(),
        });

        if !eval.entry_signal {
            return ScanOutcome::NoSignal;
        }

        match self.open_entry(symbol).await {
            Ok(position) => ScanOutcome::Entered(position),
            Err(e) => ScanOutcome::Failed(e),
        }
    }

    /// Open a position at the current price, sized by fixed notional
    async fn open_entry(&self, symbol: &str) -> Result<Position> {
        let ticker = self.fetch_ticker(symbol).await?;
        let price = ticker.last_price;

        let precision = match self.market.sizing_precision(symbol).await {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(
                    "No sizing metadata for {} ({}), using {} decimals",
                    symbol,
                    e,
                    self.config.default_precision
                );
                self.config.default_precision
            }
        };

        let quantity = round_down(self.config.usdt_per_trade / price, precision);
        if quantity <= 0.0 {
            return Err(BotError::InvalidConfiguration(format!(
                "{} USDT buys zero {} at ${} with {} decimals",
                self.config.usdt_per_trade, symbol, price, precision
            )));
        }

        let position = self
            .book
            .lock()
            .unwrap()
            .open(symbol, price, quantity, self.clock.now())?;

        tracing::info!(
            "✓ {} Opened {} @ ${:.4} (qty {})",
            self.config.mode_tag(),
            symbol,
            price,
            quantity
        );
        Ok(position)
    }

    // ========================================================================
    // Market access with timeouts
    // ========================================================================

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker> {
        self.timed(self.market.ticker(symbol), "ticker", symbol).await
    }

    async fn fetch_klines(&self, symbol: &str) -> Result<Vec<Candle>> {
        let fut = self
            .market
            .klines(symbol, self.config.timeframe, self.config.kline_limit);
        self.timed(fut, "klines", symbol).await
    }

    /// One symbol's slow fetch must never stall the whole tick
    async fn timed<T>(
        &self,
        fut: impl Future<Output = Result<T>>,
        what: &str,
        symbol: &str,
    ) -> Result<T> {
        let limit = std::time::Duration::from_secs(self.config.data_timeout_secs);
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(BotError::DataUnavailable(format!(
                "{what} fetch for {symbol} timed out after {}s",
                self.config.data_timeout_secs
            ))),
        }
    }
}

// ============================================================================
// Watch-list normalization
// ============================================================================

/// Uppercase, append the USDT quote suffix where missing, drop
/// duplicates. Rejects empty lists and non-alphanumeric names.
fn normalize_watch_list(symbols: &[String]) -> Result<Vec<String>> {
    if symbols.is_empty() {
        return Err(BotError::InvalidConfiguration(
            "watch-list is empty".to_string(),
        ));
    }

    let mut normalized = Vec::with_capacity(symbols.len());
    for raw in symbols {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(BotError::InvalidConfiguration(
                "watch-list contains an empty symbol".to_string(),
            ));
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(BotError::InvalidConfiguration(format!(
                "invalid symbol name: {trimmed:?}"
            )));
        }

        let mut symbol = trimmed.to_ascii_uppercase();
        if !symbol.ends_with("USDT") {
            symbol.push_str("USDT");
        }
        if !normalized.contains(&symbol) {
            normalized.push(symbol);
        }
    }

    Ok(normalized)
}

fn round_down(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).floor() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::clock::ManualClock;
    use crate::market::MarketSimulator;
    use crate::models::KlineInterval;
    use chrono::TimeZone;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sim_bot() -> Arc<TradingBot> {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        ));
        let market = Arc::new(MarketSimulator::with_seed(
            Arc::clone(&clock),
            KlineInterval::FiveMinutes,
            7,
        ));
        Arc::new(TradingBot::new(BotConfig::default(), market, clock))
    }

    #[test]
    fn test_normalize_appends_quote_suffix() {
        let watch = normalize_watch_list(&strings(&["btc", "ETH", "SOLUSDT"])).unwrap();
        assert_eq!(watch, vec!["BTCUSDT", "ETHUSDT", "SOLUSDT"]);
    }

    #[test]
    fn test_normalize_trims_and_dedupes() {
        let watch = normalize_watch_list(&strings(&[" btc ", "BTC", "BTCUSDT"])).unwrap();
        assert_eq!(watch, vec!["BTCUSDT"]);
    }

    #[test]
    fn test_normalize_rejects_empty_list() {
        assert!(matches!(
            normalize_watch_list(&[]),
            Err(BotError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_normalize_rejects_blank_and_garbage_symbols() {
        assert!(normalize_watch_list(&strings(&["BTC", "  "])).is_err());
        assert!(normalize_watch_list(&strings(&["BTC/USDT"])).is_err());
    }

    #[test]
    fn test_round_down_never_rounds_up() {
        assert_eq!(round_down(0.123456789, 5), 0.12345);
        assert_eq!(round_down(0.999999, 2), 0.99);
        assert_eq!(round_down(3.0, 0), 3.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_is_reported_not_restarted() {
        let bot = sim_bot();

        assert_eq!(
            bot.clone().start(strings(&["BTC"])).unwrap(),
            StartStatus::Started
        );
        assert!(bot.is_running());

        // Second start keeps the original watch-list
        assert_eq!(
            bot.clone().start(strings(&["ETH"])).unwrap(),
            StartStatus::AlreadyRunning
        );
        assert_eq!(bot.watch_list(), vec!["BTCUSDT"]);

        assert_eq!(bot.stop().await, StopStatus::Stopped);
        assert!(!bot.is_running());
        assert_eq!(bot.stop().await, StopStatus::NotRunning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_watch_list_leaves_bot_stopped() {
        let bot = sim_bot();

        assert!(bot.clone().start(vec![]).is_err());
        assert!(!bot.is_running());
        assert_eq!(bot.stop().await, StopStatus::NotRunning);
    }

    #[tokio::test]
    async fn test_scan_records_a_sample_per_watched_symbol() {
        let bot = sim_bot();
        bot.set_watch_list(strings(&["BTC", "ETH"])).unwrap();

        let results = bot.scan_entries().await;

        assert_eq!(results.len(), 2);
        assert_eq!(bot.entry_samples().len(), 2);
        for scan in &results {
            assert!(!matches!(scan.outcome, ScanOutcome::Failed(_)));
        }
    }

    #[tokio::test]
    async fn test_open_positions_empty_without_trades() {
        let bot = sim_bot();
        assert!(bot.open_positions().await.is_empty());
        assert_eq!(bot.performance_stats().total_trades, 0);
    }
}
