//! Seeded random-walk market, good enough to feed the indicator
//! pipeline without touching a real exchange.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::engine::clock::Clock;
use crate::error::{BotError, Result};
use crate::market::{MarketData, STABLECOINS};
use crate::models::{Candle, KlineInterval, Ticker};

/// Candles generated when a symbol is first touched
const BACKFILL_CANDLES: usize = 100;
/// Cap on per-symbol candle history
const SERIES_CAPACITY: usize = 500;
/// Slight downward bias in backfilled history so fresh symbols read as dips
const BACKFILL_DRIFT: f64 = -0.0002;
/// Chance per update that the shared market trend takes a step
const TREND_SHIFT_PROBABILITY: f64 = 0.05;
const TREND_STEP_SIGMA: f64 = 0.2;
/// Volatility for symbols missing from the seed table
const DEFAULT_VOLATILITY: f64 = 0.03;
/// Price updates are skipped when called again within this window
const ADVANCE_THROTTLE_SECS: i64 = 1;

/// Starting price and per-candle volatility for well-known symbols
const SEED_MARKETS: &[(&str, f64, f64)] = &[
    ("BTCUSDT", 30000.0, 0.015),
    ("ETHUSDT", 1800.0, 0.02),
    ("SOLUSDT", 45.0, 0.035),
    ("DOGEUSDT", 0.08, 0.04),
    ("BNBUSDT", 250.0, 0.02),
    ("XRPUSDT", 0.5, 0.025),
    ("ADAUSDT", 0.3, 0.025),
    ("DOTUSDT", 5.0, 0.03),
    ("AVAXUSDT", 15.0, 0.035),
    ("LINKUSDT", 8.0, 0.03),
];

struct SymbolModel {
    price: f64,
    volatility: f64,
    series: VecDeque<Candle>,
}

struct SimState {
    rng: StdRng,
    models: HashMap<String, SymbolModel>,
    market_trend: f64,
    last_advance: DateTime<Utc>,
}

/// In-memory exchange stand-in
///
/// Each symbol follows a multiplicative random walk nudged by a shared
/// market trend in `[-1, 1]`. Unseen symbols are bootstrapped on first
/// touch with a hundred candles of backfilled history. Two simulators
/// built with the same seed and clock replay the same market.
pub struct MarketSimulator {
    state: Mutex<SimState>,
    clock: Arc<dyn Clock>,
    bucket: Duration,
}

impl MarketSimulator {
    pub fn new(clock: Arc<dyn Clock>, interval: KlineInterval) -> Self {
        Self::with_seed(clock, interval, rand::random())
    }

    pub fn with_seed(clock: Arc<dyn Clock>, interval: KlineInterval, seed: u64) -> Self {
        let last_advance = clock.now();
        Self {
            state: Mutex::new(SimState {
                rng: StdRng::seed_from_u64(seed),
                models: HashMap::new(),
                market_trend: 0.0,
                last_advance,
            }),
            clock,
            bucket: interval.duration(),
        }
    }

    /// Step every symbol's price forward, at most once per second
    fn advance(&self, state: &mut SimState, now: DateTime<Utc>) {
        if (now - state.last_advance).num_seconds() < ADVANCE_THROTTLE_SECS {
            return;
        }
        state.last_advance = now;

        if state.rng.gen::<f64>() < TREND_SHIFT_PROBABILITY {
            let step = gauss(&mut state.rng, TREND_STEP_SIGMA);
            state.market_trend = (state.market_trend + step).clamp(-1.0, 1.0);
        }

        let trend = state.market_trend;
        let SimState { rng, models, .. } = state;
        for model in models.values_mut() {
            let change = gauss(rng, model.volatility) + trend * model.volatility * 0.5;
            model.price *= 1.0 + change;
            roll_candle(rng, model, self.bucket, now);
        }
    }

    fn ensure_symbol(&self, state: &mut SimState, symbol: &str, now: DateTime<Utc>) {
        if state.models.contains_key(symbol) {
            return;
        }

        let (seed_price, volatility) = SEED_MARKETS
            .iter()
            .find(|(name, _, _)| *name == symbol)
            .map(|(_, price, vol)| (*price, *vol))
            .unwrap_or((1.0, DEFAULT_VOLATILITY));

        let model = backfill(&mut state.rng, seed_price, volatility, self.bucket, now);
        state.models.insert(symbol.to_string(), model);
    }

    #[cfg(test)]
    fn market_trend(&self) -> f64 {
        self.state.lock().unwrap().market_trend
    }
}

/// Walk backwards from the seed price, then lay the series out forwards.
/// The newest candle closes exactly at `now`.
fn backfill(
    rng: &mut StdRng,
    seed_price: f64,
    volatility: f64,
    bucket: Duration,
    now: DateTime<Utc>,
) -> SymbolModel {
    let mut closes = vec![seed_price];
    for _ in 1..BACKFILL_CANDLES {
        let change = gauss(rng, volatility) + BACKFILL_DRIFT;
        let older = closes[closes.len() - 1] * (1.0 + change);
        closes.push(older);
    }
    closes.reverse();

    let count = closes.len();
    let mut series = VecDeque::with_capacity(count);
    for (i, &close) in closes.iter().enumerate() {
        let close_time = now - bucket * ((count - 1 - i) as i32);
        let high = close * (1.0 + gauss(rng, 0.5 * volatility).abs());
        let low = close * (1.0 - gauss(rng, 0.5 * volatility).abs());
        let open_raw = close * (1.0 + gauss(rng, 0.3 * volatility));

        series.push_back(Candle {
            open_time: close_time - bucket,
            close_time,
            open: open_raw.clamp(low, high),
            high,
            low,
            close,
            volume: rng.gen_range(100.0..10000.0),
        });
    }

    SymbolModel {
        price: seed_price,
        volatility,
        series,
    }
}

/// Append a candle once the current bucket has fully elapsed.
/// The new candle opens at the previous close, so the series never gaps.
fn roll_candle(rng: &mut StdRng, model: &mut SymbolModel, bucket: Duration, now: DateTime<Utc>) {
    let last_close_time = match model.series.back() {
        Some(candle) => candle.close_time,
        None => return,
    };
    if now - last_close_time < bucket {
        return;
    }

    let open = model
        .series
        .back()
        .map(|candle| candle.close)
        .unwrap_or(model.price);
    let close = model.price;
    let high = close.max(open) * (1.0 + gauss(rng, 0.5 * model.volatility).abs());
    let low = close.min(open) * (1.0 - gauss(rng, 0.5 * model.volatility).abs());

    model.series.push_back(Candle {
        open_time: last_close_time,
        close_time: last_close_time + bucket,
        open,
        high,
        low,
        close,
        volume: rng.gen_range(100.0..10000.0),
    });

    while model.series.len() > SERIES_CAPACITY {
        model.series.pop_front();
    }
}

fn gauss(rng: &mut StdRng, sigma: f64) -> f64 {
    match Normal::new(0.0, sigma) {
        Ok(normal) => normal.sample(rng),
        Err(_) => 0.0,
    }
}

#[async_trait]
impl MarketData for MarketSimulator {
    async fn ticker(&self, symbol: &str) -> Result<Ticker> {
        let mut state = self.state.lock().unwrap();
        let now = self.clock.now();
        self.advance(&mut state, now);
        self.ensure_symbol(&mut state, symbol, now);

        let model = state
            .models
            .get(symbol)
            .ok_or_else(|| BotError::DataUnavailable(format!("no simulated market for {symbol}")))?;

        Ok(Ticker {
            symbol: symbol.to_string(),
            last_price: model.price,
            bid_price: model.price * 0.999,
            ask_price: model.price * 1.001,
        })
    }

    /// The simulator keeps one series per symbol at its configured
    /// bucket width; the requested interval is not re-sampled.
    async fn klines(
        &self,
        symbol: &str,
        _interval: KlineInterval,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let mut state = self.state.lock().unwrap();
        let now = self.clock.now();
        self.advance(&mut state, now);
        self.ensure_symbol(&mut state, symbol, now);

        let model = state
            .models
            .get(symbol)
            .ok_or_else(|| BotError::DataUnavailable(format!("no simulated market for {symbol}")))?;

        let skip = model.series.len().saturating_sub(limit);
        Ok(model.series.iter().skip(skip).cloned().collect())
    }

    async fn sizing_precision(&self, symbol: &str) -> Result<u32> {
        Err(BotError::DataUnavailable(format!(
            "no exchange metadata for {symbol} in simulation"
        )))
    }

    async fn top_symbols(&self, limit: usize) -> Result<Vec<String>> {
        let mut state = self.state.lock().unwrap();
        let now = self.clock.now();
        self.advance(&mut state, now);
        for (symbol, _, _) in SEED_MARKETS {
            self.ensure_symbol(&mut state, symbol, now);
        }

        let mut ranked: Vec<(String, f64)> = state
            .models
            .iter()
            .map(|(symbol, model)| {
                let volume = model
                    .series
                    .back()
                    .map(|candle| candle.volume)
                    .unwrap_or(0.0);
                (symbol.clone(), model.price * volume)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(ranked
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
