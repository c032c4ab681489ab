use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

use dipbot::api::BinanceClient;
use dipbot::engine::{SystemClock, TradingBot};
use dipbot::market::{MarketData, MarketSimulator};
use dipbot::BotConfig;

const SUMMARY_INTERVAL_SECS: u64 = 60;

#[derive(Parser, Debug)]
#[command(name = "dipbot", version, about = "Buys oversold dips, sells small bounces")]
struct Cli {
    /// Trade against the real exchange instead of the simulator
    #[arg(long)]
    live: bool,

    /// Comma-separated coins to watch (default: top coins by volume)
    #[arg(long, value_delimiter = ',')]
    symbols: Vec<String>,

    /// How many coins to watch when --symbols is not given
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();

    let mut config = BotConfig::load(cli.config.as_deref())?;
    if cli.live {
        config.live = true;
    }

    tracing::info!("🚀 dipbot starting {}", config.mode_tag());
    tracing::info!("📊 Configuration:");
    tracing::info!("  Notional per trade: ${:.2}", config.usdt_per_trade);
    tracing::info!("  Max positions: {}", config.max_positions);
    tracing::info!(
        "  Take profit / stop loss: {:+.1}% / {:+.1}%",
        config.take_profit_pct,
        config.stop_loss_pct
    );
    tracing::info!(
        "  RSI {} < {:.0}, MACD {}/{}/{}, {} candles",
        config.rsi_period,
        config.rsi_oversold,
        config.macd_fast,
        config.macd_slow,
        config.macd_signal,
        config.timeframe
    );

    let market = build_market(&config)?;
    let watch = resolve_watch_list(&cli, market.as_ref()).await?;

    let bot = Arc::new(TradingBot::new(
        config,
        Arc::clone(&market),
        Arc::new(SystemClock),
    ));
    bot.clone().start(watch)?;

    tracing::info!("Press Ctrl+C to stop...\n");

    let mut summary = tokio::time::interval(std::time::Duration::from_secs(SUMMARY_INTERVAL_SECS));
    summary.set_missed_tick_behavior(MissedTickBehavior::Skip);
    summary.tick().await; // the first tick fires immediately

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("⚠️  Received Ctrl+C, shutting down...");
                break;
            }
            _ = summary.tick() => {
                bot.log_summary().await;
            }
        }
    }

    bot.stop().await;

    let stats = bot.performance_stats();
    tracing::info!(
        "📊 Final: {} trades ({} wins / {} losses), win rate {:.0}%, cumulative {:+.2}%",
        stats.total_trades,
        stats.winning_trades,
        stats.losing_trades,
        stats.win_rate,
        stats.total_profit_pct
    );
    for trade in bot.trade_history() {
        tracing::info!(
            "  {} {:+.2}% (${:+.2})",
            trade.symbol,
            trade.profit_pct,
            trade.profit_amount
        );
    }

    tracing::info!("👋 dipbot stopped");
    Ok(())
}

fn setup_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dipbot=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_market(config: &BotConfig) -> anyhow::Result<Arc<dyn MarketData>> {
    let market: Arc<dyn MarketData> = if config.live {
        tracing::info!("Connecting to Binance spot API");
        Arc::new(BinanceClient::new()?)
    } else {
        tracing::info!("Using the market simulator (pass --live to trade for real)");
        Arc::new(MarketSimulator::new(Arc::new(SystemClock), config.timeframe))
    };
    Ok(market)
}

async fn resolve_watch_list(cli: &Cli, market: &dyn MarketData) -> anyhow::Result<Vec<String>> {
    if !cli.symbols.is_empty() {
        return Ok(cli.symbols.clone());
    }

    tracing::info!("🔍 No symbols given, ranking top {} by volume...", cli.top);
    let top = market.top_symbols(cli.top).await?;
    tracing::info!("  ✓ Watching: {}", top.join(", "));
    Ok(top)
}
