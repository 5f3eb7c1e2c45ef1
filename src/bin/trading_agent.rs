//! Trading agent entrypoint.
//!
//! Wires credentials, config, and every infrastructure client into one
//! `EngineContext`, then spawns whichever lanes the CLI flags select. The
//! 15-minute window lane runs unless `--arb-only` is passed; every other
//! lane is opt-in.

use polymarket_arb_bot::bin_common::CliArgs;
use polymarket_arb_bot::polymarket::application::engine::{
    dashboard, ArbScanner, DashboardEvent, Engine, EngineContext, HedgeEngine, JournalSinks,
    LateWindowScanner, MarketDiscovery, MarketMaker, OrderExecutor, PriceFeed, RiskManager, WindowEngine,
};
use polymarket_arb_bot::polymarket::domain::errors::FatalError;
use polymarket_arb_bot::polymarket::domain::types::Timeframe;
use polymarket_arb_bot::polymarket::infrastructure::client::gamma::GammaClient;
use polymarket_arb_bot::polymarket::infrastructure::client::oracle::{
    spawn_oracle_trackers, CandlestickApiClient,
};
use polymarket_arb_bot::polymarket::infrastructure::client::clob::TradingClient;
use polymarket_arb_bot::polymarket::infrastructure::config::{EngineConfig, PolymarketWallet};
use polymarket_arb_bot::polymarket::infrastructure::{init_tracing_with_level, ShutdownManager};
use polymarket_arb_bot::polymarket::infrastructure::performance::spawn_snapshot_writer;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const GAMMA_BASE_URL: &str = "https://gamma-api.polymarket.com";
const STALE_MS_DEFAULT: i64 = 30_000;
const SNAPSHOT_INTERVAL_SECS: u64 = 30;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() {
    let log_level = env_or("RUST_LOG", "info");
    init_tracing_with_level(&log_level);

    match run().await {
        Ok(()) => {
            info!("trading_agent: shut down gracefully");
            std::process::exit(0);
        }
        Err(e) => {
            error!(error = %e, "trading_agent: fatal startup/runtime error");
            let code = match e {
                FatalError::Config(_) | FatalError::Wallet(_) => 1,
                _ => 2,
            };
            std::process::exit(code);
        }
    }
}

async fn run() -> Result<(), FatalError> {
    let args = CliArgs::parse();

    info!("========================================");
    info!("  polymarket trading agent starting up");
    info!("========================================");

    // Fail fast on malformed wallet credentials before touching anything else.
    let wallet = PolymarketWallet::from_env().map_err(|e| FatalError::Wallet(e.to_string()))?;
    info!(funder = %wallet.funder, sig_type = ?wallet.signature_type, "wallet: credentials validated");

    let config_path = env_or("CONFIG_PATH", "config/engine_config.yaml");
    let mut config = EngineConfig::load(&config_path, args.bankroll)
        .map_err(|e| FatalError::Config(e.to_string()))?;
    if args.sync_live_bankroll {
        warn!("trading_agent: --sync-live-bankroll requested but live balance sync is not wired in this build, keeping configured bankroll");
    }
    config.log();
    let config = Arc::new(config);

    let asset_slug = env_or("ASSET_SLUG", "bitcoin");
    let candle_symbol = env_or("CANDLE_SYMBOL", "BTCUSD");
    let data_dir = env_or("DATA_DIR", "data");

    // TradingClient reads PRIVATE_KEY/PROXY_WALLET directly; the POLY_* names
    // above are a separate fail-fast validation pass, not an alternate source.
    let trading = Arc::new(
        TradingClient::from_env()
            .await
            .map_err(|e| FatalError::Wallet(e.to_string()))?,
    );
    let gamma_for_ctx = Arc::new(GammaClient::new(GAMMA_BASE_URL));
    let gamma_for_discovery = GammaClient::new(GAMMA_BASE_URL);
    let candlestick = Arc::new(
        CandlestickApiClient::from_env().map_err(|e| FatalError::Config(e.to_string()))?,
    );

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.spawn_signal_handler();

    let oracle_prices = spawn_oracle_trackers(shutdown.flag())
        .await
        .map_err(|e| FatalError::Other(e))?;
    let price_feed = PriceFeed::new(oracle_prices, asset_slug.clone(), STALE_MS_DEFAULT);
    tokio::spawn(Arc::clone(&price_feed).spawn_primary(shutdown.flag()));

    for source in &config.secondary_sources {
        tokio::spawn(Arc::clone(&price_feed).spawn_secondary(
            source.name.clone(),
            source.url.clone(),
            source.poll_secs,
            source.price_field.clone(),
            shutdown.flag(),
        ));
    }

    let risk = Arc::new(RiskManager::new(config.bankroll_usd, &config.risk_buckets));
    let executor = Arc::new(OrderExecutor::new(
        Arc::clone(&trading),
        Arc::clone(&price_feed),
        config.guardian_bps_threshold,
        config.fok_timeout_ms,
    ));
    let discovery = Arc::new(MarketDiscovery::new(gamma_for_discovery, asset_slug.clone()));
    let journals = Arc::new(
        JournalSinks::open(&data_dir).map_err(|e| FatalError::Storage(e.to_string()))?,
    );

    let dashboard_tx = if config.dashboard.enabled || args.dashboard {
        Some(tokio::sync::broadcast::channel(1024).0)
    } else {
        None
    };

    let ctx = Arc::new(EngineContext {
        config: Arc::clone(&config),
        price_feed: Arc::clone(&price_feed),
        executor,
        risk: Arc::clone(&risk),
        trading,
        gamma: gamma_for_ctx,
        candlestick,
        discovery,
        journals,
        shutdown: Arc::clone(&shutdown),
        dashboard_tx,
    });

    let snapshot_path = std::path::PathBuf::from(&data_dir).join("performance.json");
    tokio::spawn(spawn_snapshot_writer(
        Arc::clone(&risk),
        config.bankroll_usd,
        snapshot_path,
        Duration::from_secs(SNAPSHOT_INTERVAL_SECS),
        shutdown.flag(),
    ));

    if config.dashboard.enabled || args.dashboard {
        let dash_ctx = Arc::clone(&ctx);
        let port = config.dashboard.port;
        tokio::spawn(dashboard::spawn(dash_ctx, port));

        let tick_ctx = Arc::clone(&ctx);
        let tick_asset = asset_slug.clone();
        tokio::spawn(async move {
            let shutdown = tick_ctx.shutdown_flag();
            let mut rx = tick_ctx.price_feed.subscribe();
            while shutdown.load(std::sync::atomic::Ordering::Acquire) {
                match rx.recv().await {
                    Ok(tick) => tick_ctx.publish(DashboardEvent::Tick {
                        asset: tick_asset.clone(),
                        price: tick.price,
                        observed_at: tick.observed_at,
                    }),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    let mut handles = Vec::new();

    if args.fifteen_min_enabled() {
        handles.push(spawn_engine(
            Arc::new(WindowEngine::new(Timeframe::FifteenMin, asset_slug.clone(), candle_symbol.clone())),
            Arc::clone(&ctx),
        ));
    }
    if args.five_min {
        handles.push(spawn_engine(
            Arc::new(WindowEngine::new(Timeframe::FiveMin, asset_slug.clone(), candle_symbol.clone())),
            Arc::clone(&ctx),
        ));
    }
    if args.arb || args.arb_only {
        handles.push(spawn_engine(Arc::new(ArbScanner::new(asset_slug.clone())), Arc::clone(&ctx)));
    }
    if args.late_window {
        handles.push(spawn_engine(Arc::new(LateWindowScanner::new(candle_symbol.clone())), Arc::clone(&ctx)));
    }
    if args.mm {
        handles.push(spawn_engine(Arc::new(MarketMaker), Arc::clone(&ctx)));
    }
    if args.hedge {
        handles.push(spawn_engine(Arc::new(HedgeEngine), Arc::clone(&ctx)));
    }

    info!(lanes = handles.len(), "trading_agent: engines spawned, running until shutdown");

    while shutdown.is_running() {
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    info!("trading_agent: shutdown signal received, waiting up to 5s for lanes to stop");
    let join_all = futures::future::join_all(handles);
    if tokio::time::timeout(Duration::from_secs(5), join_all).await.is_err() {
        warn!("trading_agent: lanes did not stop within 5s, proceeding to best-effort cleanup");
    }

    if let Err(e) = ctx.executor.cancel_all().await {
        warn!(error = %e, "trading_agent: best-effort cancel-all on shutdown failed");
    }

    Ok(())
}

fn spawn_engine(
    engine: Arc<dyn Engine>,
    ctx: Arc<EngineContext>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let name = engine.name();
        info!(engine = name, "trading_agent: lane starting");
        if let Err(e) = engine.start(ctx).await {
            error!(engine = name, error = %e, "trading_agent: lane exited with fatal error");
        }
        engine.stop().await;
        info!(engine = name, "trading_agent: lane stopped");
    })
}
