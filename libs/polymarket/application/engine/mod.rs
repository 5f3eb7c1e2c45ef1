//! Engine lifecycle and shared run context.
//!
//! `Engine` is the tagged-union capability surface the orchestrator addresses
//! lanes through: window engines, scanners, and the two stub lanes all
//! implement the same `{name, start, stop}` contract so the binary entrypoint
//! can spawn whichever set the CLI flags select without special-casing any
//! one of them.

pub mod arb;
pub mod dashboard;
pub mod discovery;
pub mod executor;
pub mod late_window;
pub mod price_feed;
pub mod risk;
pub mod signal;
pub mod stub;
pub mod window;

pub use arb::ArbScanner;
pub use discovery::{MarketDiscovery, ResolvedMarket};
pub use executor::{ExecutionOutcome, OrderExecutor};
pub use late_window::LateWindowScanner;
pub use price_feed::{FeedStatus, PriceFeed, Reconciled};
pub use risk::RiskManager;
pub use signal::SignalOutcome;
pub use stub::{HedgeEngine, MarketMaker};
pub use window::WindowEngine;

use crate::domain::errors::FatalError;
use crate::infrastructure::client::clob::TradingClient;
use crate::infrastructure::client::gamma::GammaClient;
use crate::infrastructure::client::oracle::CandlestickApiClient;
use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::logging::JsonlSink;
use crate::infrastructure::ShutdownManager;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// A free function view of `signal::evaluate`, kept as a type alias rather
/// than a struct so pure signal math stays free of engine plumbing; `mod.rs`
/// re-exports the symbol under this name to satisfy the capability-surface
/// naming the orchestrator uses (`SignalEngine` alongside `PriceFeed`,
/// `RiskManager`, `OrderExecutor`).
pub struct SignalEngine;

impl SignalEngine {
    pub fn evaluate(
        config: &crate::infrastructure::config::SignalConfig,
        anchor_price: f64,
        current_price: f64,
        candles: &[crate::domain::types::Candle],
        expected_payout: f64,
        estimated_fee: f64,
    ) -> Result<SignalOutcome, crate::domain::errors::DataQualityError> {
        signal::evaluate(config, anchor_price, current_price, candles, expected_payout, estimated_fee)
    }

    pub fn passes_confidence(
        s: &crate::domain::types::Signal,
        threshold_pct: f64,
    ) -> Result<(), crate::domain::errors::SignalVeto> {
        signal::passes_confidence(s, threshold_pct)
    }
}

/// The four append-only structured streams every lane writes to.
pub struct JournalSinks {
    pub trades: JsonlSink,
    pub strategy: JsonlSink,
    pub oracle: JsonlSink,
    pub errors: JsonlSink,
}

impl JournalSinks {
    pub fn open(dir: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            trades: JsonlSink::open(dir.join("trades.jsonl"))?,
            strategy: JsonlSink::open(dir.join("strategy.jsonl"))?,
            oracle: JsonlSink::open(dir.join("oracle.jsonl"))?,
            errors: JsonlSink::open(dir.join("errors.jsonl"))?,
        })
    }
}

/// Shared handles constructed once at startup and passed by reference to
/// every `Engine::start`. No process-wide singleton: everything here is
/// behind an `Arc`, owned by the binary entrypoint.
pub struct EngineContext {
    pub config: Arc<EngineConfig>,
    pub price_feed: Arc<PriceFeed>,
    pub executor: Arc<OrderExecutor>,
    pub risk: Arc<RiskManager>,
    pub trading: Arc<TradingClient>,
    pub gamma: Arc<GammaClient>,
    pub candlestick: Arc<CandlestickApiClient>,
    pub discovery: Arc<MarketDiscovery>,
    pub journals: Arc<JournalSinks>,
    pub shutdown: Arc<ShutdownManager>,
    pub dashboard_tx: Option<tokio::sync::broadcast::Sender<DashboardEvent>>,
}

impl EngineContext {
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.flag()
    }

    pub fn publish(&self, event: DashboardEvent) {
        if let Some(tx) = &self.dashboard_tx {
            let _ = tx.send(event);
        }
    }
}

/// Events broadcast to the dashboard's push-only WebSocket.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardEvent {
    Tick { asset: String, price: f64, observed_at: chrono::DateTime<chrono::Utc> },
    Trade { bucket: String, market_id: String, direction: String, size_usd: f64 },
    EngineStatus { engine: String, status: String },
}

/// Capability surface every lane implements. `start` is expected to run
/// until `ctx.shutdown` signals false; `stop` performs any best-effort
/// cleanup (order cancellation) beyond what the shutdown signal alone
/// triggers.
#[async_trait::async_trait]
pub trait Engine: Send + Sync {
    fn name(&self) -> &'static str;

    async fn start(&self, ctx: Arc<EngineContext>) -> Result<(), FatalError>;

    async fn stop(&self) {}
}
