//! Polymarket Trading Agent
//!
//! Drift-dominant trading agent for Polymarket's "Up or Down" crypto prediction
//! windows, plus a cross-timeframe arbitrage scanner.

// Core layers (Clean Architecture)
pub mod domain;
pub mod infrastructure;
pub mod application;

// Re-export commonly used items from infrastructure
pub use infrastructure::{
    PolymarketAuth,
    client::{
        gamma::{GammaClient, GammaEvent, GammaMarket, GammaTag, GammaFilters},
        clob::{
            RestClient, WebSocketClient, Market, Outcome, OrderBook, PriceLevel, Side, OrderType,
            OrderArgs, TradingClient, TradingError,
        },
    },
    init_tracing, ShutdownManager,
};

// Re-export from application layer
pub use application::engine::{
    dashboard, ArbScanner, DashboardEvent, Engine, EngineContext, JournalSinks, LateWindowScanner,
    MarketDiscovery, OrderExecutor, PriceFeed, RiskManager, SignalEngine, WindowEngine,
};

// Re-export from domain layer
pub use domain::{
    ArbOpportunity, Candle, Direction, Order, OrderKind, OrderStatus, Position, RiskBucket, Side as
    DomainSide, Signal, Tick, Timeframe, Window, WindowState,
};
