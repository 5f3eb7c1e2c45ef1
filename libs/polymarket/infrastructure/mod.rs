//! Infrastructure Layer
//!
//! Contains implementations of external interfaces (database, API clients, etc.)
//! This layer depends on the domain layer but not on the application layer.

pub mod active_order_manager;
pub mod client;
pub mod config;
pub mod logging;
pub mod performance;
pub mod shutdown;

// Re-export commonly used types from client
pub use client::{
    clob::{
        Market, OrderArgs, OrderBook, OrderType, Outcome, PriceLevel, RestClient, Side,
        TradingClient, TradingError, WebSocketClient,
    },
    gamma::{GammaClient, GammaEvent, GammaFilters, GammaMarket, GammaTag},
    oracle::{
        spawn_oracle_trackers, OraclePriceManager, OracleType, PriceEntry, SharedOraclePrices,
    },
    binance::{
        spawn_binance_tracker, BinanceAsset, BinancePriceEntry, BinancePriceManager,
        SharedBinancePrices,
    },
    PolymarketAuth,
};

// Re-export infrastructure services
pub use active_order_manager::{ActiveOrder, ActiveOrderManager};
pub use logging::{init_tracing, init_tracing_with_level, JsonlSink};
pub use performance::{spawn_snapshot_writer, PerformanceSnapshot};
pub use shutdown::ShutdownManager;
