//! Polymarket API clients
//!
//! Provides clients for both the Gamma API (market data) and CLOB API (trading).

pub mod auth;
pub mod binance;
pub mod clob;
pub mod gamma;
pub mod oracle;

pub use auth::PolymarketAuth;
pub use binance::{
    spawn_binance_tracker, BinanceAsset, BinancePriceEntry, BinancePriceManager,
    SharedBinancePrices,
};
pub use clob::{RestClient, WebSocketClient, Market, Outcome, OrderBook, PriceLevel, Side, OrderType, OrderArgs, TradingClient, TradingError};
pub use gamma::{GammaClient, GammaEvent, GammaMarket, GammaTag, GammaFilters};
pub use oracle::{spawn_oracle_trackers, OraclePriceManager, SharedOraclePrices, OracleType, PriceEntry, CandlestickApiClient};
