//! Domain Layer
//!
//! Pure business entities. No dependency on infrastructure or application.

pub mod errors;
pub mod orderbook;
pub mod types;

pub use errors::{DataQualityError, ExecutionError, FatalError, RiskVeto, SignalVeto, TransientError};
pub use orderbook::{micros_to_f64, price_to_micros, Orderbook, OrderbookSide, PriceLevel};
pub use types::{
    ArbOpportunity, Candle, Direction, Order, OrderKind, OrderStatus, Position, RiskBucket, Side,
    Signal, Tick, Timeframe, Window, WindowState,
};
