//! Error taxonomy shared across engines.
//!
//! Mirrors the five-way split a running agent needs to act on differently:
//! transient errors retry, data-quality errors widen the dead zone, signal
//! and risk vetoes are expected no-ops, execution errors fall back or abort
//! the leg, and fatal errors stop the process.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransientError {
    #[error("oracle connection dropped: {0}")]
    OracleDisconnected(String),

    #[error("REST call to {endpoint} timed out after {timeout_secs}s")]
    RequestTimeout { endpoint: String, timeout_secs: u64 },

    #[error("rate limited by {endpoint}, retry after {retry_after_secs}s")]
    RateLimited { endpoint: String, retry_after_secs: u64 },
}

#[derive(Error, Debug)]
pub enum DataQualityError {
    #[error("primary/secondary price spread {spread_pct:.2}% exceeds tolerance")]
    SourceDivergence { spread_pct: f64 },

    #[error("no fresh tick within staleness window ({age_secs}s old)")]
    StaleTick { age_secs: u64 },

    #[error("insufficient candle history: have {have}, need {need}")]
    InsufficientHistory { have: usize, need: usize },
}

#[derive(Error, Debug)]
pub enum SignalVeto {
    #[error("price move {move_pct:.3}% within dead zone ({dead_zone_pct:.3}%)")]
    DeadZone { move_pct: f64, dead_zone_pct: f64 },

    #[error("only {agreement}/{needed} indicators agree with direction")]
    InsufficientAgreement { agreement: u8, needed: u8 },

    #[error("fee-adjusted edge {edge_pct:.3}% below confidence threshold {threshold_pct:.3}%")]
    EdgeBelowThreshold { edge_pct: f64, threshold_pct: f64 },

    #[error("realized volatility {vol:.4} outside tradeable band [{min:.4}, {max:.4}]")]
    VolatilityGate { vol: f64, min: f64, max: f64 },
}

#[derive(Error, Debug)]
pub enum RiskVeto {
    #[error("bucket '{bucket}' has only ${remaining:.2} remaining, need ${requested:.2}")]
    InsufficientBankroll { bucket: String, remaining: f64, requested: f64 },

    #[error("bucket '{bucket}' hit daily trade cap ({max_trades})")]
    TradeCapReached { bucket: String, max_trades: u32 },

    #[error("bucket '{bucket}' in cooldown until {until}")]
    Cooldown { bucket: String, until: String },

    #[error("bucket '{bucket}' hit daily loss cap (-${cap:.2})")]
    DailyLossCapReached { bucket: String, cap: f64 },
}

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("order rejected by venue: {0}")]
    Rejected(String),

    #[error("fill-or-kill order {order_id} unfilled, falling back to GTC")]
    FokUnfilled { order_id: String },

    #[error("fill reported for {order_id} but not confirmed on status poll (phantom fill)")]
    PhantomFill { order_id: String },

    #[error("cancel failed for {order_id}: {reason}")]
    CancelFailed { order_id: String, reason: String },
}

#[derive(Error, Debug)]
pub enum FatalError {
    #[error("config invalid: {0}")]
    Config(String),

    #[error("wallet credentials invalid or missing: {0}")]
    Wallet(String),

    #[error("persistence write failed unrecoverably: {0}")]
    Storage(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}
