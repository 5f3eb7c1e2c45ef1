//! Core domain entities for the window trading agent
//!
//! Pure data types shared by every engine. No I/O, no locking — just the
//! shapes the rest of the crate passes around.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the fixed window durations the scheduler runs lanes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    FifteenMin,
    FiveMin,
}

impl Timeframe {
    pub fn minutes(&self) -> i64 {
        match self {
            Timeframe::FifteenMin => 15,
            Timeframe::FiveMin => 5,
        }
    }

    pub fn bucket_key(&self) -> &'static str {
        match self {
            Timeframe::FifteenMin => "15m",
            Timeframe::FiveMin => "5m",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bucket_key())
    }
}

/// A single observed oracle price, folded with its secondary corroborators.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Tick {
    pub price: f64,
    pub observed_at: DateTime<Utc>,
    /// Spread between primary and the widest secondary source, in price units.
    pub source_spread: f64,
}

/// A closed or in-progress candle for a given timeframe, used by SignalEngine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub opened_at: DateTime<Utc>,
}

/// Lifecycle stage of a [`Window`] as it moves through the per-window pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowState {
    /// Discovered, waiting for its opening boundary.
    Pending,
    /// Opening price latched; waiting out the strategy delay.
    Anchored,
    /// SignalEngine has produced a verdict (actionable or hold).
    Evaluated,
    /// An order has been submitted for this window.
    Ordered,
    /// Window resolved and, if a position was opened, P&L realized.
    Resolved,
    /// Window closed out without a trade (data quality, signal veto, risk veto).
    Skipped,
}

/// A tradeable up-or-down window for one market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Window {
    pub market_id: String,
    pub timeframe: Timeframe,
    pub yes_token_id: String,
    pub no_token_id: String,
    pub open_price: f64,
    pub opens_at: DateTime<Utc>,
    pub resolves_at: DateTime<Utc>,
    pub state: WindowState,
    /// Price latched at the anchor point (opens_at + entry_lead), once observed.
    pub anchor_price: Option<f64>,
    pub anchor_observed_at: Option<DateTime<Utc>>,
}

impl Window {
    pub fn new(
        market_id: impl Into<String>,
        timeframe: Timeframe,
        yes_token_id: impl Into<String>,
        no_token_id: impl Into<String>,
        open_price: f64,
        opens_at: DateTime<Utc>,
        resolves_at: DateTime<Utc>,
    ) -> Self {
        Self {
            market_id: market_id.into(),
            timeframe,
            yes_token_id: yes_token_id.into(),
            no_token_id: no_token_id.into(),
            open_price,
            opens_at,
            resolves_at,
            state: WindowState::Pending,
            anchor_price: None,
            anchor_observed_at: None,
        }
    }

    /// Stable identity for a window, unique within a scheduling run.
    pub fn window_id(&self) -> String {
        format!(
            "{}:{}:{}",
            self.market_id,
            self.timeframe.bucket_key(),
            self.opens_at.timestamp()
        )
    }

    pub fn anchor(&mut self, price: f64, at: DateTime<Utc>) {
        self.anchor_price = Some(price);
        self.anchor_observed_at = Some(at);
        self.state = WindowState::Anchored;
    }

    /// Seconds remaining until resolution, clamped at zero.
    pub fn time_to_resolve(&self, now: DateTime<Utc>) -> i64 {
        (self.resolves_at - now).num_seconds().max(0)
    }
}

/// Directional call produced by SignalEngine, not yet risk-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

/// Scored signal output, carrying the component breakdown for diagnostics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Signal {
    pub direction: Direction,
    /// Combined weighted score in [-1.0, 1.0]; sign gives direction, magnitude gives confidence.
    pub score: f64,
    pub price_vs_open: f64,
    pub momentum: f64,
    pub rsi: f64,
    pub macd_hist: f64,
    pub ema_cross: f64,
    /// Number of component indicators agreeing with `direction`.
    pub agreement: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    FillOrKill,
    GoodTilCancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Filled,
    PartiallyFilled,
    Cancelled,
    /// Reported live but a later status poll found no matching fill.
    Phantom,
}

/// An order submitted on behalf of a window trade or arb leg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub market_id: String,
    pub token_id: String,
    pub side: Side,
    pub kind: OrderKind,
    pub price: f64,
    pub size_usd: f64,
    pub status: OrderStatus,
    pub submitted_at: DateTime<Utc>,
    pub bucket: String,
}

/// A filled or resolved position tracked for P&L purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub market_id: String,
    pub bucket: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub size_usd: f64,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub realized_pnl_usd: Option<f64>,
}

/// Per-lane risk state: one bucket per {15m, 5m, late_window, arb, mm}.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskBucket {
    pub name: String,
    pub bankroll_cap_usd: f64,
    pub used_usd: f64,
    pub trades_today: u32,
    pub max_trades: u32,
    pub loss_streak: u32,
    pub max_streak: u32,
    pub realized_pnl_today_usd: f64,
    pub daily_loss_cap_pct: f64,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub last_reset_date: NaiveDate,
}

impl RiskBucket {
    pub fn new(name: impl Into<String>, bankroll_cap_usd: f64, max_trades: u32, max_streak: u32, daily_loss_cap_pct: f64) -> Self {
        Self {
            name: name.into(),
            bankroll_cap_usd,
            used_usd: 0.0,
            trades_today: 0,
            max_trades,
            loss_streak: 0,
            max_streak,
            realized_pnl_today_usd: 0.0,
            daily_loss_cap_pct,
            cooldown_until: None,
            last_reset_date: Utc::now().date_naive(),
        }
    }

    pub fn remaining_usd(&self) -> f64 {
        (self.bankroll_cap_usd - self.used_usd).max(0.0)
    }

    pub fn daily_loss_cap_usd(&self) -> f64 {
        self.bankroll_cap_usd * self.daily_loss_cap_pct
    }
}

/// A detected cross-timeframe arbitrage: yes + no priced under the threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbOpportunity {
    pub market_id: String,
    pub yes_token_id: String,
    pub no_token_id: String,
    pub yes_price: f64,
    pub no_price: f64,
    pub sum: f64,
    pub edge_pct: f64,
    pub detected_at: DateTime<Utc>,
}
