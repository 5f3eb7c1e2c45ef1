//! Window scheduler/orchestrator — one instance per timeframe (15m, 5m).
//!
//! Owns the wall-clock boundary loop and the seven-phase per-window
//! pipeline: sleep to anchor point, anchor, strategy delay, evaluate, risk,
//! execute, resolve. Each window's pipeline runs as its own task once
//! spawned so the scheduler loop can move straight on to computing the next
//! boundary rather than blocking on a single window's resolution.

use super::{Engine, EngineContext};
use crate::domain::errors::FatalError;
use crate::domain::types::{Candle, Direction, Timeframe};
use crate::infrastructure::client::oracle::CandlestickCandle;
use chrono::{DateTime, Timelike, Utc};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const ANCHOR_POLL_INTERVAL_MS: u64 = 200;
const ANCHOR_POLL_BUDGET_MS: u64 = 2000;
const SLIPPAGE_BAND: f64 = 0.02;
const CANDLE_LOOKBACK_MINS: i64 = 60;

pub struct WindowEngine {
    timeframe: Timeframe,
    /// Gamma slug fragment identifying the asset (e.g. "bitcoin").
    asset_slug: String,
    /// ChainLink candlestick symbol (e.g. "BTCUSD").
    candle_symbol: String,
}

impl WindowEngine {
    pub fn new(timeframe: Timeframe, asset_slug: impl Into<String>, candle_symbol: impl Into<String>) -> Self {
        Self { timeframe, asset_slug: asset_slug.into(), candle_symbol: candle_symbol.into() }
    }

    fn bucket(&self) -> &'static str {
        self.timeframe.bucket_key()
    }

    /// Next UTC minute boundary evenly divisible by the timeframe's minutes,
    /// strictly after `now`.
    fn next_boundary(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let step = self.timeframe.minutes();
        let floor = now
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(now);
        let minute = floor.minute() as i64;
        let next_minute = ((minute / step) + 1) * step;
        let add_mins = next_minute - minute;
        floor + chrono::Duration::minutes(add_mins)
    }

    /// The 5m lane shares every third boundary with the 15m lane and must
    /// yield rather than duplicate work there.
    fn shares_fifteen_minute_boundary(&self, boundary: DateTime<Utc>) -> bool {
        matches!(self.timeframe, Timeframe::FiveMin) && boundary.minute() % 15 == 0
    }

    async fn sleep_until(&self, shutdown: &std::sync::atomic::AtomicBool, at: DateTime<Utc>) -> bool {
        loop {
            let remaining = (at - Utc::now()).num_milliseconds();
            if remaining <= 0 {
                return true;
            }
            if !shutdown.load(Ordering::Acquire) {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(remaining.min(1000) as u64)).await;
        }
    }

    async fn wait_for_anchor(ctx: &EngineContext) -> Option<(f64, DateTime<Utc>)> {
        let mut waited_ms = 0u64;
        loop {
            if let super::FeedStatus::Fresh(tick) = ctx.price_feed.latest() {
                return Some((tick.price, tick.observed_at));
            }
            if waited_ms >= ANCHOR_POLL_BUDGET_MS {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(ANCHOR_POLL_INTERVAL_MS)).await;
            waited_ms += ANCHOR_POLL_INTERVAL_MS;
        }
    }

    async fn recent_candles(&self, ctx: &EngineContext, now: DateTime<Utc>) -> Vec<Candle> {
        let symbol = self.candle_symbol.clone();
        let candlestick = Arc::clone(&ctx.candlestick);
        let from = now.timestamp() - CANDLE_LOOKBACK_MINS * 60;
        let to = now.timestamp();
        let raw = tokio::task::spawn_blocking(move || candlestick.get_candles(&symbol, "1m", from, to))
            .await
            .unwrap_or_else(|e| Err(anyhow::anyhow!(e)));

        match raw {
            Ok(candles) => candles.iter().map(convert_candle).collect(),
            Err(e) => {
                warn!(error = %e, "window: candle history fetch failed");
                Vec::new()
            }
        }
    }

    async fn run_pipeline(&self, ctx: Arc<EngineContext>, boundary: DateTime<Utc>) {
        let bucket = self.bucket();
        let scheduler_cfg = ctx.config.scheduler_config(bucket);
        let anchor_at = boundary - chrono::Duration::seconds(scheduler_cfg.entry_lead_secs as i64);

        let shutdown = ctx.shutdown_flag();
        if !self.sleep_until(&shutdown, anchor_at).await {
            return;
        }

        let resolved = match ctx.discovery.find_window_market(self.timeframe, boundary).await {
            Ok(m) => m,
            Err(e) => {
                self.log_skip(&ctx, boundary, "no_market", &e.to_string());
                return;
            }
        };

        let (anchor_price, anchor_at_observed) = match Self::wait_for_anchor(&ctx).await {
            Some(v) => v,
            None => {
                self.log_skip(&ctx, boundary, "no_anchor", "no fresh tick within 2s");
                return;
            }
        };

        info!(
            timeframe = %self.timeframe,
            market_id = %resolved.market_id,
            anchor_price,
            "window: anchored"
        );

        tokio::time::sleep(Duration::from_secs(scheduler_cfg.strategy_delay_secs)).await;
        if !shutdown.load(Ordering::Acquire) {
            return;
        }

        let (current_price, _) = match Self::wait_for_anchor(&ctx).await {
            Some(v) => v,
            None => {
                self.log_skip(&ctx, boundary, "no_anchor", "no fresh tick at evaluation");
                return;
            }
        };

        let candles = self.recent_candles(&ctx, Utc::now()).await;
        let signal_cfg = ctx.config.signal_config(bucket);
        let expected_payout = self.expected_payout(&ctx, &resolved).await;
        let estimated_fee = ctx.executor.estimated_fee();

        let outcome = match super::SignalEngine::evaluate(
            &signal_cfg,
            anchor_price,
            current_price,
            &candles,
            expected_payout,
            estimated_fee,
        ) {
            Ok(o) => o,
            Err(e) => {
                self.log_skip(&ctx, boundary, "data_quality", &e.to_string());
                return;
            }
        };

        let signal = match outcome {
            super::SignalOutcome::Actionable(s) => s,
            super::SignalOutcome::Hold { reason, .. } => {
                self.log_skip(&ctx, boundary, "signal", reason);
                return;
            }
        };

        if let Err(e) = super::SignalEngine::passes_confidence(&signal, signal_cfg.confidence_threshold_pct) {
            self.log_skip(&ctx, boundary, "signal", &e.to_string());
            return;
        }

        let confidence = signal.score.abs().min(1.0);
        let bucket_cfg = match ctx.config.risk_buckets.get(bucket) {
            Some(c) => c,
            None => {
                warn!(bucket, "window: no risk bucket configured, skipping");
                return;
            }
        };

        let size_usd = match ctx.risk.size(bucket, confidence, ctx.config.bankroll_usd, bucket_cfg.kelly_fraction, Utc::now()) {
            Ok(s) => s,
            Err(e) => {
                self.log_skip(&ctx, boundary, "risk", &e.to_string());
                return;
            }
        };

        let token_id = match signal.direction {
            Direction::Up => resolved.yes_token_id.clone(),
            Direction::Down => resolved.no_token_id.clone(),
        };

        let limit_price = self.limit_price_for(&ctx, &token_id).await;

        let entry_window = Duration::from_secs(scheduler_cfg.entry_window_secs);
        let submit = ctx.executor.submit(&token_id, crate::domain::types::Side::Buy, Some(anchor_price), limit_price, size_usd);
        let outcome = match tokio::time::timeout(entry_window, submit).await {
            Ok(Ok(o)) => o,
            Ok(Err(e)) => {
                warn!(market_id = %resolved.market_id, error = %e, "window: execution error");
                return;
            }
            Err(_) => {
                warn!(market_id = %resolved.market_id, "window: entry window expired before submission resolved");
                return;
            }
        };

        ctx.risk.reserve(bucket, size_usd);
        ctx.publish(super::DashboardEvent::Trade {
            bucket: bucket.to_string(),
            market_id: resolved.market_id.clone(),
            direction: signal.direction_display().to_string(),
            size_usd,
        });
        ctx.journals.trades.write(&TradeRecord {
            market_id: resolved.market_id.clone(),
            bucket: bucket.to_string(),
            direction: signal.direction_display().to_string(),
            anchor_price,
            limit_price,
            size_usd,
            submitted_at: Utc::now(),
        }).ok();

        let (order_id, filled_size) = match outcome {
            super::ExecutionOutcome::Filled { order_id, filled_size } => (order_id, filled_size),
            super::ExecutionOutcome::Phantom { order_id } => {
                warn!(order_id, "window: phantom fill, not tracking a position");
                return;
            }
        };

        self.resolve(&ctx, bucket, bucket_cfg.cooldown_mins, resolved, signal.direction, anchor_price, limit_price, filled_size, order_id, anchor_at_observed).await;
    }

    async fn expected_payout(&self, ctx: &EngineContext, resolved: &super::ResolvedMarket) -> f64 {
        match ctx.trading.rest().get_orderbook(&resolved.yes_token_id).await {
            Ok(book) => match book.best_ask() {
                Some(level) if level.price_f64() > 0.0 => 1.0 / level.price_f64(),
                _ => 2.0,
            },
            Err(_) => 2.0,
        }
    }

    async fn limit_price_for(&self, ctx: &EngineContext, token_id: &str) -> f64 {
        match ctx.trading.rest().get_orderbook(token_id).await {
            Ok(book) => match book.best_ask() {
                Some(level) => (level.price_f64() + SLIPPAGE_BAND).min(0.99),
                None => 0.5 + SLIPPAGE_BAND,
            },
            Err(_) => 0.5 + SLIPPAGE_BAND,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn resolve(
        &self,
        ctx: &EngineContext,
        bucket: &str,
        cooldown_mins: u64,
        resolved: super::ResolvedMarket,
        direction: Direction,
        anchor_price: f64,
        limit_price: f64,
        filled_size: f64,
        order_id: String,
        _anchor_observed_at: DateTime<Utc>,
    ) {
        let shutdown = ctx.shutdown_flag();
        if !self.sleep_until(&shutdown, resolved.resolves_at).await {
            return;
        }

        let settle_price = match ctx.price_feed.latest() {
            super::FeedStatus::Fresh(tick) => tick.price,
            super::FeedStatus::Stale => anchor_price,
        };

        let went_up = settle_price > anchor_price;
        let went_down = settle_price < anchor_price;
        let won = (direction == Direction::Up && went_up) || (direction == Direction::Down && went_down);
        let pushed = !went_up && !went_down;

        let stake = limit_price * filled_size;
        if pushed {
            ctx.risk.record_push(bucket);
        } else if won {
            let pnl = filled_size - stake;
            ctx.risk.record_win(bucket, pnl);
        } else {
            ctx.risk.record_loss(bucket, -stake, cooldown_mins, Utc::now());
        }

        info!(
            order_id,
            market_id = %resolved.market_id,
            anchor_price,
            settle_price,
            won,
            pushed,
            "window: resolved"
        );
    }

    fn log_skip(&self, ctx: &EngineContext, boundary: DateTime<Utc>, reason: &str, detail: &str) {
        info!(timeframe = %self.timeframe, boundary = %boundary, reason, detail, "window: skipped");
        ctx.journals.strategy.write(&SkipRecord {
            timeframe: self.timeframe.bucket_key(),
            boundary,
            reason: reason.to_string(),
            detail: detail.to_string(),
        }).ok();
    }
}

#[derive(serde::Serialize)]
struct SkipRecord {
    timeframe: &'static str,
    boundary: DateTime<Utc>,
    reason: String,
    detail: String,
}

#[derive(serde::Serialize)]
struct TradeRecord {
    market_id: String,
    bucket: String,
    direction: String,
    anchor_price: f64,
    limit_price: f64,
    size_usd: f64,
    submitted_at: DateTime<Utc>,
}

fn convert_candle(c: &CandlestickCandle) -> Candle {
    Candle {
        open: c.open,
        high: c.high,
        low: c.low,
        close: c.close,
        opened_at: DateTime::from_timestamp(c.timestamp, 0).unwrap_or_else(Utc::now),
    }
}

#[async_trait::async_trait]
impl Engine for WindowEngine {
    fn name(&self) -> &'static str {
        self.timeframe.bucket_key()
    }

    async fn start(&self, ctx: Arc<EngineContext>) -> Result<(), FatalError> {
        let shutdown = ctx.shutdown_flag();
        while shutdown.load(Ordering::Acquire) {
            let boundary = self.next_boundary(Utc::now());
            if self.shares_fifteen_minute_boundary(boundary) {
                info!(timeframe = %self.timeframe, boundary = %boundary, reason = "overlap", "window: yielding shared boundary to 15m lane");
                if !self.sleep_until(&shutdown, boundary + chrono::Duration::seconds(1)).await {
                    break;
                }
                continue;
            }

            let engine_clone = Arc::new(WindowEngine::new(self.timeframe, self.asset_slug.clone(), self.candle_symbol.clone()));
            let ctx_clone = Arc::clone(&ctx);
            tokio::spawn(async move {
                engine_clone.run_pipeline(ctx_clone, boundary).await;
            });

            if !self.sleep_until(&shutdown, boundary + chrono::Duration::seconds(1)).await {
                break;
            }
        }
        Ok(())
    }
}

trait DirectionDisplay {
    fn direction_display(&self) -> &'static str;
}

impl DirectionDisplay for crate::domain::types::Signal {
    fn direction_display(&self) -> &'static str {
        match self.direction {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn engine(tf: Timeframe) -> WindowEngine {
        WindowEngine::new(tf, "bitcoin", "BTCUSD")
    }

    #[test]
    fn next_boundary_rounds_up_to_fifteen_minute_grid() {
        let e = engine(Timeframe::FifteenMin);
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 10, 7, 30).unwrap();
        let next = e.next_boundary(now);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 1, 10, 15, 0).unwrap());
    }

    #[test]
    fn next_boundary_on_exact_grid_advances_a_full_step() {
        let e = engine(Timeframe::FiveMin);
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 10, 15, 0).unwrap();
        let next = e.next_boundary(now);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 1, 10, 20, 0).unwrap());
    }

    #[test]
    fn five_minute_lane_yields_at_shared_boundaries() {
        let e = engine(Timeframe::FiveMin);
        let shared = Utc.with_ymd_and_hms(2026, 1, 1, 10, 15, 0).unwrap();
        let not_shared = Utc.with_ymd_and_hms(2026, 1, 1, 10, 20, 0).unwrap();
        assert!(e.shares_fifteen_minute_boundary(shared));
        assert!(!e.shares_fifteen_minute_boundary(not_shared));
    }

    #[test]
    fn fifteen_minute_lane_never_reports_overlap() {
        let e = engine(Timeframe::FifteenMin);
        let boundary = Utc.with_ymd_and_hms(2026, 1, 1, 10, 30, 0).unwrap();
        assert!(!e.shares_fifteen_minute_boundary(boundary));
    }
}
