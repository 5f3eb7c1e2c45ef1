//! Late-window drift scanner.
//!
//! Catches the tail of a window's life: once less than ~150s remain before
//! resolution, a large enough drift from the window's open price is traded
//! directly off the drift magnitude, with no indicator confirmation (there
//! is no time left for one to matter). Reuses `MarketDiscovery` to resolve
//! the currently-open market per timeframe, the way `WindowEngine` does,
//! but walks both timeframes' current window every poll rather than
//! scheduling against future boundaries.

use super::{Engine, EngineContext};
use crate::domain::errors::FatalError;
use crate::domain::types::{Direction, Side, Timeframe};
use chrono::{DateTime, Timelike, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const BUCKET: &str = "late_window";
const REMAINING_MIN_SECS: i64 = 30;
const REMAINING_MAX_SECS: i64 = 150;

fn floor_boundary(now: DateTime<Utc>, step_mins: i64) -> DateTime<Utc> {
    let floor = now.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(now);
    let minute = floor.minute() as i64;
    let floored_minute = (minute / step_mins) * step_mins;
    floor - chrono::Duration::minutes(minute - floored_minute)
}

pub struct LateWindowScanner {
    candle_symbol: String,
    traded: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl LateWindowScanner {
    pub fn new(candle_symbol: impl Into<String>) -> Self {
        Self { candle_symbol: candle_symbol.into(), traded: Mutex::new(HashMap::new()) }
    }

    fn already_traded(&self, market_id: &str, now: DateTime<Utc>) -> bool {
        let mut traded = self.traded.lock();
        traded.retain(|_, resolves_at| *resolves_at > now);
        traded.contains_key(market_id)
    }

    fn mark_traded(&self, market_id: String, resolves_at: DateTime<Utc>) {
        self.traded.lock().insert(market_id, resolves_at);
    }

    async fn scan_timeframe(&self, ctx: &EngineContext, timeframe: Timeframe) {
        let now = Utc::now();
        let floor = floor_boundary(now, timeframe.minutes());

        let resolved = match ctx.discovery.find_window_market(timeframe, floor).await {
            Ok(r) => r,
            Err(_) => return,
        };

        let remaining = (resolved.resolves_at - now).num_seconds();
        if !(REMAINING_MIN_SECS..=REMAINING_MAX_SECS).contains(&remaining) {
            return;
        }
        if self.already_traded(&resolved.market_id, now) {
            return;
        }

        let symbol = self.candle_symbol.clone();
        let candlestick = Arc::clone(&ctx.candlestick);
        let open_ts = floor.timestamp();
        let anchor = tokio::task::spawn_blocking(move || candlestick.get_open_price_at(&symbol, "1m", open_ts))
            .await
            .unwrap_or_else(|e| Err(anyhow::anyhow!(e)));

        let anchor_price = match anchor {
            Ok(p) if p > 0.0 => p,
            _ => return,
        };

        let current_price = match ctx.price_feed.latest() {
            super::FeedStatus::Fresh(tick) => tick.price,
            super::FeedStatus::Stale => return,
        };

        let drift_pct = ((current_price - anchor_price) / anchor_price).abs() * 100.0;
        let cfg = &ctx.config.late_window;
        if drift_pct < cfg.drift_threshold_pct {
            return;
        }

        let direction = if current_price > anchor_price { Direction::Up } else { Direction::Down };
        let token_id = match direction {
            Direction::Up => resolved.yes_token_id.clone(),
            Direction::Down => resolved.no_token_id.clone(),
        };

        let best_ask = match ctx.trading.rest().get_orderbook(&token_id).await {
            Ok(book) => match book.best_ask() {
                Some(level) => level.price_f64(),
                None => return,
            },
            Err(_) => return,
        };
        if best_ask > cfg.max_entry_price {
            return;
        }

        let bucket_cfg = match ctx.config.risk_buckets.get(BUCKET) {
            Some(c) => c,
            None => {
                warn!("late_window: no risk bucket configured, skipping");
                return;
            }
        };
        let confidence = (drift_pct / 100.0).min(1.0);
        let size_usd = match ctx.risk.size(BUCKET, confidence, ctx.config.bankroll_usd, bucket_cfg.kelly_fraction, now) {
            Ok(s) => s,
            Err(e) => {
                info!(market_id = %resolved.market_id, error = %e, "late_window: risk veto");
                return;
            }
        };

        self.mark_traded(resolved.market_id.clone(), resolved.resolves_at);

        let outcome = match ctx.executor.submit(&token_id, Side::Buy, Some(anchor_price), best_ask, size_usd).await {
            Ok(o) => o,
            Err(e) => {
                warn!(market_id = %resolved.market_id, error = %e, "late_window: execution error");
                return;
            }
        };

        if let super::ExecutionOutcome::Filled { order_id, filled_size } = outcome {
            ctx.risk.reserve(BUCKET, size_usd);
            ctx.publish(super::DashboardEvent::Trade {
                bucket: BUCKET.to_string(),
                market_id: resolved.market_id.clone(),
                direction: match direction {
                    Direction::Up => "up".to_string(),
                    Direction::Down => "down".to_string(),
                },
                size_usd,
            });
            ctx.journals.trades.write(&LateWindowRecord {
                market_id: resolved.market_id.clone(),
                order_id,
                anchor_price,
                current_price,
                drift_pct,
                filled_size,
                submitted_at: now,
            }).ok();
            info!(market_id = %resolved.market_id, drift_pct, "late_window: entered drift trade");
        }
    }
}

#[derive(serde::Serialize)]
struct LateWindowRecord {
    market_id: String,
    order_id: String,
    anchor_price: f64,
    current_price: f64,
    drift_pct: f64,
    filled_size: f64,
    submitted_at: DateTime<Utc>,
}

#[async_trait::async_trait]
impl Engine for LateWindowScanner {
    fn name(&self) -> &'static str {
        "late_window"
    }

    async fn start(&self, ctx: Arc<EngineContext>) -> Result<(), FatalError> {
        let shutdown = ctx.shutdown_flag();
        let poll_secs = ctx.config.late_window.poll_secs.max(1);
        while shutdown.load(Ordering::Acquire) {
            self.scan_timeframe(&ctx, Timeframe::FifteenMin).await;
            self.scan_timeframe(&ctx, Timeframe::FiveMin).await;
            tokio::time::sleep(Duration::from_secs(poll_secs)).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn floor_boundary_rounds_down_to_grid() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 10, 22, 40).unwrap();
        assert_eq!(floor_boundary(now, 15), Utc.with_ymd_and_hms(2026, 1, 1, 10, 15, 0).unwrap());
        assert_eq!(floor_boundary(now, 5), Utc.with_ymd_and_hms(2026, 1, 1, 10, 20, 0).unwrap());
    }

    #[test]
    fn traded_guard_prevents_double_entry_until_resolved() {
        let scanner = LateWindowScanner::new("BTCUSD");
        let now = Utc::now();
        let resolves_at = now + chrono::Duration::seconds(60);
        assert!(!scanner.already_traded("m1", now));
        scanner.mark_traded("m1".to_string(), resolves_at);
        assert!(scanner.already_traded("m1", now));
        assert!(!scanner.already_traded("m1", resolves_at + chrono::Duration::seconds(1)));
    }
}
