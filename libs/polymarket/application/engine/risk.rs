//! Per-bucket risk manager.
//!
//! Tracks N independent `RiskBucket`s behind one lock, keyed by bucket
//! name (`15m`, `5m`, `late_window`, `arb`, `mm`). A write to one
//! bucket's entry must never touch another's fields — the isolation
//! invariant is verified directly by test below.

use crate::domain::errors::RiskVeto;
use crate::domain::types::RiskBucket;
use crate::infrastructure::config::RiskBucketConfig;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{info, warn};

pub struct RiskManager {
    buckets: RwLock<HashMap<String, RiskBucket>>,
}

impl RiskManager {
    pub fn new(bankroll_usd: f64, configs: &HashMap<String, RiskBucketConfig>) -> Self {
        let mut buckets = HashMap::new();
        for (name, cfg) in configs {
            let cap = cfg.hard_cap_usd.min(bankroll_usd);
            buckets.insert(
                name.clone(),
                RiskBucket {
                    name: name.clone(),
                    bankroll_cap_usd: cap,
                    used_usd: 0.0,
                    trades_today: 0,
                    max_trades: cfg.max_trades,
                    loss_streak: 0,
                    max_streak: cfg.max_streak,
                    realized_pnl_today_usd: 0.0,
                    daily_loss_cap_pct: cfg.daily_loss_cap_pct,
                    cooldown_until: None,
                    last_reset_date: Utc::now().date_naive(),
                },
            );
        }
        Self { buckets: RwLock::new(buckets) }
    }

    /// Kelly-sized stake for a bucket, or the veto reason it can't trade right now.
    pub fn size(
        &self,
        bucket_name: &str,
        confidence: f64,
        bankroll_usd: f64,
        kelly_fraction: f64,
        now: DateTime<Utc>,
    ) -> Result<f64, RiskVeto> {
        let mut buckets = self.buckets.write();
        let bucket = buckets
            .get_mut(bucket_name)
            .unwrap_or_else(|| panic!("unknown risk bucket '{bucket_name}'"));

        maybe_reset_daily(bucket, now);

        if let Some(until) = bucket.cooldown_until {
            if until > now {
                return Err(RiskVeto::Cooldown { bucket: bucket.name.clone(), until: until.to_rfc3339() });
            }
        }

        if bucket.trades_today >= bucket.max_trades {
            return Err(RiskVeto::TradeCapReached { bucket: bucket.name.clone(), max_trades: bucket.max_trades });
        }

        let loss_cap = bucket.daily_loss_cap_usd();
        if bucket.realized_pnl_today_usd <= -loss_cap {
            return Err(RiskVeto::DailyLossCapReached { bucket: bucket.name.clone(), cap: loss_cap });
        }

        let edge = 2.0 * confidence - 1.0;
        let raw_stake = bankroll_usd * edge * kelly_fraction;
        let remaining = bucket.remaining_usd();
        let stake = raw_stake.min(bucket.bankroll_cap_usd).min(remaining).max(0.0);

        if stake < 1.0 {
            return Err(RiskVeto::InsufficientBankroll { bucket: bucket.name.clone(), remaining, requested: raw_stake });
        }

        Ok(stake)
    }

    /// Reserve `size_usd` of a bucket's budget at order-submission time.
    pub fn reserve(&self, bucket_name: &str, size_usd: f64) {
        let mut buckets = self.buckets.write();
        if let Some(bucket) = buckets.get_mut(bucket_name) {
            bucket.used_usd = (bucket.used_usd + size_usd).min(bucket.bankroll_cap_usd);
            bucket.trades_today += 1;
        }
    }

    pub fn record_win(&self, bucket_name: &str, pnl_usd: f64) {
        let mut buckets = self.buckets.write();
        if let Some(bucket) = buckets.get_mut(bucket_name) {
            bucket.loss_streak = 0;
            bucket.realized_pnl_today_usd += pnl_usd;
            info!(bucket = %bucket_name, pnl_usd, "risk: recorded win");
        }
    }

    pub fn record_loss(&self, bucket_name: &str, pnl_usd: f64, cooldown_mins: u64, now: DateTime<Utc>) {
        let mut buckets = self.buckets.write();
        if let Some(bucket) = buckets.get_mut(bucket_name) {
            bucket.loss_streak += 1;
            bucket.realized_pnl_today_usd += pnl_usd;
            if bucket.loss_streak >= bucket.max_streak {
                bucket.cooldown_until = Some(now + chrono::Duration::minutes(cooldown_mins as i64));
                warn!(bucket = %bucket_name, streak = bucket.loss_streak, "risk: loss-streak cooldown engaged");
            }
            info!(bucket = %bucket_name, pnl_usd, streak = bucket.loss_streak, "risk: recorded loss");
        }
    }

    pub fn record_push(&self, bucket_name: &str) {
        // Streak unchanged on a push; nothing to mutate besides a log line.
        info!(bucket = %bucket_name, "risk: recorded push");
    }

    pub fn snapshot(&self, bucket_name: &str) -> Option<RiskBucket> {
        self.buckets.read().get(bucket_name).cloned()
    }

    pub fn all_snapshots(&self) -> Vec<RiskBucket> {
        self.buckets.read().values().cloned().collect()
    }

    /// Fast oracle-proximity check: a BPS-distance test between the
    /// reference price and the live oracle price. Run inline from
    /// `OrderExecutor`'s post-submit cancellation path rather than as its
    /// own background thread.
    pub fn guardian_safe(reference_price: f64, oracle_price: f64, bps_threshold: f64) -> bool {
        if reference_price == 0.0 {
            return false;
        }
        let bps_diff = ((reference_price - oracle_price).abs() / reference_price) * 10_000.0;
        bps_diff >= bps_threshold
    }
}

/// Daily reset at 00:00 UTC: trades_today and realized P&L zero out, but
/// loss_streak and cooldown_until carry over so a cooldown earned right
/// before midnight still holds afterward.
fn maybe_reset_daily(bucket: &mut RiskBucket, now: DateTime<Utc>) {
    let today = now.date_naive();
    if today > bucket.last_reset_date {
        bucket.trades_today = 0;
        bucket.realized_pnl_today_usd = 0.0;
        bucket.used_usd = 0.0;
        bucket.last_reset_date = today;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn configs() -> HashMap<String, RiskBucketConfig> {
        let mut m = HashMap::new();
        m.insert(
            "15m".to_string(),
            RiskBucketConfig { hard_cap_usd: 25.0, kelly_fraction: 0.25, daily_loss_cap_pct: 0.15, max_trades: 20, max_streak: 5, cooldown_mins: 60 },
        );
        m.insert(
            "5m".to_string(),
            RiskBucketConfig { hard_cap_usd: 25.0, kelly_fraction: 0.25, daily_loss_cap_pct: 0.15, max_trades: 20, max_streak: 5, cooldown_mins: 60 },
        );
        m
    }

    #[test]
    fn stake_is_hard_capped_below_raw_kelly_size() {
        let rm = RiskManager::new(500.0, &configs());
        let now = Utc::now();
        let size = rm.size("15m", 0.82, 500.0, 0.25, now).unwrap();
        assert!((size - 25.0).abs() < 1e-9, "expected hard-capped $25, got {size}");
    }

    #[test]
    fn loss_streak_triggers_cooldown_then_clears() {
        let rm = RiskManager::new(500.0, &configs());
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        for i in 0..5 {
            rm.record_loss("15m", -10.0, 60, t0 + chrono::Duration::seconds(i));
        }
        let veto = rm.size("15m", 0.8, 500.0, 0.25, t0 + chrono::Duration::minutes(1));
        assert!(matches!(veto, Err(RiskVeto::Cooldown { .. })));

        let after_cooldown = t0 + chrono::Duration::minutes(61);
        assert!(rm.size("15m", 0.8, 500.0, 0.25, after_cooldown).is_ok());
    }

    #[test]
    fn used_usd_never_exceeds_bankroll_cap() {
        let rm = RiskManager::new(500.0, &configs());
        let now = Utc::now();
        for _ in 0..50 {
            if rm.size("15m", 0.9, 500.0, 0.25, now).is_ok() {
                rm.reserve("15m", 25.0);
            }
        }
        let snap = rm.snapshot("15m").unwrap();
        assert!(snap.used_usd <= snap.bankroll_cap_usd);
    }

    /// A sequence of operations on bucket `5m` never mutates any field of bucket `15m`.
    #[test]
    fn bucket_isolation_invariant() {
        let rm = RiskManager::new(500.0, &configs());
        let before = rm.snapshot("15m").unwrap();
        let now = Utc::now();
        rm.reserve("5m", 10.0);
        rm.record_loss("5m", -10.0, 60, now);
        rm.record_win("5m", 5.0);
        let _ = rm.size("5m", 0.9, 500.0, 0.25, now);

        let after = rm.snapshot("15m").unwrap();
        assert_eq!(before.used_usd, after.used_usd);
        assert_eq!(before.trades_today, after.trades_today);
        assert_eq!(before.loss_streak, after.loss_streak);
        assert_eq!(before.realized_pnl_today_usd, after.realized_pnl_today_usd);
    }

    #[test]
    fn daily_reset_clears_trades_but_preserves_streak_and_cooldown() {
        let rm = RiskManager::new(500.0, &configs());
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        rm.reserve("15m", 10.0);
        for i in 0..5 {
            rm.record_loss("15m", -5.0, 60, t0 + chrono::Duration::seconds(i));
        }
        let before = rm.snapshot("15m").unwrap();
        assert_eq!(before.loss_streak, 5);
        assert!(before.cooldown_until.is_some());

        let next_day = Utc.with_ymd_and_hms(2026, 1, 2, 0, 5, 0).unwrap();
        let _ = rm.size("15m", 0.9, 500.0, 0.25, next_day);
        let after = rm.snapshot("15m").unwrap();
        assert_eq!(after.trades_today, 0);
        assert_eq!(after.loss_streak, before.loss_streak);
        assert_eq!(after.cooldown_until, before.cooldown_until);
    }

    #[test]
    fn guardian_safe_flags_close_approach_to_reference_price() {
        assert!(!RiskManager::guardian_safe(60000.0, 60000.5, 50.0));
        assert!(RiskManager::guardian_safe(60000.0, 60500.0, 50.0));
    }
}
