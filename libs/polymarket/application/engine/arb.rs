//! Cross-outcome arbitrage scanner.
//!
//! Unlike the window scheduler, this lane is not tied to any one timeframe:
//! it walks every currently listed "Up or Down" market for the configured
//! asset, regardless of which window it belongs to, looking for a YES+NO
//! ask sum priced under parity. Grounded in the same `GammaClient` listing
//! call `MarketDiscovery` uses, duplicated rather than shared because this
//! scanner needs the full candidate set per poll, not a single resolved
//! boundary.

use super::{Engine, EngineContext};
use crate::domain::errors::FatalError;
use crate::domain::types::Side;
use crate::infrastructure::client::gamma::GammaMarket;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const BUCKET: &str = "arb";
/// Tolerance, in minutes, when matching a market's actual start/end spread
/// against a configured timeframe label (markets rarely land on the exact
/// minute due to creation jitter).
const TIMEFRAME_TOLERANCE_MINS: i64 = 1;

fn parse_clob_token_ids(raw: &str) -> Option<(String, String)> {
    let ids: Vec<String> = serde_json::from_str(raw).ok()?;
    match ids.as_slice() {
        [yes, no] => Some((yes.clone(), no.clone())),
        _ => None,
    }
}

/// Minutes a timeframe label like `"15m"`/`"1h"` denotes, or `None` for an
/// unrecognized label.
fn timeframe_minutes(label: &str) -> Option<i64> {
    match label {
        "5m" => Some(5),
        "15m" => Some(15),
        "30m" => Some(30),
        "1h" | "60m" => Some(60),
        _ => None,
    }
}

fn market_duration_minutes(m: &GammaMarket) -> Option<i64> {
    let start: DateTime<Utc> = m.start_date_iso.as_deref().and_then(|s| DateTime::parse_from_rfc3339(s).ok())?.into();
    let end: DateTime<Utc> = m.end_date_iso.as_deref().and_then(|s| DateTime::parse_from_rfc3339(s).ok())?.into();
    Some((end - start).num_minutes())
}

struct Candidate {
    market_id: String,
    yes_token_id: String,
    no_token_id: String,
    timeframe_minutes: i64,
}

/// Matches a listed market against the asset/naming convention and one of
/// the configured `timeframes`; markets whose duration matches none of them
/// (e.g. a 1h market when only 5m/15m are configured) are skipped.
fn candidate_from_market(m: &GammaMarket, asset_slug: &str, timeframes: &[i64]) -> Option<Candidate> {
    let slug = m.slug.as_deref()?;
    if !(slug.contains(asset_slug) && slug.contains("up-or-down")) {
        return None;
    }
    let duration = market_duration_minutes(m)?;
    let matched = *timeframes.iter().find(|&&mins| (duration - mins).abs() <= TIMEFRAME_TOLERANCE_MINS)?;
    let market_id = m.condition_id.clone().or_else(|| m.id.clone())?;
    let raw_ids = m.clob_token_ids.as_deref()?;
    let (yes_token_id, no_token_id) = parse_clob_token_ids(raw_ids)?;
    Some(Candidate { market_id, yes_token_id, no_token_id, timeframe_minutes: matched })
}

/// Tracks notional committed to arb trades since UTC midnight, independent of
/// the risk bucket's own daily loss cap: this bounds total deployment, not
/// losses.
struct DailyBudget {
    day: chrono::NaiveDate,
    spent_usd: f64,
}

pub struct ArbScanner {
    asset_slug: String,
    budget: Mutex<DailyBudget>,
}

impl ArbScanner {
    pub fn new(asset_slug: impl Into<String>) -> Self {
        Self {
            asset_slug: asset_slug.into(),
            budget: Mutex::new(DailyBudget { day: Utc::now().date_naive(), spent_usd: 0.0 }),
        }
    }

    fn try_reserve_budget(&self, cap_usd: f64, size_usd: f64) -> bool {
        let mut budget = self.budget.lock();
        let today = Utc::now().date_naive();
        if budget.day != today {
            budget.day = today;
            budget.spent_usd = 0.0;
        }
        if budget.spent_usd + size_usd > cap_usd {
            return false;
        }
        budget.spent_usd += size_usd;
        true
    }

    async fn scan_once(&self, ctx: &EngineContext) {
        let cfg = &ctx.config.arb;
        let timeframes: Vec<i64> = cfg.timeframes.iter().filter_map(|s| timeframe_minutes(s)).collect();
        if timeframes.is_empty() {
            warn!("arb: no recognized timeframes configured, skipping scan");
            return;
        }

        let markets = match ctx.gamma.get_all_active_markets().await {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "arb: gamma fetch failed");
                return;
            }
        };

        for market in &markets {
            let Some(candidate) = candidate_from_market(market, &self.asset_slug, &timeframes) else { continue };
            self.evaluate_candidate(ctx, cfg, candidate).await;
        }
    }

    async fn evaluate_candidate(
        &self,
        ctx: &EngineContext,
        cfg: &crate::infrastructure::config::ArbConfig,
        candidate: Candidate,
    ) {
        let rest = ctx.trading.rest();
        let (yes_book, no_book) = tokio::join!(
            rest.get_orderbook(&candidate.yes_token_id),
            rest.get_orderbook(&candidate.no_token_id)
        );

        let (yes_ask, no_ask) = match (yes_book, no_book) {
            (Ok(y), Ok(n)) => match (y.best_ask(), n.best_ask()) {
                (Some(ya), Some(na)) => (ya.price_f64(), na.price_f64()),
                _ => return,
            },
            _ => return,
        };

        let sum = yes_ask + no_ask;
        if sum >= cfg.threshold {
            return;
        }
        let edge_pct = (1.0 - sum) * 100.0;
        if edge_pct < cfg.min_edge_pct {
            return;
        }

        if !self.try_reserve_budget(cfg.daily_budget_usd, cfg.size_usd) {
            info!(market_id = %candidate.market_id, "arb: daily budget exhausted, skipping opportunity");
            return;
        }

        info!(
            market_id = %candidate.market_id,
            timeframe_minutes = candidate.timeframe_minutes,
            yes_ask,
            no_ask,
            edge_pct,
            "arb: opportunity found"
        );

        let yes_result = ctx.executor.submit(&candidate.yes_token_id, Side::Buy, None, yes_ask, cfg.size_usd).await;
        let no_result = ctx.executor.submit(&candidate.no_token_id, Side::Buy, None, no_ask, cfg.size_usd).await;

        match (yes_result, no_result) {
            (Ok(super::ExecutionOutcome::Filled { filled_size: yf, .. }), Ok(super::ExecutionOutcome::Filled { filled_size: nf, .. })) => {
                ctx.risk.reserve(BUCKET, cfg.size_usd * 2.0);
                ctx.publish(super::DashboardEvent::Trade {
                    bucket: BUCKET.to_string(),
                    market_id: candidate.market_id.clone(),
                    direction: "both".to_string(),
                    size_usd: cfg.size_usd * 2.0,
                });
                ctx.journals.trades.write(&ArbRecord {
                    market_id: candidate.market_id.clone(),
                    timeframe_minutes: candidate.timeframe_minutes,
                    yes_ask,
                    no_ask,
                    edge_pct,
                    yes_filled: yf,
                    no_filled: nf,
                    submitted_at: Utc::now(),
                }).ok();
            }
            (yes, no) => {
                warn!(market_id = %candidate.market_id, "arb: one or both legs failed to fill as expected, unwinding");
                self.unwind(ctx, &candidate, yes, no).await;
            }
        }
    }

    async fn unwind(
        &self,
        ctx: &EngineContext,
        candidate: &Candidate,
        yes: Result<super::ExecutionOutcome, crate::domain::errors::ExecutionError>,
        no: Result<super::ExecutionOutcome, crate::domain::errors::ExecutionError>,
    ) {
        if let Ok(super::ExecutionOutcome::Filled { filled_size, .. }) = yes {
            if filled_size > 0.0 {
                if let Err(e) = ctx.executor.submit(&candidate.yes_token_id, Side::Sell, None, 0.01, filled_size).await {
                    warn!(market_id = %candidate.market_id, error = %e, "arb: failed to unwind yes leg");
                }
            }
        }
        if let Ok(super::ExecutionOutcome::Filled { filled_size, .. }) = no {
            if filled_size > 0.0 {
                if let Err(e) = ctx.executor.submit(&candidate.no_token_id, Side::Sell, None, 0.01, filled_size).await {
                    warn!(market_id = %candidate.market_id, error = %e, "arb: failed to unwind no leg");
                }
            }
        }
    }
}

#[derive(serde::Serialize)]
struct ArbRecord {
    market_id: String,
    timeframe_minutes: i64,
    yes_ask: f64,
    no_ask: f64,
    edge_pct: f64,
    yes_filled: f64,
    no_filled: f64,
    submitted_at: chrono::DateTime<Utc>,
}

#[async_trait::async_trait]
impl Engine for ArbScanner {
    fn name(&self) -> &'static str {
        "arb_scanner"
    }

    async fn start(&self, ctx: Arc<EngineContext>) -> Result<(), FatalError> {
        let shutdown = ctx.shutdown_flag();
        let poll_secs = ctx.config.arb.poll_secs.max(1);
        while shutdown.load(Ordering::Acquire) {
            self.scan_once(&ctx).await;
            tokio::time::sleep(Duration::from_secs(poll_secs)).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_clob_token_ids_requires_exactly_two() {
        assert_eq!(
            parse_clob_token_ids(r#"["a","b"]"#),
            Some(("a".to_string(), "b".to_string()))
        );
        assert_eq!(parse_clob_token_ids(r#"["a","b","c"]"#), None);
    }

    #[test]
    fn daily_budget_blocks_once_cap_reached() {
        let scanner = ArbScanner::new("bitcoin");
        assert!(scanner.try_reserve_budget(100.0, 60.0));
        assert!(!scanner.try_reserve_budget(100.0, 60.0));
        assert!(scanner.try_reserve_budget(100.0, 30.0));
    }

    #[test]
    fn timeframe_minutes_recognizes_all_four_labels() {
        assert_eq!(timeframe_minutes("5m"), Some(5));
        assert_eq!(timeframe_minutes("15m"), Some(15));
        assert_eq!(timeframe_minutes("30m"), Some(30));
        assert_eq!(timeframe_minutes("1h"), Some(60));
        assert_eq!(timeframe_minutes("2h"), None);
    }
}
