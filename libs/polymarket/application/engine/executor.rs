//! Order execution: FoK-then-GTC submission with phantom-fill verification.
//!
//! Wraps `TradingClient` with the two behaviors the pipeline actually needs
//! beyond raw order placement: fall back from Fill-or-Kill to Good-Til-Cancelled
//! when the FoK leg doesn't fill, and treat a "successful" submit that shows no
//! matched size after two follow-up polls as a phantom fill rather than a
//! position.

use super::price_feed::{FeedStatus, PriceFeed};
use super::risk::RiskManager;
use crate::domain::errors::ExecutionError;
use crate::domain::types::Side as DomainSide;
use crate::infrastructure::active_order_manager::ActiveOrder;
use crate::infrastructure::client::clob::{Side as ClobSide, TradingClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const FIRST_POLL_DELAY: Duration = Duration::from_secs(3);
const SECOND_POLL_DELAY: Duration = Duration::from_secs(2);

/// Flat taker-fee estimate folded into the signal engine's fee-adjusted-edge
/// check. Polymarket's CLOB fee schedule is venue- and market-specific; this
/// is a conservative stand-in until a live schedule lookup lands.
const ESTIMATED_FEE: f64 = 0.01;

/// Terminal result of a submit-and-verify cycle.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    Filled { order_id: String, filled_size: f64 },
    Phantom { order_id: String },
}

fn to_clob_side(side: DomainSide) -> ClobSide {
    match side {
        DomainSide::Buy => ClobSide::Buy,
        DomainSide::Sell => ClobSide::Sell,
    }
}

fn is_live_status(status: Option<&str>) -> bool {
    matches!(
        status.map(|s| s.to_ascii_lowercase()).as_deref(),
        Some("matched") | Some("live") | Some("delayed")
    )
}

pub struct OrderExecutor {
    trading: Arc<TradingClient>,
    price_feed: Arc<PriceFeed>,
    guardian_bps_threshold: f64,
    fok_timeout_ms: u64,
}

impl OrderExecutor {
    pub fn new(trading: Arc<TradingClient>, price_feed: Arc<PriceFeed>, guardian_bps_threshold: f64, fok_timeout_ms: u64) -> Self {
        Self { trading, price_feed, guardian_bps_threshold, fok_timeout_ms }
    }

    pub fn estimated_fee(&self) -> f64 {
        ESTIMATED_FEE
    }

    /// Submit at `limit_price`, attempting Fill-or-Kill first (bounded by
    /// `fok_timeout_ms`) and falling back to Good-Til-Cancelled if the FoK
    /// leg times out or reports no fill. `size_usd` is converted to a share
    /// count at `limit_price`.
    ///
    /// `reference_price` is the anchor price the caller's signal was
    /// evaluated against; if `Some`, a guardian check runs right after
    /// submit and cancels the order before verifying its fill when the live
    /// oracle price hasn't moved far enough from that anchor to still trust
    /// the edge. Pass `None` for legs with no single anchor reference (arb).
    pub async fn submit(
        &self,
        token_id: &str,
        side: DomainSide,
        reference_price: Option<f64>,
        limit_price: f64,
        size_usd: f64,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let shares = size_usd / limit_price;
        let clob_side = to_clob_side(side);
        let fok_timeout = Duration::from_millis(self.fok_timeout_ms);

        let fok = match clob_side {
            ClobSide::Buy => tokio::time::timeout(fok_timeout, self.trading.buy_fok(token_id, limit_price, shares)).await,
            ClobSide::Sell => tokio::time::timeout(fok_timeout, self.trading.sell_fok(token_id, limit_price, shares)).await,
        };

        let resp = match fok {
            Ok(Ok(r)) if r.success && is_live_status(r.status.as_deref()) => r,
            Ok(other) => {
                if let Ok(r) = &other {
                    info!(token_id, status = ?r.status, "fok unfilled, falling back to gtc");
                } else {
                    warn!(token_id, "fok submit errored, falling back to gtc");
                }
                let gtc = match clob_side {
                    ClobSide::Buy => self.trading.buy(token_id, limit_price, shares).await,
                    ClobSide::Sell => self.trading.sell(token_id, limit_price, shares).await,
                };
                gtc.map_err(|e| ExecutionError::Rejected(e.to_string()))?
            }
            Err(_) => {
                warn!(token_id, timeout_ms = self.fok_timeout_ms, "fok timed out, falling back to gtc");
                let gtc = match clob_side {
                    ClobSide::Buy => self.trading.buy(token_id, limit_price, shares).await,
                    ClobSide::Sell => self.trading.sell(token_id, limit_price, shares).await,
                };
                gtc.map_err(|e| ExecutionError::Rejected(e.to_string()))?
            }
        };

        if !resp.success {
            return Err(ExecutionError::Rejected(
                resp.error_msg.unwrap_or_else(|| "order rejected, no message".to_string()),
            ));
        }

        let order_id = resp
            .order_id
            .ok_or_else(|| ExecutionError::Rejected("submit succeeded with no order id".to_string()))?;

        if let Some(reference) = reference_price {
            if let FeedStatus::Fresh(tick) = self.price_feed.latest() {
                if !RiskManager::guardian_safe(reference, tick.price, self.guardian_bps_threshold) {
                    warn!(order_id, reference, oracle_price = tick.price, "guardian: price insufficiently diverged from anchor, cancelling");
                    let _ = self.cancel(&order_id).await;
                    return Err(ExecutionError::Rejected("guardian: reference price not confirmed at fill-check time".to_string()));
                }
            }
        }

        self.verify_fill(order_id).await
    }

    /// Polls order status at 3s then 2s after submit. No matched size on
    /// either poll marks the order `Phantom`.
    async fn verify_fill(&self, order_id: String) -> Result<ExecutionOutcome, ExecutionError> {
        tokio::time::sleep(FIRST_POLL_DELAY).await;
        if let Some(size) = self.matched_size(&order_id).await {
            return Ok(ExecutionOutcome::Filled { order_id, filled_size: size });
        }

        tokio::time::sleep(SECOND_POLL_DELAY).await;
        if let Some(size) = self.matched_size(&order_id).await {
            return Ok(ExecutionOutcome::Filled { order_id, filled_size: size });
        }

        warn!(order_id, "no matched size after 3s+2s poll, marking phantom");
        Ok(ExecutionOutcome::Phantom { order_id })
    }

    async fn matched_size(&self, order_id: &str) -> Option<f64> {
        let value = self.trading.get_order(order_id).await.ok()?;
        let order = ActiveOrder::from_json(&value)?;
        (order.size_matched > 0.0).then_some(order.size_matched)
    }

    pub async fn cancel(&self, order_id: &str) -> Result<(), ExecutionError> {
        self.trading
            .cancel_order(order_id)
            .await
            .map(|_| ())
            .map_err(|e| ExecutionError::CancelFailed { order_id: order_id.to_string(), reason: e.to_string() })
    }

    pub async fn cancel_all(&self) -> Result<(), ExecutionError> {
        self.trading
            .cancel_all()
            .await
            .map(|_| ())
            .map_err(|e| ExecutionError::CancelFailed { order_id: "*".to_string(), reason: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_status_matching_is_case_insensitive() {
        assert!(is_live_status(Some("MATCHED")));
        assert!(is_live_status(Some("live")));
        assert!(!is_live_status(Some("unmatched")));
        assert!(!is_live_status(None));
    }

    #[test]
    fn side_conversion_is_lossless() {
        assert!(matches!(to_clob_side(DomainSide::Buy), ClobSide::Buy));
        assert!(matches!(to_clob_side(DomainSide::Sell), ClobSide::Sell));
    }
}
