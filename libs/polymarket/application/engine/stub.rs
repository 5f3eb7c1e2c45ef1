//! Lifecycle-only stub lanes.
//!
//! `MarketMaker` and `HedgeEngine` are addressed by name from the
//! orchestrator's CLI-driven engine list but carry no quoting or hedging
//! logic in this port — both are out of scope per the single-asset,
//! directional-only boundary. Each still honors the `Engine` contract so
//! `--mm`/`--hedge` produce a visible, cleanly-stoppable lane rather than a
//! silent no-op, and each still owns a `RiskBucket` slot (`mm`) so enabling
//! it in config doesn't leave risk accounting an orphan.

use super::{Engine, EngineContext};
use crate::domain::errors::FatalError;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct MarketMaker;

#[async_trait::async_trait]
impl Engine for MarketMaker {
    fn name(&self) -> &'static str {
        "market_maker"
    }

    async fn start(&self, ctx: Arc<EngineContext>) -> Result<(), FatalError> {
        info!("market_maker: stub lane started, no quoting logic in this build");
        ctx.publish(super::DashboardEvent::EngineStatus {
            engine: self.name().to_string(),
            status: "idle".to_string(),
        });
        let shutdown = ctx.shutdown_flag();
        while shutdown.load(Ordering::Acquire) {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        Ok(())
    }

    async fn stop(&self) {
        info!("market_maker: stopping, no open quotes to cancel");
    }
}

pub struct HedgeEngine;

#[async_trait::async_trait]
impl Engine for HedgeEngine {
    fn name(&self) -> &'static str {
        "hedge_engine"
    }

    async fn start(&self, ctx: Arc<EngineContext>) -> Result<(), FatalError> {
        info!("hedge_engine: stub lane started, cross-asset hedging out of scope");
        ctx.publish(super::DashboardEvent::EngineStatus {
            engine: self.name().to_string(),
            status: "idle".to_string(),
        });
        let shutdown = ctx.shutdown_flag();
        while shutdown.load(Ordering::Acquire) {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        Ok(())
    }
}
