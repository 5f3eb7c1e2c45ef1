//! Persistent oracle price feed with secondary-source reconciliation.
//!
//! The primary subscription is the ChainLink tracker
//! (`infrastructure::client::oracle::spawn_oracle_trackers`), which already
//! owns its own WebSocket connection and internal retry loop via
//! `hypersockets`. `PriceFeed` adds outer supervision on top: if that
//! tracker's data flow goes stale for a sustained period, respawn it behind
//! an exponential backoff (5s doubling to a 120s cap), and folds in polled
//! secondary sources for divergence detection. Secondaries are never
//! promoted to primary.

use crate::domain::types::Tick;
use crate::infrastructure::client::oracle::{spawn_oracle_trackers, OracleType, SharedOraclePrices};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

const RECONNECT_INITIAL_SECS: u64 = 5;
const RECONNECT_MAX_SECS: u64 = 120;
const DIVERGENCE_THRESHOLD_PCT: f64 = 1.0;
const DISCONNECT_STALE_MULTIPLIER: i64 = 4;

/// Result of a `latest()` query: the caller decides what to do with
/// staleness rather than the feed blocking until data arrives.
#[derive(Debug, Clone, Copy)]
pub enum FeedStatus {
    Fresh(Tick),
    Stale,
}

/// Aggregate view across primary + secondaries.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub price: f64,
    pub spread_pct: f64,
    pub sources: Vec<String>,
    pub diverged: bool,
}

#[derive(Debug, Clone, Copy)]
struct SecondaryEntry {
    price: f64,
    #[allow(dead_code)]
    observed_at: DateTime<Utc>,
}

pub struct PriceFeed {
    primary: RwLock<SharedOraclePrices>,
    asset: String,
    stale_ms: i64,
    secondaries: RwLock<HashMap<String, SecondaryEntry>>,
    tx: broadcast::Sender<Tick>,
    http: Client,
}

impl PriceFeed {
    pub fn new(primary: SharedOraclePrices, asset: impl Into<String>, stale_ms: i64) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(1024);
        Arc::new(Self {
            primary: RwLock::new(primary),
            asset: asset.into(),
            stale_ms,
            secondaries: RwLock::new(HashMap::new()),
            tx,
            http: Client::builder()
                .timeout(Duration::from_secs(3))
                .build()
                .expect("reqwest client"),
        })
    }

    /// Supervises the primary tracker under backoff. Runs until `shutdown`
    /// flips false. On sustained staleness, respawns `spawn_oracle_trackers`
    /// and swaps it in, doubling the wait each time up to the 120s cap.
    pub async fn spawn_primary(self: Arc<Self>, shutdown: Arc<AtomicBool>) {
        let mut backoff = RECONNECT_INITIAL_SECS;
        while shutdown.load(Ordering::Acquire) {
            self.wait_for_disconnect(&shutdown).await;
            if !shutdown.load(Ordering::Acquire) {
                return;
            }
            warn!(asset = %self.asset, backoff_secs = backoff, "price feed: primary disconnected, reconnecting");
            tokio::time::sleep(Duration::from_secs(backoff)).await;
            match spawn_oracle_trackers(shutdown.clone()).await {
                Ok(prices) => {
                    *self.primary.write() = prices;
                    info!(asset = %self.asset, "price feed: primary reconnected");
                    backoff = RECONNECT_INITIAL_SECS;
                }
                Err(e) => {
                    error!(error = %e, backoff_secs = backoff, "price feed: primary reconnect failed");
                    backoff = (backoff * 2).min(RECONNECT_MAX_SECS);
                }
            }
        }
    }

    async fn wait_for_disconnect(&self, shutdown: &Arc<AtomicBool>) {
        let mut check = tokio::time::interval(Duration::from_secs(5));
        loop {
            check.tick().await;
            if !shutdown.load(Ordering::Acquire) {
                return;
            }
            let age_ms = {
                let inner = self.primary.read();
                let guard = inner.read();
                guard.oracle_age(OracleType::ChainLink).as_millis() as i64
            };
            if age_ms > self.stale_ms * DISCONNECT_STALE_MULTIPLIER {
                return;
            }
        }
    }

    /// Most recent primary tick, or `Stale` if older than `stale_ms`.
    pub fn latest(&self) -> FeedStatus {
        let inner = self.primary.read();
        let guard = inner.read();
        match guard.get_price(OracleType::ChainLink, &self.asset) {
            Some(entry) => {
                let observed_at = millis_to_datetime(entry.timestamp);
                let age_ms = (Utc::now() - observed_at).num_milliseconds();
                if age_ms > self.stale_ms {
                    FeedStatus::Stale
                } else {
                    drop(guard);
                    drop(inner);
                    let spread = self.current_spread(entry.value);
                    let tick = Tick { price: entry.value, observed_at, source_spread: spread };
                    let _ = self.tx.send(tick);
                    FeedStatus::Fresh(tick)
                }
            }
            None => FeedStatus::Stale,
        }
    }

    fn current_spread(&self, primary_price: f64) -> f64 {
        let secondaries = self.secondaries.read();
        secondaries
            .values()
            .map(|e| (e.price - primary_price).abs())
            .fold(0.0, f64::max)
    }

    /// Aggregate reconciled view across primary + secondaries.
    pub fn reconciled(&self) -> Option<Reconciled> {
        let FeedStatus::Fresh(tick) = self.latest() else { return None };
        let secondaries = self.secondaries.read();
        let mut sources = vec!["primary".to_string()];
        let mut max_spread_pct: f64 = 0.0;
        for (name, entry) in secondaries.iter() {
            sources.push(name.clone());
            let spread_pct = ((entry.price - tick.price).abs() / tick.price) * 100.0;
            max_spread_pct = max_spread_pct.max(spread_pct);
        }
        Some(Reconciled {
            price: tick.price,
            spread_pct: max_spread_pct,
            sources,
            diverged: max_spread_pct > DIVERGENCE_THRESHOLD_PCT,
        })
    }

    /// Delivers every primary tick to subscribers (dashboard heartbeat,
    /// late-window scanner).
    pub fn subscribe(&self) -> broadcast::Receiver<Tick> {
        self.tx.subscribe()
    }

    /// Polls a secondary REST source on its own interval (>= 2s), folding
    /// results into the reconciliation view. Never promoted to primary; a
    /// poll failure is logged and simply retried next tick. `price_field`
    /// names the top-level JSON field holding the price, read as either a
    /// number or a numeric string (covers both shapes the configured
    /// secondaries return).
    pub async fn spawn_secondary(
        self: Arc<Self>,
        name: String,
        url: String,
        poll_secs: u64,
        price_field: String,
        shutdown: Arc<AtomicBool>,
    ) {
        let mut ticker = tokio::time::interval(Duration::from_secs(poll_secs.max(2)));
        while shutdown.load(Ordering::Acquire) {
            ticker.tick().await;
            match self.http.get(&url).send().await {
                Ok(resp) => match resp.json::<serde_json::Value>().await {
                    Ok(body) => {
                        let price = body
                            .get(&price_field)
                            .and_then(|v| v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok())));
                        if let Some(price) = price {
                            self.secondaries.write().insert(
                                name.clone(),
                                SecondaryEntry { price, observed_at: Utc::now() },
                            );
                        } else {
                            debug!(source = %name, field = %price_field, "price feed: secondary payload missing price field");
                        }
                    }
                    Err(e) => warn!(source = %name, error = %e, "price feed: secondary decode failed"),
                },
                Err(e) => warn!(source = %name, error = %e, "price feed: secondary fetch failed"),
            }
        }
    }
}

fn millis_to_datetime(ms: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms as i64).unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::client::oracle::OraclePriceManager;
    use std::sync::Arc as StdArc;

    fn fresh_feed(price: f64) -> StdArc<PriceFeed> {
        let prices: SharedOraclePrices = StdArc::new(RwLock::new(OraclePriceManager::new()));
        let now_ms = Utc::now().timestamp_millis() as u64;
        prices.write().update_price(OracleType::ChainLink, "BTC", price, now_ms);
        PriceFeed::new(prices, "BTC", 30_000)
    }

    #[test]
    fn latest_returns_fresh_tick_within_staleness_window() {
        let feed = fresh_feed(60000.0);
        match feed.latest() {
            FeedStatus::Fresh(tick) => assert!((tick.price - 60000.0).abs() < 1e-9),
            FeedStatus::Stale => panic!("expected fresh tick"),
        }
    }

    #[test]
    fn latest_reports_stale_past_window() {
        let prices: SharedOraclePrices = StdArc::new(RwLock::new(OraclePriceManager::new()));
        let old_ms = (Utc::now() - chrono::Duration::seconds(60)).timestamp_millis() as u64;
        prices.write().update_price(OracleType::ChainLink, "BTC", 60000.0, old_ms);
        let feed = PriceFeed::new(prices, "BTC", 30_000);
        assert!(matches!(feed.latest(), FeedStatus::Stale));
    }

    #[test]
    fn reconciled_flags_divergence_over_one_percent() {
        let feed = fresh_feed(60000.0);
        feed.secondaries.write().insert(
            "secondary_a".to_string(),
            SecondaryEntry { price: 60700.0, observed_at: Utc::now() },
        );
        let reconciled = feed.reconciled().unwrap();
        assert!(reconciled.diverged);
        assert!(reconciled.spread_pct > 1.0);
    }

    #[test]
    fn reconciled_none_when_primary_stale() {
        let prices: SharedOraclePrices = StdArc::new(RwLock::new(OraclePriceManager::new()));
        let feed = PriceFeed::new(prices, "BTC", 30_000);
        assert!(feed.reconciled().is_none());
    }
}
