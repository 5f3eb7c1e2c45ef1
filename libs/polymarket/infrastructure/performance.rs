//! Performance snapshot writer.
//!
//! Serializes the current per-bucket risk state to a JSON file on a fixed
//! cadence plus once more on shutdown, so an external process (or a human
//! with `cat`) can read the bot's standing without querying it directly.
//! Writes go to a `.tmp` sibling and rename over the target so a reader
//! never observes a partially written file.

use crate::application::engine::RiskManager;
use crate::domain::types::RiskBucket;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub generated_at: DateTime<Utc>,
    pub bankroll_usd: f64,
    pub buckets: Vec<RiskBucket>,
}

impl PerformanceSnapshot {
    pub fn capture(risk: &RiskManager, bankroll_usd: f64) -> Self {
        Self { generated_at: Utc::now(), bankroll_usd, buckets: risk.all_snapshots() }
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let path = path.as_ref();
        let tmp = tmp_path(path);
        let body = serde_json::to_vec_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, path)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Writes a snapshot every `interval` until `shutdown` clears, then writes
/// once more before returning.
pub async fn spawn_snapshot_writer(
    risk: Arc<RiskManager>,
    bankroll_usd: f64,
    path: PathBuf,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
) {
    while shutdown.load(Ordering::Acquire) {
        write_once(&risk, bankroll_usd, &path);
        tokio::time::sleep(interval).await;
    }
    write_once(&risk, bankroll_usd, &path);
    info!(path = %path.display(), "performance: final snapshot written");
}

fn write_once(risk: &RiskManager, bankroll_usd: f64, path: &Path) {
    let snapshot = PerformanceSnapshot::capture(risk, bankroll_usd);
    if let Err(e) = snapshot.write_to(path) {
        error!(error = %e, path = %path.display(), "performance: snapshot write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::RiskBucketConfig;
    use std::collections::HashMap;

    fn risk_manager() -> RiskManager {
        let mut configs = HashMap::new();
        configs.insert(
            "15m".to_string(),
            RiskBucketConfig {
                hard_cap_usd: 500.0,
                kelly_fraction: 0.25,
                daily_loss_cap_pct: 20.0,
                max_trades: 40,
                max_streak: 4,
                cooldown_mins: 30,
            },
        );
        RiskManager::new(1000.0, &configs)
    }

    #[test]
    fn writes_and_replaces_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("performance.json");
        let manager = risk_manager();

        let snapshot = PerformanceSnapshot::capture(&manager, 1000.0);
        snapshot.write_to(&path).unwrap();
        assert!(path.exists());
        assert!(!tmp_path(&path).exists());

        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: PerformanceSnapshot = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.buckets.len(), 1);
    }
}
