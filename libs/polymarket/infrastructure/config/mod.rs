//! Engine configuration: YAML file + environment overrides.
//!
//! Layering follows the same shape as the bot's legacy `BotConfig`: a YAML
//! file on disk for tunables, with secrets and environment-specific values
//! pulled from the process environment rather than checked into the file.

pub mod wallet;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub use wallet::{PolymarketWallet, SignatureType};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("environment variable not found: {0}")]
    EnvVarMissing(String),

    #[error("invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

fn default_dead_zone_pct() -> f64 {
    0.04
}
fn default_agreement_min() -> u8 {
    3
}
fn default_confidence_threshold_pct() -> f64 {
    60.0
}
fn default_drift_k() -> f64 {
    // Calibrated so a 0.1% anchor-to-current drift saturates to a score of ~1.0.
    10.0
}
fn default_min_vol() -> f64 {
    0.03
}
fn default_max_vol() -> f64 {
    3.0
}
fn default_entry_lead_secs() -> u64 {
    20
}
fn default_strategy_delay_secs() -> u64 {
    5
}
fn default_entry_window_secs() -> u64 {
    10
}
fn default_kelly_fraction() -> f64 {
    0.25
}
fn default_cooldown_mins() -> u64 {
    30
}
fn default_daily_loss_cap_pct() -> f64 {
    0.15
}
fn default_dashboard_port() -> u16 {
    8765
}
fn default_poll_secs() -> u64 {
    2
}
fn default_arb_poll_secs() -> u64 {
    8
}
fn default_arb_threshold() -> f64 {
    0.98
}
fn default_arb_timeframes() -> Vec<String> {
    vec!["5m".to_string(), "15m".to_string(), "30m".to_string(), "1h".to_string()]
}
fn default_secondary_price_field() -> String {
    "price".to_string()
}
fn default_guardian_bps_threshold() -> f64 {
    // Same magnitude as the default dead-zone (0.04% = 4bps): reconfirms the
    // anchor-drift edge a window traded on hasn't collapsed by fill time.
    4.0
}
fn default_fok_timeout_ms() -> u64 {
    2000
}

/// Per-timeframe / per-lane risk configuration — becomes one `RiskBucket`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskBucketConfig {
    pub hard_cap_usd: f64,
    #[serde(default = "default_kelly_fraction")]
    pub kelly_fraction: f64,
    #[serde(default = "default_daily_loss_cap_pct")]
    pub daily_loss_cap_pct: f64,
    pub max_trades: u32,
    pub max_streak: u32,
    #[serde(default = "default_cooldown_mins")]
    pub cooldown_mins: u64,
}

/// Per-timeframe signal tuning — the Open Question in the design notes
/// ("should dead-zone be global or per-bucket?") is resolved as per-bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    #[serde(default = "default_dead_zone_pct")]
    pub dead_zone_pct: f64,
    #[serde(default = "default_agreement_min")]
    pub agreement_min: u8,
    #[serde(default = "default_confidence_threshold_pct")]
    pub confidence_threshold_pct: f64,
    #[serde(default = "default_drift_k")]
    pub drift_k: f64,
    #[serde(default = "default_min_vol")]
    pub min_vol: f64,
    #[serde(default = "default_max_vol")]
    pub max_vol: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            dead_zone_pct: default_dead_zone_pct(),
            agreement_min: default_agreement_min(),
            confidence_threshold_pct: default_confidence_threshold_pct(),
            drift_k: default_drift_k(),
            min_vol: default_min_vol(),
            max_vol: default_max_vol(),
        }
    }
}

/// Per-window pipeline timing (§4.1 step 1, 3, 6). One instance per
/// timeframe, since the 15m and 5m lanes use different literal offsets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_entry_lead_secs")]
    pub entry_lead_secs: u64,
    #[serde(default = "default_strategy_delay_secs")]
    pub strategy_delay_secs: u64,
    #[serde(default = "default_entry_window_secs")]
    pub entry_window_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            entry_lead_secs: default_entry_lead_secs(),
            strategy_delay_secs: default_strategy_delay_secs(),
            entry_window_secs: default_entry_window_secs(),
        }
    }
}

impl SchedulerConfig {
    /// §4.1's literal per-lane defaults: 15m uses a 60s lead / 45s delay /
    /// 30s entry window, 5m uses 55s / 45s / 20s. Any other key falls back
    /// to the flat defaults above.
    pub fn default_for_timeframe(timeframe_key: &str) -> Self {
        match timeframe_key {
            "15m" => Self { entry_lead_secs: 60, strategy_delay_secs: 45, entry_window_secs: 30 },
            "5m" => Self { entry_lead_secs: 55, strategy_delay_secs: 45, entry_window_secs: 20 },
            _ => Self::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbConfig {
    #[serde(default = "default_arb_poll_secs")]
    pub poll_secs: u64,
    #[serde(default = "default_arb_threshold")]
    pub threshold: f64,
    pub min_edge_pct: f64,
    pub size_usd: f64,
    pub daily_budget_usd: f64,
    /// Which listed market durations the scanner groups candidates into
    /// (`5m`, `15m`, `30m`, `1h`); a market whose start/end spread matches
    /// none of these (within a minute's tolerance) is skipped.
    #[serde(default = "default_arb_timeframes")]
    pub timeframes: Vec<String>,
}

/// A polled secondary REST price source, folded into `PriceFeed`'s
/// reconciliation view. Never promoted to primary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondarySourceConfig {
    pub name: String,
    pub url: String,
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
    /// Top-level JSON field on the response body holding the price.
    #[serde(default = "default_secondary_price_field")]
    pub price_field: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LateWindowConfig {
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
    pub drift_threshold_pct: f64,
    pub max_entry_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { enabled: false, port: default_dashboard_port() }
    }
}

/// Top-level engine configuration loaded from `config/engine_config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub bankroll_usd: f64,
    pub risk_buckets: HashMap<String, RiskBucketConfig>,
    #[serde(default)]
    pub signals: HashMap<String, SignalConfig>,
    #[serde(default)]
    pub scheduler: HashMap<String, SchedulerConfig>,
    pub arb: ArbConfig,
    pub late_window: LateWindowConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub secondary_sources: Vec<SecondarySourceConfig>,
    #[serde(default = "default_guardian_bps_threshold")]
    pub guardian_bps_threshold: f64,
    #[serde(default = "default_fok_timeout_ms")]
    pub fok_timeout_ms: u64,
}

impl EngineConfig {
    /// Load from YAML, then apply `--bankroll` CLI override if present.
    pub fn load(config_path: impl AsRef<Path>, bankroll_override: Option<f64>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        let mut config: EngineConfig = serde_yaml::from_str(&yaml_content)?;

        if let Some(bankroll) = bankroll_override {
            config.bankroll_usd = bankroll;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.bankroll_usd <= 0.0 {
            return Err(ConfigError::ValidationError("bankroll_usd must be positive".into()));
        }
        if self.risk_buckets.is_empty() {
            return Err(ConfigError::ValidationError("at least one risk bucket must be configured".into()));
        }
        for (name, bucket) in &self.risk_buckets {
            if bucket.hard_cap_usd > self.bankroll_usd {
                return Err(ConfigError::ValidationError(format!(
                    "bucket '{name}' hard_cap_usd (${:.2}) exceeds bankroll (${:.2})",
                    bucket.hard_cap_usd, self.bankroll_usd
                )));
            }
            if !(0.0..=1.0).contains(&bucket.kelly_fraction) {
                return Err(ConfigError::ValidationError(format!(
                    "bucket '{name}' kelly_fraction must be in [0, 1]"
                )));
            }
        }
        if self.arb.threshold <= 0.0 || self.arb.threshold > 1.0 {
            return Err(ConfigError::ValidationError("arb.threshold must be in (0, 1]".into()));
        }
        Ok(())
    }

    pub fn log(&self) {
        info!("Engine configuration loaded:");
        info!("  Bankroll: ${:.2}", self.bankroll_usd);
        for (name, bucket) in &self.risk_buckets {
            info!(
                "  Bucket '{name}': cap=${:.2} kelly={:.2} max_trades={} max_streak={} daily_loss_cap={:.0}%",
                bucket.hard_cap_usd,
                bucket.kelly_fraction,
                bucket.max_trades,
                bucket.max_streak,
                bucket.daily_loss_cap_pct * 100.0
            );
        }
        info!(
            "  Arb: threshold={:.4} min_edge={:.2}% size=${:.2} daily_budget=${:.2} timeframes={:?}",
            self.arb.threshold, self.arb.min_edge_pct, self.arb.size_usd, self.arb.daily_budget_usd, self.arb.timeframes
        );
        info!(
            "  Dashboard: {}",
            if self.dashboard.enabled { format!("enabled on port {}", self.dashboard.port) } else { "disabled".to_string() }
        );
        info!(
            "  Guardian: {:.1}bps  FoK timeout: {}ms  Secondary sources: {}",
            self.guardian_bps_threshold,
            self.fok_timeout_ms,
            self.secondary_sources.len()
        );
    }

    pub fn signal_config(&self, timeframe_key: &str) -> SignalConfig {
        self.signals.get(timeframe_key).cloned().unwrap_or_default()
    }

    pub fn scheduler_config(&self, timeframe_key: &str) -> SchedulerConfig {
        self.scheduler
            .get(timeframe_key)
            .cloned()
            .unwrap_or_else(|| SchedulerConfig::default_for_timeframe(timeframe_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EngineConfig {
        let mut risk_buckets = HashMap::new();
        risk_buckets.insert(
            "15m".to_string(),
            RiskBucketConfig {
                hard_cap_usd: 200.0,
                kelly_fraction: 0.25,
                daily_loss_cap_pct: 0.15,
                max_trades: 20,
                max_streak: 4,
                cooldown_mins: 30,
            },
        );
        EngineConfig {
            bankroll_usd: 1000.0,
            risk_buckets,
            signals: HashMap::new(),
            scheduler: HashMap::new(),
            arb: ArbConfig {
                poll_secs: 2,
                threshold: 0.99,
                min_edge_pct: 0.5,
                size_usd: 50.0,
                daily_budget_usd: 500.0,
                timeframes: default_arb_timeframes(),
            },
            late_window: LateWindowConfig {
                poll_secs: 2,
                drift_threshold_pct: 0.3,
                max_entry_price: 0.9,
            },
            dashboard: DashboardConfig::default(),
            secondary_sources: Vec::new(),
            guardian_bps_threshold: default_guardian_bps_threshold(),
            fok_timeout_ms: default_fok_timeout_ms(),
        }
    }

    #[test]
    fn validates_a_well_formed_config() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn rejects_bucket_cap_over_bankroll() {
        let mut config = sample();
        config.risk_buckets.get_mut("15m").unwrap().hard_cap_usd = 5000.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_bankroll() {
        let mut config = sample();
        config.bankroll_usd = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn bankroll_override_applies() {
        let config = sample();
        assert_eq!(config.bankroll_usd, 1000.0);
    }

    #[test]
    fn arb_timeframes_default_to_all_four_durations() {
        assert_eq!(default_arb_timeframes(), vec!["5m", "15m", "30m", "1h"]);
    }
}
