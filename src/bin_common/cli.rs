//! CLI utilities for binaries
//!
//! Handles configuration loading and environment variables
//! for all binary executables.

use std::path::PathBuf;

/// Type of configuration to load
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Events configuration (events_config.yaml)
    Events,
    /// Strategies configuration (strategies_config.yaml)
    Strategies,
    /// Bot configuration (config.yaml) - legacy
    Bot,
    /// Custom path
    Custom(String),
}

impl ConfigType {
    /// Get the default path for this config type
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Events => "config/events_config.yaml",
            ConfigType::Strategies => "config/strategies_config.yaml",
            ConfigType::Bot => "config.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Get the environment variable name for this config type
    pub fn env_var_name(&self) -> &str {
        match self {
            ConfigType::Events => "EVENTS_CONFIG_PATH",
            ConfigType::Strategies => "STRATEGIES_CONFIG_PATH",
            ConfigType::Bot => "CONFIG_PATH",
            ConfigType::Custom(_) => "CONFIG_PATH",
        }
    }
}

/// Load configuration path from environment or use default
///
/// # Arguments
/// * `config_type` - Type of configuration to load
///
/// # Returns
/// Path to the configuration file
///
/// # Examples
/// ```
/// use polymarket_arb_bot::bin_common::load_config_from_env;
/// use polymarket_arb_bot::bin_common::ConfigType;
///
/// let path = load_config_from_env(ConfigType::Strategies);
/// ```
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    std::env::var(config_type.env_var_name())
        .unwrap_or_else(|_| config_type.default_path().to_string())
        .into()
}

/// Parse command line arguments for a binary
///
/// Returns a vector of arguments (excluding the program name)
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

/// Flags accepted by the trading agent binary. Hand-rolled rather than a
/// `clap` derive, matching the rest of `bin_common`.
#[derive(Debug, Clone)]
pub struct CliArgs {
    pub bankroll: Option<f64>,
    pub cycles: u64,
    pub arb: bool,
    pub arb_only: bool,
    pub late_window: bool,
    pub five_min: bool,
    pub mm: bool,
    pub hedge: bool,
    pub dashboard: bool,
    pub sync_live_bankroll: bool,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            bankroll: None,
            cycles: 0,
            arb: false,
            arb_only: false,
            late_window: false,
            five_min: false,
            mm: false,
            hedge: false,
            dashboard: false,
            sync_live_bankroll: false,
        }
    }
}

impl CliArgs {
    /// Parse from `std::env::args()`. Unknown flags are ignored rather than
    /// rejected, since auxiliary lanes may add their own flags later.
    pub fn parse() -> Self {
        Self::from_args(parse_args())
    }

    pub fn from_args(args: Vec<String>) -> Self {
        let mut parsed = Self::default();
        let mut iter = args.into_iter().peekable();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--bankroll" => {
                    if let Some(v) = iter.next().and_then(|s| s.parse().ok()) {
                        parsed.bankroll = Some(v);
                    }
                }
                "--cycles" => {
                    if let Some(v) = iter.next().and_then(|s| s.parse().ok()) {
                        parsed.cycles = v;
                    }
                }
                "--arb" => parsed.arb = true,
                "--arb-only" => parsed.arb_only = true,
                "--late-window" => parsed.late_window = true,
                "--5m" => parsed.five_min = true,
                "--mm" => parsed.mm = true,
                "--hedge" => parsed.hedge = true,
                "--dashboard" => parsed.dashboard = true,
                "--sync-live-bankroll" => parsed.sync_live_bankroll = true,
                _ => {}
            }
        }
        parsed
    }

    /// Whether the 15m window engine should run. `--arb-only` suppresses it.
    pub fn fifteen_min_enabled(&self) -> bool {
        !self.arb_only
    }
}

#[cfg(test)]
mod cli_args_tests {
    use super::*;

    #[test]
    fn defaults_run_fifteen_minute_lane_only() {
        let args = CliArgs::default();
        assert!(args.fifteen_min_enabled());
        assert!(!args.arb && !args.five_min && !args.mm && !args.hedge);
    }

    #[test]
    fn parses_bankroll_and_flags() {
        let args = CliArgs::from_args(vec![
            "--bankroll".to_string(),
            "750".to_string(),
            "--arb".to_string(),
            "--dashboard".to_string(),
        ]);
        assert_eq!(args.bankroll, Some(750.0));
        assert!(args.arb);
        assert!(args.dashboard);
        assert!(!args.mm);
    }

    #[test]
    fn arb_only_disables_fifteen_minute_lane() {
        let args = CliArgs::from_args(vec!["--arb-only".to_string()]);
        assert!(!args.fifteen_min_enabled());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_type_paths() {
        assert_eq!(ConfigType::Events.default_path(), "config/events_config.yaml");
        assert_eq!(ConfigType::Strategies.default_path(), "config/strategies_config.yaml");
        assert_eq!(ConfigType::Bot.default_path(), "config.yaml");

        let custom = ConfigType::Custom("custom/path.yaml".to_string());
        assert_eq!(custom.default_path(), "custom/path.yaml");
    }

    #[test]
    fn test_config_type_env_vars() {
        assert_eq!(ConfigType::Events.env_var_name(), "EVENTS_CONFIG_PATH");
        assert_eq!(ConfigType::Strategies.env_var_name(), "STRATEGIES_CONFIG_PATH");
        assert_eq!(ConfigType::Bot.env_var_name(), "CONFIG_PATH");
    }
}
