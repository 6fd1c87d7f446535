//! Application configuration.
//!
//! One TOML file supplies every threshold at process start. Parse and
//! validation failures are the only fatal errors in the system; after
//! startup nothing mutates the configuration except the relaxation
//! mechanism inside the gate.

use std::path::Path;

use serde::{Deserialize, Serialize};

use surge_detector::IgnitionConfig;
use surge_gate::{GateConfig, SelectorConfig};
use surge_market::ClientConfig;
use surge_position::ExitConfig;
use surge_stats::StatsWindows;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Instruments to track, e.g. ["KRW-BTC", "KRW-ETH"].
    #[serde(default = "default_instruments")]
    pub instruments: Vec<String>,

    /// Evaluation cycle interval (ms).
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,

    /// Ticks fetched per instrument per cycle.
    #[serde(default = "default_tick_fetch_count")]
    pub tick_fetch_count: u32,

    /// Candles fetched per instrument per cycle.
    #[serde(default = "default_candle_fetch_count")]
    pub candle_fetch_count: u32,

    /// Maximum instrument scans in flight at once.
    #[serde(default = "default_max_scan_workers")]
    pub max_scan_workers: usize,

    /// Maximum concurrently monitored positions.
    #[serde(default = "default_max_open_positions")]
    pub max_open_positions: usize,

    /// Ticks fetched per poll by a position monitor.
    #[serde(default = "default_monitor_tick_fetch_count")]
    pub monitor_tick_fetch_count: u32,

    /// Position monitor poll interval (ms).
    #[serde(default = "default_monitor_poll_interval_ms")]
    pub monitor_poll_interval_ms: u64,

    /// Notional size of each entry, quote currency.
    #[serde(default = "default_entry_notional")]
    pub entry_notional: f64,

    #[serde(default)]
    pub market: ClientConfig,

    #[serde(default)]
    pub windows: StatsWindows,

    #[serde(default)]
    pub ignition: IgnitionConfig,

    #[serde(default)]
    pub gate: GateConfig,

    #[serde(default)]
    pub selector: SelectorConfig,

    #[serde(default)]
    pub exit: ExitConfig,
}

fn default_instruments() -> Vec<String> {
    vec!["KRW-BTC".to_string()]
}

fn default_cycle_interval_ms() -> u64 {
    1_000
}

fn default_tick_fetch_count() -> u32 {
    100
}

fn default_candle_fetch_count() -> u32 {
    30
}

fn default_max_scan_workers() -> usize {
    4
}

fn default_max_open_positions() -> usize {
    3
}

fn default_monitor_tick_fetch_count() -> u32 {
    30
}

fn default_monitor_poll_interval_ms() -> u64 {
    500
}

fn default_entry_notional() -> f64 {
    100_000.0
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            instruments: default_instruments(),
            cycle_interval_ms: default_cycle_interval_ms(),
            tick_fetch_count: default_tick_fetch_count(),
            candle_fetch_count: default_candle_fetch_count(),
            max_scan_workers: default_max_scan_workers(),
            max_open_positions: default_max_open_positions(),
            monitor_tick_fetch_count: default_monitor_tick_fetch_count(),
            monitor_poll_interval_ms: default_monitor_poll_interval_ms(),
            entry_notional: default_entry_notional(),
            market: ClientConfig::default(),
            windows: StatsWindows::default(),
            ignition: IgnitionConfig::default(),
            gate: GateConfig::default(),
            selector: SelectorConfig::default(),
            exit: ExitConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from a file, falling back to defaults when it is missing.
    pub fn load(config_path: &str) -> AppResult<Self> {
        if Path::new(config_path).exists() {
            Self::from_file(config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Startup validation. These are the only fatal errors in the
    /// system; after this point all failures are instrument-local.
    pub fn validate(&self) -> AppResult<()> {
        if self.instruments.is_empty() {
            return Err(AppError::Config("instruments must not be empty".into()));
        }
        for symbol in &self.instruments {
            surge_core::Instrument::parse(symbol.as_str())
                .map_err(|e| AppError::Config(format!("bad instrument {symbol}: {e}")))?;
        }
        if self.max_open_positions == 0 {
            return Err(AppError::Config("max_open_positions must be positive".into()));
        }
        if self.max_scan_workers == 0 {
            return Err(AppError::Config("max_scan_workers must be positive".into()));
        }
        let g = &self.gate;
        if g.min_buy_ratio_floor > g.min_buy_ratio
            || g.min_turn_ratio_floor > g.min_turn_ratio
            || g.min_flow_accel_floor > g.min_flow_accel
            || g.min_imbalance_floor > g.min_imbalance
            || g.min_volume_vs_ma_floor > g.min_volume_vs_ma
        {
            return Err(AppError::Config(
                "relaxation floor above its static threshold".into(),
            ));
        }
        if g.max_surge_pct_floor < g.max_surge_pct {
            return Err(AppError::Config(
                "max_surge_pct_floor must sit above max_surge_pct".into(),
            ));
        }
        if g.relaxation.full_after_ms <= g.relaxation.start_after_ms {
            return Err(AppError::Config(
                "relaxation full_after_ms must exceed start_after_ms".into(),
            ));
        }
        Ok(())
    }
}
