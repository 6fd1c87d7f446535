//! Ignition thresholds.

use serde::{Deserialize, Serialize};

/// Thresholds for raising an ignition.
///
/// All four activity conditions must hold simultaneously on the same
/// feature snapshot; partial matches never ignite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnitionConfig {
    /// Short-window tick rate must exceed this multiple of baseline.
    #[serde(default = "default_min_tick_rate_multiple")]
    pub min_tick_rate_multiple: f64,
    /// Absolute tick count floor in the short window.
    #[serde(default = "default_min_tick_count")]
    pub min_tick_count: usize,
    /// Minimum live consecutive-buy streak.
    #[serde(default = "default_min_buy_streak")]
    pub min_buy_streak: u32,
    /// Minimum recent price impulse, percent.
    #[serde(default = "default_min_impulse_pct")]
    pub min_impulse_pct: f64,
    /// Minimum recent-vs-baseline volume burst ratio.
    #[serde(default = "default_min_volume_burst")]
    pub min_volume_burst: f64,
    /// Maximum relative spread while the burst holds.
    #[serde(default = "default_max_spread_pct")]
    pub max_spread_pct: f64,
    /// Ignition record time-to-live (ms).
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: i64,
}

fn default_min_tick_rate_multiple() -> f64 {
    4.0
}

fn default_min_tick_count() -> usize {
    5
}

fn default_min_buy_streak() -> u32 {
    3
}

fn default_min_impulse_pct() -> f64 {
    1.0
}

fn default_min_volume_burst() -> f64 {
    3.0
}

fn default_max_spread_pct() -> f64 {
    0.005
}

fn default_ttl_ms() -> i64 {
    30_000
}

impl Default for IgnitionConfig {
    fn default() -> Self {
        Self {
            min_tick_rate_multiple: default_min_tick_rate_multiple(),
            min_tick_count: default_min_tick_count(),
            min_buy_streak: default_min_buy_streak(),
            min_impulse_pct: default_min_impulse_pct(),
            min_volume_burst: default_min_volume_burst(),
            max_spread_pct: default_max_spread_pct(),
            ttl_ms: default_ttl_ms(),
        }
    }
}
