//! Gate configuration.
//!
//! Static thresholds, their full-relaxation limits, price-tier spread
//! scaling and the two override policies. Grouped into cohesive structs
//! so tests can override individual families without ambient constants.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Time-based relaxation schedule.
///
/// Idle time is measured since the last admitted entry. Relaxation is
/// linear between `start_after_ms` and `full_after_ms` and clamped at
/// both ends; thresholds never move past their configured limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaxationConfig {
    /// Idle time before any relaxation begins (ms).
    #[serde(default = "default_start_after_ms")]
    pub start_after_ms: i64,
    /// Idle time at which thresholds sit exactly on their limits (ms).
    #[serde(default = "default_full_after_ms")]
    pub full_after_ms: i64,
}

fn default_start_after_ms() -> i64 {
    10 * 60 * 1000
}

fn default_full_after_ms() -> i64 {
    60 * 60 * 1000
}

impl Default for RelaxationConfig {
    fn default() -> Self {
        Self {
            start_after_ms: default_start_after_ms(),
            full_after_ms: default_full_after_ms(),
        }
    }
}

/// Price-tier spread scaling and turn ceilings.
///
/// Relative spread behaves non-linearly across price magnitudes, so the
/// absolute spread cap is scaled per bracket rather than shared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTiers {
    /// Upper price bound of the low tier (exclusive).
    #[serde(default = "default_low_price_max")]
    pub low_price_max: Decimal,
    /// Lower price bound of the high tier (inclusive).
    #[serde(default = "default_high_price_min")]
    pub high_price_min: Decimal,
    /// Spread-ceiling multiplier for the low tier.
    #[serde(default = "default_low_spread_mult")]
    pub low_spread_mult: f64,
    /// Spread-ceiling multiplier for the mid tier.
    #[serde(default = "default_mid_spread_mult")]
    pub mid_spread_mult: f64,
    /// Spread-ceiling multiplier for the high tier.
    #[serde(default = "default_high_spread_mult")]
    pub high_spread_mult: f64,
    /// Maximum turn ratio for the low tier.
    #[serde(default = "default_low_max_turn")]
    pub low_max_turn: f64,
    /// Maximum turn ratio for the mid tier.
    #[serde(default = "default_mid_max_turn")]
    pub mid_max_turn: f64,
    /// Maximum turn ratio for the high tier.
    #[serde(default = "default_high_max_turn")]
    pub high_max_turn: f64,
}

fn default_low_price_max() -> Decimal {
    dec!(1000)
}

fn default_high_price_min() -> Decimal {
    dec!(100000)
}

fn default_low_spread_mult() -> f64 {
    2.0
}

fn default_mid_spread_mult() -> f64 {
    1.0
}

fn default_high_spread_mult() -> f64 {
    0.6
}

fn default_low_max_turn() -> f64 {
    8.0
}

fn default_mid_max_turn() -> f64 {
    5.0
}

fn default_high_max_turn() -> f64 {
    3.0
}

impl Default for PriceTiers {
    fn default() -> Self {
        Self {
            low_price_max: default_low_price_max(),
            high_price_min: default_high_price_min(),
            low_spread_mult: default_low_spread_mult(),
            mid_spread_mult: default_mid_spread_mult(),
            high_spread_mult: default_high_spread_mult(),
            low_max_turn: default_low_max_turn(),
            mid_max_turn: default_mid_max_turn(),
            high_max_turn: default_high_max_turn(),
        }
    }
}

/// Strong-break and mega-breakout override thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideConfig {
    /// Strong break: minimum consecutive bullish closed candles.
    #[serde(default = "default_strong_min_bull_candles")]
    pub strong_min_bull_candles: u32,
    /// Strong break: minimum turn ratio.
    #[serde(default = "default_strong_min_turn")]
    pub strong_min_turn: f64,
    /// Strong break: minimum flow acceleration.
    #[serde(default = "default_strong_min_accel")]
    pub strong_min_accel: f64,
    /// Strong break: maximum price-band stdev.
    #[serde(default = "default_strong_max_band_std")]
    pub strong_max_band_std: f64,
    /// Strong break: spread-ceiling multiplier while the override holds.
    #[serde(default = "default_strong_spread_mult")]
    pub strong_spread_mult: f64,

    /// Mega breakout: minimum single-period return (percent).
    #[serde(default = "default_mega_min_return_pct")]
    pub mega_min_return_pct: f64,
    /// Mega breakout: minimum volume z-score.
    #[serde(default = "default_mega_min_zscore")]
    pub mega_min_zscore: f64,
    /// Mega breakout: minimum absolute notional value of the period.
    #[serde(default = "default_mega_min_value")]
    pub mega_min_value: f64,
}

fn default_strong_min_bull_candles() -> u32 {
    3
}

fn default_strong_min_turn() -> f64 {
    1.5
}

fn default_strong_min_accel() -> f64 {
    2.5
}

fn default_strong_max_band_std() -> f64 {
    0.004
}

fn default_strong_spread_mult() -> f64 {
    1.5
}

fn default_mega_min_return_pct() -> f64 {
    5.0
}

fn default_mega_min_zscore() -> f64 {
    4.0
}

fn default_mega_min_value() -> f64 {
    500_000_000.0
}

impl Default for OverrideConfig {
    fn default() -> Self {
        Self {
            strong_min_bull_candles: default_strong_min_bull_candles(),
            strong_min_turn: default_strong_min_turn(),
            strong_min_accel: default_strong_min_accel(),
            strong_max_band_std: default_strong_max_band_std(),
            strong_spread_mult: default_strong_spread_mult(),
            mega_min_return_pct: default_mega_min_return_pct(),
            mega_min_zscore: default_mega_min_zscore(),
            mega_min_value: default_mega_min_value(),
        }
    }
}

/// Entry gate configuration.
///
/// `*_floor` fields are the full-relaxation limits; static values move
/// linearly toward them with idle time and snap back on admission. For
/// the surge ceiling the limit sits above the static value (a ceiling
/// relaxes upward).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Minimum turn ratio (relaxable).
    #[serde(default = "default_min_turn_ratio")]
    pub min_turn_ratio: f64,
    /// Full-relaxation limit for `min_turn_ratio`.
    #[serde(default = "default_min_turn_ratio_floor")]
    pub min_turn_ratio_floor: f64,

    /// Base spread ceiling before tier scaling.
    #[serde(default = "default_max_spread_pct")]
    pub max_spread_pct: f64,

    /// Minimum flow acceleration (relaxable).
    #[serde(default = "default_min_flow_accel")]
    pub min_flow_accel: f64,
    /// Full-relaxation limit for `min_flow_accel`.
    #[serde(default = "default_min_flow_accel_floor")]
    pub min_flow_accel_floor: f64,

    /// Minimum buy-side value ratio (relaxable).
    #[serde(default = "default_min_buy_ratio")]
    pub min_buy_ratio: f64,
    /// Full-relaxation limit for `min_buy_ratio`.
    #[serde(default = "default_min_buy_ratio_floor")]
    pub min_buy_ratio_floor: f64,

    /// Overheat ceiling on the recent impulse, percent (relaxable upward).
    #[serde(default = "default_max_surge_pct")]
    pub max_surge_pct: f64,
    /// Full-relaxation limit for `max_surge_pct`.
    #[serde(default = "default_max_surge_pct_floor")]
    pub max_surge_pct_floor: f64,

    /// Minimum order-book imbalance (relaxable).
    #[serde(default = "default_min_imbalance")]
    pub min_imbalance: f64,
    /// Full-relaxation limit for `min_imbalance`.
    #[serde(default = "default_min_imbalance_floor")]
    pub min_imbalance_floor: f64,

    /// Maximum tape age for freshness (ms).
    #[serde(default = "default_max_tape_age_ms")]
    pub max_tape_age_ms: i64,

    /// Maximum normalized price-band stdev.
    #[serde(default = "default_max_price_band_std")]
    pub max_price_band_std: f64,

    /// Minimum live consecutive quality buys.
    #[serde(default = "default_min_quality_buys")]
    pub min_quality_buys: u32,

    /// Minimum absolute traded value in the tape window.
    #[serde(default = "default_min_abs_value")]
    pub min_abs_value: f64,

    /// Minimum latest-candle volume vs its moving average (relaxable).
    #[serde(default = "default_min_volume_vs_ma")]
    pub min_volume_vs_ma: f64,
    /// Full-relaxation limit for `min_volume_vs_ma`.
    #[serde(default = "default_min_volume_vs_ma_floor")]
    pub min_volume_vs_ma_floor: f64,

    /// Minimum absolute price.
    #[serde(default = "default_min_price")]
    pub min_price: Decimal,

    /// Price-tier scaling.
    #[serde(default)]
    pub tiers: PriceTiers,

    /// Override policies.
    #[serde(default)]
    pub overrides: OverrideConfig,

    /// Relaxation schedule.
    #[serde(default)]
    pub relaxation: RelaxationConfig,
}

fn default_min_turn_ratio() -> f64 {
    0.5
}

fn default_min_turn_ratio_floor() -> f64 {
    0.2
}

fn default_max_spread_pct() -> f64 {
    0.003
}

fn default_min_flow_accel() -> f64 {
    1.8
}

fn default_min_flow_accel_floor() -> f64 {
    1.3
}

fn default_min_buy_ratio() -> f64 {
    0.6
}

fn default_min_buy_ratio_floor() -> f64 {
    0.5
}

fn default_max_surge_pct() -> f64 {
    4.0
}

fn default_max_surge_pct_floor() -> f64 {
    6.0
}

fn default_min_imbalance() -> f64 {
    0.15
}

fn default_min_imbalance_floor() -> f64 {
    0.05
}

fn default_max_tape_age_ms() -> i64 {
    3000
}

fn default_max_price_band_std() -> f64 {
    0.006
}

fn default_min_quality_buys() -> u32 {
    3
}

fn default_min_abs_value() -> f64 {
    30_000_000.0
}

fn default_min_volume_vs_ma() -> f64 {
    2.0
}

fn default_min_volume_vs_ma_floor() -> f64 {
    1.4
}

fn default_min_price() -> Decimal {
    dec!(1)
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_turn_ratio: default_min_turn_ratio(),
            min_turn_ratio_floor: default_min_turn_ratio_floor(),
            max_spread_pct: default_max_spread_pct(),
            min_flow_accel: default_min_flow_accel(),
            min_flow_accel_floor: default_min_flow_accel_floor(),
            min_buy_ratio: default_min_buy_ratio(),
            min_buy_ratio_floor: default_min_buy_ratio_floor(),
            max_surge_pct: default_max_surge_pct(),
            max_surge_pct_floor: default_max_surge_pct_floor(),
            min_imbalance: default_min_imbalance(),
            min_imbalance_floor: default_min_imbalance_floor(),
            max_tape_age_ms: default_max_tape_age_ms(),
            max_price_band_std: default_max_price_band_std(),
            min_quality_buys: default_min_quality_buys(),
            min_abs_value: default_min_abs_value(),
            min_volume_vs_ma: default_min_volume_vs_ma(),
            min_volume_vs_ma_floor: default_min_volume_vs_ma_floor(),
            min_price: default_min_price(),
            tiers: PriceTiers::default(),
            overrides: OverrideConfig::default(),
            relaxation: RelaxationConfig::default(),
        }
    }
}
