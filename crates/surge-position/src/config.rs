//! Exit configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Thresholds for the position exit state machine.
///
/// Partial targets are max-favorable-excursion gains in percent of the
/// entry price, compared fee-adjusted so a target never fires below
/// round-trip cost. Trailing offsets tighten as stages realize, subject
/// to the global stop-distance cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitConfig {
    /// First partial target, percent gain over entry.
    #[serde(default = "default_partial1_target_pct")]
    pub partial1_target_pct: Decimal,
    /// Quantity fraction realized at the first partial.
    #[serde(default = "default_partial1_fraction")]
    pub partial1_fraction: Decimal,

    /// Second partial target, percent gain over entry.
    #[serde(default = "default_partial2_target_pct")]
    pub partial2_target_pct: Decimal,
    /// Quantity fraction realized at the second partial.
    #[serde(default = "default_partial2_fraction")]
    pub partial2_fraction: Decimal,

    /// Trailing offset below the running high while fully open, percent.
    #[serde(default = "default_trail_open_pct")]
    pub trail_open_pct: Decimal,
    /// Trailing offset after the first partial, percent.
    #[serde(default = "default_trail_partial1_pct")]
    pub trail_partial1_pct: Decimal,
    /// Trailing offset after the second partial, percent.
    #[serde(default = "default_trail_partial2_pct")]
    pub trail_partial2_pct: Decimal,

    /// Hard cap on the trailing offset, percent of the running high.
    #[serde(default = "default_max_stop_distance_pct")]
    pub max_stop_distance_pct: Decimal,

    /// Round-trip fee, percent. Added on top of each partial target.
    #[serde(default = "default_fee_round_trip_pct")]
    pub fee_round_trip_pct: Decimal,

    /// Absolute time-in-position ceiling (ms).
    #[serde(default = "default_max_hold_ms")]
    pub max_hold_ms: i64,
}

fn default_partial1_target_pct() -> Decimal {
    dec!(1.2)
}

fn default_partial1_fraction() -> Decimal {
    dec!(0.5)
}

fn default_partial2_target_pct() -> Decimal {
    dec!(2.5)
}

fn default_partial2_fraction() -> Decimal {
    dec!(0.3)
}

fn default_trail_open_pct() -> Decimal {
    dec!(1.5)
}

fn default_trail_partial1_pct() -> Decimal {
    dec!(1.0)
}

fn default_trail_partial2_pct() -> Decimal {
    dec!(0.6)
}

fn default_max_stop_distance_pct() -> Decimal {
    dec!(2.0)
}

fn default_fee_round_trip_pct() -> Decimal {
    dec!(0.1)
}

fn default_max_hold_ms() -> i64 {
    30 * 60 * 1000
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            partial1_target_pct: default_partial1_target_pct(),
            partial1_fraction: default_partial1_fraction(),
            partial2_target_pct: default_partial2_target_pct(),
            partial2_fraction: default_partial2_fraction(),
            trail_open_pct: default_trail_open_pct(),
            trail_partial1_pct: default_trail_partial1_pct(),
            trail_partial2_pct: default_trail_partial2_pct(),
            max_stop_distance_pct: default_max_stop_distance_pct(),
            fee_round_trip_pct: default_fee_round_trip_pct(),
            max_hold_ms: default_max_hold_ms(),
        }
    }
}
