//! Effective threshold resolution.
//!
//! Takes the static configuration, the current relaxation fraction and
//! the instrument price, and produces the concrete numbers the gate
//! compares against. Pure so the same inputs always resolve the same.

use rust_decimal::Decimal;

use crate::config::GateConfig;

/// Linear interpolation from a static threshold toward its
/// full-relaxation limit. Works in both directions: floors move down,
/// ceilings move up.
pub fn relax_toward(static_value: f64, limit: f64, fraction: f64) -> f64 {
    let f = fraction.clamp(0.0, 1.0);
    static_value + (limit - static_value) * f
}

/// Concrete thresholds for one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct GateThresholds {
    pub min_turn_ratio: f64,
    pub max_turn_ratio: f64,
    pub max_spread_pct: f64,
    pub min_flow_accel: f64,
    pub min_buy_ratio: f64,
    pub max_surge_pct: f64,
    pub min_imbalance: f64,
    pub min_volume_vs_ma: f64,
}

impl GateThresholds {
    /// Resolve effective thresholds for `last_price` at relaxation
    /// `fraction`.
    pub fn resolve(cfg: &GateConfig, fraction: f64, last_price: Decimal) -> Self {
        let (spread_mult, max_turn) = if last_price < cfg.tiers.low_price_max {
            (cfg.tiers.low_spread_mult, cfg.tiers.low_max_turn)
        } else if last_price >= cfg.tiers.high_price_min {
            (cfg.tiers.high_spread_mult, cfg.tiers.high_max_turn)
        } else {
            (cfg.tiers.mid_spread_mult, cfg.tiers.mid_max_turn)
        };

        Self {
            min_turn_ratio: relax_toward(cfg.min_turn_ratio, cfg.min_turn_ratio_floor, fraction),
            max_turn_ratio: max_turn,
            max_spread_pct: cfg.max_spread_pct * spread_mult,
            min_flow_accel: relax_toward(cfg.min_flow_accel, cfg.min_flow_accel_floor, fraction),
            min_buy_ratio: relax_toward(cfg.min_buy_ratio, cfg.min_buy_ratio_floor, fraction),
            max_surge_pct: relax_toward(cfg.max_surge_pct, cfg.max_surge_pct_floor, fraction),
            min_imbalance: relax_toward(cfg.min_imbalance, cfg.min_imbalance_floor, fraction),
            min_volume_vs_ma: relax_toward(
                cfg.min_volume_vs_ma,
                cfg.min_volume_vs_ma_floor,
                fraction,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_relax_toward_floor_direction() {
        assert_eq!(relax_toward(0.6, 0.5, 0.0), 0.6);
        assert!((relax_toward(0.6, 0.5, 0.5) - 0.55).abs() < 1e-12);
        assert_eq!(relax_toward(0.6, 0.5, 1.0), 0.5);
    }

    #[test]
    fn test_relax_toward_ceiling_direction() {
        assert_eq!(relax_toward(4.0, 6.0, 0.0), 4.0);
        assert!((relax_toward(4.0, 6.0, 0.5) - 5.0).abs() < 1e-12);
        assert_eq!(relax_toward(4.0, 6.0, 1.0), 6.0);
    }

    #[test]
    fn test_fraction_clamped() {
        assert_eq!(relax_toward(0.6, 0.5, -1.0), 0.6);
        assert_eq!(relax_toward(0.6, 0.5, 2.0), 0.5);
    }

    #[test]
    fn test_resolve_stays_within_static_and_limit() {
        let cfg = GateConfig::default();
        for step in 0..=10 {
            let f = step as f64 / 10.0;
            let t = GateThresholds::resolve(&cfg, f, dec!(50000));
            assert!(t.min_buy_ratio <= cfg.min_buy_ratio);
            assert!(t.min_buy_ratio >= cfg.min_buy_ratio_floor);
            assert!(t.max_surge_pct >= cfg.max_surge_pct);
            assert!(t.max_surge_pct <= cfg.max_surge_pct_floor);
            assert!(t.min_turn_ratio <= cfg.min_turn_ratio);
            assert!(t.min_turn_ratio >= cfg.min_turn_ratio_floor);
        }
    }

    #[test]
    fn test_full_relaxation_sits_exactly_on_limits() {
        let cfg = GateConfig::default();
        let t = GateThresholds::resolve(&cfg, 1.0, dec!(50000));
        assert_eq!(t.min_turn_ratio, cfg.min_turn_ratio_floor);
        assert_eq!(t.min_flow_accel, cfg.min_flow_accel_floor);
        assert_eq!(t.min_buy_ratio, cfg.min_buy_ratio_floor);
        assert_eq!(t.max_surge_pct, cfg.max_surge_pct_floor);
        assert_eq!(t.min_imbalance, cfg.min_imbalance_floor);
        assert_eq!(t.min_volume_vs_ma, cfg.min_volume_vs_ma_floor);
    }

    #[test]
    fn test_price_tier_spread_scaling() {
        let cfg = GateConfig::default();
        let low = GateThresholds::resolve(&cfg, 0.0, dec!(500));
        let mid = GateThresholds::resolve(&cfg, 0.0, dec!(50000));
        let high = GateThresholds::resolve(&cfg, 0.0, dec!(200000));
        assert!(low.max_spread_pct > mid.max_spread_pct);
        assert!(mid.max_spread_pct > high.max_spread_pct);
        assert!(low.max_turn_ratio > mid.max_turn_ratio);
        assert!(mid.max_turn_ratio > high.max_turn_ratio);
    }

    #[test]
    fn test_tier_boundaries() {
        let cfg = GateConfig::default();
        // Exactly at low_price_max falls in the mid tier, exactly at
        // high_price_min falls in the high tier.
        let at_low = GateThresholds::resolve(&cfg, 0.0, cfg.tiers.low_price_max);
        let at_high = GateThresholds::resolve(&cfg, 0.0, cfg.tiers.high_price_min);
        assert_eq!(at_low.max_turn_ratio, cfg.tiers.mid_max_turn);
        assert_eq!(at_high.max_turn_ratio, cfg.tiers.high_max_turn);
    }
}
