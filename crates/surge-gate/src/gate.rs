//! Entry gate.
//!
//! Evaluates a feature snapshot against the effective thresholds and
//! either admits the candidate (naming the admitting policy) or rejects
//! it with the first failing condition. Evaluation is pure: the same
//! snapshot and relaxation state always produce the same decision.

use tracing::debug;

use surge_core::FeatureSnapshot;
use surge_telemetry::metrics::{GATE_ADMITTED_TOTAL, GATE_REJECTED_TOTAL};

use crate::config::GateConfig;
use crate::decision::{AdmitPath, GateDecision};
use crate::relaxation::RelaxationState;
use crate::thresholds::GateThresholds;

pub struct EntryGate {
    config: GateConfig,
}

impl EntryGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Evaluate one candidate snapshot.
    ///
    /// The mega-breakout override is checked before everything else and
    /// admits directly. The strong-break override then softens parts of
    /// the base battery; otherwise the full battery applies.
    pub fn evaluate(
        &self,
        instrument: &str,
        snap: &FeatureSnapshot,
        relax: &RelaxationState,
    ) -> GateDecision {
        let fraction = relax.fraction(&self.config.relaxation, snap.ts_ms);
        let thresholds = GateThresholds::resolve(&self.config, fraction, snap.last_price.inner());

        let decision = self.decide(snap, &thresholds);
        match &decision {
            GateDecision::Admit { path } => {
                debug!(
                    instrument,
                    path = %path,
                    relax_fraction = fraction,
                    "gate admitted"
                );
                GATE_ADMITTED_TOTAL
                    .with_label_values(&[instrument, path.as_str()])
                    .inc();
            }
            GateDecision::Reject { reason } => {
                debug!(instrument, reason = %reason, "gate rejected");
                GATE_REJECTED_TOTAL.with_label_values(&[reason]).inc();
            }
        }
        decision
    }

    fn decide(&self, snap: &FeatureSnapshot, t: &GateThresholds) -> GateDecision {
        if self.is_mega_breakout(snap) {
            return GateDecision::Admit { path: AdmitPath::MegaBreakout };
        }

        let strong = self.is_strong_break(snap);
        let (max_spread, check_surge, check_turn_ceiling) = if strong {
            (t.max_spread_pct * self.config.overrides.strong_spread_mult, false, false)
        } else {
            (t.max_spread_pct, true, true)
        };

        if snap.last_price.inner() < self.config.min_price {
            return GateDecision::reject("min_price");
        }
        if snap.tape.age_ms > self.config.max_tape_age_ms {
            return GateDecision::reject("fresh");
        }
        match snap.spread_pct {
            Some(spread) if spread <= max_spread => {}
            _ => return GateDecision::reject("spread"),
        }
        if snap.turn_ratio < t.min_turn_ratio {
            return GateDecision::reject("turn");
        }
        if check_turn_ceiling && snap.turn_ratio > t.max_turn_ratio {
            return GateDecision::reject("turn_ceiling");
        }
        if snap.flow_accel < t.min_flow_accel {
            return GateDecision::reject("accel");
        }
        if snap.tape.buy_ratio < t.min_buy_ratio {
            return GateDecision::reject("buy_ratio");
        }
        if check_surge && snap.impulse_pct > t.max_surge_pct {
            return GateDecision::reject("surge");
        }
        if snap.book_imbalance < t.min_imbalance {
            return GateDecision::reject("imbalance");
        }
        match snap.price_band_std {
            Some(std) if std <= self.config.max_price_band_std => {}
            // No band estimate means too few ticks to judge stability.
            _ => return GateDecision::reject("band_std"),
        }
        if snap.buy_streak < self.config.min_quality_buys {
            return GateDecision::reject("quality_buys");
        }
        if snap.tape.traded_value < self.config.min_abs_value {
            return GateDecision::reject("abs_value");
        }
        if snap.volume_vs_ma < t.min_volume_vs_ma {
            return GateDecision::reject("volume_ma");
        }

        let path = if strong { AdmitPath::StrongBreak } else { AdmitPath::Base };
        GateDecision::Admit { path }
    }

    fn is_mega_breakout(&self, snap: &FeatureSnapshot) -> bool {
        let o = &self.config.overrides;
        snap.candle_return_pct >= o.mega_min_return_pct
            && snap.volume_zscore >= o.mega_min_zscore
            && snap.latest_value >= o.mega_min_value
    }

    fn is_strong_break(&self, snap: &FeatureSnapshot) -> bool {
        let o = &self.config.overrides;
        let band_ok = match snap.price_band_std {
            Some(std) => std <= o.strong_max_band_std,
            None => false,
        };
        snap.consec_bull_candles >= o.strong_min_bull_candles
            && snap.turn_ratio >= o.strong_min_turn
            && snap.flow_accel >= o.strong_min_accel
            && band_ok
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use surge_core::{Price, TapeStats};

    use super::*;
    use crate::config::RelaxationConfig;

    fn passing_snapshot(ts_ms: i64) -> FeatureSnapshot {
        FeatureSnapshot {
            ts_ms,
            last_price: Price::new(dec!(50000)),
            interarrival_cv: Some(0.4),
            price_band_std: Some(0.002),
            tape: TapeStats {
                traded_value: 80_000_000.0,
                tick_count: 40,
                buy_ratio: 0.72,
                age_ms: 300,
                value_per_sec: 8_000_000.0,
            },
            buy_streak: 4,
            flow_accel: 2.2,
            vwap: Some(Price::new(dec!(49800))),
            volume_zscore: 1.5,
            book_imbalance: 0.3,
            spread_pct: Some(0.001),
            impulse_pct: 1.2,
            tick_rate_multiple: 3.0,
            short_tick_count: 12,
            volume_burst: 2.0,
            turn_ratio: 1.1,
            volume_vs_ma: 2.5,
            candle_return_pct: 0.8,
            consec_bull_candles: 1,
            latest_value: 50_000_000.0,
        }
    }

    fn gate() -> EntryGate {
        EntryGate::new(GateConfig::default())
    }

    fn fresh_relax(ts_ms: i64) -> RelaxationState {
        RelaxationState::new(ts_ms)
    }

    #[test]
    fn test_passing_snapshot_admits_base() {
        let snap = passing_snapshot(1_000_000);
        let decision = gate().evaluate("KRW-BTC", &snap, &fresh_relax(1_000_000));
        assert_eq!(decision, GateDecision::Admit { path: AdmitPath::Base });
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let snap = passing_snapshot(1_000_000);
        let g = gate();
        let relax = fresh_relax(1_000_000);
        let first = g.evaluate("KRW-BTC", &snap, &relax);
        for _ in 0..10 {
            assert_eq!(g.evaluate("KRW-BTC", &snap, &relax), first);
        }
    }

    #[test]
    fn test_first_failing_condition_names_rejection() {
        let g = gate();
        let relax = fresh_relax(1_000_000);

        let mut snap = passing_snapshot(1_000_000);
        snap.tape.age_ms = 10_000;
        assert_eq!(
            g.evaluate("KRW-BTC", &snap, &relax),
            GateDecision::reject("fresh")
        );

        let mut snap = passing_snapshot(1_000_000);
        snap.spread_pct = Some(0.02);
        assert_eq!(
            g.evaluate("KRW-BTC", &snap, &relax),
            GateDecision::reject("spread")
        );

        let mut snap = passing_snapshot(1_000_000);
        snap.turn_ratio = 0.1;
        assert_eq!(
            g.evaluate("KRW-BTC", &snap, &relax),
            GateDecision::reject("turn")
        );

        let mut snap = passing_snapshot(1_000_000);
        snap.flow_accel = 1.0;
        assert_eq!(
            g.evaluate("KRW-BTC", &snap, &relax),
            GateDecision::reject("accel")
        );

        let mut snap = passing_snapshot(1_000_000);
        snap.tape.buy_ratio = 0.4;
        assert_eq!(
            g.evaluate("KRW-BTC", &snap, &relax),
            GateDecision::reject("buy_ratio")
        );

        let mut snap = passing_snapshot(1_000_000);
        snap.impulse_pct = 9.0;
        assert_eq!(
            g.evaluate("KRW-BTC", &snap, &relax),
            GateDecision::reject("surge")
        );

        let mut snap = passing_snapshot(1_000_000);
        snap.book_imbalance = -0.2;
        assert_eq!(
            g.evaluate("KRW-BTC", &snap, &relax),
            GateDecision::reject("imbalance")
        );

        let mut snap = passing_snapshot(1_000_000);
        snap.price_band_std = None;
        assert_eq!(
            g.evaluate("KRW-BTC", &snap, &relax),
            GateDecision::reject("band_std")
        );

        let mut snap = passing_snapshot(1_000_000);
        snap.buy_streak = 1;
        assert_eq!(
            g.evaluate("KRW-BTC", &snap, &relax),
            GateDecision::reject("quality_buys")
        );

        let mut snap = passing_snapshot(1_000_000);
        snap.tape.traded_value = 1_000_000.0;
        assert_eq!(
            g.evaluate("KRW-BTC", &snap, &relax),
            GateDecision::reject("abs_value")
        );

        let mut snap = passing_snapshot(1_000_000);
        snap.volume_vs_ma = 1.0;
        assert_eq!(
            g.evaluate("KRW-BTC", &snap, &relax),
            GateDecision::reject("volume_ma")
        );

        let mut snap = passing_snapshot(1_000_000);
        snap.last_price = Price::new(dec!(0.5));
        assert_eq!(
            g.evaluate("KRW-BTC", &snap, &relax),
            GateDecision::reject("min_price")
        );
    }

    #[test]
    fn test_relaxation_admits_borderline_after_idle() {
        let mut config = GateConfig::default();
        config.relaxation = RelaxationConfig {
            start_after_ms: 10_000,
            full_after_ms: 60_000,
        };
        let g = EntryGate::new(config.clone());

        // Between the floor and the static threshold: fails with no
        // idle time, passes fully relaxed.
        let mut snap = passing_snapshot(0);
        snap.tape.buy_ratio = 0.55;

        let relax = RelaxationState::new(0);
        assert_eq!(
            g.evaluate("KRW-BTC", &snap, &relax),
            GateDecision::reject("buy_ratio")
        );

        snap.ts_ms = 120_000;
        assert!(g.evaluate("KRW-BTC", &snap, &relax).is_admit());
    }

    #[test]
    fn test_relaxation_never_passes_the_floor() {
        let g = gate();
        let relax = RelaxationState::new(0);

        // Below the floor: no amount of idle time admits it.
        let mut snap = passing_snapshot(0);
        snap.tape.buy_ratio = GateConfig::default().min_buy_ratio_floor - 0.01;
        snap.ts_ms = 24 * 3600 * 1000;
        assert_eq!(
            g.evaluate("KRW-BTC", &snap, &relax),
            GateDecision::reject("buy_ratio")
        );
    }

    #[test]
    fn test_strong_break_bypasses_surge_and_turn_ceiling() {
        let g = gate();
        let relax = fresh_relax(1_000_000);

        let mut snap = passing_snapshot(1_000_000);
        snap.consec_bull_candles = 3;
        snap.turn_ratio = 6.0; // above the mid-tier ceiling
        snap.flow_accel = 3.0;
        snap.price_band_std = Some(0.003);
        snap.impulse_pct = 5.5; // above the static surge ceiling
        assert_eq!(
            g.evaluate("KRW-BTC", &snap, &relax),
            GateDecision::Admit { path: AdmitPath::StrongBreak }
        );

        // Same snapshot without the sustained trend hits the ceiling.
        snap.consec_bull_candles = 1;
        assert_eq!(
            g.evaluate("KRW-BTC", &snap, &relax),
            GateDecision::reject("turn_ceiling")
        );
    }

    #[test]
    fn test_mega_breakout_admits_directly() {
        let g = gate();
        let relax = fresh_relax(1_000_000);

        // Everything else about the snapshot is hostile: stale tape,
        // wide spread, weak flow. The expansion alone admits it.
        let mut snap = passing_snapshot(1_000_000);
        snap.tape.age_ms = 60_000;
        snap.spread_pct = Some(0.05);
        snap.flow_accel = 0.1;
        snap.candle_return_pct = 7.0;
        snap.volume_zscore = 5.0;
        snap.latest_value = 900_000_000.0;
        assert_eq!(
            g.evaluate("KRW-BTC", &snap, &relax),
            GateDecision::Admit { path: AdmitPath::MegaBreakout }
        );
    }

    #[test]
    fn test_mega_breakout_takes_precedence_over_strong_break() {
        let g = gate();
        let relax = fresh_relax(1_000_000);

        let mut snap = passing_snapshot(1_000_000);
        // Qualifies for both overrides.
        snap.consec_bull_candles = 3;
        snap.turn_ratio = 2.0;
        snap.flow_accel = 3.0;
        snap.price_band_std = Some(0.003);
        snap.candle_return_pct = 7.0;
        snap.volume_zscore = 5.0;
        snap.latest_value = 900_000_000.0;
        assert_eq!(
            g.evaluate("KRW-BTC", &snap, &relax),
            GateDecision::Admit { path: AdmitPath::MegaBreakout }
        );
    }

    #[test]
    fn test_tier_spread_ceiling_applies() {
        let g = gate();
        let relax = fresh_relax(1_000_000);

        // High-tier price shrinks the spread ceiling to 0.6x.
        let mut snap = passing_snapshot(1_000_000);
        snap.last_price = Price::new(dec!(200000));
        snap.spread_pct = Some(0.0025); // under the base 0.003, over 0.0018
        assert_eq!(
            g.evaluate("KRW-BTC", &snap, &relax),
            GateDecision::reject("spread")
        );

        // Low-tier price widens it to 2x.
        snap.last_price = Price::new(dec!(500));
        snap.spread_pct = Some(0.005);
        assert!(g.evaluate("KRW-BTC", &snap, &relax).is_admit());
    }
}
