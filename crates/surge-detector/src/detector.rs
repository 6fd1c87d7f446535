//! Ignition detector.
//!
//! Per-instrument state machine:
//! `DORMANT -> IGNITED -> {CONSUMED, EXPIRED} -> DORMANT`.
//!
//! Raising requires all four activity conditions on one feature
//! snapshot: tick-rate burst (with an absolute count floor), a live
//! consecutive-buy streak, a price impulse, and a volume burst under a
//! spread ceiling.

use crate::config::IgnitionConfig;
use crate::record::{IgnitionOutcome, IgnitionRecord};
use std::collections::HashMap;
use surge_core::{FeatureSnapshot, Instrument};
use surge_telemetry::metrics::{
    IGNITIONS_CONSUMED_TOTAL, IGNITIONS_EXPIRED_TOTAL, IGNITIONS_RAISED_TOTAL,
};
use tracing::{debug, info};

/// Ignition detector over the tracked instrument set.
pub struct IgnitionDetector {
    config: IgnitionConfig,
    active: HashMap<Instrument, IgnitionRecord>,
}

impl IgnitionDetector {
    pub fn new(config: IgnitionConfig) -> Self {
        Self {
            config,
            active: HashMap::new(),
        }
    }

    /// Evaluate one instrument's snapshot; raises an ignition if dormant
    /// and all conditions hold.
    ///
    /// Returns the active record (new or pre-existing) if the instrument
    /// is ignited after this observation.
    pub fn observe(
        &mut self,
        instrument: &Instrument,
        snap: &FeatureSnapshot,
    ) -> Option<&IgnitionRecord> {
        self.expire_one(instrument, snap.ts_ms);

        if self.active.contains_key(instrument) {
            // Cooldown: no re-raise while a record is active.
            return self.active.get(instrument);
        }

        if !self.conditions_met(snap) {
            return None;
        }

        let record = IgnitionRecord::new(instrument.clone(), snap.ts_ms, self.config.ttl_ms);
        info!(
            %instrument,
            tick_rate_multiple = snap.tick_rate_multiple,
            buy_streak = snap.buy_streak,
            impulse_pct = snap.impulse_pct,
            volume_burst = snap.volume_burst,
            expires_at_ms = record.expires_at_ms,
            "Ignition raised"
        );
        IGNITIONS_RAISED_TOTAL
            .with_label_values(&[instrument.as_str()])
            .inc();
        self.active.insert(instrument.clone(), record);
        self.active.get(instrument)
    }

    /// All four conditions on the same snapshot.
    fn conditions_met(&self, snap: &FeatureSnapshot) -> bool {
        let rate_burst = snap.tick_rate_multiple >= self.config.min_tick_rate_multiple
            && snap.short_tick_count >= self.config.min_tick_count;

        let streak = snap.buy_streak >= self.config.min_buy_streak;

        let impulse = snap.impulse_pct >= self.config.min_impulse_pct;

        // Volume burst only counts while the book is tight; a missing
        // spread fails the condition.
        let burst_under_spread = snap.volume_burst >= self.config.min_volume_burst
            && snap
                .spread_pct
                .is_some_and(|s| s <= self.config.max_spread_pct);

        rate_burst && streak && impulse && burst_under_spread
    }

    /// The active record for an instrument, if any (expiry applied).
    pub fn active(&mut self, instrument: &Instrument, now_ms: i64) -> Option<&IgnitionRecord> {
        self.expire_one(instrument, now_ms);
        self.active.get(instrument)
    }

    /// Instruments currently ignited (expiry applied).
    pub fn ignited(&mut self, now_ms: i64) -> Vec<Instrument> {
        self.expire_stale(now_ms);
        self.active.keys().cloned().collect()
    }

    /// Consume the active record after a successful gate pass.
    ///
    /// Returns false if no active record existed (already expired or
    /// never raised).
    pub fn consume(&mut self, instrument: &Instrument, now_ms: i64) -> bool {
        self.expire_one(instrument, now_ms);
        if let Some(record) = self.active.remove(instrument) {
            info!(
                %instrument,
                held_ms = now_ms - record.detected_at_ms,
                outcome = %IgnitionOutcome::Consumed,
                "Ignition consumed"
            );
            IGNITIONS_CONSUMED_TOTAL
                .with_label_values(&[instrument.as_str()])
                .inc();
            true
        } else {
            false
        }
    }

    /// Drop all expired records, returning their instruments to dormant.
    pub fn expire_stale(&mut self, now_ms: i64) {
        let expired: Vec<Instrument> = self
            .active
            .iter()
            .filter(|(_, r)| r.is_expired(now_ms))
            .map(|(k, _)| k.clone())
            .collect();
        for instrument in expired {
            self.active.remove(&instrument);
            debug!(%instrument, outcome = %IgnitionOutcome::Expired, "Ignition expired");
            IGNITIONS_EXPIRED_TOTAL
                .with_label_values(&[instrument.as_str()])
                .inc();
        }
    }

    fn expire_one(&mut self, instrument: &Instrument, now_ms: i64) {
        if self
            .active
            .get(instrument)
            .is_some_and(|r| r.is_expired(now_ms))
        {
            self.active.remove(instrument);
            debug!(%instrument, outcome = %IgnitionOutcome::Expired, "Ignition expired");
            IGNITIONS_EXPIRED_TOTAL
                .with_label_values(&[instrument.as_str()])
                .inc();
        }
    }

    pub fn config(&self) -> &IgnitionConfig {
        &self.config
    }
}
