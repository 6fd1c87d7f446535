//! Leader selection.
//!
//! When several instruments clear the gate in the same cycle only one
//! is entered. Candidates are scored by a weighted blend of momentum
//! features and the highest score wins, with a lexicographic tie-break
//! so the choice never depends on iteration order.

use serde::{Deserialize, Serialize};
use tracing::info;

use surge_core::{FeatureSnapshot, Instrument};

use crate::decision::AdmitPath;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    #[serde(default = "default_accel_weight")]
    pub accel_weight: f64,
    #[serde(default = "default_zscore_weight")]
    pub zscore_weight: f64,
    #[serde(default = "default_imbalance_weight")]
    pub imbalance_weight: f64,
}

fn default_accel_weight() -> f64 {
    1.0
}

fn default_zscore_weight() -> f64 {
    0.5
}

fn default_imbalance_weight() -> f64 {
    2.0
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            accel_weight: default_accel_weight(),
            zscore_weight: default_zscore_weight(),
            imbalance_weight: default_imbalance_weight(),
        }
    }
}

/// One gate-admitted instrument in the current cycle.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub instrument: Instrument,
    pub snapshot: FeatureSnapshot,
    pub path: AdmitPath,
}

pub struct LeaderSelector {
    config: SelectorConfig,
}

impl LeaderSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, snap: &FeatureSnapshot) -> f64 {
        self.config.accel_weight * snap.flow_accel
            + self.config.zscore_weight * snap.volume_zscore
            + self.config.imbalance_weight * snap.book_imbalance
    }

    /// Pick the single leader among this cycle's admitted candidates.
    ///
    /// Returns `None` only for an empty slate. Ties on score fall back
    /// to instrument code ordering.
    pub fn select(&self, candidates: Vec<Candidate>) -> Option<Candidate> {
        let leader = candidates.into_iter().max_by(|a, b| {
            self.score(&a.snapshot)
                .partial_cmp(&self.score(&b.snapshot))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.instrument.as_str().cmp(a.instrument.as_str()))
        })?;
        info!(
            instrument = %leader.instrument,
            path = %leader.path,
            score = self.score(&leader.snapshot),
            "leader selected"
        );
        Some(leader)
    }
}
