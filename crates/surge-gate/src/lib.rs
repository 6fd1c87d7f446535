//! Entry admission gate and leader selection.
//!
//! Converts an ignited candidate into an admissible entry signal via a
//! fixed battery of named conditions, with time-based threshold
//! relaxation, price-tier spread scaling and two override policies
//! (strong-break and mega-breakout). When several candidates are
//! admissible in one cycle, the leader selector picks at most one.

pub mod config;
pub mod decision;
pub mod gate;
pub mod relaxation;
pub mod selector;
pub mod thresholds;

pub use config::{GateConfig, OverrideConfig, PriceTiers, RelaxationConfig};
pub use decision::{AdmitPath, GateDecision};
pub use gate::EntryGate;
pub use relaxation::RelaxationState;
pub use selector::{Candidate, LeaderSelector, SelectorConfig};
pub use thresholds::GateThresholds;
