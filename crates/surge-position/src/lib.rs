//! Position lifecycle for the surge ignition bot.
//!
//! Each admitted entry becomes one `Position` owned by one
//! `PositionMonitor` task. Exit policy is a forward-only state machine:
//! partial take-profits on max-favorable-excursion targets, a trailing
//! stop below the running high that tightens per realized stage, and a
//! hard time-in-position ceiling.

pub mod config;
pub mod monitor;
pub mod position;

pub use config::ExitConfig;
pub use monitor::{ClosedSummary, PositionMonitor};
pub use position::{ExitEvent, ExitStage, Position};
