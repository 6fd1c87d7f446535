//! Ignition detection for the surge bot.
//!
//! Flags the onset of an abnormal upward burst per instrument. Each
//! instrument moves through `DORMANT -> IGNITED -> {CONSUMED, EXPIRED}
//! -> DORMANT`; while a record is active no new ignition can be raised
//! for that instrument.

pub mod config;
pub mod detector;
pub mod record;

pub use config::IgnitionConfig;
pub use detector::IgnitionDetector;
pub use record::{IgnitionOutcome, IgnitionRecord};
