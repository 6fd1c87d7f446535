//! Structured logging and Prometheus metrics for the surge bot.
//!
//! - Structured JSON logging with tracing (pretty output in development)
//! - Prometheus counters for ignition/gate/position lifecycle events

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
