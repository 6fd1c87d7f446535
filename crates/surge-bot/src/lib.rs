//! Momentum-ignition decision engine.
//!
//! Orchestrates the full pipeline:
//! - Market data ingestion via the rate-limited REST client
//! - Windowed feature snapshots per instrument
//! - Ignition detection and gate admission
//! - Leader selection (one entry per cycle)
//! - Position monitor tasks until exit

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
