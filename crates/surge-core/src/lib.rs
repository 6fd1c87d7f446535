//! Core domain types for the surge ignition bot.
//!
//! This crate provides fundamental types used throughout the system:
//! - `Instrument`: Validated exchange symbol (e.g., "KRW-BTC")
//! - `Price`, `Qty`: Precision-safe numeric types
//! - `Tick`, `Candle`, `OrderbookSnapshot`: Raw market data
//! - `TickBuffer`: Bounded rolling per-instrument tick window
//! - `FeatureSnapshot`: Fixed-shape bundle of derived scalars

pub mod buffer;
pub mod decimal;
pub mod error;
pub mod instrument;
pub mod time;
pub mod types;

pub use buffer::TickBuffer;
pub use decimal::{Price, Qty};
pub use error::{CoreError, Result};
pub use instrument::Instrument;
pub use time::unix_ms;
pub use types::{
    BookLevel, Candle, FeatureSnapshot, OrderbookSnapshot, Side, TapeStats, Tick,
};
