//! Windowed streaming statistics for the surge ignition bot.
//!
//! Pure, side-effect-free transforms over bounded tick/candle windows.
//! Every function is total: when the window is too short it returns an
//! explicit insufficient-data sentinel (`None`, a stale `TapeStats`, or a
//! defined neutral value) instead of raising or emitting a numeric
//! artifact.

pub mod snapshot;
pub mod window;

pub use snapshot::{build_snapshot, StatsWindows};
pub use window::{
    book_imbalance, buy_streak, flow_accel, interarrival_cv, price_band_std, running_candle,
    tape_stats, volume_zscore, vwap,
};
