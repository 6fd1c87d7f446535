//! Common market data types.
//!
//! Raw exchange data (ticks, candles, order book snapshots) and the
//! derived `FeatureSnapshot` bundle consumed by the detector and gate.

use crate::decimal::{Price, Qty};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trade aggressor side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn is_buy(&self) -> bool {
        matches!(self, Self::Buy)
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// A single executed trade.
///
/// Immutable once received; ordered by `ts_ms` within a `TickBuffer`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Trade timestamp in Unix milliseconds.
    pub ts_ms: i64,
    /// Trade price.
    pub price: Price,
    /// Trade volume.
    pub volume: Qty,
    /// Aggressor side.
    pub side: Side,
}

impl Tick {
    pub fn new(ts_ms: i64, price: Price, volume: Qty, side: Side) -> Self {
        Self {
            ts_ms,
            price,
            volume,
            side,
        }
    }

    /// Traded value (price x volume).
    #[inline]
    pub fn value(&self) -> Decimal {
        self.volume.notional(self.price)
    }
}

/// One price level of an order book side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    pub size: Qty,
}

impl BookLevel {
    pub fn new(price: Price, size: Qty) -> Self {
        Self { price, size }
    }

    /// Resting value at this level (price x size).
    #[inline]
    pub fn value(&self) -> Decimal {
        self.size.notional(self.price)
    }
}

/// Full-replace order book snapshot (top N levels).
///
/// Each snapshot replaces the previous one wholesale; there is no
/// incremental diffing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderbookSnapshot {
    /// Snapshot timestamp in Unix milliseconds.
    pub ts_ms: i64,
    /// Bid levels, best first.
    pub bids: Vec<BookLevel>,
    /// Ask levels, best first.
    pub asks: Vec<BookLevel>,
}

impl OrderbookSnapshot {
    pub fn new(ts_ms: i64, bids: Vec<BookLevel>, asks: Vec<BookLevel>) -> Self {
        Self { ts_ms, bids, asks }
    }

    pub fn best_bid(&self) -> Option<&BookLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&BookLevel> {
        self.asks.first()
    }

    /// Mid price: (best_bid + best_ask) / 2.
    ///
    /// Returns None if either side is empty or the book is crossed.
    pub fn mid_price(&self) -> Option<Price> {
        let bid = self.best_bid()?.price;
        let ask = self.best_ask()?.price;
        if !bid.is_positive() || !ask.is_positive() || bid >= ask {
            return None;
        }
        Some(Price::new((bid.inner() + ask.inner()) / Decimal::TWO))
    }

    /// Relative spread: (ask - bid) / mid.
    pub fn spread_pct(&self) -> Option<f64> {
        let bid = self.best_bid()?.price;
        let ask = self.best_ask()?.price;
        let mid = self.mid_price()?;
        Some((ask.to_f64() - bid.to_f64()) / mid.to_f64())
    }
}

/// A fixed-period candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    /// Accumulated traded volume in the period.
    pub acc_volume: Qty,
    /// Accumulated traded value (quote currency) in the period.
    pub acc_value: Decimal,
    /// Period start (UTC; parsed from the exchange's KST timestamp).
    pub period_start: DateTime<Utc>,
}

impl Candle {
    /// Whether the candle closed above its open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Open-to-close return in percent. Zero for a zero open.
    pub fn return_pct(&self) -> f64 {
        if self.open.is_zero() {
            return 0.0;
        }
        (self.close.to_f64() - self.open.to_f64()) / self.open.to_f64() * 100.0
    }
}

/// Trailing tape statistics over a fixed window.
///
/// `stale()` is the defined sentinel for an empty window: zero activity
/// and an `age_ms` of `i64::MAX` so freshness conditions always fail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapeStats {
    /// Total traded value in the window.
    pub traded_value: f64,
    /// Number of ticks in the window.
    pub tick_count: usize,
    /// Buy-side value ratio in [0, 1].
    pub buy_ratio: f64,
    /// Age of the newest tick (now - newest), in milliseconds.
    pub age_ms: i64,
    /// Traded value per second over the window.
    pub value_per_sec: f64,
}

impl TapeStats {
    /// Sentinel for an empty window.
    pub fn stale() -> Self {
        Self {
            traded_value: 0.0,
            tick_count: 0,
            buy_ratio: 0.0,
            age_ms: i64::MAX,
            value_per_sec: 0.0,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.tick_count == 0
    }
}

/// Point-in-time bundle of derived scalars.
///
/// Computed fresh from the current buffers on each evaluation cycle and
/// never cached across cycles; every gate condition of one evaluation
/// reads this single snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSnapshot {
    /// Evaluation timestamp (Unix ms).
    pub ts_ms: i64,
    /// Most recent trade price.
    pub last_price: Price,
    /// Coefficient of variation of tick inter-arrival gaps. None below
    /// the minimum window.
    pub interarrival_cv: Option<f64>,
    /// Population stdev of trade prices normalized by the window mean.
    pub price_band_std: Option<f64>,
    /// Trailing tape statistics.
    pub tape: TapeStats,
    /// Longest unbroken run of buy-side ticks in the window.
    pub buy_streak: u32,
    /// Short-window value rate over long-window value rate (1.0 neutral).
    pub flow_accel: f64,
    /// Volume-weighted average price over recent candles.
    pub vwap: Option<Price>,
    /// Z-score of the latest candle's accumulated value.
    pub volume_zscore: f64,
    /// Weighted top-of-book imbalance in [-1, 1].
    pub book_imbalance: f64,
    /// Relative spread (ask - bid) / mid. None without a valid book.
    pub spread_pct: Option<f64>,
    /// Recent short-window price return, percent.
    pub impulse_pct: f64,
    /// Short-window tick arrival rate as a multiple of baseline.
    pub tick_rate_multiple: f64,
    /// Tick count in the short window (absolute floor for ignition).
    pub short_tick_count: usize,
    /// Recent volume versus baseline volume ratio.
    pub volume_burst: f64,
    /// Short-window traded value relative to the baseline per-minute value.
    pub turn_ratio: f64,
    /// Latest candle volume versus its moving average.
    pub volume_vs_ma: f64,
    /// Running-candle open-to-last return, percent.
    pub candle_return_pct: f64,
    /// Consecutive bullish closed candles, newest backwards.
    pub consec_bull_candles: u32,
    /// Latest candle accumulated value (for absolute notional floors).
    pub latest_value: f64,
}
