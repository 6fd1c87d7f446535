//! Pure windowed statistics over ticks, candles and order books.
//!
//! Edge policies (minimum window lengths, zero-division guards, neutral
//! values) are part of each function's contract and covered by tests.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use surge_core::{Candle, OrderbookSnapshot, Price, TapeStats, Tick};

/// Minimum tick count for inter-arrival statistics.
pub const MIN_INTERARRIVAL_TICKS: usize = 4;
/// Minimum tick count for the price-band stdev.
pub const MIN_BAND_TICKS: usize = 3;
/// Minimum candle count for the volume z-score.
pub const MIN_ZSCORE_CANDLES: usize = 3;

/// Weights applied to the top order book levels for imbalance.
const LEVEL_WEIGHTS: [f64; 3] = [1.0, 0.5, 0.25];

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
fn pop_stdev(values: &[f64], mean: f64) -> f64 {
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Sample standard deviation (n - 1 denominator).
fn sample_stdev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let var =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Coefficient of variation of tick inter-arrival gaps within
/// `[now - window_ms, now]`.
///
/// Requires at least [`MIN_INTERARRIVAL_TICKS`] ticks in the window;
/// returns `None` below that, and `None` for a zero mean gap (all ticks
/// in the same millisecond carry no arrival-rhythm information).
pub fn interarrival_cv<'a>(
    ticks: impl Iterator<Item = &'a Tick>,
    now_ms: i64,
    window_ms: i64,
) -> Option<f64> {
    let cutoff = now_ms - window_ms;
    let ts: Vec<i64> = ticks
        .filter(|t| t.ts_ms >= cutoff)
        .map(|t| t.ts_ms)
        .collect();
    if ts.len() < MIN_INTERARRIVAL_TICKS {
        return None;
    }

    let gaps: Vec<f64> = ts.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
    let m = mean(&gaps);
    if m <= 0.0 {
        return None;
    }
    Some(pop_stdev(&gaps, m) / m)
}

/// Population stdev of trade prices in the window, normalized by the
/// window mean price.
///
/// Requires at least [`MIN_BAND_TICKS`] ticks; `None` otherwise.
pub fn price_band_std<'a>(
    ticks: impl Iterator<Item = &'a Tick>,
    now_ms: i64,
    window_ms: i64,
) -> Option<f64> {
    let cutoff = now_ms - window_ms;
    let prices: Vec<f64> = ticks
        .filter(|t| t.ts_ms >= cutoff)
        .map(|t| t.price.to_f64())
        .collect();
    if prices.len() < MIN_BAND_TICKS {
        return None;
    }
    let m = mean(&prices);
    if m <= 0.0 {
        return None;
    }
    Some(pop_stdev(&prices, m) / m)
}

/// Trailing tape statistics over `[now - window_ms, now]`.
///
/// An empty window yields the stale sentinel, never a division artifact.
pub fn tape_stats<'a>(
    ticks: impl Iterator<Item = &'a Tick>,
    now_ms: i64,
    window_ms: i64,
) -> TapeStats {
    let cutoff = now_ms - window_ms;
    let mut traded_value = 0.0;
    let mut buy_value = 0.0;
    let mut tick_count = 0usize;
    let mut newest_ms = i64::MIN;

    for tick in ticks.filter(|t| t.ts_ms >= cutoff) {
        let value = tick.value().to_f64().unwrap_or(0.0);
        traded_value += value;
        if tick.side.is_buy() {
            buy_value += value;
        }
        tick_count += 1;
        newest_ms = newest_ms.max(tick.ts_ms);
    }

    if tick_count == 0 {
        return TapeStats::stale();
    }

    let buy_ratio = if traded_value > 0.0 {
        buy_value / traded_value
    } else {
        0.0
    };
    let window_secs = (window_ms as f64 / 1000.0).max(f64::EPSILON);

    TapeStats {
        traded_value,
        tick_count,
        buy_ratio,
        age_ms: now_ms.saturating_sub(newest_ms),
        value_per_sec: traded_value / window_secs,
    }
}

/// Longest unbroken run of buy-side ticks within the window.
///
/// Scans oldest to newest, resetting on any non-buy tick, and reports the
/// run ending at the newest tick (the live streak, not the historical
/// maximum).
pub fn buy_streak<'a>(ticks: impl Iterator<Item = &'a Tick>, now_ms: i64, window_ms: i64) -> u32 {
    let cutoff = now_ms - window_ms;
    let mut run = 0u32;
    for tick in ticks.filter(|t| t.ts_ms >= cutoff) {
        if tick.side.is_buy() {
            run += 1;
        } else {
            run = 0;
        }
    }
    run
}

/// Flow acceleration: short-window value rate over long-window value rate.
///
/// Returns 1.0 (neutral) when the long-window rate is non-positive.
pub fn flow_accel<'a>(
    ticks: impl Iterator<Item = &'a Tick> + Clone,
    now_ms: i64,
    short_ms: i64,
    long_ms: i64,
) -> f64 {
    let short = tape_stats(ticks.clone(), now_ms, short_ms);
    let long = tape_stats(ticks, now_ms, long_ms);
    if long.value_per_sec <= 0.0 {
        return 1.0;
    }
    short.value_per_sec / long.value_per_sec
}

/// Volume-weighted average price over the last `n` candles.
///
/// Uses accumulated value / accumulated volume; `None` on zero total
/// volume or an empty window.
pub fn vwap(candles: &[Candle], n: usize) -> Option<Price> {
    let tail = candles.iter().rev().take(n);
    let mut value = Decimal::ZERO;
    let mut volume = Decimal::ZERO;
    for candle in tail {
        value += candle.acc_value;
        volume += candle.acc_volume.inner();
    }
    if volume.is_zero() {
        return None;
    }
    Some(Price::new(value / volume))
}

/// Z-score of the latest candle's accumulated value against the trailing
/// `n` candles.
///
/// Zero below [`MIN_ZSCORE_CANDLES`] candles and for a zero stdev.
pub fn volume_zscore(candles: &[Candle], n: usize) -> f64 {
    let tail: Vec<f64> = candles
        .iter()
        .rev()
        .take(n)
        .map(|c| c.acc_value.to_f64().unwrap_or(0.0))
        .collect();
    if tail.len() < MIN_ZSCORE_CANDLES {
        return 0.0;
    }
    // tail is newest-first; the latest candle is tail[0].
    let latest = tail[0];
    let m = mean(&tail);
    let sd = sample_stdev(&tail, m);
    if sd <= 0.0 {
        return 0.0;
    }
    (latest - m) / sd
}

/// Weighted order book imbalance over the top 3 levels, in [-1, 1].
///
/// Positive values mean bid-heavy. Zero on a malformed or absent book.
pub fn book_imbalance(book: Option<&OrderbookSnapshot>) -> f64 {
    let Some(book) = book else {
        return 0.0;
    };
    if book.bids.is_empty() || book.asks.is_empty() {
        return 0.0;
    }

    let mut bid_value = 0.0;
    let mut ask_value = 0.0;
    for (i, weight) in LEVEL_WEIGHTS.iter().enumerate() {
        if let Some(level) = book.bids.get(i) {
            bid_value += weight * level.value().to_f64().unwrap_or(0.0);
        }
        if let Some(level) = book.asks.get(i) {
            ask_value += weight * level.value().to_f64().unwrap_or(0.0);
        }
    }

    let total = bid_value + ask_value;
    if total <= 0.0 {
        return 0.0;
    }
    ((bid_value - ask_value) / total).clamp(-1.0, 1.0)
}

/// Synthesize the in-progress period's candle from raw ticks.
///
/// Uses ticks whose timestamp falls inside the current period
/// (`now - now % period_ms` onwards). If none do, falls back to the most
/// recent `fallback_secs` of ticks. Returns `None` only when the tick
/// window is empty.
pub fn running_candle<'a>(
    ticks: impl Iterator<Item = &'a Tick> + Clone,
    now_ms: i64,
    period_ms: i64,
    fallback_secs: i64,
) -> Option<Candle> {
    let period_start = now_ms - now_ms.rem_euclid(period_ms);
    let in_period: Vec<&Tick> = ticks.clone().filter(|t| t.ts_ms >= period_start).collect();

    let chosen: Vec<&Tick> = if !in_period.is_empty() {
        in_period
    } else {
        let cutoff = now_ms - fallback_secs * 1000;
        ticks.filter(|t| t.ts_ms >= cutoff).collect()
    };

    let first = chosen.first()?;
    let mut high = first.price;
    let mut low = first.price;
    let mut volume = Decimal::ZERO;
    let mut value = Decimal::ZERO;
    for tick in &chosen {
        high = high.max(tick.price);
        low = low.min(tick.price);
        volume += tick.volume.inner();
        value += tick.value();
    }
    let close = chosen.last()?.price;

    Some(Candle {
        open: first.price,
        high,
        low,
        close,
        acc_volume: surge_core::Qty::new(volume),
        acc_value: value,
        period_start: chrono::DateTime::from_timestamp_millis(period_start)
            .unwrap_or_default(),
    })
}
