//! FeatureSnapshot assembly.
//!
//! Builds the fixed-shape [`FeatureSnapshot`] from one instrument's
//! buffers in a single pass. The snapshot is computed fresh per
//! evaluation cycle; nothing here caches across calls.

use crate::window::{
    book_imbalance, buy_streak, flow_accel, interarrival_cv, price_band_std, running_candle,
    tape_stats, volume_zscore, vwap,
};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use surge_core::{Candle, FeatureSnapshot, OrderbookSnapshot, TickBuffer};

/// Window lengths for snapshot construction.
///
/// Supplied from application config; defaults match the live tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsWindows {
    /// Inter-arrival CV window (ms).
    #[serde(default = "default_interarrival_window_ms")]
    pub interarrival_window_ms: i64,
    /// Price-band stdev window (ms).
    #[serde(default = "default_band_window_ms")]
    pub band_window_ms: i64,
    /// Tape statistics window (ms).
    #[serde(default = "default_tape_window_ms")]
    pub tape_window_ms: i64,
    /// Buy-streak scan window (ms).
    #[serde(default = "default_streak_window_ms")]
    pub streak_window_ms: i64,
    /// Short flow window for acceleration (ms).
    #[serde(default = "default_short_flow_ms")]
    pub short_flow_ms: i64,
    /// Long flow window for acceleration (ms).
    #[serde(default = "default_long_flow_ms")]
    pub long_flow_ms: i64,
    /// Baseline window for rate/volume multiples (ms).
    #[serde(default = "default_baseline_window_ms")]
    pub baseline_window_ms: i64,
    /// Short burst window for rate/volume multiples (ms).
    #[serde(default = "default_burst_window_ms")]
    pub burst_window_ms: i64,
    /// Price impulse lookback (ms).
    #[serde(default = "default_impulse_window_ms")]
    pub impulse_window_ms: i64,
    /// Candle count for VWAP.
    #[serde(default = "default_vwap_candles")]
    pub vwap_candles: usize,
    /// Candle count for the volume z-score.
    #[serde(default = "default_zscore_candles")]
    pub zscore_candles: usize,
    /// Candle count for the volume moving average.
    #[serde(default = "default_volume_ma_candles")]
    pub volume_ma_candles: usize,
    /// Candle period for running-candle synthesis (ms).
    #[serde(default = "default_candle_period_ms")]
    pub candle_period_ms: i64,
    /// Running-candle fallback horizon (seconds).
    #[serde(default = "default_fallback_secs")]
    pub fallback_secs: i64,
}

fn default_interarrival_window_ms() -> i64 {
    10_000
}

fn default_band_window_ms() -> i64 {
    20_000
}

fn default_tape_window_ms() -> i64 {
    10_000
}

fn default_streak_window_ms() -> i64 {
    15_000
}

fn default_short_flow_ms() -> i64 {
    3_000
}

fn default_long_flow_ms() -> i64 {
    30_000
}

fn default_baseline_window_ms() -> i64 {
    60_000
}

fn default_burst_window_ms() -> i64 {
    5_000
}

fn default_impulse_window_ms() -> i64 {
    10_000
}

fn default_vwap_candles() -> usize {
    5
}

fn default_zscore_candles() -> usize {
    20
}

fn default_volume_ma_candles() -> usize {
    10
}

fn default_candle_period_ms() -> i64 {
    60_000
}

fn default_fallback_secs() -> i64 {
    30
}

impl Default for StatsWindows {
    fn default() -> Self {
        Self {
            interarrival_window_ms: default_interarrival_window_ms(),
            band_window_ms: default_band_window_ms(),
            tape_window_ms: default_tape_window_ms(),
            streak_window_ms: default_streak_window_ms(),
            short_flow_ms: default_short_flow_ms(),
            long_flow_ms: default_long_flow_ms(),
            baseline_window_ms: default_baseline_window_ms(),
            burst_window_ms: default_burst_window_ms(),
            impulse_window_ms: default_impulse_window_ms(),
            vwap_candles: default_vwap_candles(),
            zscore_candles: default_zscore_candles(),
            volume_ma_candles: default_volume_ma_candles(),
            candle_period_ms: default_candle_period_ms(),
            fallback_secs: default_fallback_secs(),
        }
    }
}

/// Build a [`FeatureSnapshot`] from one instrument's current buffers.
///
/// Returns `None` when the tick buffer is empty; individual statistics
/// that lack data carry their own sentinels inside the snapshot.
pub fn build_snapshot(
    buffer: &TickBuffer,
    candles: &[Candle],
    book: Option<&OrderbookSnapshot>,
    now_ms: i64,
    windows: &StatsWindows,
) -> Option<FeatureSnapshot> {
    let last_price = buffer.newest()?.price;

    let tape = tape_stats(buffer.iter(), now_ms, windows.tape_window_ms);
    let running = running_candle(
        buffer.iter(),
        now_ms,
        windows.candle_period_ms,
        windows.fallback_secs,
    );

    // Burst ratios: short window scaled against the baseline window.
    let burst = tape_stats(buffer.iter(), now_ms, windows.burst_window_ms);
    let baseline = tape_stats(buffer.iter(), now_ms, windows.baseline_window_ms);
    let baseline_secs = (windows.baseline_window_ms as f64 / 1000.0).max(f64::EPSILON);
    let burst_secs = (windows.burst_window_ms as f64 / 1000.0).max(f64::EPSILON);
    let baseline_tick_rate = baseline.tick_count as f64 / baseline_secs;
    let burst_tick_rate = burst.tick_count as f64 / burst_secs;
    let tick_rate_multiple = if baseline_tick_rate > 0.0 {
        burst_tick_rate / baseline_tick_rate
    } else {
        0.0
    };
    let volume_burst = if baseline.value_per_sec > 0.0 {
        burst.value_per_sec / baseline.value_per_sec
    } else {
        0.0
    };

    // Price impulse: return over the impulse lookback.
    let impulse_cutoff = now_ms - windows.impulse_window_ms;
    let impulse_pct = buffer
        .since(impulse_cutoff)
        .next()
        .filter(|t| t.price.is_positive())
        .map(|start| {
            (last_price.to_f64() - start.price.to_f64()) / start.price.to_f64() * 100.0
        })
        .unwrap_or(0.0);

    // Turn ratio: short-window traded value vs the per-minute candle baseline.
    let candle_value_mean = mean_candle_value(candles, windows.volume_ma_candles);
    let turn_ratio = if candle_value_mean > 0.0 {
        tape.traded_value / candle_value_mean
    } else {
        0.0
    };

    // Latest candle volume vs its moving average (previous candles).
    let volume_vs_ma = latest_vs_ma(candles, windows.volume_ma_candles);

    let latest_value = running
        .as_ref()
        .map(|c| c.acc_value.to_f64().unwrap_or(0.0))
        .or_else(|| {
            candles
                .last()
                .map(|c| c.acc_value.to_f64().unwrap_or(0.0))
        })
        .unwrap_or(0.0);

    Some(FeatureSnapshot {
        ts_ms: now_ms,
        last_price,
        interarrival_cv: interarrival_cv(buffer.iter(), now_ms, windows.interarrival_window_ms),
        price_band_std: price_band_std(buffer.iter(), now_ms, windows.band_window_ms),
        tape,
        buy_streak: buy_streak(buffer.iter(), now_ms, windows.streak_window_ms),
        flow_accel: flow_accel(
            buffer.iter(),
            now_ms,
            windows.short_flow_ms,
            windows.long_flow_ms,
        ),
        vwap: vwap(candles, windows.vwap_candles),
        volume_zscore: volume_zscore(candles, windows.zscore_candles),
        book_imbalance: book_imbalance(book),
        spread_pct: book.and_then(|b| b.spread_pct()),
        impulse_pct,
        tick_rate_multiple,
        short_tick_count: burst.tick_count,
        volume_burst,
        turn_ratio,
        volume_vs_ma,
        candle_return_pct: running.map(|c| c.return_pct()).unwrap_or(0.0),
        consec_bull_candles: consec_bull(candles),
        latest_value,
    })
}

fn mean_candle_value(candles: &[Candle], n: usize) -> f64 {
    let tail: Vec<f64> = candles
        .iter()
        .rev()
        .take(n)
        .map(|c| c.acc_value.to_f64().unwrap_or(0.0))
        .collect();
    if tail.is_empty() {
        return 0.0;
    }
    tail.iter().sum::<f64>() / tail.len() as f64
}

fn latest_vs_ma(candles: &[Candle], n: usize) -> f64 {
    let Some(latest) = candles.last() else {
        return 1.0;
    };
    let prior: Vec<f64> = candles
        .iter()
        .rev()
        .skip(1)
        .take(n)
        .map(|c| c.acc_value.to_f64().unwrap_or(0.0))
        .collect();
    if prior.is_empty() {
        return 1.0;
    }
    let ma = prior.iter().sum::<f64>() / prior.len() as f64;
    if ma <= 0.0 {
        return 1.0;
    }
    latest.acc_value.to_f64().unwrap_or(0.0) / ma
}

fn consec_bull(candles: &[Candle]) -> u32 {
    let mut run = 0u32;
    for candle in candles.iter().rev() {
        if candle.is_bullish() {
            run += 1;
        } else {
            break;
        }
    }
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use surge_core::{BookLevel, Price, Qty, Side, Tick};

    fn tick(ts_ms: i64, price: Decimal, volume: Decimal, side: Side) -> Tick {
        Tick::new(ts_ms, Price::new(price), Qty::new(volume), side)
    }

    fn candle(open: Decimal, close: Decimal, acc_value: Decimal) -> Candle {
        Candle {
            open: Price::new(open),
            high: Price::new(open.max(close)),
            low: Price::new(open.min(close)),
            close: Price::new(close),
            acc_volume: Qty::new(dec!(1)),
            acc_value,
            period_start: chrono::Utc::now(),
        }
    }

    fn filled_buffer() -> TickBuffer {
        let mut buf = TickBuffer::new(120_000);
        for i in 0..20 {
            buf.push(tick(
                i * 1000,
                dec!(100) + Decimal::from(i) / dec!(10),
                dec!(1),
                Side::Buy,
            ));
        }
        buf
    }

    #[test]
    fn test_empty_buffer_yields_no_snapshot() {
        let buf = TickBuffer::default();
        assert!(build_snapshot(&buf, &[], None, 1000, &StatsWindows::default()).is_none());
    }

    #[test]
    fn test_snapshot_is_deterministic() {
        let buf = filled_buffer();
        let candles = vec![
            candle(dec!(100), dec!(101), dec!(500)),
            candle(dec!(101), dec!(102), dec!(800)),
        ];
        let book = OrderbookSnapshot::new(
            19_000,
            vec![BookLevel::new(Price::new(dec!(101)), Qty::new(dec!(5)))],
            vec![BookLevel::new(Price::new(dec!(102)), Qty::new(dec!(2)))],
        );
        let windows = StatsWindows::default();

        let a = build_snapshot(&buf, &candles, Some(&book), 19_500, &windows).unwrap();
        let b = build_snapshot(&buf, &candles, Some(&book), 19_500, &windows).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_snapshot_fields_populated() {
        let buf = filled_buffer();
        let candles = vec![
            candle(dec!(100), dec!(99), dec!(500)),
            candle(dec!(99), dec!(100), dec!(500)),
            candle(dec!(100), dec!(101), dec!(1500)),
        ];
        let snap =
            build_snapshot(&buf, &candles, None, 19_500, &StatsWindows::default()).unwrap();

        assert_eq!(snap.last_price.inner(), dec!(101.9));
        assert!(snap.interarrival_cv.is_some());
        assert!(snap.buy_streak >= 10);
        assert_eq!(snap.consec_bull_candles, 2);
        assert!(snap.volume_vs_ma > 1.0); // 1500 vs mean(500, 500)
        assert_eq!(snap.book_imbalance, 0.0); // no book supplied
        assert!(snap.spread_pct.is_none());
    }

    #[test]
    fn test_tick_rate_multiple_on_burst() {
        // Sparse baseline across 60s, then a 5-tick burst in the last 2s.
        let mut buf = TickBuffer::new(120_000);
        for i in 0..6 {
            buf.push(tick(i * 10_000, dec!(100), dec!(1), Side::Buy));
        }
        for i in 0..5 {
            buf.push(tick(58_000 + i * 400, dec!(100), dec!(1), Side::Buy));
        }
        let snap =
            build_snapshot(&buf, &[], None, 60_000, &StatsWindows::default()).unwrap();
        assert!(snap.tick_rate_multiple > 3.0);
    }
}
