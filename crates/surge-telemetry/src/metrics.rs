//! Prometheus metrics for the surge bot.
//!
//! Lifecycle counters for ignition, gate and position events. There is no
//! metrics HTTP endpoint; everything registers on the default registry,
//! so an embedding process can `prometheus::gather()` it.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration
//! failure means duplicate metric names, a startup defect that should
//! crash immediately. These panics only occur during static
//! initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_int_counter, register_int_gauge, CounterVec, IntCounter,
    IntGauge,
};

/// Ignitions raised, per instrument.
pub static IGNITIONS_RAISED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "surge_ignitions_raised_total",
        "Total ignition records raised",
        &["instrument"]
    )
    .unwrap()
});

/// Ignition records expired unconsumed, per instrument.
pub static IGNITIONS_EXPIRED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "surge_ignitions_expired_total",
        "Total ignition records expired unconsumed",
        &["instrument"]
    )
    .unwrap()
});

/// Ignition records consumed by an entry, per instrument.
pub static IGNITIONS_CONSUMED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "surge_ignitions_consumed_total",
        "Total ignition records consumed by an entry",
        &["instrument"]
    )
    .unwrap()
});

/// Gate admissions, per instrument and admit path (base/strong_break/mega_breakout).
pub static GATE_ADMITTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "surge_gate_admitted_total",
        "Total entry gate admissions",
        &["instrument", "path"]
    )
    .unwrap()
});

/// Gate rejections, per first failing condition.
pub static GATE_REJECTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "surge_gate_rejected_total",
        "Total entry gate rejections",
        &["reason"]
    )
    .unwrap()
});

/// Positions opened.
pub static POSITIONS_OPENED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("surge_positions_opened_total", "Total positions opened").unwrap()
});

/// Positions closed, per exit kind (stop/time).
pub static POSITIONS_CLOSED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "surge_positions_closed_total",
        "Total positions closed",
        &["exit"]
    )
    .unwrap()
});

/// Currently open positions.
pub static OPEN_POSITIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("surge_open_positions", "Currently open positions").unwrap()
});

/// Market data requests that returned empty after retries, per endpoint.
pub static MARKET_EMPTY_RESULTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "surge_market_empty_results_total",
        "Market data requests that returned empty",
        &["endpoint"]
    )
    .unwrap()
});
