//! Position exit state machine.
//!
//! `Open → Partial1 → Partial2 → Closed`, forward only. The machine is
//! pure: callers feed ticks and closed candles, events come back. All
//! price math stays in `Decimal`.

use rust_decimal::Decimal;
use tracing::warn;

use surge_core::{Candle, Instrument, Price, Qty};

use crate::config::ExitConfig;

/// Monotonic exit stage. No stage is ever revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExitStage {
    Open,
    Partial1,
    Partial2,
    Closed,
}

impl ExitStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExitStage::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExitStage::Open => "open",
            ExitStage::Partial1 => "partial_1",
            ExitStage::Partial2 => "partial_2",
            ExitStage::Closed => "closed",
        }
    }
}

/// What happened on one update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitEvent {
    /// A partial target was hit and a fraction of quantity realized.
    PartialRealized {
        stage: ExitStage,
        fraction: Decimal,
        price: Price,
    },
    /// The trailing stop was breached.
    StopExit { price: Price },
    /// The time-in-position ceiling forced the close.
    TimeExit { price: Price },
}

impl ExitEvent {
    pub fn exit_kind(&self) -> Option<&'static str> {
        match self {
            ExitEvent::StopExit { .. } => Some("stop"),
            ExitEvent::TimeExit { .. } => Some("time"),
            ExitEvent::PartialRealized { .. } => None,
        }
    }
}

/// One open long position and its exit bookkeeping.
#[derive(Debug, Clone)]
pub struct Position {
    pub instrument: Instrument,
    pub entry_price: Price,
    pub qty: Qty,
    pub entered_at_ms: i64,
    config: ExitConfig,
    stage: ExitStage,
    running_high: Price,
    realized_fraction: Decimal,
}

impl Position {
    pub fn open(
        instrument: Instrument,
        entry_price: Price,
        qty: Qty,
        entered_at_ms: i64,
        config: ExitConfig,
    ) -> Self {
        Self {
            instrument,
            entry_price,
            qty,
            entered_at_ms,
            config,
            stage: ExitStage::Open,
            running_high: entry_price,
            realized_fraction: Decimal::ZERO,
        }
    }

    pub fn stage(&self) -> ExitStage {
        self.stage
    }

    pub fn running_high(&self) -> Price {
        self.running_high
    }

    pub fn realized_fraction(&self) -> Decimal {
        self.realized_fraction
    }

    /// Current trailing stop price.
    ///
    /// Offset tightens with realized stage and is capped by the global
    /// stop-distance limit.
    pub fn stop_price(&self) -> Price {
        let offset_pct = match self.stage {
            ExitStage::Open => self.config.trail_open_pct,
            ExitStage::Partial1 => self.config.trail_partial1_pct,
            ExitStage::Partial2 | ExitStage::Closed => self.config.trail_partial2_pct,
        };
        let capped = offset_pct.min(self.config.max_stop_distance_pct);
        let factor = Decimal::ONE - capped / Decimal::from(100);
        Price::new(self.running_high.inner() * factor)
    }

    /// Feed one trade tick.
    pub fn on_tick(&mut self, ts_ms: i64, price: Price) -> Vec<ExitEvent> {
        self.update(ts_ms, price, price, price)
    }

    /// Feed one closed candle. The high raises the running high, the
    /// low is checked against the stop so an intra-period breach is not
    /// missed between ticks.
    pub fn on_candle(&mut self, ts_ms: i64, candle: &Candle) -> Vec<ExitEvent> {
        self.update(ts_ms, candle.close, candle.high, candle.low)
    }

    fn update(&mut self, ts_ms: i64, last: Price, high: Price, low: Price) -> Vec<ExitEvent> {
        let mut events = Vec::new();
        if self.stage.is_terminal() {
            return events;
        }

        if !last.is_positive() || !high.is_positive() || !low.is_positive() {
            debug_assert!(false, "non-positive price fed to position update");
            warn!(instrument = %self.instrument, %last, "dropping malformed price update");
            return events;
        }

        // Running high only ever rises.
        if high > self.running_high {
            self.running_high = high;
        }

        while let Some(event) = self.try_partial(last) {
            events.push(event);
        }

        if ts_ms - self.entered_at_ms >= self.config.max_hold_ms {
            self.stage = ExitStage::Closed;
            events.push(ExitEvent::TimeExit { price: last });
            return events;
        }

        if low <= self.stop_price() {
            self.stage = ExitStage::Closed;
            events.push(ExitEvent::StopExit { price: last });
        }
        events
    }

    /// Advance one partial stage if its fee-adjusted target is met.
    fn try_partial(&mut self, last: Price) -> Option<ExitEvent> {
        let gain_pct = self.running_high.pct_from(self.entry_price)?;
        let fee = self.config.fee_round_trip_pct;

        let (target, fraction, next) = match self.stage {
            ExitStage::Open => (
                self.config.partial1_target_pct,
                self.config.partial1_fraction,
                ExitStage::Partial1,
            ),
            ExitStage::Partial1 => (
                self.config.partial2_target_pct,
                self.config.partial2_fraction,
                ExitStage::Partial2,
            ),
            ExitStage::Partial2 | ExitStage::Closed => return None,
        };

        if gain_pct < target + fee {
            return None;
        }

        self.stage = next;
        self.realized_fraction += fraction;
        Some(ExitEvent::PartialRealized {
            stage: next,
            fraction,
            price: last,
        })
    }
}
