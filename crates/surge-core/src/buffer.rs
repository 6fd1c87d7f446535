//! Bounded rolling tick buffer.
//!
//! One buffer per tracked instrument, owned exclusively by that
//! instrument's monitoring task. Ticks are kept in timestamp order and
//! evicted once they fall outside the retention horizon.

use crate::types::Tick;
use std::collections::VecDeque;

/// Default retention horizon: 60 seconds.
pub const DEFAULT_HORIZON_MS: i64 = 60_000;

/// Rolling window of ticks for one instrument.
#[derive(Debug, Clone)]
pub struct TickBuffer {
    ticks: VecDeque<Tick>,
    horizon_ms: i64,
}

impl TickBuffer {
    /// Create a buffer with the given retention horizon.
    pub fn new(horizon_ms: i64) -> Self {
        Self {
            ticks: VecDeque::new(),
            horizon_ms,
        }
    }

    /// Append a tick and evict everything older than the horizon.
    ///
    /// Out-of-order ticks (timestamp older than the newest) are dropped;
    /// the feed delivers trades in execution order and a regression would
    /// corrupt inter-arrival statistics.
    pub fn push(&mut self, tick: Tick) {
        if let Some(newest) = self.ticks.back() {
            if tick.ts_ms < newest.ts_ms {
                return;
            }
        }
        self.ticks.push_back(tick);
        self.evict(tick.ts_ms);
    }

    /// Extend from a chronological batch (e.g., a REST ticks fetch).
    pub fn extend(&mut self, ticks: impl IntoIterator<Item = Tick>) {
        for tick in ticks {
            self.push(tick);
        }
    }

    fn evict(&mut self, now_ms: i64) {
        let cutoff = now_ms - self.horizon_ms;
        while self.ticks.front().is_some_and(|t| t.ts_ms < cutoff) {
            self.ticks.pop_front();
        }
    }

    /// All retained ticks, oldest first. The iterator is `Clone` so
    /// callers can make several passes over one window.
    pub fn iter(&self) -> impl Iterator<Item = &Tick> + Clone {
        self.ticks.iter()
    }

    /// Ticks with `ts_ms >= since_ms`, oldest first.
    pub fn since(&self, since_ms: i64) -> impl Iterator<Item = &Tick> + Clone {
        // Buffer is time-ordered, so skipping the older prefix is enough.
        self.ticks.iter().skip_while(move |t| t.ts_ms < since_ms)
    }

    /// Newest tick, if any.
    pub fn newest(&self) -> Option<&Tick> {
        self.ticks.back()
    }

    /// Oldest retained tick, if any.
    pub fn oldest(&self) -> Option<&Tick> {
        self.ticks.front()
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

impl Default for TickBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HORIZON_MS)
    }
}
