//! Idle-time relaxation clock.
//!
//! One state per process: the gate loosens the longer no entry has been
//! admitted anywhere, and snaps back to static thresholds the instant
//! one is.

use crate::config::RelaxationConfig;

/// Tracks the timestamp of the last admitted entry.
#[derive(Debug, Clone)]
pub struct RelaxationState {
    last_entry_ms: i64,
}

impl RelaxationState {
    pub fn new(now_ms: i64) -> Self {
        Self { last_entry_ms: now_ms }
    }

    /// Relaxation fraction in `[0, 1]` at `now_ms`.
    ///
    /// 0 before `start_after_ms` of idle time, 1 at or past
    /// `full_after_ms`, linear in between. A clock that runs backwards
    /// reads as no idle time.
    pub fn fraction(&self, cfg: &RelaxationConfig, now_ms: i64) -> f64 {
        let idle = (now_ms - self.last_entry_ms).max(0);
        if idle <= cfg.start_after_ms {
            return 0.0;
        }
        if idle >= cfg.full_after_ms {
            return 1.0;
        }
        let span = (cfg.full_after_ms - cfg.start_after_ms) as f64;
        if span <= 0.0 {
            return 1.0;
        }
        (idle - cfg.start_after_ms) as f64 / span
    }

    /// Snap back to static thresholds after an admitted entry.
    pub fn reset(&mut self, now_ms: i64) {
        self.last_entry_ms = now_ms;
    }

    pub fn last_entry_ms(&self) -> i64 {
        self.last_entry_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> RelaxationConfig {
        RelaxationConfig {
            start_after_ms: 10_000,
            full_after_ms: 60_000,
        }
    }

    #[test]
    fn test_zero_before_start() {
        let state = RelaxationState::new(0);
        assert_eq!(state.fraction(&cfg(), 0), 0.0);
        assert_eq!(state.fraction(&cfg(), 10_000), 0.0);
    }

    #[test]
    fn test_linear_between_start_and_full() {
        let state = RelaxationState::new(0);
        let f = state.fraction(&cfg(), 35_000);
        assert!((f - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_one_at_and_past_full() {
        let state = RelaxationState::new(0);
        assert_eq!(state.fraction(&cfg(), 60_000), 1.0);
        assert_eq!(state.fraction(&cfg(), 600_000), 1.0);
    }

    #[test]
    fn test_monotone_in_idle_time() {
        let state = RelaxationState::new(0);
        let mut prev = -1.0;
        for now in (0..120_000).step_by(5_000) {
            let f = state.fraction(&cfg(), now);
            assert!(f >= prev, "fraction decreased at {now}");
            prev = f;
        }
    }

    #[test]
    fn test_reset_snaps_back_to_zero() {
        let mut state = RelaxationState::new(0);
        assert_eq!(state.fraction(&cfg(), 60_000), 1.0);
        state.reset(60_000);
        assert_eq!(state.fraction(&cfg(), 60_000), 0.0);
        assert_eq!(state.fraction(&cfg(), 65_000), 0.0);
    }

    #[test]
    fn test_backwards_clock_reads_as_no_idle() {
        let state = RelaxationState::new(50_000);
        assert_eq!(state.fraction(&cfg(), 40_000), 0.0);
    }
}
