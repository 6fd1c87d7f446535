//! Shared single-slot request pacer.
//!
//! Enforces a minimum interval between outgoing requests across all
//! instrument tasks, respecting the exchange rate limit. This is the
//! sole cross-task synchronization point in the data path.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Single-slot minimum-interval limiter.
///
/// Each caller reserves the next free send slot under a short lock, then
/// sleeps outside the lock until its slot arrives. Slots are handed out
/// strictly `min_interval` apart, so concurrent callers queue up without
/// ever holding the lock across an await.
pub struct RequestPacer {
    min_interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RequestPacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    /// Reserve the next send slot and wait until it arrives.
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock();
            let now = Instant::now();
            let slot = if *next > now { *next } else { now };
            *next = slot + self.min_interval;
            slot
        };
        tokio::time::sleep_until(slot).await;
    }

    /// Configured minimum inter-request interval.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_sequential_acquires_are_spaced() {
        let pacer = RequestPacer::new(Duration::from_millis(100));
        let start = Instant::now();

        pacer.acquire().await;
        pacer.acquire().await;
        pacer.acquire().await;

        // First slot is immediate; the next two wait 100ms each.
        assert_eq!(start.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_acquires_serialize() {
        let pacer = Arc::new(RequestPacer::new(Duration::from_millis(50)));
        let start = Instant::now();

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let pacer = pacer.clone();
                tokio::spawn(async move {
                    pacer.acquire().await;
                    start.elapsed()
                })
            })
            .collect();

        let mut elapsed: Vec<Duration> = Vec::new();
        for task in tasks {
            elapsed.push(task.await.unwrap());
        }
        elapsed.sort();

        // Four callers occupy four distinct slots 50ms apart.
        assert_eq!(elapsed.last().unwrap(), &Duration::from_millis(150));
        let unique: std::collections::HashSet<_> = elapsed.iter().collect();
        assert_eq!(unique.len(), 4);
    }

    #[tokio::test]
    async fn test_idle_pacer_does_not_wait() {
        let pacer = RequestPacer::new(Duration::from_millis(100));
        let start = std::time::Instant::now();
        pacer.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
