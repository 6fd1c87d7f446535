//! Per-position monitor task.
//!
//! Each open position gets one task that owns the `Position` for its
//! whole lifetime: poll recent ticks and the latest closed candle, feed
//! them through the state machine, and finish when the position
//! reaches its terminal stage. A failed fetch skips the cycle; nothing
//! here propagates to other instruments.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{info, warn};

use surge_core::{unix_ms, Tick};
use surge_market::MarketClient;
use surge_telemetry::metrics::{OPEN_POSITIONS, POSITIONS_CLOSED_TOTAL, POSITIONS_OPENED_TOTAL};

use crate::position::{ExitEvent, Position};

/// How the monitored position ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedSummary {
    pub exit_kind: &'static str,
    pub events: Vec<ExitEvent>,
}

pub struct PositionMonitor {
    client: Arc<MarketClient>,
    position: Position,
    poll_interval: Duration,
    tick_fetch_count: u32,
    last_seen_tick_ms: i64,
    seen_in_last_ms: usize,
}

impl PositionMonitor {
    pub fn new(client: Arc<MarketClient>, position: Position) -> Self {
        Self {
            client,
            last_seen_tick_ms: position.entered_at_ms,
            position,
            poll_interval: Duration::from_millis(500),
            tick_fetch_count: 30,
            seen_in_last_ms: 0,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_tick_fetch_count(mut self, count: u32) -> Self {
        self.tick_fetch_count = count;
        self
    }

    /// Run until the position closes. Fetch failures are soft: the
    /// cycle is skipped and retried on the next interval.
    pub async fn run(mut self) -> ClosedSummary {
        POSITIONS_OPENED_TOTAL.inc();
        OPEN_POSITIONS.inc();
        info!(
            instrument = %self.position.instrument,
            entry = %self.position.entry_price,
            qty = %self.position.qty,
            "position monitor started"
        );

        let mut all_events = Vec::new();
        let mut ticker = interval(self.poll_interval);
        let exit_kind = loop {
            ticker.tick().await;
            if let Some(kind) = self.poll_once(&mut all_events).await {
                break kind;
            }
        };

        OPEN_POSITIONS.dec();
        POSITIONS_CLOSED_TOTAL.with_label_values(&[exit_kind]).inc();
        info!(
            instrument = %self.position.instrument,
            exit = exit_kind,
            realized = %self.position.realized_fraction(),
            "position closed"
        );
        ClosedSummary { exit_kind, events: all_events }
    }

    async fn poll_once(&mut self, all_events: &mut Vec<ExitEvent>) -> Option<&'static str> {
        let instrument = self.position.instrument.clone();
        let ticks = self.client.fetch_ticks(&instrument, self.tick_fetch_count).await;
        if let Some(kind) = self.apply_ticks(&ticks, all_events) {
            return Some(kind);
        }

        // The latest closed candle catches a breach that fell outside
        // the tick fetch window.
        let candles = self.client.fetch_candles(&instrument, 1).await;
        if let Some(candle) = candles.last() {
            let period_end_ms = candle.period_start.timestamp_millis() + 60_000;
            if period_end_ms > self.position.entered_at_ms {
                let events = self.position.on_candle(unix_ms(), candle);
                if let Some(kind) = collect(events, all_events) {
                    return Some(kind);
                }
            }
        } else if ticks.is_empty() {
            warn!(instrument = %instrument, "no market data this cycle, skipping");
            // The time ceiling still has to fire without market data.
            return self.apply_clock_only(all_events);
        }
        None
    }

    /// Feed unseen ticks from one fetched batch, oldest first.
    ///
    /// The exchange delivers same-millisecond trades in a stable order,
    /// so the position within a millisecond dedupes across overlapping
    /// fetches without dropping distinct trades that share a timestamp.
    fn apply_ticks(&mut self, ticks: &[Tick], all_events: &mut Vec<ExitEvent>) -> Option<&'static str> {
        let mut index_in_ms = 0usize;
        for tick in ticks {
            if tick.ts_ms < self.last_seen_tick_ms {
                continue;
            }
            if tick.ts_ms == self.last_seen_tick_ms {
                index_in_ms += 1;
                if index_in_ms <= self.seen_in_last_ms {
                    continue;
                }
                self.seen_in_last_ms = index_in_ms;
            } else {
                self.last_seen_tick_ms = tick.ts_ms;
                index_in_ms = 1;
                self.seen_in_last_ms = 1;
            }
            let events = self.position.on_tick(tick.ts_ms, tick.price);
            if let Some(kind) = collect(events, all_events) {
                return Some(kind);
            }
        }
        None
    }

    fn apply_clock_only(&mut self, all_events: &mut Vec<ExitEvent>) -> Option<&'static str> {
        let last = self.position.running_high();
        let events = self.position.on_tick(unix_ms(), last);
        collect(events, all_events)
    }
}

fn collect(events: Vec<ExitEvent>, all_events: &mut Vec<ExitEvent>) -> Option<&'static str> {
    let mut kind = None;
    for event in events {
        if let Some(k) = event.exit_kind() {
            kind = Some(k);
        }
        all_events.push(event);
    }
    kind
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExitConfig;
    use async_trait::async_trait;
    use chrono::{FixedOffset, Utc};
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use surge_core::{Instrument, Price, Qty};
    use surge_market::{ClientConfig, HttpResponse, HttpTransport, MarketClient, MarketResult};

    /// Transport scripted per endpoint, one body per request; an
    /// exhausted script answers with an empty list.
    struct ScriptedTransport {
        ticks: Mutex<VecDeque<String>>,
        candles: Mutex<VecDeque<String>>,
        candle_requests: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(ticks: Vec<String>, candles: Vec<String>) -> Self {
            Self {
                ticks: Mutex::new(ticks.into()),
                candles: Mutex::new(candles.into()),
                candle_requests: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn get(&self, url: &str) -> MarketResult<HttpResponse> {
            let body = if url.contains("/v1/trades/ticks") {
                self.ticks.lock().pop_front()
            } else {
                self.candle_requests.fetch_add(1, Ordering::SeqCst);
                self.candles.lock().pop_front()
            }
            .unwrap_or_else(|| "[]".to_string());
            Ok(HttpResponse { status: 200, body })
        }
    }

    fn client(transport: Arc<ScriptedTransport>) -> Arc<MarketClient> {
        let config = ClientConfig {
            base_url: "http://localhost".to_string(),
            min_request_interval_ms: 0,
            request_timeout_ms: 1000,
            retry: Default::default(),
        };
        Arc::new(MarketClient::with_transport(config, transport))
    }

    /// Trade prints, newest first, the way the exchange delivers them.
    fn tick_body(prints: &[(&str, i64)]) -> String {
        let entries: Vec<String> = prints
            .iter()
            .map(|(price, ts)| {
                format!(
                    r#"{{"trade_price":{price},"trade_volume":1.0,"ask_bid":"BID","timestamp":{ts}}}"#
                )
            })
            .collect();
        format!("[{}]", entries.join(","))
    }

    /// One closed candle stamped at the current minute so it passes the
    /// pre-entry filter.
    fn candle_body(low: &str) -> String {
        let kst = Utc::now().with_timezone(&FixedOffset::east_opt(9 * 3600).unwrap());
        format!(
            r#"[{{"candle_date_time_kst":"{}","opening_price":102.5,"high_price":102.8,"low_price":{low},"trade_price":102.0,"candle_acc_trade_price":500000.0,"candle_acc_trade_volume":5.0}}]"#,
            kst.format("%Y-%m-%dT%H:%M:%S")
        )
    }

    fn flat_config() -> ExitConfig {
        // No partials, 1.5% trail, no time ceiling.
        ExitConfig {
            partial1_target_pct: dec!(1000),
            partial2_target_pct: dec!(2000),
            trail_open_pct: dec!(1.5),
            max_hold_ms: i64::MAX,
            ..ExitConfig::default()
        }
    }

    fn open_position(entered_at_ms: i64, config: ExitConfig) -> Position {
        Position::open(
            Instrument::parse("KRW-BTC").unwrap(),
            Price::new(dec!(100)),
            Qty::new(dec!(1)),
            entered_at_ms,
            config,
        )
    }

    #[tokio::test]
    async fn test_candle_low_breach_caught_outside_tick_window() {
        let entered_at = unix_ms();
        // The tick fetch only shows prints above the stop; the stop
        // breach is visible only in the candle low.
        let transport = Arc::new(ScriptedTransport::new(
            vec![tick_body(&[
                ("103.0", entered_at + 200),
                ("103.0", entered_at + 100),
            ])],
            vec![candle_body("101.0")],
        ));
        let monitor = PositionMonitor::new(
            client(Arc::clone(&transport)),
            open_position(entered_at, flat_config()),
        );

        let summary = monitor.run().await;
        // Stop is 103 * 0.985 = 101.455; the candle low pierced it.
        assert_eq!(summary.exit_kind, "stop");
        assert_eq!(
            summary.events,
            vec![ExitEvent::StopExit { price: Price::new(dec!(102.0)) }]
        );
        assert_eq!(transport.candle_requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_millisecond_trades_are_not_dropped() {
        let entered_at = unix_ms();
        let ts = entered_at + 100;
        // Second poll re-delivers the seen print plus a distinct trade
        // in the same millisecond that breaches the stop (100 * 0.985).
        let transport = Arc::new(ScriptedTransport::new(
            vec![
                tick_body(&[("100.0", ts)]),
                tick_body(&[("85.0", ts), ("100.0", ts)]),
            ],
            Vec::new(),
        ));
        let monitor = PositionMonitor::new(
            client(Arc::clone(&transport)),
            open_position(entered_at, flat_config()),
        )
        .with_poll_interval(Duration::from_millis(5));

        let summary = monitor.run().await;
        assert_eq!(summary.exit_kind, "stop");
        assert_eq!(
            summary.events,
            vec![ExitEvent::StopExit { price: Price::new(dec!(85.0)) }]
        );
    }

    #[tokio::test]
    async fn test_time_ceiling_fires_without_market_data() {
        let entered_at = unix_ms();
        let transport = Arc::new(ScriptedTransport::new(Vec::new(), Vec::new()));
        let monitor = PositionMonitor::new(
            client(transport),
            open_position(entered_at, ExitConfig { max_hold_ms: 0, ..flat_config() }),
        );

        let summary = monitor.run().await;
        assert_eq!(summary.exit_kind, "time");
    }
}
