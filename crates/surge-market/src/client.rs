//! Market data client.
//!
//! `fetch_*` methods never raise for ordinary data-path failures: after
//! bounded retries (429/5xx/transport errors) or on any non-retryable
//! status or malformed payload, they return an empty result so the
//! caller simply skips this cycle.

use crate::backoff::RetryPolicy;
use crate::error::MarketResult;
use crate::pacer::RequestPacer;
use crate::transport::{HttpTransport, ReqwestTransport};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use surge_core::{BookLevel, Candle, Instrument, OrderbookSnapshot, Price, Qty, Side, Tick};
use surge_telemetry::metrics::MARKET_EMPTY_RESULTS_TOTAL;
use tracing::{debug, warn};

/// KST offset: the exchange reports candle timestamps in UTC+9.
const KST_OFFSET_SECS: i32 = 9 * 3600;

/// Market client configuration.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
pub struct ClientConfig {
    /// REST API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Minimum inter-request interval shared across all callers (ms).
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,
    /// Per-request timeout (ms).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Retry policy for transient failures.
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_base_url() -> String {
    "https://api.upbit.com".to_string()
}

fn default_min_request_interval_ms() -> u64 {
    120
}

fn default_request_timeout_ms() -> u64 {
    5000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            min_request_interval_ms: default_min_request_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Raw minute candle as delivered by the exchange (newest first).
#[derive(Debug, Deserialize)]
struct RawCandle {
    candle_date_time_kst: String,
    opening_price: Decimal,
    high_price: Decimal,
    low_price: Decimal,
    trade_price: Decimal,
    candle_acc_trade_price: Decimal,
    candle_acc_trade_volume: Decimal,
}

/// Raw trade tick as delivered by the exchange (newest first).
#[derive(Debug, Deserialize)]
struct RawTick {
    trade_price: Decimal,
    trade_volume: Decimal,
    ask_bid: String,
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct RawBookUnit {
    bid_price: Decimal,
    bid_size: Decimal,
    ask_price: Decimal,
    ask_size: Decimal,
}

#[derive(Debug, Deserialize)]
struct RawOrderbook {
    timestamp: i64,
    orderbook_units: Vec<RawBookUnit>,
}

/// Market data client with shared pacing and bounded retries.
pub struct MarketClient {
    transport: Arc<dyn HttpTransport>,
    pacer: Arc<RequestPacer>,
    config: ClientConfig,
}

impl MarketClient {
    /// Create a client with the production reqwest transport.
    pub fn new(config: ClientConfig) -> MarketResult<Self> {
        let transport = Arc::new(ReqwestTransport::new(Duration::from_millis(
            config.request_timeout_ms,
        ))?);
        Ok(Self::with_transport(config, transport))
    }

    /// Create a client over an explicit transport (used by tests).
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let pacer = Arc::new(RequestPacer::new(Duration::from_millis(
            config.min_request_interval_ms,
        )));
        Self {
            transport,
            pacer,
            config,
        }
    }

    /// The shared pacer (one per process; clone the Arc into other clients
    /// if more than one client instance must share the same budget).
    pub fn pacer(&self) -> Arc<RequestPacer> {
        self.pacer.clone()
    }

    /// Fetch the most recent `count` minute candles, oldest first.
    ///
    /// The exchange returns candles newest-first; the result is reversed
    /// to chronological order. Empty on any failure.
    pub async fn fetch_candles(&self, instrument: &Instrument, count: u32) -> Vec<Candle> {
        let url = format!(
            "{}/v1/candles/minutes/1?market={}&count={}",
            self.config.base_url, instrument, count
        );
        let Some(payload) = self.send_with_retry(&url, "candles").await else {
            return Vec::new();
        };
        Self::parse_candles(payload)
    }

    /// Fetch the most recent `count` trade ticks, oldest first.
    pub async fn fetch_ticks(&self, instrument: &Instrument, count: u32) -> Vec<Tick> {
        let url = format!(
            "{}/v1/trades/ticks?market={}&count={}",
            self.config.base_url, instrument, count
        );
        let Some(payload) = self.send_with_retry(&url, "ticks").await else {
            return Vec::new();
        };
        Self::parse_ticks(payload)
    }

    /// Fetch the current order book snapshot.
    pub async fn fetch_orderbook(&self, instrument: &Instrument) -> Option<OrderbookSnapshot> {
        let url = format!(
            "{}/v1/orderbook?markets={}",
            self.config.base_url, instrument
        );
        let payload = self.send_with_retry(&url, "orderbook").await?;
        Self::parse_orderbook(payload)
    }

    /// Paced GET with bounded retry.
    ///
    /// Retries 429/5xx and transport failures with exponential backoff;
    /// returns the parsed JSON body on 2xx, None on everything else.
    async fn send_with_retry(&self, url: &str, endpoint: &str) -> Option<serde_json::Value> {
        let policy = &self.config.retry;

        for attempt in 0..=policy.max_retries {
            self.pacer.acquire().await;

            let retryable = match self.transport.get(url).await {
                Ok(response) if response.is_success() => {
                    match serde_json::from_str(&response.body) {
                        Ok(value) => return Some(value),
                        Err(e) => {
                            // Malformed payload is a permanent failure.
                            warn!(endpoint, error = %e, "Malformed response body");
                            MARKET_EMPTY_RESULTS_TOTAL
                                .with_label_values(&[endpoint])
                                .inc();
                            return None;
                        }
                    }
                }
                Ok(response) if response.is_retryable() => {
                    debug!(endpoint, status = response.status, attempt, "Retryable status");
                    true
                }
                Ok(response) => {
                    warn!(endpoint, status = response.status, "Non-retryable status");
                    MARKET_EMPTY_RESULTS_TOTAL
                        .with_label_values(&[endpoint])
                        .inc();
                    return None;
                }
                Err(e) => {
                    debug!(endpoint, error = %e, attempt, "Transport failure");
                    true
                }
            };

            if retryable && attempt < policy.max_retries {
                let delay = policy.jittered_delay(attempt, &mut rand::thread_rng());
                tokio::time::sleep(delay).await;
            }
        }

        warn!(endpoint, retries = policy.max_retries, "Retries exhausted");
        MARKET_EMPTY_RESULTS_TOTAL
            .with_label_values(&[endpoint])
            .inc();
        None
    }

    fn parse_candles(payload: serde_json::Value) -> Vec<Candle> {
        let Some(entries) = payload.as_array() else {
            warn!("Candle payload is not a list");
            return Vec::new();
        };

        let mut candles: Vec<Candle> = entries
            .iter()
            .filter_map(|entry| {
                let raw: RawCandle = match serde_json::from_value(entry.clone()) {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!(error = %e, "Skipping malformed candle entry");
                        return None;
                    }
                };
                let period_start = parse_kst(&raw.candle_date_time_kst)?;
                Some(Candle {
                    open: Price::new(raw.opening_price),
                    high: Price::new(raw.high_price),
                    low: Price::new(raw.low_price),
                    close: Price::new(raw.trade_price),
                    acc_volume: Qty::new(raw.candle_acc_trade_volume),
                    acc_value: raw.candle_acc_trade_price,
                    period_start,
                })
            })
            .collect();

        // Exchange order is newest-first.
        candles.reverse();
        candles
    }

    fn parse_ticks(payload: serde_json::Value) -> Vec<Tick> {
        let Some(entries) = payload.as_array() else {
            warn!("Tick payload is not a list");
            return Vec::new();
        };

        let mut ticks: Vec<Tick> = entries
            .iter()
            .filter_map(|entry| {
                let raw: RawTick = match serde_json::from_value(entry.clone()) {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!(error = %e, "Skipping malformed tick entry");
                        return None;
                    }
                };
                let side = match raw.ask_bid.as_str() {
                    "BID" => Side::Buy,
                    "ASK" => Side::Sell,
                    other => {
                        warn!(ask_bid = other, "Unknown tick side");
                        return None;
                    }
                };
                Some(Tick::new(
                    raw.timestamp,
                    Price::new(raw.trade_price),
                    Qty::new(raw.trade_volume),
                    side,
                ))
            })
            .collect();

        ticks.reverse();
        ticks
    }

    fn parse_orderbook(payload: serde_json::Value) -> Option<OrderbookSnapshot> {
        let entries = payload.as_array()?;
        let raw: RawOrderbook = serde_json::from_value(entries.first()?.clone()).ok()?;

        let bids = raw
            .orderbook_units
            .iter()
            .map(|u| BookLevel::new(Price::new(u.bid_price), Qty::new(u.bid_size)))
            .collect();
        let asks = raw
            .orderbook_units
            .iter()
            .map(|u| BookLevel::new(Price::new(u.ask_price), Qty::new(u.ask_size)))
            .collect();

        Some(OrderbookSnapshot::new(raw.timestamp, bids, asks))
    }
}

fn kst_offset() -> FixedOffset {
    FixedOffset::east_opt(KST_OFFSET_SECS).expect("valid KST offset")
}

/// Parse the exchange's KST-local timestamp string into UTC.
fn parse_kst(s: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok()?;
    Some(
        naive
            .and_local_timezone(kst_offset())
            .single()?
            .with_timezone(&Utc),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MarketError;
    use crate::transport::{HttpResponse, MockHttpTransport};
    use chrono::Timelike;
    use mockall::Sequence;
    use rust_decimal_macros::dec;

    const CANDLE_BODY: &str = r#"[
        {"candle_date_time_kst":"2024-03-01T09:01:00","opening_price":100.0,
         "high_price":104.0,"low_price":99.0,"trade_price":103.0,
         "candle_acc_trade_price":500000.0,"candle_acc_trade_volume":5.0},
        {"candle_date_time_kst":"2024-03-01T09:00:00","opening_price":98.0,
         "high_price":101.0,"low_price":97.0,"trade_price":100.0,
         "candle_acc_trade_price":300000.0,"candle_acc_trade_volume":3.0}
    ]"#;

    fn test_config() -> ClientConfig {
        ClientConfig {
            base_url: "http://localhost".to_string(),
            min_request_interval_ms: 0,
            request_timeout_ms: 1000,
            retry: RetryPolicy {
                max_retries: 3,
                base_delay_ms: 100,
                jitter_frac: 0.0,
            },
        }
    }

    fn instrument() -> Instrument {
        Instrument::parse("KRW-BTC").unwrap()
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            body: body.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_429s_then_success_backs_off_exactly() {
        let mut transport = MockHttpTransport::new();
        let mut seq = Sequence::new();
        for _ in 0..3 {
            transport
                .expect_get()
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(response(429, "")));
        }
        transport
            .expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(200, CANDLE_BODY)));

        let client = MarketClient::with_transport(test_config(), Arc::new(transport));
        let start = tokio::time::Instant::now();
        let candles = client.fetch_candles(&instrument(), 2).await;

        // Three backoff sleeps: 100 + 200 + 400 ms, no jitter.
        assert_eq!(start.elapsed(), Duration::from_millis(700));
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[1].close.inner(), dec!(103));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted_returns_empty() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_get()
            .times(4) // initial + 3 retries
            .returning(|_| Ok(response(503, "")));

        let client = MarketClient::with_transport(test_config(), Arc::new(transport));
        let candles = client.fetch_candles(&instrument(), 2).await;
        assert!(candles.is_empty());
    }

    #[tokio::test]
    async fn test_non_retryable_status_fails_fast() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_get()
            .times(1) // no retry on 404
            .returning(|_| Ok(response(404, "")));

        let client = MarketClient::with_transport(test_config(), Arc::new(transport));
        let candles = client.fetch_candles(&instrument(), 2).await;
        assert!(candles.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_empty_not_retried() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_get()
            .times(1)
            .returning(|_| Ok(response(200, "not json")));

        let client = MarketClient::with_transport(test_config(), Arc::new(transport));
        let candles = client.fetch_candles(&instrument(), 2).await;
        assert!(candles.is_empty());
    }

    #[tokio::test]
    async fn test_non_list_payload_is_empty() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_get()
            .times(1)
            .returning(|_| Ok(response(200, r#"{"error":"rate limited"}"#)));

        let client = MarketClient::with_transport(test_config(), Arc::new(transport));
        let candles = client.fetch_candles(&instrument(), 2).await;
        assert!(candles.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_retries() {
        let mut transport = MockHttpTransport::new();
        let mut seq = Sequence::new();
        transport
            .expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(MarketError::Timeout));
        transport
            .expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(200, CANDLE_BODY)));

        let client = MarketClient::with_transport(test_config(), Arc::new(transport));
        let candles = client.fetch_candles(&instrument(), 2).await;
        assert_eq!(candles.len(), 2);
    }

    #[test]
    fn test_candles_reversed_to_chronological() {
        let payload: serde_json::Value = serde_json::from_str(CANDLE_BODY).unwrap();
        let candles = MarketClient::parse_candles(payload);
        assert_eq!(candles.len(), 2);
        assert!(candles[0].period_start < candles[1].period_start);
        assert_eq!(candles[0].open.inner(), dec!(98));
        assert_eq!(candles[1].open.inner(), dec!(100));
    }

    #[test]
    fn test_kst_timestamp_converted_to_utc() {
        let ts = parse_kst("2024-03-01T09:00:00").unwrap();
        // 09:00 KST == 00:00 UTC.
        assert_eq!(ts.hour(), 0);
        assert_eq!(ts.minute(), 0);
    }

    #[test]
    fn test_tick_parsing_and_sides() {
        let body = r#"[
            {"trade_price":101.0,"trade_volume":0.5,"ask_bid":"ASK","timestamp":2000},
            {"trade_price":100.0,"trade_volume":1.0,"ask_bid":"BID","timestamp":1000}
        ]"#;
        let ticks = MarketClient::parse_ticks(serde_json::from_str(body).unwrap());
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[0].ts_ms, 1000);
        assert_eq!(ticks[0].side, Side::Buy);
        assert_eq!(ticks[1].side, Side::Sell);
    }

    #[test]
    fn test_orderbook_parsing() {
        let body = r#"[{"timestamp":5000,"orderbook_units":[
            {"bid_price":100.0,"bid_size":2.0,"ask_price":101.0,"ask_size":1.0},
            {"bid_price":99.0,"bid_size":3.0,"ask_price":102.0,"ask_size":4.0}
        ]}]"#;
        let book = MarketClient::parse_orderbook(serde_json::from_str(body).unwrap()).unwrap();
        assert_eq!(book.ts_ms, 5000);
        assert_eq!(book.best_bid().unwrap().price.inner(), dec!(100));
        assert_eq!(book.best_ask().unwrap().price.inner(), dec!(101));
        assert_eq!(book.bids.len(), 2);
    }
}
