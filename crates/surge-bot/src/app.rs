//! Main application loop.
//!
//! One evaluation cycle per interval: every tracked instrument scans on
//! its own task (fetch, snapshot, detector, gate), bounded by a worker
//! pool; the coordinator then picks at most one leader and hands it to
//! a position monitor task. Instrument failures are soft; only startup
//! configuration problems are fatal.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::interval;
use tracing::{debug, info, warn};

use surge_core::buffer::DEFAULT_HORIZON_MS;
use surge_core::{unix_ms, Instrument, Price, Qty, TickBuffer};
use surge_detector::IgnitionDetector;
use surge_gate::{Candidate, EntryGate, GateDecision, LeaderSelector, RelaxationState};
use surge_market::MarketClient;
use surge_position::{ClosedSummary, Position, PositionMonitor};
use surge_stats::build_snapshot;

use crate::config::AppConfig;
use crate::error::AppResult;

pub struct Application {
    config: Arc<AppConfig>,
    client: Arc<MarketClient>,
    detector: Arc<Mutex<IgnitionDetector>>,
    gate: Arc<EntryGate>,
    selector: LeaderSelector,
    relaxation: Arc<Mutex<RelaxationState>>,
    instruments: Vec<Instrument>,
    buffers: HashMap<Instrument, TickBuffer>,
    scan_slots: Arc<Semaphore>,
    position_slots: Arc<Semaphore>,
    monitors: JoinSet<ClosedSummary>,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let client = Arc::new(MarketClient::new(config.market.clone())?);
        Self::with_client(config, client)
    }

    /// Build over an explicit market client (used by tests).
    pub fn with_client(config: AppConfig, client: Arc<MarketClient>) -> AppResult<Self> {
        let mut instruments = Vec::new();
        let mut buffers = HashMap::new();
        for symbol in &config.instruments {
            let instrument = Instrument::parse(symbol.as_str())
                .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
            buffers.insert(instrument.clone(), TickBuffer::new(DEFAULT_HORIZON_MS));
            instruments.push(instrument);
        }

        Ok(Self {
            detector: Arc::new(Mutex::new(IgnitionDetector::new(config.ignition.clone()))),
            gate: Arc::new(EntryGate::new(config.gate.clone())),
            selector: LeaderSelector::new(config.selector.clone()),
            relaxation: Arc::new(Mutex::new(RelaxationState::new(unix_ms()))),
            scan_slots: Arc::new(Semaphore::new(config.max_scan_workers)),
            position_slots: Arc::new(Semaphore::new(config.max_open_positions)),
            monitors: JoinSet::new(),
            client,
            instruments,
            buffers,
            config: Arc::new(config),
        })
    }

    /// Run until ctrl-c. Open monitors get a grace period to finish
    /// their current poll before the process exits.
    pub async fn run(&mut self) -> AppResult<()> {
        info!(
            instruments = self.config.instruments.len(),
            cycle_interval_ms = self.config.cycle_interval_ms,
            scan_workers = self.config.max_scan_workers,
            "application started"
        );

        let mut ticker = interval(Duration::from_millis(self.config.cycle_interval_ms));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
                Some(result) = self.monitors.join_next() => {
                    match result {
                        Ok(summary) => debug!(exit = summary.exit_kind, "monitor finished"),
                        Err(e) => warn!(error = %e, "monitor task panicked"),
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown requested");
                    break;
                }
            }
        }

        self.monitors.shutdown().await;
        info!("application stopped");
        Ok(())
    }

    /// One evaluation cycle: scan every instrument on its own worker,
    /// then pick a leader from the admitted candidates.
    ///
    /// Each worker moves its instrument's buffer in and out and reads
    /// the clock itself, so a stalled fetch on one instrument never
    /// delays or skews another.
    async fn run_cycle(&mut self) {
        self.detector.lock().expire_stale(unix_ms());

        let mut scans: JoinSet<(Instrument, TickBuffer, Option<Candidate>)> = JoinSet::new();
        for (instrument, mut buffer) in self.buffers.drain() {
            let client = Arc::clone(&self.client);
            let config = Arc::clone(&self.config);
            let detector = Arc::clone(&self.detector);
            let gate = Arc::clone(&self.gate);
            let relaxation = Arc::clone(&self.relaxation);
            let slots = Arc::clone(&self.scan_slots);
            scans.spawn(async move {
                let _slot = match slots.acquire_owned().await {
                    Ok(slot) => slot,
                    // Closed only during shutdown.
                    Err(_) => return (instrument, buffer, None),
                };
                let candidate = scan_instrument(
                    &client,
                    &config,
                    &detector,
                    &gate,
                    &relaxation,
                    &instrument,
                    &mut buffer,
                )
                .await;
                (instrument, buffer, candidate)
            });
        }

        let mut candidates = Vec::new();
        while let Some(result) = scans.join_next().await {
            match result {
                Ok((instrument, buffer, candidate)) => {
                    self.buffers.insert(instrument, buffer);
                    if let Some(candidate) = candidate {
                        candidates.push(candidate);
                    }
                }
                Err(e) => warn!(error = %e, "scan task panicked"),
            }
        }
        self.restore_missing_buffers();

        if candidates.is_empty() {
            return;
        }

        // Losers keep their ignition record for the next cycle.
        if let Some(leader) = self.selector.select(candidates) {
            self.try_enter(leader, unix_ms());
        }
    }

    /// A panicked scan loses its buffer; reseed so the instrument stays
    /// tracked on the next cycle.
    fn restore_missing_buffers(&mut self) {
        for instrument in &self.instruments {
            if !self.buffers.contains_key(instrument) {
                warn!(%instrument, "scan lost its buffer, reseeding");
                self.buffers
                    .insert(instrument.clone(), TickBuffer::new(DEFAULT_HORIZON_MS));
            }
        }
    }

    /// Consume the leader's ignition record and spawn its monitor,
    /// capacity permitting.
    fn try_enter(&mut self, leader: Candidate, now_ms: i64) {
        let permit = match Arc::clone(&self.position_slots).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                debug!(
                    instrument = %leader.instrument,
                    "position slots exhausted, leader not entered"
                );
                return;
            }
        };

        if !self.detector.lock().consume(&leader.instrument, now_ms) {
            // Record expired between evaluation and entry.
            return;
        }
        self.relaxation.lock().reset(now_ms);

        let entry_price = leader.snapshot.last_price;
        let qty = entry_qty(self.config.entry_notional, entry_price);
        let position = Position::open(
            leader.instrument.clone(),
            entry_price,
            qty,
            now_ms,
            self.config.exit.clone(),
        );
        info!(
            instrument = %leader.instrument,
            path = %leader.path,
            entry = %entry_price,
            %qty,
            "entering position"
        );

        let monitor = PositionMonitor::new(Arc::clone(&self.client), position)
            .with_poll_interval(Duration::from_millis(self.config.monitor_poll_interval_ms))
            .with_tick_fetch_count(self.config.monitor_tick_fetch_count);
        self.monitors.spawn(async move {
            let summary = monitor.run().await;
            drop(permit);
            summary
        });
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// Ingest, snapshot, detect and gate one instrument. A data gap skips
/// the cycle for this instrument only.
async fn scan_instrument(
    client: &MarketClient,
    config: &AppConfig,
    detector: &Mutex<IgnitionDetector>,
    gate: &EntryGate,
    relaxation: &Mutex<RelaxationState>,
    instrument: &Instrument,
    buffer: &mut TickBuffer,
) -> Option<Candidate> {
    let ticks = client.fetch_ticks(instrument, config.tick_fetch_count).await;
    if ticks.is_empty() {
        debug!(%instrument, "no ticks this cycle");
        return None;
    }
    let candles = client
        .fetch_candles(instrument, config.candle_fetch_count)
        .await;
    let book = client.fetch_orderbook(instrument).await;

    buffer.extend(ticks);

    // Clock read after the fetches so age windows are not skewed by
    // time spent on the wire.
    let now_ms = unix_ms();
    let snapshot = build_snapshot(buffer, &candles, book.as_ref(), now_ms, &config.windows)?;

    {
        let mut detector = detector.lock();
        detector.observe(instrument, &snapshot);
        if detector.active(instrument, now_ms).is_none() {
            return None;
        }
    }

    let decision = {
        let relax = relaxation.lock();
        gate.evaluate(instrument.as_str(), &snapshot, &relax)
    };
    match decision {
        GateDecision::Admit { path } => Some(Candidate {
            instrument: instrument.clone(),
            snapshot,
            path,
        }),
        GateDecision::Reject { .. } => None,
    }
}

/// Quantity for a fixed-notional entry.
fn entry_qty(notional: f64, price: Price) -> Qty {
    let notional = Decimal::from_f64(notional).unwrap_or(Decimal::ZERO);
    if price.is_zero() {
        return Qty::new(Decimal::ZERO);
    }
    Qty::new(notional / price.inner())
}
