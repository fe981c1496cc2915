//! The control loop: sample, detect, dispatch captures, apply outcomes.
//!
//! `Station` is the single writer of the [`BillingLedger`]. Capture outcomes and
//! operator commands both arrive over channels and are applied on the thread
//! that calls [`Station::tick`].

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel as xch;
use scalepos_traits::clock::{Clock, MonotonicClock};
use scalepos_traits::{Classifier, Imager, WeightSensor};

use crate::capture::{CaptureOutcome, CaptureWorker, ItemCapturePipeline, apply_outcome};
use crate::checkout::{CheckoutCoordinator, CheckoutReceipt};
use crate::config::{CaptureCfg, CheckoutCfg, DetectionCfg, SamplingMode, TickCfg};
use crate::display::DisplaySink;
use crate::error::{BuildError, Result};
use crate::hw_error::{Stage, map_hw_error};
use crate::ledger::BillingLedger;
use crate::pricing::PricingEngine;
use crate::sampler::Sampler;
use crate::stability::{DetectionCandidate, DetectorState, StabilityDetector, WeightSample};

/// Operator input, drained at the start of every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    DeleteLast,
    Clear,
    Checkout,
    /// Re-detect the item currently on the scale.
    Rescan,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    Continue,
    Shutdown,
}

/// What a finished [`Station::run`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub items: usize,
    /// False if a capture was still running when the settle timeout expired.
    pub settled: bool,
}

enum WeightSource {
    Direct(Box<dyn WeightSensor + Send>),
    Background(Sampler),
}

pub struct Station {
    source: WeightSource,
    readings: u32,
    period: Duration,
    clock: Arc<dyn Clock + Send + Sync>,
    detector: StabilityDetector,
    pricing: PricingEngine,
    ledger: BillingLedger,
    worker: CaptureWorker,
    in_flight: Option<DetectionCandidate>,
    pending: Option<DetectionCandidate>,
    sink: Box<dyn DisplaySink>,
    checkout: CheckoutCoordinator,
    commands: Option<xch::Receiver<Command>>,
    settle_timeout: Duration,
    last_receipt: Option<CheckoutReceipt>,
}

impl core::fmt::Debug for Station {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Station")
            .field("state", &self.detector.state())
            .field("items", &self.ledger.len())
            .field("in_flight", &self.in_flight.is_some())
            .field("pending", &self.pending.is_some())
            .finish()
    }
}

impl Station {
    pub fn builder() -> StationBuilder {
        StationBuilder::default()
    }

    /// One control-loop iteration.
    pub fn tick(&mut self) -> TickStatus {
        if self.drain_commands() == TickStatus::Shutdown {
            return TickStatus::Shutdown;
        }

        while let Some(outcome) = self.worker.try_recv() {
            self.complete(outcome);
        }

        let Some(grams) = self.read_weight() else {
            return TickStatus::Continue;
        };
        let sample = WeightSample::from_grams(grams, self.clock.now());
        if let Some(candidate) = self.detector.observe(sample) {
            self.dispatch(candidate);
        }
        TickStatus::Continue
    }

    /// Tick at the configured period until shutdown or `max_ticks`, then wait
    /// for outstanding captures.
    pub fn run(&mut self, max_ticks: Option<u64>) -> RunSummary {
        let mut ticks = 0u64;
        let mut next = self.clock.now();
        tracing::info!(period_ms = self.period.as_millis() as u64, ?max_ticks, "station running");
        loop {
            if max_ticks.is_some_and(|max| ticks >= max) {
                break;
            }
            if self.tick() == TickStatus::Shutdown {
                tracing::info!(ticks, "shutdown requested");
                break;
            }
            ticks += 1;
            next = (next + self.period).max(self.clock.now());
            self.clock.sleep_until(next);
        }
        let settled = self.settle_captures(self.settle_timeout);
        if !settled {
            tracing::warn!("capture still in flight at shutdown, result dropped");
        }
        RunSummary {
            ticks,
            items: self.ledger.len(),
            settled,
        }
    }

    /// Apply an operator command immediately.
    pub fn handle_command(&mut self, cmd: Command) -> TickStatus {
        tracing::debug!(?cmd, "command");
        match cmd {
            Command::DeleteLast => {
                if self.ledger.delete_last().is_some() {
                    self.publish();
                }
            }
            Command::Clear => {
                if self.ledger.clear() > 0 {
                    self.publish();
                }
            }
            Command::Checkout => {
                let receipt = self.checkout.checkout(&self.ledger, &mut *self.sink);
                self.last_receipt = Some(receipt);
            }
            Command::Rescan => self.detector.rearm(),
            Command::Shutdown => return TickStatus::Shutdown,
        }
        TickStatus::Continue
    }

    /// Block until no capture is in flight or pending. Returns false on timeout.
    pub fn settle_captures(&mut self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while self.in_flight.is_some() {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            match self.worker.recv_timeout(remaining) {
                Some(outcome) => self.complete(outcome),
                None => return false,
            }
        }
        true
    }

    pub fn ledger(&self) -> &BillingLedger {
        &self.ledger
    }

    pub fn detector_state(&self) -> DetectorState {
        self.detector.state()
    }

    pub fn capture_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn pending_candidate(&self) -> Option<&DetectionCandidate> {
        self.pending.as_ref()
    }

    pub fn last_receipt(&self) -> Option<&CheckoutReceipt> {
        self.last_receipt.as_ref()
    }

    pub fn pricing(&self) -> &PricingEngine {
        &self.pricing
    }

    fn drain_commands(&mut self) -> TickStatus {
        let cmds: Vec<Command> = match &self.commands {
            Some(rx) => rx.try_iter().collect(),
            None => return TickStatus::Continue,
        };
        for cmd in cmds {
            if self.handle_command(cmd) == TickStatus::Shutdown {
                return TickStatus::Shutdown;
            }
        }
        TickStatus::Continue
    }

    fn read_weight(&mut self) -> Option<f32> {
        match &mut self.source {
            WeightSource::Direct(sensor) => match sensor.sample(self.readings) {
                Ok(g) => Some(g),
                Err(e) => {
                    let err = map_hw_error(Stage::Sensor, &*e);
                    tracing::warn!(error = %err, "sensor read failed, tick skipped");
                    None
                }
            },
            WeightSource::Background(sampler) => {
                let latest = sampler.latest();
                if latest.is_none() {
                    tracing::trace!(stalled_ms = sampler.stalled_for_now(), "no fresh sample");
                }
                latest
            }
        }
    }

    fn dispatch(&mut self, candidate: DetectionCandidate) {
        if self.in_flight.is_none() {
            self.submit(candidate);
            return;
        }
        match self.pending.replace(candidate) {
            Some(old) => tracing::warn!(
                dropped_g = old.weight_grams(),
                weight_g = candidate.weight_grams(),
                "capture busy, pending candidate replaced"
            ),
            None => tracing::info!(
                weight_g = candidate.weight_grams(),
                "capture busy, candidate queued"
            ),
        }
    }

    fn submit(&mut self, candidate: DetectionCandidate) {
        match self.worker.submit(candidate) {
            Ok(()) => self.in_flight = Some(candidate),
            Err(e) => tracing::error!(error = %e, weight_g = candidate.weight_grams(), "capture dispatch failed"),
        }
    }

    fn complete(&mut self, outcome: CaptureOutcome) {
        self.in_flight = None;
        if apply_outcome(&outcome, &self.pricing, &mut self.ledger).is_some() {
            self.publish();
        }
        if let Some(next) = self.pending.take() {
            self.submit(next);
        }
    }

    fn publish(&mut self) {
        let items = self.ledger.list();
        let totals = self.ledger.totals();
        self.sink.ledger_updated(&items, &totals);
    }
}

/// Builder for [`Station`]. Collaborators are required; configs default.
pub struct StationBuilder {
    sensor: Option<Box<dyn WeightSensor + Send>>,
    imager: Option<Box<dyn Imager + Send>>,
    classifier: Option<Box<dyn Classifier + Send>>,
    sink: Option<Box<dyn DisplaySink>>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    detection: DetectionCfg,
    capture: CaptureCfg,
    tick: TickCfg,
    checkout: CheckoutCfg,
    pricing: PricingEngine,
    commands: Option<xch::Receiver<Command>>,
    settle_timeout: Duration,
}

impl Default for StationBuilder {
    fn default() -> Self {
        Self {
            sensor: None,
            imager: None,
            classifier: None,
            sink: None,
            clock: None,
            detection: DetectionCfg::default(),
            capture: CaptureCfg::default(),
            tick: TickCfg::default(),
            checkout: CheckoutCfg::default(),
            pricing: PricingEngine::new(scalepos_config::default_pricing()),
            commands: None,
            settle_timeout: Duration::from_secs(15),
        }
    }
}

impl StationBuilder {
    pub fn with_sensor(mut self, s: impl WeightSensor + Send + 'static) -> Self {
        self.sensor = Some(Box::new(s));
        self
    }

    pub fn with_imager(mut self, i: impl Imager + Send + 'static) -> Self {
        self.imager = Some(Box::new(i));
        self
    }

    pub fn with_classifier(mut self, c: impl Classifier + Send + 'static) -> Self {
        self.classifier = Some(Box::new(c));
        self
    }

    pub fn with_sink(mut self, d: impl DisplaySink + 'static) -> Self {
        self.sink = Some(Box::new(d));
        self
    }

    pub fn with_clock(mut self, c: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(c));
        self
    }

    pub fn with_detection(mut self, cfg: DetectionCfg) -> Self {
        self.detection = cfg;
        self
    }

    pub fn with_capture(mut self, cfg: CaptureCfg) -> Self {
        self.capture = cfg;
        self
    }

    pub fn with_tick(mut self, cfg: TickCfg) -> Self {
        self.tick = cfg;
        self
    }

    pub fn with_checkout(mut self, cfg: CheckoutCfg) -> Self {
        self.checkout = cfg;
        self
    }

    pub fn with_pricing(mut self, p: PricingEngine) -> Self {
        self.pricing = p;
        self
    }

    pub fn with_commands(mut self, rx: xch::Receiver<Command>) -> Self {
        self.commands = Some(rx);
        self
    }

    /// How long `run` waits for an in-flight capture before returning.
    pub fn with_settle_timeout(mut self, d: Duration) -> Self {
        self.settle_timeout = d;
        self
    }

    /// Take detection, capture, tick, checkout and pricing settings from a loaded config.
    pub fn with_config(mut self, cfg: &scalepos_config::Config) -> Self {
        self.detection = DetectionCfg::from(&cfg.detection);
        self.capture = CaptureCfg::from(&cfg.capture);
        self.tick = TickCfg::from(&cfg.sensor);
        self.checkout = CheckoutCfg::from(&cfg.checkout);
        self.pricing = PricingEngine::from(cfg);
        self
    }

    pub fn try_build(self) -> Result<Station> {
        let sensor = self
            .sensor
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSensor))?;
        let imager = self
            .imager
            .ok_or_else(|| eyre::Report::new(BuildError::MissingImager))?;
        let classifier = self
            .classifier
            .ok_or_else(|| eyre::Report::new(BuildError::MissingClassifier))?;
        let sink = self
            .sink
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSink))?;

        validate(&self.detection, &self.capture, &self.tick)?;

        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(c) => c,
            None => Arc::new(MonotonicClock::new()),
        };
        let source = match self.tick.mode {
            SamplingMode::Direct => WeightSource::Direct(sensor),
            SamplingMode::Background => WeightSource::Background(Sampler::spawn(
                sensor,
                self.tick.readings_per_sample,
                self.tick.period,
                clock.clone(),
            )),
        };
        let worker = CaptureWorker::spawn(ItemCapturePipeline::new(
            imager,
            classifier,
            self.capture.clone(),
        ));

        tracing::debug!(
            mode = ?self.tick.mode,
            epsilon_g = self.detection.epsilon_g,
            stable_ms = self.detection.stable_ms,
            min_confidence = self.capture.min_confidence,
            "station built"
        );

        Ok(Station {
            source,
            readings: self.tick.readings_per_sample,
            period: self.tick.period,
            clock,
            detector: StabilityDetector::new(&self.detection),
            pricing: self.pricing,
            ledger: BillingLedger::new(),
            worker,
            in_flight: None,
            pending: None,
            sink,
            checkout: CheckoutCoordinator::new(self.checkout),
            commands: self.commands,
            settle_timeout: self.settle_timeout,
            last_receipt: None,
        })
    }
}

fn validate(detection: &DetectionCfg, capture: &CaptureCfg, tick: &TickCfg) -> Result<()> {
    if !detection.epsilon_g.is_finite() || detection.epsilon_g <= 0.0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "epsilon_g must be > 0",
        )));
    }
    if !detection.idle_threshold_g.is_finite() || detection.idle_threshold_g < 0.0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "idle_threshold_g must be >= 0",
        )));
    }
    if detection.stable_ms == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "stable_ms must be >= 1",
        )));
    }
    if !(0.0..=1.0).contains(&capture.min_confidence) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "min_confidence must be within [0, 1]",
        )));
    }
    if tick.period.is_zero() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "tick period must be > 0",
        )));
    }
    if tick.readings_per_sample == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "readings_per_sample must be >= 1",
        )));
    }
    Ok(())
}
