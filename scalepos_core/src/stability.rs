//! Plateau detection over the weight stream.
//!
//! The detector sees one sample per tick and emits a [`DetectionCandidate`]
//! when a plateau has held for the configured duration and its weight differs
//! from the last committed item. All comparisons run on integer centigrams.

use std::time::{Duration, Instant};

use crate::config::DetectionCfg;
use crate::fixed_point::{abs_diff_i32_u32, from_hundredths, quantize_to_cg_i32};

/// One weight reading, clamped to be non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightSample {
    value_cg: i32,
    observed_at: Instant,
}

impl WeightSample {
    /// Negative and non-finite readings become 0 g.
    pub fn from_grams(grams: f32, observed_at: Instant) -> Self {
        Self {
            value_cg: quantize_to_cg_i32(grams).max(0),
            observed_at,
        }
    }

    pub fn grams(&self) -> f64 {
        from_hundredths(i64::from(self.value_cg))
    }

    pub fn value_cg(&self) -> i32 {
        self.value_cg
    }

    pub fn observed_at(&self) -> Instant {
        self.observed_at
    }
}

/// A settled plateau that should be captured and classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionCandidate {
    pub weight_cg: i32,
    pub settled_at: Instant,
}

impl DetectionCandidate {
    pub fn weight_grams(&self) -> f64 {
        from_hundredths(i64::from(self.weight_cg))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// Scale empty; no window.
    Idle,
    /// Window open, waiting for it to hold.
    Settling,
    /// Window held but matched the committed weight.
    Stable,
    /// A candidate was just emitted; window cleared.
    Consumed,
}

#[derive(Debug, Clone, Copy)]
struct StabilityWindow {
    reference_cg: i32,
    start: Instant,
}

#[derive(Debug)]
pub struct StabilityDetector {
    epsilon_cg: u32,
    idle_cg: i32,
    stable_for: Duration,
    state: DetectorState,
    window: Option<StabilityWindow>,
    committed_cg: i32,
}

impl StabilityDetector {
    pub fn new(cfg: &DetectionCfg) -> Self {
        Self {
            epsilon_cg: quantize_to_cg_i32(cfg.epsilon_g).max(0).unsigned_abs(),
            idle_cg: quantize_to_cg_i32(cfg.idle_threshold_g).max(0),
            stable_for: Duration::from_millis(cfg.stable_ms),
            state: DetectorState::Idle,
            window: None,
            committed_cg: 0,
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// Weight of the last emitted candidate, in grams. 0 after the scale empties.
    pub fn committed_grams(&self) -> f64 {
        from_hundredths(i64::from(self.committed_cg))
    }

    /// Feed one sample. Returns a candidate at most once per plateau.
    pub fn observe(&mut self, sample: WeightSample) -> Option<DetectionCandidate> {
        let w = sample.value_cg;
        let now = sample.observed_at;

        if w < self.idle_cg {
            if self.state != DetectorState::Idle {
                tracing::debug!(from = ?self.state, "scale empty, detector idle");
            }
            self.state = DetectorState::Idle;
            self.window = None;
            self.committed_cg = 0;
            return None;
        }

        let win = match self.window {
            Some(win) if abs_diff_i32_u32(w, win.reference_cg) <= self.epsilon_cg => win,
            Some(_) | None => {
                // Outside the band (or no window): restart the clock at this sample.
                self.window = Some(StabilityWindow {
                    reference_cg: w,
                    start: now,
                });
                self.state = DetectorState::Settling;
                return None;
            }
        };

        if now.saturating_duration_since(win.start) < self.stable_for {
            return None;
        }
        if self.state == DetectorState::Stable {
            return None;
        }

        if abs_diff_i32_u32(win.reference_cg, self.committed_cg) > self.epsilon_cg {
            let candidate = DetectionCandidate {
                weight_cg: win.reference_cg,
                settled_at: now,
            };
            tracing::info!(
                weight_g = candidate.weight_grams(),
                previous_g = self.committed_grams(),
                "plateau settled"
            );
            self.committed_cg = win.reference_cg;
            self.window = None;
            self.state = DetectorState::Consumed;
            Some(candidate)
        } else {
            tracing::debug!(
                weight_g = from_hundredths(i64::from(win.reference_cg)),
                "plateau matches committed weight"
            );
            self.state = DetectorState::Stable;
            None
        }
    }

    /// Forget the committed weight so the item on the scale is detected again
    /// once it holds for the stable duration.
    pub fn rearm(&mut self) {
        tracing::info!(previous_g = self.committed_grams(), "detection re-armed");
        self.committed_cg = 0;
        self.window = None;
        if self.state != DetectorState::Idle {
            self.state = DetectorState::Consumed;
        }
    }
}
