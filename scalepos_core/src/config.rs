//! Runtime configuration types for the station.
//!
//! These are the structs the detector, pipeline and control loop consume.
//! They are separate from the TOML-deserialized config in `scalepos_config`.

use std::time::Duration;

pub use scalepos_config::SamplingMode;

/// Plateau detection thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionCfg {
    /// Max deviation from the plateau reference that keeps the window open.
    pub epsilon_g: f32,
    /// How long a plateau must hold to count as settled.
    pub stable_ms: u64,
    /// Readings below this are an empty scale.
    pub idle_threshold_g: f32,
}

impl Default for DetectionCfg {
    fn default() -> Self {
        Self {
            epsilon_g: 1.0,
            stable_ms: 2000,
            idle_threshold_g: 1.0,
        }
    }
}

/// Capture pipeline policy.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureCfg {
    /// Confidence gate; results below it never reach the ledger.
    pub min_confidence: f64,
    /// Keep images whose classification was rejected.
    pub keep_rejected_images: bool,
}

impl Default for CaptureCfg {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            keep_rejected_images: true,
        }
    }
}

/// Control loop cadence and sampling.
#[derive(Debug, Clone, PartialEq)]
pub struct TickCfg {
    pub period: Duration,
    pub readings_per_sample: u32,
    pub mode: SamplingMode,
}

impl Default for TickCfg {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(100),
            readings_per_sample: 5,
            mode: SamplingMode::Direct,
        }
    }
}

/// Checkout artifact settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutCfg {
    pub payload_url: String,
    pub currency: String,
}

impl Default for CheckoutCfg {
    fn default() -> Self {
        Self {
            payload_url: "https://www.google.com".into(),
            currency: "INR".into(),
        }
    }
}
