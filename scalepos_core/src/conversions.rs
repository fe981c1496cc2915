//! `From` implementations bridging `scalepos_config` types to `scalepos_core` types.

use std::time::Duration;

use crate::config::{CaptureCfg, CheckoutCfg, DetectionCfg, TickCfg};
use crate::pricing::PricingEngine;

// ── DetectionCfg ─────────────────────────────────────────────────────────────

impl From<&scalepos_config::DetectionCfg> for DetectionCfg {
    fn from(c: &scalepos_config::DetectionCfg) -> Self {
        Self {
            epsilon_g: c.epsilon_g,
            stable_ms: c.stable_ms,
            idle_threshold_g: c.idle_threshold_g,
        }
    }
}

// ── CaptureCfg ───────────────────────────────────────────────────────────────

impl From<&scalepos_config::CaptureCfg> for CaptureCfg {
    fn from(c: &scalepos_config::CaptureCfg) -> Self {
        Self {
            min_confidence: c.min_confidence,
            keep_rejected_images: c.keep_rejected_images,
        }
    }
}

// ── TickCfg ──────────────────────────────────────────────────────────────────

impl From<&scalepos_config::SensorCfg> for TickCfg {
    fn from(c: &scalepos_config::SensorCfg) -> Self {
        Self {
            period: Duration::from_millis(c.tick_ms.max(1)),
            readings_per_sample: c.readings_per_sample.max(1),
            mode: c.mode,
        }
    }
}

// ── CheckoutCfg ──────────────────────────────────────────────────────────────

impl From<&scalepos_config::CheckoutCfg> for CheckoutCfg {
    fn from(c: &scalepos_config::CheckoutCfg) -> Self {
        Self {
            payload_url: c.payload_url.clone(),
            currency: c.currency.clone(),
        }
    }
}

// ── PricingEngine ────────────────────────────────────────────────────────────

impl From<&scalepos_config::Config> for PricingEngine {
    fn from(c: &scalepos_config::Config) -> Self {
        PricingEngine::new(c.pricing.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_file_config_maps_to_runtime_defaults() {
        let file = scalepos_config::Config::default();
        assert_eq!(DetectionCfg::from(&file.detection), DetectionCfg::default());
        assert_eq!(CaptureCfg::from(&file.capture), CaptureCfg::default());
        assert_eq!(TickCfg::from(&file.sensor), TickCfg::default());
        assert_eq!(CheckoutCfg::from(&file.checkout), CheckoutCfg::default());
        let pricing = PricingEngine::from(&file);
        assert_eq!(pricing.rate("apple"), Some(72.0));
    }
}
