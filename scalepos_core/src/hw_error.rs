//! Maps `Box<dyn Error>` from trait boundaries to typed `PosError`.
//!
//! The traits in `scalepos_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `scalepos_hardware::HwError` downcasting. The stage
//! (sensor, capture, classify) decides the fallback variant.

use crate::error::PosError;

/// Which collaborator produced the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Sensor,
    Capture,
    Classify,
}

impl Stage {
    fn timeout_subject(self) -> &'static str {
        match self {
            Stage::Sensor => "weight sensor",
            Stage::Capture => "camera",
            Stage::Classify => "classifier",
        }
    }

    fn wrap(self, msg: String) -> PosError {
        match self {
            Stage::Sensor => PosError::Hardware(msg),
            Stage::Capture => PosError::Capture(msg),
            Stage::Classify => PosError::Classification(msg),
        }
    }
}

/// Map a trait-boundary error raised during `stage` to a typed `PosError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(stage: Stage, e: &(dyn std::error::Error + 'static)) -> PosError {
    #[cfg(feature = "hardware-errors")]
    {
        use scalepos_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout | HwError::DataReadyTimeout => {
                    PosError::Timeout(stage.timeout_subject())
                }
                HwError::MalformedResponse(m) => PosError::MalformedResponse(m.clone()),
                HwError::Camera { .. } => PosError::Capture(hw.to_string()),
                HwError::Http(_) | HwError::HttpStatus(_) => {
                    PosError::Classification(hw.to_string())
                }
                other => stage.wrap(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        PosError::Timeout(stage.timeout_subject())
    } else if lower.contains("malformed") {
        PosError::MalformedResponse(s)
    } else {
        stage.wrap(s)
    }
}
