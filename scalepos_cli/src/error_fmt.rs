//! Human-readable error descriptions and structured JSON error formatting.

use scalepos_core::error::{BuildError, PosError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSensor => {
                "What happened: No weight sensor was provided to the station.\nLikely causes: The HX711 failed to initialize or was not wired into the builder.\nHow to fix: Ensure the sensor is created successfully and passed via with_sensor(...).".to_string()
            }
            BuildError::MissingImager => {
                "What happened: No camera was provided to the station.\nLikely causes: The imager was not wired into the builder.\nHow to fix: Pass an imager via with_imager(...).".to_string()
            }
            BuildError::MissingClassifier => {
                "What happened: No classifier was provided to the station.\nLikely causes: The classifier client was not wired into the builder.\nHow to fix: Pass a classifier via with_classifier(...).".to_string()
            }
            BuildError::MissingSink => {
                "What happened: No display was provided to the station.\nLikely causes: The display sink was not wired into the builder.\nHow to fix: Pass a sink via with_sink(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(pe) = err.downcast_ref::<PosError>() {
        return match pe {
            PosError::Config(msg) if msg.contains("pricing CSV must have headers") => {
                "Invalid headers in pricing CSV. Expected 'label,price_per_kg'.".to_string()
            }
            PosError::Config(msg) => format!(
                "What happened: Configuration is invalid ({msg}).\nLikely causes: A typo or out-of-range value in the TOML or pricing CSV.\nHow to fix: Fix the named key and rerun `scalepos self-check`."
            ),
            PosError::Timeout(what) => format!(
                "What happened: Timed out waiting for the {what}.\nLikely causes: Wiring or power problems, or a service that is down.\nHow to fix: Check the device or service; for the HX711 raise hardware.sensor_read_timeout_ms, for the classifier raise classifier.timeout_ms."
            ),
            PosError::Hardware(msg) => format!(
                "What happened: Hardware initialization failed ({msg}).\nLikely causes: Wrong DT/SCK pins or missing GPIO permissions.\nHow to fix: Check [hardware] in the config and that the process can access GPIO."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("data-ready timeout") {
        return "What happened: HX711 did not produce data within the configured timeout.\nLikely causes: Wrong DT/SCK pins, wiring/power issues, or timeout configured too low.\nHow to fix: Check [hardware] in the config, verify 5V/GND, and raise hardware.sensor_read_timeout_ms.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: configuration 2, hardware 3, anything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match reason_name(err) {
        "ConfigError" => 2,
        "HardwareError" => 3,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(_) => "ConfigError",
            _ => "BuildError",
        };
    }
    match err.downcast_ref::<PosError>() {
        Some(PosError::Config(_)) => "ConfigError",
        Some(PosError::Hardware(_) | PosError::Timeout("weight sensor")) => "HardwareError",
        Some(PosError::Capture(_)) => "CaptureError",
        Some(PosError::Classification(_)) => "ClassificationError",
        Some(PosError::MalformedResponse(_)) => "MalformedResponse",
        Some(PosError::Timeout(_)) => "Timeout",
        Some(PosError::State(_) | PosError::Io(_)) | None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}
