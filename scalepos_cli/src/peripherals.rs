//! Peripheral assembly: HX711, camera and HTTP classifier with `--features
//! hardware`, simulated stand-ins otherwise.

use std::time::Duration;

use scalepos_config::Config;
use scalepos_core::error::PosError;
use scalepos_hardware::HttpClassifier;
use scalepos_traits::{Classifier, Imager, WeightSensor};

pub const SIM_PROFILE_ENV: &str = "SCALEPOS_SIM_PROFILE";
pub const SIM_LABEL_ENV: &str = "SCALEPOS_SIM_LABEL";
pub const SIM_CONFIDENCE_ENV: &str = "SCALEPOS_SIM_CONFIDENCE";

/// Empty scale for a second, then a 500 g item.
const DEFAULT_SIM_PROFILE: &str = "0:10,500:30";

pub struct Peripherals {
    pub sensor: Box<dyn WeightSensor + Send>,
    pub imager: Box<dyn Imager + Send>,
    pub classifier: Box<dyn Classifier + Send>,
}

fn http_classifier(cfg: &Config) -> eyre::Result<Box<dyn Classifier + Send>> {
    let c = HttpClassifier::new(
        cfg.classifier.endpoint.clone(),
        Duration::from_millis(cfg.classifier.timeout_ms),
    )
    .map_err(|e| PosError::Config(format!("classifier client: {e}")))?;
    tracing::info!(endpoint = %c.endpoint(), "classifier");
    Ok(Box::new(c))
}

#[cfg(feature = "hardware")]
pub fn build(cfg: &Config, _explicit_endpoint: bool) -> eyre::Result<Peripherals> {
    use scalepos_hardware::{CommandImager, Hx711Sensor};

    let mut sensor = Hx711Sensor::open(
        cfg.hardware.hx711_dt,
        cfg.hardware.hx711_sck,
        cfg.hardware.gain_pulses,
        cfg.sensor.reference_unit,
        Duration::from_millis(cfg.hardware.sensor_read_timeout_ms),
    )
    .map_err(|e| PosError::Hardware(format!("open hx711: {e}")))?;
    sensor
        .tare(cfg.sensor.tare_readings)
        .map_err(|e| PosError::Hardware(format!("tare: {e}")))?;

    let imager = CommandImager::new(
        cfg.capture.command.clone(),
        cfg.capture.args.clone(),
        &cfg.capture.image_dir,
    );

    Ok(Peripherals {
        sensor: Box::new(sensor),
        imager: Box::new(imager),
        classifier: http_classifier(cfg)?,
    })
}

/// Simulated peripherals. The classifier is still real HTTP when the
/// endpoint was given on the command line.
#[cfg(not(feature = "hardware"))]
pub fn build(cfg: &Config, explicit_endpoint: bool) -> eyre::Result<Peripherals> {
    use scalepos_hardware::{SimulatedClassifier, SimulatedImager, SimulatedSensor};

    let profile =
        std::env::var(SIM_PROFILE_ENV).unwrap_or_else(|_| DEFAULT_SIM_PROFILE.to_string());
    let sensor = SimulatedSensor::from_profile_str(&profile)
        .map_err(|e| PosError::Config(format!("{SIM_PROFILE_ENV}: {e}")))?;

    let classifier: Box<dyn Classifier + Send> = if explicit_endpoint {
        http_classifier(cfg)?
    } else {
        let label = std::env::var(SIM_LABEL_ENV).unwrap_or_else(|_| "apple".to_string());
        let confidence = match std::env::var(SIM_CONFIDENCE_ENV) {
            Ok(v) => v
                .trim()
                .parse::<f64>()
                .map_err(|e| PosError::Config(format!("{SIM_CONFIDENCE_ENV}={v}: {e}")))?,
            Err(_) => 0.9,
        };
        tracing::info!(%label, confidence, "simulated classifier");
        Box::new(SimulatedClassifier::fixed(label, confidence))
    };

    tracing::info!(%profile, "simulated scale");
    Ok(Peripherals {
        sensor: Box::new(sensor),
        imager: Box::new(SimulatedImager::new(&cfg.capture.image_dir)),
        classifier,
    })
}
