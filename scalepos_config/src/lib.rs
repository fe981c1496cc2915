#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and pricing-table parsing for the weighing station.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Every section has defaults, so an empty file is a valid simulated setup.
//! - The pricing CSV loader enforces headers and rejects negative or
//!   non-finite rates.
use std::collections::BTreeMap;

use serde::Deserialize;

/// Pricing CSV schema.
///
/// Expected headers:
/// label,price_per_kg
///
/// Example:
/// label,price_per_kg
/// apple,72
/// banana,36
#[derive(Debug, Deserialize, Clone)]
pub struct PricingRow {
    pub label: String,
    pub price_per_kg: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SamplingMode {
    /// Read the sensor inside the control tick.
    #[default]
    Direct,
    /// A background thread owns the sensor; the tick consumes the newest reading.
    Background,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SensorCfg {
    pub mode: SamplingMode,
    /// Internal reads averaged into one weight sample.
    pub readings_per_sample: u32,
    /// Control loop period in milliseconds.
    pub tick_ms: u64,
    /// Reads averaged when taring at start-up (0 disables the tare).
    pub tare_readings: u32,
    /// Raw counts per gram (sign follows load-cell wiring).
    pub reference_unit: f32,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            mode: SamplingMode::Direct,
            readings_per_sample: 5,
            tick_ms: 100,
            tare_readings: 15,
            reference_unit: -192.5,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Hardware {
    pub hx711_dt: u8,
    pub hx711_sck: u8,
    /// 25 = channel A gain 128, 26 = channel B gain 32, 27 = channel A gain 64
    pub gain_pulses: u8,
    /// Max time to wait for HX711 data-ready (DT low) before failing
    pub sensor_read_timeout_ms: u64,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            hx711_dt: 5,
            hx711_sck: 6,
            gain_pulses: 25,
            sensor_read_timeout_ms: 150,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DetectionCfg {
    /// Samples within this many grams of the plateau reference keep the window open.
    pub epsilon_g: f32,
    /// How long a plateau must hold before it counts as settled.
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CaptureCfg {
    /// Classifications below this confidence never reach the ledger.
    pub min_confidence: f64,
    /// Directory captured images are written to.
    pub image_dir: String,
    /// Still-capture program; `-o <path>` is appended to `args`.
    pub command: String,
    pub args: Vec<String>,
    /// Keep images whose classification was rejected.
    pub keep_rejected_images: bool,
}

impl Default for CaptureCfg {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            image_dir: "images".into(),
            command: "libcamera-still".into(),
            args: vec!["-r".into(), "-n".into()],
            keep_rejected_images: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClassifierCfg {
    pub endpoint: String,
    pub timeout_ms: u64,
}

impl Default for ClassifierCfg {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8000/predict/".into(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CheckoutCfg {
    /// Payload encoded in the checkout artifact.
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

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Default label -> price-per-kilogram table.
pub fn default_pricing() -> BTreeMap<String, f64> {
    [("apple", 72.0), ("tomato", 26.0), ("banana", 36.0), ("grapes", 75.0)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sensor: SensorCfg,
    pub hardware: Hardware,
    pub detection: DetectionCfg,
    pub capture: CaptureCfg,
    pub classifier: ClassifierCfg,
    /// label -> price per kilogram; replaces the default table when present.
    pub pricing: BTreeMap<String, f64>,
    pub checkout: CheckoutCfg,
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sensor: SensorCfg::default(),
            hardware: Hardware::default(),
            detection: DetectionCfg::default(),
            capture: CaptureCfg::default(),
            classifier: ClassifierCfg::default(),
            pricing: default_pricing(),
            checkout: CheckoutCfg::default(),
            logging: Logging::default(),
        }
    }
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

fn check_rate(label: &str, rate: f64) -> eyre::Result<()> {
    if label.trim().is_empty() {
        eyre::bail!("pricing label must not be empty");
    }
    if !rate.is_finite() || rate < 0.0 {
        eyre::bail!("pricing.{label} must be a finite rate >= 0, got {rate}");
    }
    Ok(())
}

pub fn load_pricing_csv(path: &std::path::Path) -> eyre::Result<BTreeMap<String, f64>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open pricing CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["label", "price_per_kg"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "pricing CSV must have headers 'label,price_per_kg', got: {}",
            actual.join(",")
        );
    }

    let mut table = BTreeMap::new();
    for (idx, rec) in rdr.deserialize::<PricingRow>().enumerate() {
        let row = rec.map_err(|e| eyre::eyre!("invalid CSV row {}: {}", idx + 2, e))?;
        check_rate(&row.label, row.price_per_kg)
            .map_err(|e| eyre::eyre!("invalid CSV row {}: {}", idx + 2, e))?;
        table.insert(row.label, row.price_per_kg);
    }
    Ok(table)
}

impl Config {
    /// Overlay rows from a pricing CSV; CSV rates win per label.
    pub fn merge_pricing(&mut self, rows: BTreeMap<String, f64>) {
        self.pricing.extend(rows);
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Sensor
        if self.sensor.readings_per_sample == 0 {
            eyre::bail!("sensor.readings_per_sample must be >= 1");
        }
        if self.sensor.tick_ms == 0 {
            eyre::bail!("sensor.tick_ms must be >= 1");
        }
        if self.sensor.tick_ms > 10_000 {
            eyre::bail!("sensor.tick_ms is unreasonably large (>10s)");
        }
        if !self.sensor.reference_unit.is_finite() || self.sensor.reference_unit == 0.0 {
            eyre::bail!("sensor.reference_unit must be a finite, non-zero number");
        }

        // Hardware
        if self.hardware.sensor_read_timeout_ms == 0 {
            eyre::bail!("hardware.sensor_read_timeout_ms must be >= 1");
        }
        if !(25..=27).contains(&self.hardware.gain_pulses) {
            eyre::bail!("hardware.gain_pulses must be 25, 26 or 27");
        }
        if self.hardware.hx711_dt == self.hardware.hx711_sck {
            eyre::bail!("hardware.hx711_dt and hardware.hx711_sck must differ");
        }

        // Detection
        if !(self.detection.epsilon_g > 0.0 && self.detection.epsilon_g.is_finite()) {
            eyre::bail!("detection.epsilon_g must be > 0");
        }
        if !(self.detection.idle_threshold_g >= 0.0 && self.detection.idle_threshold_g.is_finite())
        {
            eyre::bail!("detection.idle_threshold_g must be >= 0");
        }
        if self.detection.stable_ms == 0 {
            eyre::bail!("detection.stable_ms must be >= 1");
        }
        if self.detection.stable_ms > 5 * 60 * 1000 {
            eyre::bail!("detection.stable_ms is unreasonably large (>5min)");
        }
        if self.detection.stable_ms < self.sensor.tick_ms {
            eyre::bail!("detection.stable_ms must be >= sensor.tick_ms");
        }

        // Capture
        if !(0.0..=1.0).contains(&self.capture.min_confidence) {
            eyre::bail!("capture.min_confidence must be in [0.0, 1.0]");
        }
        if self.capture.image_dir.trim().is_empty() {
            eyre::bail!("capture.image_dir must not be empty");
        }
        if self.capture.command.trim().is_empty() {
            eyre::bail!("capture.command must not be empty");
        }

        // Classifier
        let ep = self.classifier.endpoint.trim();
        if !(ep.starts_with("http://") || ep.starts_with("https://")) {
            eyre::bail!("classifier.endpoint must be an http(s) URL, got '{ep}'");
        }
        if self.classifier.timeout_ms == 0 {
            eyre::bail!("classifier.timeout_ms must be >= 1");
        }

        // Pricing
        for (label, rate) in &self.pricing {
            check_rate(label, *rate)?;
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got '{r}'");
        }

        Ok(())
    }
}
