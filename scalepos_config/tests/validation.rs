use scalepos_config::{Config, SamplingMode, load_toml};
use rstest::rstest;

const FULL: &str = r#"
[sensor]
mode = "background"
readings_per_sample = 3
tick_ms = 100
tare_readings = 10
reference_unit = -192.5

[hardware]
hx711_dt = 5
hx711_sck = 6
gain_pulses = 25
sensor_read_timeout_ms = 150

[detection]
epsilon_g = 1.0
stable_ms = 2000
idle_threshold_g = 1.0

[capture]
min_confidence = 0.3
image_dir = "images"
command = "libcamera-still"
args = ["-r", "-n"]
keep_rejected_images = false

[classifier]
endpoint = "http://10.0.0.2:8000/predict/"
timeout_ms = 5000

[pricing]
apple = 72
tomato = 26.5

[checkout]
payload_url = "https://pay.example/session"
currency = "INR"

[logging]
rotation = "daily"
"#;

#[test]
fn empty_config_is_valid_defaults() {
    let cfg = load_toml("").expect("parse TOML");
    cfg.validate().expect("defaults should pass");
    assert_eq!(cfg.sensor.mode, SamplingMode::Direct);
    assert_eq!(cfg.sensor.tick_ms, 100);
    assert_eq!(cfg.detection.stable_ms, 2000);
    assert!((cfg.capture.min_confidence - 0.3).abs() < f64::EPSILON);
    assert_eq!(cfg.pricing.get("apple"), Some(&72.0));
    assert_eq!(cfg.pricing.get("grapes"), Some(&75.0));
}

#[test]
fn full_config_round_trips_fields() {
    let cfg = load_toml(FULL).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.sensor.mode, SamplingMode::Background);
    assert_eq!(cfg.sensor.readings_per_sample, 3);
    assert!(!cfg.capture.keep_rejected_images);
    assert_eq!(cfg.classifier.timeout_ms, 5000);
    // An explicit [pricing] table replaces the defaults
    assert_eq!(cfg.pricing.len(), 2);
    assert_eq!(cfg.pricing.get("tomato"), Some(&26.5));
    assert_eq!(cfg.checkout.payload_url, "https://pay.example/session");
}

#[test]
fn merge_pricing_overrides_per_label() {
    let mut cfg = Config::default();
    cfg.merge_pricing([("apple".to_string(), 80.0), ("kiwi".to_string(), 120.0)].into());
    assert_eq!(cfg.pricing.get("apple"), Some(&80.0));
    assert_eq!(cfg.pricing.get("kiwi"), Some(&120.0));
    assert_eq!(cfg.pricing.get("banana"), Some(&36.0));
}

#[rstest]
#[case("[sensor]\ntick_ms = 0", "sensor.tick_ms must be >= 1")]
#[case("[sensor]\nreadings_per_sample = 0", "sensor.readings_per_sample must be >= 1")]
#[case("[sensor]\nreference_unit = 0.0", "sensor.reference_unit")]
#[case("[detection]\nepsilon_g = 0.0", "detection.epsilon_g must be > 0")]
#[case("[detection]\nstable_ms = 50", "detection.stable_ms must be >= sensor.tick_ms")]
#[case("[capture]\nmin_confidence = 1.5", "capture.min_confidence")]
#[case("[classifier]\nendpoint = \"ftp://x\"", "classifier.endpoint")]
#[case("[pricing]\napple = -1", "pricing.apple")]
#[case("[hardware]\ngain_pulses = 30", "hardware.gain_pulses")]
#[case("[logging]\nrotation = \"weekly\"", "logging.rotation")]
fn rejects_invalid_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    let msg = format!("{err}");
    assert!(msg.contains(needle), "'{msg}' should contain '{needle}'");
}

#[test]
fn unknown_sampling_mode_fails_to_parse() {
    assert!(load_toml("[sensor]\nmode = \"turbo\"").is_err());
}
