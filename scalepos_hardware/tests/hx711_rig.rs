#![cfg(feature = "hardware")]

use std::time::Duration;

use scalepos_hardware::Hx711Sensor;
use scalepos_traits::WeightSensor;

// NOTE: These only run on a Raspberry Pi. Without a load cell wired to the pins
// the data-ready wait must time out promptly instead of spinning.

#[test]
fn hx711_sample_times_out_without_wiring() {
    let dt_pin = 5u8; // adjust for your test rig
    let sck_pin = 6u8; // adjust for your test rig
    let mut sensor = Hx711Sensor::open(dt_pin, sck_pin, 25, -192.5, Duration::from_millis(5))
        .expect("open hx711");
    let err = sensor.sample(1).expect_err("expect timeout");
    assert!(format!("{err}").to_lowercase().contains("timeout"));
}

#[test]
fn hx711_rejects_zero_reference_unit() {
    assert!(Hx711Sensor::open(5, 6, 25, 0.0, Duration::from_millis(5)).is_err());
}
