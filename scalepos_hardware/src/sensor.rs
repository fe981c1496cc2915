//! Weight sensor adapters.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use scalepos_traits::{BoxError, WeightSensor};

use crate::error::{HwError, Result};

/// One simulated plateau: hold `grams` for `samples` calls to `sample()`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plateau {
    pub grams: f32,
    pub samples: u32,
}

/// Simulated load cell.
///
/// Plays back a scripted profile of plateaus, then keeps reporting whatever
/// weight was last set (via the profile or a [`SimWeightHandle`]).
pub struct SimulatedSensor {
    current: Arc<AtomicU32>,
    profile: VecDeque<Plateau>,
    remaining_in_plateau: u32,
}

/// Shared handle to push a weight into a running [`SimulatedSensor`].
#[derive(Debug, Clone)]
pub struct SimWeightHandle(Arc<AtomicU32>);

impl SimWeightHandle {
    pub fn set_grams(&self, grams: f32) {
        self.0.store(grams.to_bits(), Ordering::Relaxed);
    }

    pub fn grams(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSensor {
    /// Empty scale reporting 0 g until told otherwise.
    pub fn new() -> Self {
        Self {
            current: Arc::new(AtomicU32::new(0f32.to_bits())),
            profile: VecDeque::new(),
            remaining_in_plateau: 0,
        }
    }

    pub fn with_profile(profile: impl IntoIterator<Item = Plateau>) -> Self {
        let mut s = Self::new();
        s.profile = profile.into_iter().collect();
        s
    }

    /// Parse `"500:25,0:10,300:30"` (grams:samples pairs).
    pub fn from_profile_str(profile: &str) -> Result<Self> {
        let mut plateaus = Vec::new();
        for part in profile.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (g, n) = part
                .split_once(':')
                .ok_or_else(|| HwError::InvalidSim(format!("expected grams:samples, got '{part}'")))?;
            let grams: f32 = g
                .trim()
                .parse()
                .map_err(|_| HwError::InvalidSim(format!("bad grams '{g}'")))?;
            let samples: u32 = n
                .trim()
                .parse()
                .map_err(|_| HwError::InvalidSim(format!("bad sample count '{n}'")))?;
            if !grams.is_finite() {
                return Err(HwError::InvalidSim(format!("non-finite grams '{g}'")));
            }
            plateaus.push(Plateau { grams, samples });
        }
        Ok(Self::with_profile(plateaus))
    }

    pub fn handle(&self) -> SimWeightHandle {
        SimWeightHandle(self.current.clone())
    }

    fn advance_profile(&mut self) {
        while self.remaining_in_plateau == 0 {
            match self.profile.pop_front() {
                Some(p) => {
                    self.current.store(p.grams.to_bits(), Ordering::Relaxed);
                    self.remaining_in_plateau = p.samples;
                }
                None => return,
            }
        }
        self.remaining_in_plateau -= 1;
    }
}

impl WeightSensor for SimulatedSensor {
    fn sample(&mut self, _readings: u32) -> std::result::Result<f32, BoxError> {
        self.advance_profile();
        let grams = f32::from_bits(self.current.load(Ordering::Relaxed));
        tracing::trace!(grams, "simulated weight sample");
        Ok(grams)
    }
}

#[cfg(feature = "hardware")]
pub use self::hardware::Hx711Sensor;

#[cfg(feature = "hardware")]
mod hardware {
    use std::time::Duration;

    use scalepos_traits::{BoxError, WeightSensor};

    use crate::error::{HwError, Result};
    use crate::hx711::Hx711;
    use crate::util::mean_counts;

    /// HX711-backed sensor converting raw counts to grams:
    /// `grams = (mean_raw - zero_counts) / reference_unit`.
    pub struct Hx711Sensor {
        hx711: Hx711,
        reference_unit: f32,
        zero_counts: f64,
        read_timeout: Duration,
    }

    impl Hx711Sensor {
        pub fn open(
            dt_pin: u8,
            sck_pin: u8,
            gain_pulses: u8,
            reference_unit: f32,
            read_timeout: Duration,
        ) -> Result<Self> {
            if reference_unit == 0.0 || !reference_unit.is_finite() {
                return Err(HwError::Gpio(format!(
                    "invalid hx711 reference unit {reference_unit}"
                )));
            }
            Ok(Self {
                hx711: Hx711::open(dt_pin, sck_pin, gain_pulses)?,
                reference_unit,
                zero_counts: 0.0,
                read_timeout,
            })
        }

        /// Record the current (empty-scale) reading as zero. Returns the tare in counts.
        pub fn tare(&mut self, readings: u32) -> Result<f64> {
            let zero = self.read_mean(readings)?;
            self.zero_counts = zero;
            tracing::info!(zero_counts = zero, readings, "scale tared");
            Ok(zero)
        }

        fn read_mean(&mut self, readings: u32) -> Result<f64> {
            let n = readings.max(1) as usize;
            let mut raws = Vec::with_capacity(n);
            let max_attempts = 3;
            for _ in 0..n {
                let mut attempts = 0;
                loop {
                    match self.hx711.read_raw(self.read_timeout) {
                        Ok(raw) => {
                            raws.push(raw);
                            break;
                        }
                        Err(HwError::DataReadyTimeout) if attempts < max_attempts => {
                            attempts += 1;
                            tracing::warn!(retries = attempts, "hx711 timeout, retrying");
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "hx711 read error");
                            return Err(e);
                        }
                    }
                }
            }
            mean_counts(&raws).ok_or(HwError::Timeout)
        }
    }

    impl WeightSensor for Hx711Sensor {
        fn sample(&mut self, readings: u32) -> std::result::Result<f32, BoxError> {
            let mean = self.read_mean(readings)?;
            let grams = ((mean - self.zero_counts) / f64::from(self.reference_unit)) as f32;
            tracing::debug!(grams, "hx711 sample");
            Ok(grams)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_plays_back_then_holds_last_value() {
        let mut s = SimulatedSensor::from_profile_str("500:2, 0:1").unwrap();
        let got: Vec<f32> = (0..5).map(|_| s.sample(5).unwrap()).collect();
        assert_eq!(got, vec![500.0, 500.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn zero_length_plateaus_are_skipped() {
        let mut s = SimulatedSensor::from_profile_str("100:0,200:1").unwrap();
        assert_eq!(s.sample(1).unwrap(), 200.0);
    }

    #[test]
    fn handle_overrides_weight() {
        let mut s = SimulatedSensor::new();
        let h = s.handle();
        assert_eq!(s.sample(1).unwrap(), 0.0);
        h.set_grams(42.5);
        assert_eq!(s.sample(1).unwrap(), 42.5);
        assert_eq!(h.grams(), 42.5);
    }

    #[test]
    fn rejects_malformed_profile() {
        assert!(SimulatedSensor::from_profile_str("500").is_err());
        assert!(SimulatedSensor::from_profile_str("abc:3").is_err());
        assert!(SimulatedSensor::from_profile_str("5:x").is_err());
    }
}
