//! Peripheral adapters for the weighing station.
//!
//! - `sensor`: simulated load cell and (feature `hardware`) HX711 over GPIO
//! - `camera`: `libcamera-still` subprocess imager and a simulated imager
//! - `classifier`: HTTP multipart classification client and a scripted stand-in
pub mod camera;
pub mod classifier;
pub mod error;
#[cfg(feature = "hardware")]
pub mod hx711;
pub mod sensor;
pub mod util;

pub use camera::{CommandImager, SimulatedImager};
pub use classifier::{HttpClassifier, SimResponse, SimulatedClassifier, parse_results};
pub use error::HwError;
#[cfg(feature = "hardware")]
pub use sensor::Hx711Sensor;
pub use sensor::{Plateau, SimWeightHandle, SimulatedSensor};
