//! Boundary traits for the weighing station's external collaborators.
//!
//! Everything here is hardware- and transport-agnostic. Adapters live in
//! `scalepos_hardware`; the control loop in `scalepos_core` only sees these traits.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

use std::path::{Path, PathBuf};

/// Boxed error used at every collaborator boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Load-cell front end yielding a smoothed weight in grams.
pub trait WeightSensor {
    /// Average `readings` internal reads and return grams.
    fn sample(&mut self, readings: u32) -> Result<f32, BoxError>;
}

/// Still-image capture device.
pub trait Imager {
    fn capture(&mut self) -> Result<CapturedImage, BoxError>;
}

/// Remote (or simulated) image classifier.
///
/// Returns the service's result set in the order the service produced it.
/// An empty vector means "nothing recognized".
pub trait Classifier {
    fn classify(&mut self, image: &CapturedImage) -> Result<Vec<Prediction>, BoxError>;
}

/// Handle to an image produced by an [`Imager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    path: PathBuf,
}

impl CapturedImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// One `label -> confidence` entry of a classification result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

impl<S: WeightSensor + ?Sized> WeightSensor for Box<S> {
    fn sample(&mut self, readings: u32) -> Result<f32, BoxError> {
        (**self).sample(readings)
    }
}

impl<I: Imager + ?Sized> Imager for Box<I> {
    fn capture(&mut self) -> Result<CapturedImage, BoxError> {
        (**self).capture()
    }
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn classify(&mut self, image: &CapturedImage) -> Result<Vec<Prediction>, BoxError> {
        (**self).classify(image)
    }
}
