use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PosError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("image capture failed: {0}")]
    Capture(String),
    #[error("classification failed: {0}")]
    Classification(String),
    #[error("malformed classification response: {0}")]
    MalformedResponse(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("timeout waiting for {0}")]
    Timeout(&'static str),
    #[error("invalid state: {0}")]
    State(String),
    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing weight sensor")]
    MissingSensor,
    #[error("missing imager")]
    MissingImager,
    #[error("missing classifier")]
    MissingClassifier,
    #[error("missing display sink")]
    MissingSink,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
