use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("sensor timeout")]
    Timeout,
    #[error("hx711 data-ready timeout")]
    DataReadyTimeout,
    #[error("camera command `{command}` failed: {detail}")]
    Camera { command: String, detail: String },
    #[error("classifier transport error: {0}")]
    Http(String),
    #[error("classifier returned http status {0}")]
    HttpStatus(u16),
    #[error("malformed classifier response: {0}")]
    MalformedResponse(String),
    #[error("invalid simulation setting: {0}")]
    InvalidSim(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for HwError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            HwError::Timeout
        } else if let Some(status) = e.status() {
            HwError::HttpStatus(status.as_u16())
        } else {
            HwError::Http(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, HwError>;
