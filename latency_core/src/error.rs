use thiserror::Error;

/// Failures surfaced by a measurement session.
#[derive(Debug, Error, Clone)]
pub enum LatencyError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("timeout waiting for a sensor frame")]
    Timeout,
    #[error("record sink error: {0}")]
    Sink(String),
    #[error("io error: {0}")]
    Io(String),
}

/// Rejected engine configuration.
#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
