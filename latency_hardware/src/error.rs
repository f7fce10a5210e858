use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("probe read timeout")]
    Timeout,
    #[error("short frame: expected {expected} bytes, got {got}")]
    ShortFrame { expected: usize, got: usize },
    #[error("frame stream ended")]
    EndOfStream,
    #[error("invalid frame size {0}")]
    FrameSize(usize),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
