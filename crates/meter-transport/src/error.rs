use thiserror::Error;

pub type Result<T, E = TransportError> = core::result::Result<T, E>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("failed to open {path}: {reason}")]
    Open { path: String, reason: String },
    #[error("I/O error: {0}")]
    Io(String),
    #[error("timeout")]
    Timeout,
    #[error("device exception: {0}")]
    Exception(String),
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}
