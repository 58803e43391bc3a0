use meter_registry::DecodeError;
use meter_transport::TransportError;
use thiserror::Error;

/// Failure to obtain one register value. Recovered per field, never fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReadError {
    #[error("device did not answer in time")]
    Timeout,
    #[error("device exception: {0}")]
    Exception(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("not read: shutdown requested")]
    Cancelled,
}

impl From<TransportError> for ReadError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Timeout => ReadError::Timeout,
            TransportError::Exception(code) => ReadError::Exception(code),
            TransportError::InvalidFrame(reason) => ReadError::Malformed(reason),
            other => ReadError::Transport(other.to_string()),
        }
    }
}

impl From<DecodeError> for ReadError {
    fn from(e: DecodeError) -> Self {
        ReadError::Malformed(e.to_string())
    }
}

/// Failure to deliver one point to the sink. Recovered per field, never fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WriteError {
    #[error("sink rejected write (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("sink transport error: {0}")]
    Transport(String),
    #[error("invalid sink configuration: {0}")]
    Config(String),
}

/// The only fatal class: the pipeline cannot be started.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("polling interval must be greater than zero")]
    InvalidInterval,
    #[error("device read timeout must be greater than zero")]
    InvalidReadTimeout,
    #[error("cannot open transport: {0}")]
    Transport(#[from] TransportError),
    #[error("sink unreachable: {0}")]
    Sink(#[from] WriteError),
}
