//! Error types for the control side
use thiserror::Error;

/// Control errors
#[derive(Error, Debug)]
pub enum ControlError {
    /// DMX output error
    #[error("DMX error: {0}")]
    DmxError(String),

    /// Address component or channel outside its valid range
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// HTTP API error
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// No sender registered for a universe
    #[error("Sender not found for universe {0}")]
    SenderNotFound(u16),
}

/// Result type for control operations
pub type Result<T> = std::result::Result<T, ControlError>;
