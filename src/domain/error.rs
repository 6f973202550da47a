//! Domain error types

use thiserror::Error;

/// Errors that can occur while driving the I/O panel.
///
/// Every variant raised inside a poll session is terminal for that session:
/// the worker reports it once and stops talking to the device.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PanelError {
    #[error("Can't open {port}: {reason}")]
    ConnectionOpen { port: String, reason: String },

    #[error("Wait write request timeout")]
    WriteTimeout,

    #[error("Wait read response timeout")]
    ReadTimeout,

    #[error("Unexpected response size: received {len} bytes, expected 2")]
    SizeMismatch { len: usize },

    #[error("Serial port error: {0}")]
    Serial(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for panel operations
pub type PanelResult<T> = Result<T, PanelError>;
