//! Error types for ser2osc
//!
//! One crate-wide error enum using thiserror. Fatal, operator-facing
//! conditions carry a remediation string; the CLI boundary decides whether
//! to prompt before exiting, the library itself never blocks on input.

use thiserror::Error;

/// Main error type for ser2osc
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port enumeration, open, or read errors
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// OSC encoding or send errors
    #[error("OSC error: {0}")]
    Osc(String),

    /// Unrecoverable condition requiring operator attention before exit
    #[error("{message}")]
    Fatal {
        message: String,
        /// Suggested next step for the operator
        remediation: String,
    },
}

impl Error {
    /// Build a fatal error with an operator-facing remediation hint
    pub fn fatal(message: impl Into<String>, remediation: impl Into<String>) -> Self {
        Error::Fatal {
            message: message.into(),
            remediation: remediation.into(),
        }
    }
}

/// Convenience Result type using the ser2osc Error
pub type Result<T> = std::result::Result<T, Error>;
