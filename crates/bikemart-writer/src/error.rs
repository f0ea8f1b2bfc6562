//! Error types for the mart writer crate

use std::path::PathBuf;
use thiserror::Error;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// E004: Writer configuration missing or invalid
    E004InvalidConfig,
    /// E005: Mart file could not be encoded or persisted
    E005WriteFailure,
    /// E006: Existing mart file could not be decoded
    E006ReadFailure,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::E004InvalidConfig => "E004",
            Self::E005WriteFailure => "E005",
            Self::E006ReadFailure => "E006",
        }
    }
}

/// Errors that can occur while writing or reading mart files
#[derive(Debug, Error)]
pub enum WriterError {
    /// Invalid configuration provided
    #[error("[{code}] Invalid configuration: {message}")]
    InvalidConfig { code: &'static str, message: String },

    /// Write operation failed
    #[error("[{code}] Write of '{}' failed: {message}", .path.display())]
    WriteFailure {
        code: &'static str,
        path: PathBuf,
        message: String,
    },

    /// Read operation failed
    #[error("[{code}] Read of '{}' failed: {message}", .path.display())]
    ReadFailure {
        code: &'static str,
        path: PathBuf,
        message: String,
    },
}

impl WriterError {
    /// Create an invalid config error with error code
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            code: ErrorCode::E004InvalidConfig.as_str(),
            message: message.into(),
        }
    }

    /// Create a write failure error with error code
    pub fn write_failure(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::WriteFailure {
            code: ErrorCode::E005WriteFailure.as_str(),
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a read failure error with error code
    pub fn read_failure(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::ReadFailure {
            code: ErrorCode::E006ReadFailure.as_str(),
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidConfig { .. } => ErrorCode::E004InvalidConfig,
            Self::WriteFailure { .. } => ErrorCode::E005WriteFailure,
            Self::ReadFailure { .. } => ErrorCode::E006ReadFailure,
        }
    }
}

/// Result type alias for WriterError
pub type Result<T> = std::result::Result<T, WriterError>;
