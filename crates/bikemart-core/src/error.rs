//! Error types shared by the pipeline stages.

use std::path::PathBuf;
use thiserror::Error;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// E101: Input file missing or unreadable
    E101Io,
    /// E102: Malformed field value
    E102Parse,
    /// E103: Input column set matches neither known shape
    E103SchemaMismatch,
    /// E104: Accumulated sum left the 64-bit range
    E104Overflow,
    /// E105: Arrow array construction or cast failed
    E105Arrow,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::E101Io => "E101",
            Self::E102Parse => "E102",
            Self::E103SchemaMismatch => "E103",
            Self::E104Overflow => "E104",
            Self::E105Arrow => "E105",
        }
    }
}

/// Errors that can occur while reading, normalizing or aggregating trips.
///
/// Only file-level and arithmetic problems surface as values of this type.
/// Row-level parse problems are counted in [`crate::RejectCounts`] instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// File missing or unreadable; the unit is skipped by the scan driver
    #[error("[{}] I/O error on '{}': {source}", ErrorCode::E101Io.as_str(), .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A field could not be parsed
    #[error("[{}] Parse error in column '{column}': {message}", ErrorCode::E102Parse.as_str())]
    Parse { column: String, message: String },

    /// Input file has an unsupported column layout
    #[error(
        "[{}] Schema mismatch in '{}': found {found} columns, expected 7 or 10",
        ErrorCode::E103SchemaMismatch.as_str(),
        .path.display()
    )]
    SchemaMismatch { path: PathBuf, found: usize },

    /// A running sum no longer fits in 64 bits
    #[error("[{}] Overflow while accumulating {what}", ErrorCode::E104Overflow.as_str())]
    Overflow { what: String },

    /// Arrow failure while building or reading columns
    #[error("[{}] Arrow error: {}", ErrorCode::E105Arrow.as_str(), .0)]
    Arrow(#[from] arrow::error::ArrowError),
}

impl PipelineError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } => ErrorCode::E101Io,
            Self::Parse { .. } => ErrorCode::E102Parse,
            Self::SchemaMismatch { .. } => ErrorCode::E103SchemaMismatch,
            Self::Overflow { .. } => ErrorCode::E104Overflow,
            Self::Arrow(_) => ErrorCode::E105Arrow,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(column: &str, message: impl Into<String>) -> Self {
        Self::Parse {
            column: column.to_string(),
            message: message.into(),
        }
    }

    pub fn overflow(what: impl Into<String>) -> Self {
        Self::Overflow { what: what.into() }
    }
}

/// Result type alias for PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;
