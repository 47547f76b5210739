//! Error types for TopicPress.
//!
//! Library crates use [`TopicPressError`] via `thiserror`.
//! The CLI wraps this with `color-eyre`; the HTTP layer maps it to status codes.

use std::path::PathBuf;

/// Top-level error type for all TopicPress operations.
#[derive(Debug, thiserror::Error)]
pub enum TopicPressError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to a page, provider, or proxy target.
    #[error("network error: {0}")]
    Network(String),

    /// HTML or JSON parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error (empty topic, bad id, malformed block, ...).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// No document is stored under the given id.
    #[error("document not found: {id}")]
    NotFound { id: String },

    /// A stored record exists but cannot be decoded.
    #[error("corrupt record {id}: {message}")]
    CorruptRecord { id: String, message: String },

    /// The content generation provider failed or returned unusable output.
    #[error("generation error: {0}")]
    Generation(String),

    /// A bounded operation ran past its deadline.
    #[error("timed out: {0}")]
    Timeout(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TopicPressError>;

impl TopicPressError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn corrupt(id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::CorruptRecord {
            id: id.into(),
            message: msg.into(),
        }
    }

    /// True for the outcomes a reader should treat as "no such document".
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::CorruptRecord { .. })
    }
}
