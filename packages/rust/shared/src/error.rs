//! Error types for pagepatch.
//!
//! Library crates use [`PagePatchError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all pagepatch operations.
#[derive(Debug, thiserror::Error)]
pub enum PagePatchError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error while reading.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Writing a patched document (or the ledger) back to disk failed.
    #[error("write failed at {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A catalog entry's backing document does not exist or is unreadable.
    #[error("missing document: {path:?}")]
    MissingDocument { path: PathBuf },

    /// A content key has no registered content blocks.
    #[error("no content registered for key '{key}'")]
    MissingContent { key: String },

    /// Data validation error (bad stage definition, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Ledger (state record) could not be parsed or serialized.
    #[error("state error: {0}")]
    State(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PagePatchError>;

impl PagePatchError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
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

    /// Wrap a failed write with the target path.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Whether this error comes from writing to storage.
    pub fn is_write_failure(&self) -> bool {
        matches!(self, Self::Write { .. })
    }
}
