//! Error types for autoresearch.
//!
//! Library crates use [`ResearchError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all autoresearch operations.
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching a source.
    #[error("network error: {0}")]
    Network(String),

    /// An API source answered with HTTP 429.
    #[error("rate limit exceeded for {url}")]
    RateLimited { url: String },

    /// XML document could not be produced (illegal tag name, writer failure).
    #[error("serialization error in {context}: {message}")]
    Serialization { context: String, message: String },

    /// Input was not a well-formed document (XML, HTML or JSON payload).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Completion endpoint error (request, API status, or response shape).
    #[error("completion error: {0}")]
    Completion(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad URL, unsupported value shape, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ResearchError>;

impl ResearchError {
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

    /// Create a serialization error naming the element it failed on.
    pub fn serialization(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            context: context.into(),
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
}
