//! Error types for clipdex.
//!
//! Write-path operations surface these as typed failures. Read-path
//! operations (search, listing, facets) absorb them under the read policy
//! in `clipdex-search` and return empty results instead.

use std::path::{Path, PathBuf};

/// Result type alias for clipdex operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed underlying cause carried by wrapping variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur in the clipdex search core.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The document does not exist in the index.
    #[error("Document not found: {id}")]
    NotFound {
        /// Identifier that was looked up
        id: String,
    },

    /// Indexing or updating a document failed.
    #[error("Write failed for document {id}: {message}")]
    Write {
        /// Identifier of the document being written
        id: String,
        /// Human-readable error message
        message: String,
        /// Underlying cause
        #[source]
        source: Option<BoxError>,
    },

    /// The search engine could not be reached (connect, DNS, timeout).
    #[error("Search engine unavailable: {message}")]
    EngineUnavailable {
        /// Human-readable error message
        message: String,
        /// Underlying transport error
        #[source]
        source: Option<BoxError>,
    },

    /// The search engine answered with a non-success status.
    #[error("Search engine error (HTTP {status}): {reason}")]
    Engine {
        /// HTTP status code returned by the engine
        status: u16,
        /// Reason reported by the engine
        reason: String,
    },

    /// A scroll cursor was rejected (expired or unknown).
    #[error("Scroll cursor error: {message}")]
    Scroll {
        /// What went wrong
        message: String,
    },

    /// A document or request failed boundary validation.
    #[error("Validation error on {field}: {message}")]
    Validation {
        /// Field that failed validation
        field: String,
        /// What went wrong
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// I/O error with the path that caused it.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Returns whether this error is transient.
    ///
    /// The core never retries on its own; callers use this to decide.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::EngineUnavailable { .. } => true,
            Error::Engine { status, .. } => *status >= 500 || *status == 429,
            Error::Scroll { .. } => true,
            Error::Write { source, .. } => source
                .as_ref()
                .and_then(|s| s.downcast_ref::<Error>())
                .is_some_and(Error::is_retryable),
            Error::NotFound { .. } => false,
            Error::Validation { .. } => false,
            Error::Serialization(_) => false,
            Error::Config { .. } => false,
            Error::Io { .. } => false,
        }
    }

    /// Returns `true` for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Returns `true` for [`Error::EngineUnavailable`].
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::EngineUnavailable { .. })
    }

    /// Creates a not-found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Error::NotFound { id: id.into() }
    }

    /// Creates a write error without an underlying cause.
    pub fn write(id: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Write {
            id: id.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Wraps `source` as the cause of a failed write.
    pub fn write_with_source<E>(id: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Write {
            id: id.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates an engine-unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Error::EngineUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an engine-unavailable error with the transport error as source.
    pub fn unavailable_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::EngineUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates an engine status error.
    pub fn engine(status: u16, reason: impl Into<String>) -> Self {
        Error::Engine {
            status,
            reason: reason.into(),
        }
    }

    /// Creates a scroll cursor error.
    pub fn scroll(message: impl Into<String>) -> Self {
        Error::Scroll {
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Creates an I/O error tagged with the offending path.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
