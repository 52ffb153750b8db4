//! Centralized error types for emlsift.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the emlsift library.
#[derive(Error, Debug)]
pub enum EmailError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The entity carries no `Content-Type` header.
    #[error("missing Content-Type header")]
    MissingContentType,

    /// The `Content-Type` value did not parse as a media type, even after
    /// normalization. Carries the normalized string that failed.
    #[error("invalid media type '{0}'")]
    InvalidMediaType(String),

    /// A `multipart/*` entity without a `boundary` parameter.
    #[error("missing boundary")]
    MissingBoundary,

    /// The multipart body was malformed beyond recovery.
    #[error("multipart read error: {0}")]
    Multipart(String),

    /// Nesting exceeded the configured depth cap.
    #[error("multipart nesting deeper than {0} levels")]
    TooDeep(usize),

    /// Hash requested for a part whose body has been released.
    #[error("nil body")]
    NilBody,

    /// The header decoder was asked to fill a field with raw values when
    /// the field requires a typed decode strategy.
    #[error("unsupported field type for header '{0}'")]
    UnsupportedFieldType(&'static str),

    /// A non-empty address header value that did not parse.
    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    /// An address was requested from an empty value.
    #[error("empty address")]
    EmptyAddress,

    /// A date header value that did not parse.
    #[error("invalid date '{0}'")]
    InvalidDate(String),

    /// A `Received` value recognized as a non-routing banner and excluded
    /// from the chain. Not a failure of the whole-chain operation.
    #[error("ignore transport")]
    IgnoreTransport,

    /// A `Received` value that passed the shape filter but could not be
    /// decomposed.
    #[error("invalid transport")]
    InvalidTransport,

    /// A safe-link wrapper with no recoverable target URL.
    #[error("empty safe link")]
    EmptySafeLink,

    /// The operation was cancelled via a [`CancelToken`](crate::cancel::CancelToken).
    #[error("operation cancelled")]
    Cancelled,
}

/// Convenience alias for `Result<T, EmailError>`.
pub type Result<T> = std::result::Result<T, EmailError>;

impl EmailError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `EmailError`
/// when no path context is available (rare — prefer `EmailError::io`).
impl From<std::io::Error> for EmailError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
