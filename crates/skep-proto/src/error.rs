//! Error types for the skep-proto crate.

use thiserror::Error;

/// Errors that can occur while parsing identifiers or wire messages.
///
/// Every variant is recoverable: a handler that hits one replies with the
/// protocol sentinel and closes the connection normally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtoError {
    /// Location code is not exactly five ASCII letters.
    #[error("invalid location {0:?}: expected exactly 5 ASCII letters")]
    InvalidLocation(String),

    /// Category is not a digit string in the accepted range.
    #[error("invalid category {0:?}: expected a digit in 1..=5")]
    InvalidCategory(String),

    /// Storage percent is not a decimal integer in 0..=100.
    #[error("invalid storage percent {0:?}: expected 0..=100")]
    InvalidPercent(String),

    /// Image path does not carry the required `.jpg` extension.
    #[error("invalid image path {0:?}: expected a `.jpg` file")]
    BadExtension(String),

    /// Filename stem does not split into `LOCATION_CATEGORY`.
    #[error("malformed identifier {0:?}: expected LOCATION_CATEGORY")]
    BadIdentifier(String),

    /// Request line does not match the expected message shape.
    #[error("malformed request {0:?}: {1}")]
    MalformedRequest(String, &'static str),
}

/// Result type for protocol operations.
pub type ProtoResult<T> = Result<T, ProtoError>;
