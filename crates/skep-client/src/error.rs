//! Error types for the bin endpoint client.

use thiserror::Error;
use tokio_util::codec::LinesCodecError;

use skep_proto::ProtoError;

/// Errors that can occur on the endpoint side of an exchange.
///
/// None of these are fatal to the endpoint process; the deposit loop
/// reports the failure and awaits the next event.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Local input failed validation before anything was sent.
    #[error("invalid deposit input: {0}")]
    Invalid(#[from] ProtoError),

    /// Could not reach the server.
    #[error("connection failed: {0}")]
    Connection(String),

    /// An await exceeded its configured deadline.
    #[error("timed out: {0}")]
    Timeout(&'static str),

    /// Transport-level failure mid-exchange.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server closed the connection before replying.
    #[error("connection closed by server")]
    ConnectionClosed,

    /// The server sent a reply the protocol does not allow.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}

impl From<LinesCodecError> for ClientError {
    fn from(err: LinesCodecError) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proto_error_maps_to_invalid() {
        let err: ClientError = ProtoError::BadExtension("x.png".to_string()).into();
        assert!(matches!(err, ClientError::Invalid(_)));
        assert!(err.to_string().contains("x.png"));
    }
}
