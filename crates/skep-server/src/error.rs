//! Error types for the exchange server.

use std::net::SocketAddr;

use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Errors that can occur in the exchange server.
///
/// None of these are fatal to the process: a session-level error ends
/// that connection only, and the acceptor loop keeps running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {0}: {1}")]
    BindFailed(SocketAddr, std::io::Error),

    /// Transport-level failure on a connection (reset, I/O error,
    /// oversize frame).
    #[error("transport error: {0}")]
    Transport(String),

    /// The peer closed the connection before the exchange finished.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// No message arrived within the configured receive window.
    #[error("timed out waiting for a message")]
    ReceiveTimeout,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<LinesCodecError> for ServerError {
    fn from(err: LinesCodecError) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn bind_failed_display() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8888);
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let err = ServerError::BindFailed(addr, io_err);
        let msg = err.to_string();
        assert!(msg.contains("127.0.0.1:8888"));
        assert!(msg.contains("address in use"));
    }

    #[test]
    fn codec_error_maps_to_transport() {
        let codec_err = LinesCodecError::MaxLineLengthExceeded;
        let err: ServerError = codec_err.into();
        assert!(matches!(err, ServerError::Transport(_)));
    }
}
