//! Endpoint client configuration.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use skep_proto::wire::DEFAULT_MAX_LINE_LEN;

/// Default connection timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for each reply awaited from the server.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a bin endpoint client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Address of the exchange server.
    pub server_addr: SocketAddr,
    /// How long to wait for the TCP connect.
    pub connect_timeout: Duration,
    /// How long to wait for each reply message.
    pub receive_timeout: Duration,
    /// Maximum accepted line length in bytes.
    pub max_line_len: usize,
}

impl ClientConfig {
    /// Create a configuration pointing at the given server, defaults
    /// everywhere else.
    #[must_use]
    pub const fn new(server_addr: SocketAddr) -> Self {
        Self {
            server_addr,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }

    /// Set the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the per-reply receive timeout.
    #[must_use]
    pub const fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    /// Set the maximum accepted line length.
    #[must_use]
    pub const fn with_max_line_len(mut self, len: usize) -> Self {
        self.max_line_len = len;
        self
    }
}
