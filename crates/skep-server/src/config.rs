//! Server configuration.
//!
//! All tunables are carried in an explicit [`ServerConfig`] injected
//! into the acceptor; nothing is read from global state.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use skep_proto::wire::DEFAULT_MAX_LINE_LEN;

/// Default bind address.
pub const DEFAULT_BIND_ADDR: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8888);

/// Default maximum number of concurrent connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 64;

/// Default receive window for each message awaited from a peer.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Which request/reply shape this server instance speaks.
///
/// Deployments run one process per variant; a single listener never
/// mixes the two.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProtocolVariant {
    /// One combined request: the deposit image path carries the
    /// receptacle identifier, one category + one storage reply.
    #[default]
    SinglePhase,
    /// Classify first, then request the bin-interior image: two
    /// request/reply rounds, aborted after round one on the sentinel.
    TwoPhase,
}

impl ProtocolVariant {
    /// Returns the variant as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SinglePhase => "single-phase",
            Self::TwoPhase => "two-phase",
        }
    }
}

/// How the two-phase handler treats an inner image whose embedded
/// identifier disagrees with the negotiated location/category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyMode {
    /// Log a warning and carry on (the historical behavior).
    #[default]
    Lenient,
    /// Treat the mismatch as a soft failure: reply `"0"` and close.
    Strict,
}

/// Configuration for the exchange server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the listener to.
    pub bind_addr: SocketAddr,
    /// Protocol variant this instance speaks.
    pub variant: ProtocolVariant,
    /// Maximum number of concurrent connections; further connects are
    /// rejected with a warning.
    pub max_connections: usize,
    /// How long to wait for each message from a peer.
    pub receive_timeout: Duration,
    /// Maximum accepted line length in bytes.
    pub max_line_len: usize,
    /// Inner-image consistency handling (two-phase only).
    pub consistency: ConsistencyMode,
}

impl ServerConfig {
    /// Create a configuration with the given bind address and variant,
    /// defaults everywhere else.
    #[must_use]
    pub const fn new(bind_addr: SocketAddr, variant: ProtocolVariant) -> Self {
        Self {
            bind_addr,
            variant,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            consistency: ConsistencyMode::Lenient,
        }
    }

    /// Set the maximum number of concurrent connections.
    #[must_use]
    pub const fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the per-message receive timeout.
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

    /// Set the inner-image consistency mode.
    #[must_use]
    pub const fn with_consistency(mut self, mode: ConsistencyMode) -> Self {
        self.consistency = mode;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BIND_ADDR, ProtocolVariant::SinglePhase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.variant, ProtocolVariant::SinglePhase);
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.consistency, ConsistencyMode::Lenient);
    }

    #[test]
    fn builder_overrides() {
        let config = ServerConfig::new(DEFAULT_BIND_ADDR, ProtocolVariant::TwoPhase)
            .with_max_connections(8)
            .with_receive_timeout(Duration::from_secs(5))
            .with_max_line_len(256)
            .with_consistency(ConsistencyMode::Strict);
        assert_eq!(config.variant, ProtocolVariant::TwoPhase);
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.receive_timeout, Duration::from_secs(5));
        assert_eq!(config.max_line_len, 256);
        assert_eq!(config.consistency, ConsistencyMode::Strict);
    }
}
