//! Endpoint-side exchange state machines.
//!
//! A [`BinClient`] opens one connection per deposit event and drives
//! the protocol from the initiating side. Inputs are validated before
//! anything is sent, so a malformed image path never costs a
//! connection.

use std::str::FromStr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

use skep_proto::ident::{file_name, has_image_extension, parse_image_path};
use skep_proto::wire::{message_stream, CategoryReply, CheckinRequest, MessageStream, StorageReply};
use skep_proto::{Category, Location, ProtoError, ReceptacleKey};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::report::DepositReport;

/// Client half of the bin exchange protocol.
#[derive(Debug, Clone)]
pub struct BinClient {
    config: ClientConfig,
}

impl BinClient {
    /// Create a client from its configuration.
    #[must_use]
    pub const fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Get the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run a single-phase deposit exchange.
    ///
    /// The outer image path must embed a valid receptacle identifier
    /// (`LOCATION_CATEGORY.jpg`, category 1..=5); it is validated
    /// locally before the connection is opened.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Invalid` for a malformed path, otherwise
    /// connection/transport/timeout errors.
    pub async fn deposit(&self, outer_path: &str) -> ClientResult<DepositReport> {
        let key = parse_image_path(outer_path)?;
        debug!(key = %key, "Starting deposit exchange");

        let mut stream = self.connect().await?;
        send_request(&mut stream, outer_path).await?;

        let category: CategoryReply = self.recv_reply(&mut stream).await?;
        let storage: StorageReply = self.recv_reply(&mut stream).await?;

        Ok(DepositReport::new(category.category(), storage.0))
    }

    /// Start a two-phase check-in exchange.
    ///
    /// Sends the outer image path and endpoint location, then waits
    /// for the category reply. On the sentinel the server has already
    /// terminated the exchange and `CheckinOutcome::Rejected` is
    /// returned; otherwise the returned [`TwoPhaseExchange`] holds the
    /// open connection for round two.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Invalid` if the outer path is not a
    /// `.jpg`, otherwise connection/transport/timeout errors.
    pub async fn begin_checkin(
        &self,
        outer_path: &str,
        location: Location,
    ) -> ClientResult<CheckinOutcome> {
        let request = CheckinRequest::new(outer_path, location)?;
        debug!(location = %request.location, "Starting check-in exchange");

        let mut stream = self.connect().await?;
        send_request(&mut stream, &request).await?;

        let reply: CategoryReply = self.recv_reply(&mut stream).await?;
        match reply.category() {
            None => {
                debug!(location = %request.location, "Server rejected check-in with sentinel");
                Ok(CheckinOutcome::Rejected)
            }
            Some(category) => Ok(CheckinOutcome::Accepted(TwoPhaseExchange {
                stream,
                key: ReceptacleKey::new(request.location, category),
                receive_timeout: self.config.receive_timeout,
            })),
        }
    }

    async fn connect(&self) -> ClientResult<MessageStream> {
        let addr = self.config.server_addr;
        let stream = timeout(self.config.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ClientError::Timeout("connecting to server"))?
            .map_err(|e| ClientError::Connection(format!("{addr}: {e}")))?;
        debug!(addr = %addr, "Connected to exchange server");
        Ok(message_stream(stream, self.config.max_line_len))
    }

    async fn recv_reply<T>(&self, stream: &mut MessageStream) -> ClientResult<T>
    where
        T: FromStr<Err = ProtoError>,
    {
        recv_reply(stream, self.config.receive_timeout).await
    }
}

/// Result of the first round of a two-phase exchange.
#[derive(Debug)]
pub enum CheckinOutcome {
    /// Classification succeeded; round two may proceed.
    Accepted(TwoPhaseExchange),
    /// The server replied with the sentinel and closed the exchange.
    Rejected,
}

/// An accepted two-phase exchange awaiting its inner image.
///
/// Dropping the exchange without calling [`complete`](Self::complete)
/// closes the connection and abandons the remaining round.
#[derive(Debug)]
pub struct TwoPhaseExchange {
    stream: MessageStream,
    key: ReceptacleKey,
    receive_timeout: Duration,
}

impl TwoPhaseExchange {
    /// The category the server resolved in round one.
    #[must_use]
    pub const fn category(&self) -> Category {
        self.key.category
    }

    /// The filename the server expects the inner image to carry.
    #[must_use]
    pub fn expected_inner_name(&self) -> String {
        self.key.expected_image_name()
    }

    /// Whether an inner image path carries the expected filename.
    #[must_use]
    pub fn inner_name_matches(&self, inner_path: &str) -> bool {
        file_name(inner_path) == self.expected_inner_name()
    }

    /// Send the inner image path and read the final storage reply.
    ///
    /// A name that differs from [`expected_inner_name`] is only warned
    /// about here; whether the server tolerates it depends on its
    /// configured consistency mode.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Invalid` if the path is not a `.jpg`,
    /// otherwise transport/timeout errors.
    pub async fn complete(mut self, inner_path: &str) -> ClientResult<DepositReport> {
        if !has_image_extension(inner_path) {
            return Err(ProtoError::BadExtension(inner_path.to_string()).into());
        }
        if !self.inner_name_matches(inner_path) {
            warn!(
                inner = %inner_path,
                expected = %self.expected_inner_name(),
                "Inner image name differs from the negotiated identifier"
            );
        }

        send_request(&mut self.stream, inner_path).await?;
        let storage: StorageReply = recv_reply(&mut self.stream, self.receive_timeout).await?;
        Ok(DepositReport::new(Some(self.key.category), storage.0))
    }
}

async fn send_request(
    stream: &mut MessageStream,
    message: impl std::fmt::Display,
) -> ClientResult<()> {
    stream.send(message.to_string()).await.map_err(Into::into)
}

async fn recv_reply<T>(stream: &mut MessageStream, window: Duration) -> ClientResult<T>
where
    T: FromStr<Err = ProtoError>,
{
    let line = match timeout(window, stream.next()).await {
        Err(_) => return Err(ClientError::Timeout("waiting for server reply")),
        Ok(None) => return Err(ClientError::ConnectionClosed),
        Ok(Some(line)) => line?,
    };
    line.parse()
        .map_err(|e: ProtoError| ClientError::UnexpectedReply(format!("{line:?}: {e}")))
}
