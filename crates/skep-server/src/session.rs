//! Per-connection exchange state machines.
//!
//! One session serves exactly one deposit exchange: either the
//! single-phase shape (request, category reply, storage reply) or the
//! two-phase shape (check-in, category reply, inner image, storage
//! reply). Sessions are never reused; the framed socket is dropped on
//! every exit path.
//!
//! Error discipline follows the protocol taxonomy: malformed input,
//! unknown receptacles, unknown waste items and oracle failures all
//! turn into sentinel replies on a connection that still closes
//! normally; only transport failures abort the exchange, and none of
//! them outlive the session.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use skep_proto::ident::{has_image_extension, parse_image_path, parse_inner_image_path};
use skep_proto::wire::{CategoryReply, CheckinRequest, MessageStream, StorageReply};
use skep_proto::{FillPercent, ReceptacleKey};
use skep_store::{BinStore, ClassificationGateway};

use crate::config::{ConsistencyMode, ProtocolVariant, ServerConfig};
use crate::error::{ServerError, ServerResult};
use crate::oracle::{OracleResult, VisionOracle};

/// The collaborators a session orchestrates.
///
/// Sessions own no durable state of their own; everything lives behind
/// these shared ports.
#[derive(Debug, Clone)]
pub struct ExchangeServices {
    /// Fill-level store, addressed by `(location, category)`.
    pub store: Arc<dyn BinStore>,
    /// Waste-name classifier.
    pub gateway: Arc<dyn ClassificationGateway>,
    /// Imagery upstream supplying waste names and fill readings.
    pub oracle: Arc<dyn VisionOracle>,
}

/// Run one exchange on an accepted, framed connection.
///
/// # Errors
///
/// Returns a `ServerError` only for transport-level failures (peer
/// close, timeout, I/O); protocol-level failures are answered with
/// sentinel replies and reported as success.
pub async fn run_session(
    mut stream: MessageStream,
    services: ExchangeServices,
    config: &ServerConfig,
) -> ServerResult<()> {
    match config.variant {
        ProtocolVariant::SinglePhase => run_single_phase(&mut stream, &services, config).await,
        ProtocolVariant::TwoPhase => run_two_phase(&mut stream, &services, config).await,
    }
}

/// Single-phase exchange: the deposit image path carries the
/// receptacle identifier.
///
/// The path-embedded category only routes the storage update; the
/// classification gateway's result is authoritative for the category
/// reply. The storage reply is always sent, whichever branch the
/// category reply took.
async fn run_single_phase(
    stream: &mut MessageStream,
    services: &ExchangeServices,
    config: &ServerConfig,
) -> ServerResult<()> {
    let request = recv_message(stream, config.receive_timeout).await?;
    debug!(request = %request, "Received deposit request");

    let key = match parse_image_path(&request) {
        Ok(key) => key,
        Err(err) => {
            warn!(request = %request, error = %err, "Malformed deposit request");
            send_message(stream, CategoryReply::Unrecognized).await?;
            send_message(stream, StorageReply(FillPercent::ZERO)).await?;
            return Ok(());
        }
    };

    let (waste_name, percent) = match solicit_observation(services, &request) {
        Ok(observation) => observation,
        Err(err) => {
            warn!(key = %key, error = %err, "Oracle failed; replying with sentinels");
            send_message(stream, CategoryReply::Unrecognized).await?;
            send_message(stream, StorageReply(FillPercent::ZERO)).await?;
            return Ok(());
        }
    };

    let rows = match services.store.set_storage(&key, percent) {
        Ok(rows) => rows,
        Err(err) => {
            // Transient store failures never reach the peer; the reply
            // carries the locally computed value.
            warn!(key = %key, error = %err, "Storage update failed");
            1
        }
    };

    let reply = if rows == 0 {
        info!(key = %key, "No matching receptacle");
        CategoryReply::Unrecognized
    } else {
        let category = services.gateway.classify(&waste_name);
        if category.is_none() {
            info!(waste = %waste_name, "Unrecognized waste item");
        }
        CategoryReply::from_classification(category)
    };

    send_message(stream, reply).await?;
    send_message(stream, StorageReply(percent)).await?;
    info!(key = %key, category = %reply, storage = %percent, "Deposit exchange complete");
    Ok(())
}

/// Two-phase exchange: classify first, request the bin-interior image
/// only once classification has succeeded.
async fn run_two_phase(
    stream: &mut MessageStream,
    services: &ExchangeServices,
    config: &ServerConfig,
) -> ServerResult<()> {
    let line = recv_message(stream, config.receive_timeout).await?;
    let request = match CheckinRequest::parse(&line) {
        Ok(request) => request,
        Err(err) => {
            warn!(request = %line, error = %err, "Malformed check-in request");
            send_message(stream, CategoryReply::Unrecognized).await?;
            return Ok(());
        }
    };
    debug!(outer = %request.outer_path, location = %request.location, "Received check-in");

    let waste_name = match services.oracle.identify_waste(&request.outer_path) {
        Ok(name) => name,
        Err(err) => {
            warn!(location = %request.location, error = %err, "Oracle failed to identify waste");
            send_message(stream, CategoryReply::Unrecognized).await?;
            return Ok(());
        }
    };

    let category = match services.gateway.classify(&waste_name) {
        Some(category) if !category.is_sentinel() => category,
        _ => {
            info!(waste = %waste_name, "Unrecognized waste item; terminating exchange");
            send_message(stream, CategoryReply::Unrecognized).await?;
            return Ok(());
        }
    };
    send_message(stream, CategoryReply::Resolved(category)).await?;

    let key = ReceptacleKey::new(request.location, category);
    let inner = recv_message(stream, config.receive_timeout).await?;
    debug!(key = %key, inner = %inner, "Received inner image");

    if !has_image_extension(&inner) {
        warn!(inner = %inner, "Inner image is not a .jpg; reporting zero storage");
        send_message(stream, StorageReply(FillPercent::ZERO)).await?;
        return Ok(());
    }

    if !inner_image_consistent(&inner, &key, config.consistency) {
        send_message(stream, StorageReply(FillPercent::ZERO)).await?;
        return Ok(());
    }

    let current = match services.store.get_storage(&key) {
        Ok(Some(percent)) => percent,
        Ok(None) => {
            warn!(key = %key, "Receptacle not provisioned; assuming empty");
            FillPercent::ZERO
        }
        Err(err) => {
            warn!(key = %key, error = %err, "Storage read failed; assuming empty");
            FillPercent::ZERO
        }
    };

    let updated = match services.oracle.assess_fill(&inner, current) {
        Ok(percent) => percent,
        Err(err) => {
            warn!(key = %key, error = %err, "Oracle failed to assess fill; reporting last known level");
            send_message(stream, StorageReply(current)).await?;
            return Ok(());
        }
    };

    match services.store.set_storage(&key, updated) {
        Ok(0) => warn!(key = %key, "No matching receptacle; reply still sent"),
        Ok(_) => {}
        Err(err) => warn!(key = %key, error = %err, "Storage update failed; reply still sent"),
    }

    send_message(stream, StorageReply(updated)).await?;
    info!(key = %key, storage = %updated, "Check-in exchange complete");
    Ok(())
}

/// Compare the inner image's embedded identifier against the
/// negotiated key; the verdict depends on the configured mode.
fn inner_image_consistent(inner: &str, key: &ReceptacleKey, mode: ConsistencyMode) -> bool {
    let complaint = match parse_inner_image_path(inner) {
        Ok((location, code)) if location == key.location && code == key.category.code() => {
            return true;
        }
        Ok((location, code)) => format!("expected {key}, image names {location}_{code}"),
        Err(err) => format!("identifier unreadable: {err}"),
    };
    match mode {
        ConsistencyMode::Lenient => {
            warn!(inner = %inner, complaint = %complaint, "Inner image inconsistent; continuing");
            true
        }
        ConsistencyMode::Strict => {
            warn!(inner = %inner, complaint = %complaint, "Inner image inconsistent; rejecting");
            false
        }
    }
}

/// Obtain the waste name and target fill level for a single-phase
/// deposit.
fn solicit_observation(
    services: &ExchangeServices,
    image_path: &str,
) -> OracleResult<(String, FillPercent)> {
    let name = services.oracle.identify_waste(image_path)?;
    let percent = services.oracle.assess_fill(image_path, FillPercent::ZERO)?;
    Ok((name, percent))
}

async fn recv_message(stream: &mut MessageStream, window: Duration) -> ServerResult<String> {
    match tokio::time::timeout(window, stream.next()).await {
        Err(_) => Err(ServerError::ReceiveTimeout),
        Ok(None) => Err(ServerError::ConnectionClosed),
        Ok(Some(line)) => line.map_err(Into::into),
    }
}

async fn send_message(
    stream: &mut MessageStream,
    message: impl std::fmt::Display,
) -> ServerResult<()> {
    stream.send(message.to_string()).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skep_proto::{Category, Location};

    fn key(location: &str, category: u8) -> ReceptacleKey {
        ReceptacleKey::new(
            Location::parse(location).unwrap(),
            Category::new(category).unwrap(),
        )
    }

    #[test]
    fn consistent_inner_image_passes_both_modes() {
        let key = key("ABCDE", 3);
        assert!(inner_image_consistent("ABCDE_3.jpg", &key, ConsistencyMode::Lenient));
        assert!(inner_image_consistent("ABCDE_3.jpg", &key, ConsistencyMode::Strict));
        // Leading directories are ignored, matching the identifier codec.
        assert!(inner_image_consistent("/bins/ABCDE_3.jpg", &key, ConsistencyMode::Strict));
    }

    #[test]
    fn mismatch_passes_lenient_and_fails_strict() {
        let key = key("ABCDE", 3);
        assert!(inner_image_consistent("ABCDE_4.jpg", &key, ConsistencyMode::Lenient));
        assert!(!inner_image_consistent("ABCDE_4.jpg", &key, ConsistencyMode::Strict));
        assert!(!inner_image_consistent("FGHIJ_3.jpg", &key, ConsistencyMode::Strict));
    }

    #[test]
    fn unreadable_identifier_passes_lenient_and_fails_strict() {
        let key = key("ABCDE", 3);
        assert!(inner_image_consistent("whatever.jpg", &key, ConsistencyMode::Lenient));
        assert!(!inner_image_consistent("whatever.jpg", &key, ConsistencyMode::Strict));
    }

    #[test]
    fn out_of_range_inner_category_is_a_mismatch_not_an_error() {
        // The second-phase codec accepts any digit string; 9 simply
        // fails the comparison against the negotiated category.
        let key = key("ABCDE", 3);
        assert!(inner_image_consistent("ABCDE_9.jpg", &key, ConsistencyMode::Lenient));
        assert!(!inner_image_consistent("ABCDE_9.jpg", &key, ConsistencyMode::Strict));
    }
}
