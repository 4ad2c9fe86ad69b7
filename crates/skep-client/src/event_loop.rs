//! Deposit event loop.
//!
//! The physical endpoint signals deposit events (someone dropped
//! waste into the bin); this loop turns each event into one exchange
//! with the backend and forwards the outcome to the operator channel.
//! A failed exchange is reported and the loop keeps waiting for the
//! next event; nothing here terminates the endpoint process.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use skep_proto::Location;

use crate::error::ClientResult;
use crate::report::DepositReport;
use crate::session::{BinClient, CheckinOutcome};

/// One detected deposit, with the evidence the active variant needs.
#[derive(Debug, Clone)]
pub enum DepositEvent {
    /// Single-phase deposit: the outer image path embeds the
    /// receptacle identifier.
    Deposit {
        /// Path of the captured deposit image.
        outer_path: String,
    },
    /// Two-phase check-in: location travels separately and the inner
    /// image is only sent if classification succeeds.
    Checkin {
        /// Path of the captured deposit image.
        outer_path: String,
        /// Site code the endpoint is mounted at.
        location: Location,
        /// Path of the bin-interior image for round two.
        inner_path: String,
    },
}

/// Drive exchanges for every event until the event channel closes.
///
/// Outcomes (including failures) are delivered on `reports`; if that
/// channel closes the loop stops early.
pub async fn run_deposit_loop(
    client: BinClient,
    mut events: mpsc::Receiver<DepositEvent>,
    reports: mpsc::Sender<ClientResult<DepositReport>>,
) {
    while let Some(event) = events.recv().await {
        let outcome = handle_event(&client, event).await;
        if let Err(err) = &outcome {
            warn!(error = %err, "Deposit exchange failed");
        }
        if reports.send(outcome).await.is_err() {
            debug!("Report channel closed; stopping deposit loop");
            return;
        }
    }
    debug!("Deposit event stream ended");
}

async fn handle_event(client: &BinClient, event: DepositEvent) -> ClientResult<DepositReport> {
    match event {
        DepositEvent::Deposit { outer_path } => client.deposit(&outer_path).await,
        DepositEvent::Checkin {
            outer_path,
            location,
            inner_path,
        } => match client.begin_checkin(&outer_path, location).await? {
            CheckinOutcome::Rejected => Ok(DepositReport::rejected()),
            CheckinOutcome::Accepted(exchange) => exchange.complete(&inner_path).await,
        },
    }
}
