//! # skep-client
//!
//! Endpoint-side of the skep exchange: the [`BinClient`] session that
//! drives one connection per deposit event, the [`DepositReport`] the
//! operator sees, and the event loop that keeps a physical bin
//! endpoint running across failed exchanges.
//!
//! ## Example
//!
//! ```rust,no_run
//! use skep_client::{BinClient, ClientConfig};
//!
//! # async fn example() -> Result<(), skep_client::ClientError> {
//! let client = BinClient::new(ClientConfig::new("127.0.0.1:8888".parse().unwrap()));
//! let report = client.deposit("/trash/ABCDE_3.jpg").await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod event_loop;
pub mod report;
pub mod session;

pub use config::{ClientConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_RECEIVE_TIMEOUT};
pub use error::{ClientError, ClientResult};
pub use event_loop::{run_deposit_loop, DepositEvent};
pub use report::DepositReport;
pub use session::{BinClient, CheckinOutcome, TwoPhaseExchange};
