//! # skep-server
//!
//! Backend exchange server for skep bin endpoints. Accepts one TCP
//! connection per deposit event, runs the configured protocol variant's
//! state machine against the storage and classification ports, and
//! replies with the resolved waste category and the receptacle's fill
//! level.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   framed TCP   ┌──────────────────┐
//! │ bin endpoint │◄──────────────►│  ExchangeServer  │
//! └──────────────┘                │                  │
//!                                 │  ┌────────────┐  │    ┌───────────┐
//! ┌──────────────┐                │  │  session   │──┼───►│ BinStore  │
//! │ bin endpoint │◄──────────────►│  │ (per conn) │  │    └───────────┘
//! └──────────────┘                │  └─────┬──────┘  │    ┌───────────┐
//!                                 │        ├─────────┼───►│ Gateway   │
//!                                 │        └─────────┼───►│ Oracle    │
//!                                 └──────────────────┘    └───────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use skep_proto::FillPercent;
//! use skep_server::{ExchangeServer, ExchangeServices, FixedOracle, ProtocolVariant, ServerConfig};
//! use skep_store::{KnowledgeTable, MemoryBinStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let services = ExchangeServices {
//!         store: Arc::new(MemoryBinStore::new()),
//!         gateway: Arc::new(KnowledgeTable::new()),
//!         oracle: Arc::new(FixedOracle::new("plastic bottle", FillPercent::ZERO)),
//!     };
//!     let addr = "127.0.0.1:8888".parse().unwrap();
//!     let config = ServerConfig::new(addr, ProtocolVariant::SinglePhase);
//!     let mut server = ExchangeServer::new(config, services);
//!     server.serve().await.unwrap();
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod oracle;
pub mod server;
pub mod session;

pub use config::{
    ConsistencyMode, ProtocolVariant, ServerConfig, DEFAULT_BIND_ADDR, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_RECEIVE_TIMEOUT,
};
pub use error::{ServerError, ServerResult};
pub use oracle::{FixedOracle, OracleError, OracleResult, ScriptedOracle, VisionOracle};
pub use server::{ExchangeServer, ShutdownHandle};
pub use session::{run_session, ExchangeServices};
