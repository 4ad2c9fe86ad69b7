//! # skep-store
//!
//! Storage-side ports of the skep backend: the [`BinStore`] keyed by
//! `(location, category)` and the [`ClassificationGateway`] mapping
//! waste names to categories, plus in-memory implementations used by
//! the server binary and the test suite.
//!
//! Schema management and bulk loading for a durable backend live
//! outside this crate; handlers only ever see the two traits.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod knowledge;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use knowledge::{ClassificationGateway, KnowledgeTable};
pub use store::{BinStore, MemoryBinStore};
