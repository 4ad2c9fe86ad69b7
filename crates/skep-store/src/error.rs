//! Error types for the storage ports.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during store operations.
///
/// Connection handlers treat every variant as transient: a failed write
/// is logged and the locally computed value is still sent to the peer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store rejected or lost the operation.
    #[error("storage backend failure: {reason}")]
    Backend {
        /// What the backend reported.
        reason: String,
    },

    /// A seed entry was rejected.
    #[error("invalid seed entry: {reason}")]
    InvalidSeed {
        /// Why the entry cannot be seeded.
        reason: String,
    },
}

impl StoreError {
    /// Build a backend failure from anything displayable.
    #[must_use]
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }
}
