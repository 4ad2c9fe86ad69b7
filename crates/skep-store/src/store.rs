//! Receptacle fill-level store.
//!
//! The backend owns one [`FillPercent`] per [`ReceptacleKey`] and is the
//! only durable state in the system. Connection handlers never cache
//! levels across connections; every exchange re-reads or re-writes the
//! store. Updates follow SQL `UPDATE` semantics: writing a key that was
//! never provisioned affects zero rows rather than inserting, which is
//! how the protocol detects an unknown receptacle.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use skep_proto::{FillPercent, ReceptacleKey};

use crate::error::StoreResult;

/// Keyed storage for receptacle fill levels.
///
/// Implementations must serialize concurrent writes to the same key at
/// row granularity (last writer wins); cross-key transactions are not
/// required.
pub trait BinStore: Send + Sync + std::fmt::Debug {
    /// Read the current fill level, `None` if the key was never
    /// provisioned.
    fn get_storage(&self, key: &ReceptacleKey) -> StoreResult<Option<FillPercent>>;

    /// Write a fill level, returning the number of rows affected
    /// (0 when the key does not exist).
    fn set_storage(&self, key: &ReceptacleKey, percent: FillPercent) -> StoreResult<u64>;
}

/// In-memory [`BinStore`] backed by a read-write lock.
///
/// Row-level atomicity comes from taking the map lock for the duration
/// of each operation.
#[derive(Debug, Default)]
pub struct MemoryBinStore {
    levels: Arc<RwLock<HashMap<ReceptacleKey, FillPercent>>>,
}

impl MemoryBinStore {
    /// Create an empty store with no provisioned receptacles.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision a receptacle at the given starting level (builder
    /// form, for wiring and tests).
    #[must_use]
    pub fn with_receptacle(self, key: ReceptacleKey, percent: FillPercent) -> Self {
        self.levels.write().insert(key, percent);
        self
    }

    /// Provision a receptacle after construction.
    pub fn provision(&self, key: ReceptacleKey, percent: FillPercent) {
        debug!(key = %key, percent = %percent, "Provisioned receptacle");
        self.levels.write().insert(key, percent);
    }

    /// Number of provisioned receptacles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.read().len()
    }

    /// Whether no receptacles are provisioned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.read().is_empty()
    }
}

impl BinStore for MemoryBinStore {
    fn get_storage(&self, key: &ReceptacleKey) -> StoreResult<Option<FillPercent>> {
        Ok(self.levels.read().get(key).copied())
    }

    fn set_storage(&self, key: &ReceptacleKey, percent: FillPercent) -> StoreResult<u64> {
        let mut levels = self.levels.write();
        match levels.get_mut(key) {
            Some(level) => {
                *level = percent;
                debug!(key = %key, percent = %percent, "Updated receptacle storage");
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
