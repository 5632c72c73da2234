// Path: crates/storage/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! Backends for the append-only value store and the consumer marker store.
//!
//! `RedbValueStore` persists submissions in a single redb file and relies on
//! redb's single-writer transactions for the atomic nonce check. `MemoryValueStore`
//! partitions by identifier and publishes each partition as an immutable snapshot,
//! so readers never block writers.

mod keys;
pub mod memory;
pub mod metrics;
pub mod redb_store;

pub use memory::{MemoryMarkerStore, MemoryValueStore};
pub use redb_store::{RedbMarkerStore, RedbValueStore};

use oraclegate_api::storage::{ActedMarkerStore, ValueStore};
use oraclegate_api::time::Clock;
use oraclegate_types::config::{StorageBackend, StorageConfig};
use oraclegate_types::error::StoreError;
use oraclegate_types::MAX_VALUE_BYTES;
use std::sync::Arc;

/// A value store and the marker store that lives beside it.
#[derive(Clone)]
pub struct Stores {
    /// The submission log.
    pub values: Arc<dyn ValueStore>,
    /// The consumer's "already acted" markers.
    pub markers: Arc<dyn ActedMarkerStore>,
}

/// Opens the backend selected by `cfg`.
pub fn open_stores(cfg: &StorageConfig, clock: Arc<dyn Clock>) -> Result<Stores, StoreError> {
    match cfg.backend {
        StorageBackend::Memory => Ok(Stores {
            values: Arc::new(MemoryValueStore::new(clock)),
            markers: Arc::new(MemoryMarkerStore::default()),
        }),
        StorageBackend::Redb => {
            let path = cfg
                .path
                .as_deref()
                .ok_or_else(|| StoreError::Backend("storage.path is not set".into()))?;
            let store = RedbValueStore::open(path, clock)?;
            let markers = store.marker_store();
            Ok(Stores {
                values: Arc::new(store),
                markers: Arc::new(markers),
            })
        }
    }
}

pub(crate) fn check_value_size(value: &[u8]) -> Result<(), StoreError> {
    if value.len() > MAX_VALUE_BYTES {
        metrics::metrics().inc_submissions_rejected("value_too_large");
        return Err(StoreError::ValueTooLarge {
            size: value.len(),
            max: MAX_VALUE_BYTES,
        });
    }
    Ok(())
}
