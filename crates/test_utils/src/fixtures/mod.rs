// Path: crates/test_utils/src/fixtures/mod.rs
//! Test fixtures for reproducible tests

use async_trait::async_trait;
use oraclegate_api::storage::{ActedMarkerStore, ValueStore};
use oraclegate_api::time::ManualClock;
use oraclegate_services::crowdfund::EscrowRelease;
use oraclegate_storage::{MemoryMarkerStore, MemoryValueStore, RedbValueStore};
use oraclegate_types::app::{Address, QueryId};
use oraclegate_types::error::{ActionError, StoreError};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// A reporter address whose every byte is `n`.
pub fn reporter(n: u8) -> Address {
    Address([n; 20])
}

/// A crowdfund contract address, distinct from every `reporter(n)` for `n < 0xc0`.
pub fn contract(n: u8) -> Address {
    let mut a = [0xc0; 20];
    if let Some(last) = a.last_mut() {
        *last = n;
    }
    Address(a)
}

/// A value store, its marker store, and the clock stamping submissions.
pub struct TestStores {
    pub values: Arc<dyn ValueStore>,
    pub markers: Arc<dyn ActedMarkerStore>,
    pub clock: Arc<ManualClock>,
    // Keeps a redb file alive for the lifetime of the fixture.
    _dir: Option<tempfile::TempDir>,
}

impl TestStores {
    /// Volatile stores with the clock at `now`.
    pub fn memory(now: u64) -> Self {
        let clock = Arc::new(ManualClock::new(now));
        Self {
            values: Arc::new(MemoryValueStore::new(clock.clone())),
            markers: Arc::new(MemoryMarkerStore::default()),
            clock,
            _dir: None,
        }
    }

    /// A redb store in a fresh temporary directory with the clock at `now`.
    pub fn redb(now: u64) -> Result<Self, StoreError> {
        let dir = tempfile::tempdir().map_err(|e: io::Error| StoreError::Backend(e.to_string()))?;
        let clock = Arc::new(ManualClock::new(now));
        let store = RedbValueStore::open(dir.path().join("oraclegate.redb"), clock.clone())?;
        let markers = store.marker_store();
        Ok(Self {
            values: Arc::new(store),
            markers: Arc::new(markers),
            clock,
            _dir: Some(dir),
        })
    }
}

/// An escrow that records releases instead of moving funds.
#[derive(Default)]
pub struct RecordingEscrow {
    released: Mutex<Vec<(QueryId, Address)>>,
    fail_next: AtomicBool,
}

impl RecordingEscrow {
    /// Every `(identifier, beneficiary)` released so far, in order.
    pub fn releases(&self) -> Vec<(QueryId, Address)> {
        self.released
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|p| p.into_inner().clone())
    }

    /// Makes the next release fail with `ActionError::Failed`.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl EscrowRelease for RecordingEscrow {
    async fn release(&self, identifier: &QueryId, beneficiary: Address) -> Result<(), ActionError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ActionError::Failed("escrow unavailable".into()));
        }
        self.released
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((*identifier, beneficiary));
        Ok(())
    }
}
