// Path: crates/storage/src/memory.rs
//! Volatile backends, used by tests and by `backend = "memory"`.

use crate::check_value_size;
use crate::metrics::metrics;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use oraclegate_api::storage::{ActedMarkerStore, SubmissionSnapshot, ValueStore};
use oraclegate_api::time::Clock;
use oraclegate_types::app::{Address, QueryId, Submission, Timestamp};
use oraclegate_types::error::StoreError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("partition lock poisoned".into())
}

/// One identifier's log.
///
/// `writer` serializes mutations of the partition and holds the nonce floor per
/// reporter. `records` is the published snapshot: readers clone the `Arc` and
/// never wait on a writer for longer than the pointer swap.
#[derive(Default)]
struct Partition {
    writer: Mutex<HashMap<Address, u64>>,
    records: RwLock<Arc<Vec<Submission>>>,
}

impl Partition {
    fn snapshot(&self) -> Result<Arc<Vec<Submission>>, StoreError> {
        Ok(self.records.read().map_err(poisoned)?.clone())
    }
}

/// An in-memory value store.
///
/// Different identifiers never contend. Writes to one identifier are serialized
/// by its partition lock.
pub struct MemoryValueStore {
    partitions: DashMap<QueryId, Arc<Partition>>,
    payloads: DashMap<QueryId, Vec<u8>>,
    sequence: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl MemoryValueStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            partitions: DashMap::new(),
            payloads: DashMap::new(),
            sequence: AtomicU64::new(0),
            clock,
        }
    }

    fn partition(&self, identifier: &QueryId) -> Option<Arc<Partition>> {
        self.partitions.get(identifier).map(|p| p.value().clone())
    }

    fn dispute(
        &self,
        identifier: &QueryId,
        reporter: Option<&Address>,
        nonce: u64,
    ) -> Result<Submission, StoreError> {
        let not_found = || StoreError::NotFound {
            identifier: *identifier,
            nonce,
        };
        let part = self.partition(identifier).ok_or_else(not_found)?;
        let _writer = part.writer.lock().map_err(poisoned)?;
        let mut published = part.records.write().map_err(poisoned)?;
        let pos = published
            .iter()
            .position(|s| s.nonce == nonce && reporter.map_or(true, |r| *r == s.reporter))
            .ok_or_else(not_found)?;
        let records = Arc::make_mut(&mut *published);
        let record = records.get_mut(pos).ok_or_else(not_found)?;
        if !record.disputed {
            record.disputed = true;
            metrics().inc_disputes();
            tracing::info!(
                target: "store",
                identifier = %identifier,
                reporter = %record.reporter,
                nonce,
                sequence = record.sequence,
                "submission disputed"
            );
        }
        Ok(record.clone())
    }
}

impl ValueStore for MemoryValueStore {
    fn submit(
        &self,
        identifier: QueryId,
        value: Vec<u8>,
        reporter: Address,
        nonce: u64,
    ) -> Result<Submission, StoreError> {
        check_value_size(&value)?;
        let part = self
            .partitions
            .entry(identifier)
            .or_default()
            .value()
            .clone();
        let mut last_nonce = part.writer.lock().map_err(poisoned)?;
        if let Some(&prev) = last_nonce.get(&reporter) {
            if nonce <= prev {
                metrics().inc_submissions_rejected("stale_nonce");
                tracing::warn!(
                    target: "store",
                    identifier = %identifier,
                    reporter = %reporter,
                    nonce,
                    last = prev,
                    "rejected stale nonce"
                );
                return Err(StoreError::StaleNonce {
                    reporter,
                    nonce,
                    last: prev,
                });
            }
        }

        let submission = Submission {
            identifier,
            value,
            submitted_at: self.clock.now(),
            reporter,
            nonce,
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            disputed: false,
        };
        {
            let mut published = part.records.write().map_err(poisoned)?;
            let records = Arc::make_mut(&mut *published);
            let key = submission.order_key();
            let at = records.partition_point(|s| s.order_key() <= key);
            records.insert(at, submission.clone());
        }
        last_nonce.insert(reporter, nonce);

        metrics().inc_submissions_accepted();
        metrics().inc_bytes_written_total(submission.value.len() as u64);
        tracing::debug!(
            target: "store",
            identifier = %identifier,
            reporter = %reporter,
            nonce,
            sequence = submission.sequence,
            submitted_at = submission.submitted_at,
            "submission accepted"
        );
        Ok(submission)
    }

    fn mark_disputed(&self, identifier: &QueryId, nonce: u64) -> Result<Submission, StoreError> {
        self.dispute(identifier, None, nonce)
    }

    fn mark_disputed_by(
        &self,
        identifier: &QueryId,
        reporter: &Address,
        nonce: u64,
    ) -> Result<Submission, StoreError> {
        self.dispute(identifier, Some(reporter), nonce)
    }

    fn list_submissions(&self, identifier: &QueryId) -> Result<SubmissionSnapshot, StoreError> {
        let records = match self.partition(identifier) {
            Some(part) => part.snapshot()?,
            None => Arc::default(),
        };
        Ok(SubmissionSnapshot::from_sorted(*identifier, records))
    }

    fn record_query_payload(&self, identifier: &QueryId, payload: &[u8]) -> Result<bool, StoreError> {
        match self.payloads.entry(*identifier) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(v) => {
                v.insert(payload.to_vec());
                Ok(true)
            }
        }
    }

    fn query_payload(&self, identifier: &QueryId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.payloads.get(identifier).map(|p| p.value().clone()))
    }
}

/// In-memory "already acted" markers.
#[derive(Default)]
pub struct MemoryMarkerStore {
    markers: DashMap<QueryId, Timestamp>,
}

impl ActedMarkerStore for MemoryMarkerStore {
    fn acted_at(&self, identifier: &QueryId) -> Result<Option<Timestamp>, StoreError> {
        Ok(self.markers.get(identifier).map(|t| *t.value()))
    }

    fn mark_acted(&self, identifier: &QueryId, at: Timestamp) -> Result<bool, StoreError> {
        match self.markers.entry(*identifier) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(v) => {
                v.insert(at);
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oraclegate_api::time::ManualClock;

    #[test]
    fn snapshots_are_isolated_from_later_writes() {
        let store = MemoryValueStore::new(Arc::new(ManualClock::new(1)));
        let id = QueryId([1; 32]);
        store.submit(id, vec![1], Address([1; 20]), 0).unwrap();
        let before = store.list_submissions(&id).unwrap();
        store.submit(id, vec![2], Address([1; 20]), 1).unwrap();
        store.mark_disputed(&id, 0).unwrap();
        assert_eq!(before.len(), 1);
        assert!(!before.iter().any(|s| s.disputed));
        let after = store.list_submissions(&id).unwrap();
        assert_eq!(after.len(), 2);
        assert!(after.find_by_nonce(0).unwrap().disputed);
    }

    #[test]
    fn clock_going_backwards_still_lists_in_order() {
        let clock = Arc::new(ManualClock::new(50));
        let store = MemoryValueStore::new(clock.clone());
        let id = QueryId([1; 32]);
        store.submit(id, vec![1], Address([1; 20]), 0).unwrap();
        clock.set(40);
        store.submit(id, vec![2], Address([2; 20]), 0).unwrap();
        let ts: Vec<_> = store
            .list_submissions(&id)
            .unwrap()
            .iter()
            .map(|s| s.submitted_at)
            .collect();
        assert_eq!(ts, vec![40, 50]);
    }

    proptest::proptest! {
        #[test]
        fn listing_is_sorted_whatever_the_clock_does(
            steps in proptest::collection::vec((0u64..20, 0u8..4), 1..40)
        ) {
            let clock = Arc::new(ManualClock::new(0));
            let store = MemoryValueStore::new(clock.clone());
            let id = QueryId([9; 32]);
            let mut next_nonce = [0u64; 4];
            for (at, who) in &steps {
                clock.set(*at);
                let slot = usize::from(*who);
                store.submit(id, vec![*who], Address([*who; 20]), next_nonce[slot]).unwrap();
                next_nonce[slot] += 1;
            }
            let snap = store.list_submissions(&id).unwrap();
            proptest::prop_assert_eq!(snap.len(), steps.len());
            let keys: Vec<_> = snap.iter().map(|s| s.order_key()).collect();
            proptest::prop_assert!(keys.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
