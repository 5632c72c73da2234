// Path: crates/storage/src/redb_store.rs
use crate::check_value_size;
use crate::keys::{
    k_last_nonce, k_nonce_index, k_nonce_prefix, k_submission, parse_u64, K_SEQUENCE,
};
use crate::metrics::metrics;
use oraclegate_api::storage::{be64, ActedMarkerStore, SubmissionSnapshot, ValueStore};
use oraclegate_api::time::Clock;
use oraclegate_telemetry::time::Timer;
use oraclegate_types::app::{Address, QueryId, Submission, Timestamp};
use oraclegate_types::codec;
use oraclegate_types::error::StoreError;
use oraclegate_types::keys::{
    ACTED_MARKERS_TABLE, LAST_NONCE_TABLE, NONCE_INDEX_TABLE, QUERY_PAYLOADS_TABLE,
    SEQUENCE_TABLE, SUBMISSIONS_TABLE,
};
use redb::{Database, ReadTransaction, ReadableTable, TableDefinition, WriteTransaction};
use std::path::Path;
use std::sync::Arc;

/// ---- Table definitions (single DB, prefix-encoded keys) ----
const SUBMISSIONS: TableDefinition<&[u8], &[u8]> = TableDefinition::new(SUBMISSIONS_TABLE); // value = SCALE(Submission)
const NONCE_INDEX: TableDefinition<&[u8], &[u8]> = TableDefinition::new(NONCE_INDEX_TABLE); // value = submission key
const LAST_NONCE: TableDefinition<&[u8], &[u8]> = TableDefinition::new(LAST_NONCE_TABLE); // value = nonce_be(8)
const SEQUENCE: TableDefinition<&[u8], &[u8]> = TableDefinition::new(SEQUENCE_TABLE); // key=b"next", value = seq_be(8)
const QUERY_PAYLOADS: TableDefinition<&[u8], &[u8]> = TableDefinition::new(QUERY_PAYLOADS_TABLE);
const ACTED_MARKERS: TableDefinition<&[u8], &[u8]> = TableDefinition::new(ACTED_MARKERS_TABLE); // value = ts_be(8)

fn backend<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn decode_submission(bytes: &[u8]) -> Result<Submission, StoreError> {
    codec::from_bytes_canonical(bytes).map_err(StoreError::Corrupt)
}

/// Durable value store backed by a single redb file.
///
/// Every submit runs in one write transaction, so the stale-nonce check and the
/// append are atomic and a crash leaves either both or neither. Reads use redb's
/// MVCC read transactions and never observe a partially applied write.
#[derive(Clone)]
pub struct RedbValueStore {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
}

impl RedbValueStore {
    pub fn open<P: AsRef<Path>>(path: P, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(backend)?;

        // Ensure tables exist
        {
            let w = db.begin_write().map_err(backend)?;
            {
                w.open_table(SUBMISSIONS).map_err(backend)?;
                w.open_table(NONCE_INDEX).map_err(backend)?;
                w.open_table(LAST_NONCE).map_err(backend)?;
                w.open_table(SEQUENCE).map_err(backend)?;
                w.open_table(QUERY_PAYLOADS).map_err(backend)?;
                w.open_table(ACTED_MARKERS).map_err(backend)?;
            }
            w.commit().map_err(backend)?;
        }
        tracing::info!(target: "store", path = %path.as_ref().display(), "opened redb value store");

        Ok(Self {
            db: Arc::new(db),
            clock,
        })
    }

    /// A marker store sharing this store's database file.
    pub fn marker_store(&self) -> RedbMarkerStore {
        RedbMarkerStore {
            db: self.db.clone(),
        }
    }

    fn read_txn(&self) -> Result<ReadTransaction<'_>, StoreError> {
        self.db.begin_read().map_err(backend)
    }
    fn write_txn(&self) -> Result<WriteTransaction<'_>, StoreError> {
        self.db.begin_write().map_err(backend)
    }

    fn next_sequence(w: &WriteTransaction) -> Result<u64, StoreError> {
        let mut t = w.open_table(SEQUENCE).map_err(backend)?;
        let seq = t
            .get(K_SEQUENCE)
            .map_err(backend)?
            .map(|v| parse_u64(v.value()))
            .transpose()?
            .unwrap_or(0);
        t.insert(K_SEQUENCE, be64(seq + 1).as_slice())
            .map_err(backend)?;
        Ok(seq)
    }

    /// Primary keys of every submission carrying `nonce`, in listing order.
    fn keys_for_nonce<T: ReadableTable<&'static [u8], &'static [u8]>>(
        idx: &T,
        identifier: &QueryId,
        nonce: u64,
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        let prefix = k_nonce_prefix(identifier, nonce);
        let mut keys: Vec<Vec<u8>> = idx
            .range(prefix.as_slice()..)
            .map_err(backend)?
            .take_while(|r| r.as_ref().is_ok_and(|(k, _)| k.value().starts_with(&prefix)))
            .map(|r| r.map(|(_, v)| v.value().to_vec()))
            .collect::<Result<_, _>>()
            .map_err(backend)?;
        keys.sort();
        Ok(keys)
    }

    fn dispute(
        &self,
        identifier: &QueryId,
        reporter: Option<&Address>,
        nonce: u64,
    ) -> Result<Submission, StoreError> {
        let w = self.write_txn()?;
        let (record, newly) = {
            let idx = w.open_table(NONCE_INDEX).map_err(backend)?;
            let mut subs = w.open_table(SUBMISSIONS).map_err(backend)?;
            let mut found = None;
            for pk in Self::keys_for_nonce(&idx, identifier, nonce)? {
                let record = subs
                    .get(pk.as_slice())
                    .map_err(backend)?
                    .map(|v| decode_submission(v.value()))
                    .transpose()?
                    .ok_or_else(|| StoreError::Corrupt("nonce index points at a missing record".into()))?;
                if reporter.map_or(true, |r| *r == record.reporter) {
                    found = Some((pk, record));
                    break;
                }
            }
            let (pk, mut record) = found.ok_or(StoreError::NotFound {
                identifier: *identifier,
                nonce,
            })?;
            let newly = !record.disputed;
            if newly {
                record.disputed = true;
                let bytes = codec::to_bytes_canonical(&record).map_err(StoreError::Backend)?;
                subs.insert(pk.as_slice(), bytes.as_slice())
                    .map_err(backend)?;
            }
            (record, newly)
        };
        w.commit().map_err(backend)?;
        if newly {
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
        Ok(record)
    }
}

impl ValueStore for RedbValueStore {
    fn submit(
        &self,
        identifier: QueryId,
        value: Vec<u8>,
        reporter: Address,
        nonce: u64,
    ) -> Result<Submission, StoreError> {
        check_value_size(&value)?;
        let _timer = Timer::new(|secs| metrics().observe_write_duration(secs));
        let w = self.write_txn()?;
        let submission = {
            let lk = k_last_nonce(&identifier, &reporter);
            let mut last = w.open_table(LAST_NONCE).map_err(backend)?;
            let prev = last
                .get(lk.as_slice())
                .map_err(backend)?
                .map(|v| parse_u64(v.value()))
                .transpose()?;
            if let Some(prev) = prev {
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
                sequence: Self::next_sequence(&w)?,
                disputed: false,
            };
            let pk = k_submission(&identifier, submission.submitted_at, nonce, submission.sequence);
            let bytes = codec::to_bytes_canonical(&submission).map_err(StoreError::Backend)?;

            let mut subs = w.open_table(SUBMISSIONS).map_err(backend)?;
            subs.insert(pk.as_slice(), bytes.as_slice())
                .map_err(backend)?;
            let mut idx = w.open_table(NONCE_INDEX).map_err(backend)?;
            idx.insert(
                k_nonce_index(&identifier, nonce, submission.sequence).as_slice(),
                pk.as_slice(),
            )
            .map_err(backend)?;
            last.insert(lk.as_slice(), be64(nonce).as_slice())
                .map_err(backend)?;
            submission
        };
        w.commit().map_err(backend)?;

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
        let r = self.read_txn()?;
        let t = r.open_table(SUBMISSIONS).map_err(backend)?;
        let prefix = identifier.0.as_slice();
        let records = t
            .range(prefix..)
            .map_err(backend)?
            .take_while(|r| r.as_ref().is_ok_and(|(k, _)| k.value().starts_with(prefix)))
            .map(|r| {
                r.map_err(backend)
                    .and_then(|(_, v)| decode_submission(v.value()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SubmissionSnapshot::from_sorted(*identifier, Arc::new(records)))
    }

    fn get_specific(&self, identifier: &QueryId, nonce: u64) -> Result<Option<Submission>, StoreError> {
        let r = self.read_txn()?;
        let idx = r.open_table(NONCE_INDEX).map_err(backend)?;
        let subs = r.open_table(SUBMISSIONS).map_err(backend)?;
        match Self::keys_for_nonce(&idx, identifier, nonce)?.first() {
            Some(pk) => subs
                .get(pk.as_slice())
                .map_err(backend)?
                .map(|v| decode_submission(v.value()))
                .transpose(),
            None => Ok(None),
        }
    }

    fn record_query_payload(&self, identifier: &QueryId, payload: &[u8]) -> Result<bool, StoreError> {
        let w = self.write_txn()?;
        let recorded = {
            let mut t = w.open_table(QUERY_PAYLOADS).map_err(backend)?;
            let exists = t.get(identifier.0.as_slice()).map_err(backend)?.is_some();
            if !exists {
                t.insert(identifier.0.as_slice(), payload).map_err(backend)?;
            }
            !exists
        };
        w.commit().map_err(backend)?;
        Ok(recorded)
    }

    fn query_payload(&self, identifier: &QueryId) -> Result<Option<Vec<u8>>, StoreError> {
        let r = self.read_txn()?;
        let t = r.open_table(QUERY_PAYLOADS).map_err(backend)?;
        let out = t
            .get(identifier.0.as_slice())
            .map_err(backend)?
            .map(|v| v.value().to_vec());
        Ok(out)
    }
}

/// Durable "already acted" markers stored beside the submissions.
#[derive(Clone)]
pub struct RedbMarkerStore {
    db: Arc<Database>,
}

impl ActedMarkerStore for RedbMarkerStore {
    fn acted_at(&self, identifier: &QueryId) -> Result<Option<Timestamp>, StoreError> {
        let r = self.db.begin_read().map_err(backend)?;
        let t = r.open_table(ACTED_MARKERS).map_err(backend)?;
        let out = t
            .get(identifier.0.as_slice())
            .map_err(backend)?
            .map(|v| parse_u64(v.value()))
            .transpose()?;
        Ok(out)
    }

    fn mark_acted(&self, identifier: &QueryId, at: Timestamp) -> Result<bool, StoreError> {
        let w = self.db.begin_write().map_err(backend)?;
        let written = {
            let mut t = w.open_table(ACTED_MARKERS).map_err(backend)?;
            let exists = t.get(identifier.0.as_slice()).map_err(backend)?.is_some();
            if !exists {
                t.insert(identifier.0.as_slice(), be64(at).as_slice())
                    .map_err(backend)?;
            }
            !exists
        };
        w.commit().map_err(backend)?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oraclegate_api::time::ManualClock;

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("values.redb");
        let id = QueryId([5; 32]);
        let reporter = Address([1; 20]);
        {
            let store = RedbValueStore::open(&path, Arc::new(ManualClock::new(10))).unwrap();
            store.submit(id, vec![1], reporter, 3).unwrap();
            store.mark_disputed(&id, 3).unwrap();
            store.marker_store().mark_acted(&id, 11).unwrap();
        }
        let store = RedbValueStore::open(&path, Arc::new(ManualClock::new(20))).unwrap();
        let snap = store.list_submissions(&id).unwrap();
        assert_eq!(snap.len(), 1);
        assert!(snap.iter().all(|s| s.disputed));
        assert_eq!(store.marker_store().acted_at(&id).unwrap(), Some(11));
        // The nonce floor is durable too.
        assert!(matches!(
            store.submit(id, vec![2], reporter, 3),
            Err(StoreError::StaleNonce { last: 3, .. })
        ));
        let next = store.submit(id, vec![2], reporter, 4).unwrap();
        assert_eq!(next.sequence, 1);
    }
}
