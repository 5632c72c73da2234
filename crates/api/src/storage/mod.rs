// Path: crates/api/src/storage/mod.rs

//! API for the append-only value store and the consumer's marker store.

use oraclegate_types::app::{Address, QueryId, Submission, Timestamp};
use oraclegate_types::error::StoreError;
use std::sync::Arc;

/// Encodes a u64 into a big-endian byte array, suitable for ordered key scans.
#[inline]
pub fn be64(x: u64) -> [u8; 8] {
    x.to_be_bytes()
}

/// A consistent, point-in-time view of one identifier's submissions.
///
/// Records are held in listing order: ascending `submitted_at`, ties broken by
/// nonce and then by store sequence. Concurrent appends made after the snapshot
/// was taken are not visible through it. A snapshot can be iterated any number
/// of times.
#[derive(Clone, Debug, Default)]
pub struct SubmissionSnapshot {
    identifier: QueryId,
    records: Arc<Vec<Submission>>,
}

impl SubmissionSnapshot {
    /// Builds a snapshot from records, sorting them into listing order.
    pub fn new(identifier: QueryId, mut records: Vec<Submission>) -> Self {
        records.sort_by_key(Submission::order_key);
        Self {
            identifier,
            records: Arc::new(records),
        }
    }

    /// Wraps records the caller guarantees are already in listing order.
    pub fn from_sorted(identifier: QueryId, records: Arc<Vec<Submission>>) -> Self {
        Self {
            identifier,
            records,
        }
    }

    /// The identifier this snapshot covers.
    pub fn identifier(&self) -> &QueryId {
        &self.identifier
    }

    /// Oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, Submission> {
        self.records.iter()
    }

    /// Newest first.
    pub fn newest_first(&self) -> std::iter::Rev<std::slice::Iter<'_, Submission>> {
        self.records.iter().rev()
    }

    /// Number of records, disputed ones included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the identifier has no submissions.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The record at a listing position.
    pub fn get(&self, index: usize) -> Option<&Submission> {
        self.records.get(index)
    }

    /// The first record in listing order carrying `nonce`.
    pub fn find_by_nonce(&self, nonce: u64) -> Option<&Submission> {
        self.records.iter().find(|s| s.nonce == nonce)
    }

    /// The records as a slice in listing order.
    pub fn as_slice(&self) -> &[Submission] {
        &self.records
    }
}

impl<'a> IntoIterator for &'a SubmissionSnapshot {
    type Item = &'a Submission;
    type IntoIter = std::slice::Iter<'a, Submission>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The append-only log of reporter submissions, keyed by query identifier.
///
/// Implementations must make the stale-nonce check and the append a single
/// atomic step per `(identifier, reporter)`, must never lose an accepted
/// submission, and must serve reads from a consistent view.
pub trait ValueStore: Send + Sync {
    /// Appends a submission stamped with the store's clock.
    ///
    /// Rejects the submission with [`StoreError::StaleNonce`] when `nonce` is not
    /// strictly greater than the last nonce accepted from `reporter` for
    /// `identifier`. The first submission from a reporter accepts any nonce.
    fn submit(
        &self,
        identifier: QueryId,
        value: Vec<u8>,
        reporter: Address,
        nonce: u64,
    ) -> Result<Submission, StoreError>;

    /// Marks the earliest submission (in listing order) with `nonce` as disputed.
    ///
    /// Marking an already disputed record is a no-op. Returns the record as stored.
    fn mark_disputed(&self, identifier: &QueryId, nonce: u64) -> Result<Submission, StoreError>;

    /// Marks the submission from `reporter` with `nonce` as disputed.
    fn mark_disputed_by(
        &self,
        identifier: &QueryId,
        reporter: &Address,
        nonce: u64,
    ) -> Result<Submission, StoreError>;

    /// Takes a snapshot of every submission for `identifier`, disputed ones included.
    fn list_submissions(&self, identifier: &QueryId) -> Result<SubmissionSnapshot, StoreError>;

    /// The earliest submission (in listing order) with `nonce`, disputed or not.
    fn get_specific(&self, identifier: &QueryId, nonce: u64) -> Result<Option<Submission>, StoreError> {
        Ok(self
            .list_submissions(identifier)?
            .find_by_nonce(nonce)
            .cloned())
    }

    /// Remembers the payload that produced `identifier`. The first recorded payload
    /// wins; returns whether this call recorded it.
    fn record_query_payload(&self, identifier: &QueryId, payload: &[u8]) -> Result<bool, StoreError>;

    /// The payload recorded for `identifier`, if any.
    fn query_payload(&self, identifier: &QueryId) -> Result<Option<Vec<u8>>, StoreError>;
}

impl<T: ValueStore + ?Sized> ValueStore for Arc<T> {
    fn submit(
        &self,
        identifier: QueryId,
        value: Vec<u8>,
        reporter: Address,
        nonce: u64,
    ) -> Result<Submission, StoreError> {
        (**self).submit(identifier, value, reporter, nonce)
    }

    fn mark_disputed(&self, identifier: &QueryId, nonce: u64) -> Result<Submission, StoreError> {
        (**self).mark_disputed(identifier, nonce)
    }

    fn mark_disputed_by(
        &self,
        identifier: &QueryId,
        reporter: &Address,
        nonce: u64,
    ) -> Result<Submission, StoreError> {
        (**self).mark_disputed_by(identifier, reporter, nonce)
    }

    fn list_submissions(&self, identifier: &QueryId) -> Result<SubmissionSnapshot, StoreError> {
        (**self).list_submissions(identifier)
    }

    fn get_specific(&self, identifier: &QueryId, nonce: u64) -> Result<Option<Submission>, StoreError> {
        (**self).get_specific(identifier, nonce)
    }

    fn record_query_payload(&self, identifier: &QueryId, payload: &[u8]) -> Result<bool, StoreError> {
        (**self).record_query_payload(identifier, payload)
    }

    fn query_payload(&self, identifier: &QueryId) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).query_payload(identifier)
    }
}

/// Durable record of which conditions a consumer has already acted on.
pub trait ActedMarkerStore: Send + Sync {
    /// When the consumer acted on `identifier`, if it has.
    fn acted_at(&self, identifier: &QueryId) -> Result<Option<Timestamp>, StoreError>;

    /// Records the marker unless one exists. Returns whether this call wrote it.
    fn mark_acted(&self, identifier: &QueryId, at: Timestamp) -> Result<bool, StoreError>;
}

impl<T: ActedMarkerStore + ?Sized> ActedMarkerStore for Arc<T> {
    fn acted_at(&self, identifier: &QueryId) -> Result<Option<Timestamp>, StoreError> {
        (**self).acted_at(identifier)
    }

    fn mark_acted(&self, identifier: &QueryId, at: Timestamp) -> Result<bool, StoreError> {
        (**self).mark_acted(identifier, at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(submitted_at: u64, nonce: u64, sequence: u64) -> Submission {
        Submission {
            identifier: QueryId([1; 32]),
            value: vec![],
            submitted_at,
            reporter: Address::ZERO,
            nonce,
            sequence,
            disputed: false,
        }
    }

    #[test]
    fn snapshot_sorts_into_listing_order() {
        let snap = SubmissionSnapshot::new(
            QueryId([1; 32]),
            vec![record(20, 0, 3), record(10, 5, 2), record(20, 0, 1), record(10, 1, 4)],
        );
        let keys: Vec<_> = snap.iter().map(Submission::order_key).collect();
        assert_eq!(keys, vec![(10, 1, 4), (10, 5, 2), (20, 0, 1), (20, 0, 3)]);
        let newest: Vec<_> = snap.newest_first().map(|s| s.sequence).collect();
        assert_eq!(newest, vec![3, 1, 2, 4]);
        assert_eq!(snap.find_by_nonce(0).map(|s| s.sequence), Some(1));
        // Restartable.
        assert_eq!(snap.iter().count(), (&snap).into_iter().count());
    }
}
