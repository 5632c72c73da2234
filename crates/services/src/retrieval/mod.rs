// Path: crates/services/src/retrieval/mod.rs
//! Latest-valid retrieval over a store snapshot.
//!
//! A submission qualifies when it is not disputed, was submitted no later than
//! `now`, and `now - submitted_at <= max_age`. The scan runs newest first, so
//! the first qualifying record is the answer. "No qualifying value" is `None`;
//! storage failures are always errors.

use oraclegate_api::storage::{SubmissionSnapshot, ValueStore};
use oraclegate_telemetry::retrieval_metrics;
use oraclegate_telemetry::time::Timer;
use oraclegate_types::app::{CurrentValue, QueryId, RetrievedValue, Submission, Timestamp};
use oraclegate_types::error::StoreError;
use std::sync::Arc;
use std::time::Duration;

/// Picks the newest qualifying submission from a snapshot.
///
/// Disputed records are skipped even when they are the newest. Records stamped
/// after `now` are outside the view and skipped too.
pub fn select_latest_valid(
    snapshot: &SubmissionSnapshot,
    now: Timestamp,
    max_age: Duration,
) -> Option<&Submission> {
    let max_age = max_age.as_secs();
    let mut disputed = 0u64;
    let mut future = 0u64;
    let mut found = None;
    for s in snapshot.newest_first() {
        if s.disputed {
            disputed += 1;
            continue;
        }
        if s.submitted_at > now {
            future += 1;
            continue;
        }
        // Everything after this point is at least as old.
        if now - s.submitted_at <= max_age {
            found = Some(s);
        }
        break;
    }
    if disputed > 0 {
        retrieval_metrics().inc_skipped("disputed", disputed);
    }
    if future > 0 {
        retrieval_metrics().inc_skipped("future", future);
    }
    found
}

/// The newest non-disputed submission, whatever its age.
pub fn select_current(snapshot: &SubmissionSnapshot) -> Option<&Submission> {
    snapshot.newest_first().find(|s| !s.disputed)
}

/// The newest non-disputed submission strictly before `timestamp`.
pub fn select_before(snapshot: &SubmissionSnapshot, timestamp: Timestamp) -> Option<&Submission> {
    snapshot
        .newest_first()
        .find(|s| !s.disputed && s.submitted_at < timestamp)
}

fn record_outcome<T>(result: &Result<Option<T>, StoreError>) {
    let outcome = match result {
        Ok(Some(_)) => "found",
        Ok(None) => "none",
        Err(_) => "error",
    };
    retrieval_metrics().inc_lookups(outcome);
}

/// Consumer-facing reads over a value store.
#[derive(Clone)]
pub struct Retrieval {
    store: Arc<dyn ValueStore>,
}

impl Retrieval {
    pub fn new(store: Arc<dyn ValueStore>) -> Self {
        Self { store }
    }

    /// The newest submission satisfying the dispute and staleness rules.
    pub fn get_latest_valid(
        &self,
        identifier: &QueryId,
        now: Timestamp,
        max_age: Duration,
    ) -> Result<Option<RetrievedValue>, StoreError> {
        let _timer = Timer::new(|secs| retrieval_metrics().observe_lookup_duration(secs));
        let result = self
            .store
            .list_submissions(identifier)
            .map(|snap| select_latest_valid(&snap, now, max_age).map(Submission::to_retrieved));
        record_outcome(&result);
        match &result {
            Ok(found) => tracing::debug!(
                target: "retrieval",
                identifier = %identifier,
                now,
                max_age_secs = max_age.as_secs(),
                found = found.is_some(),
                "latest-valid lookup"
            ),
            Err(e) => tracing::warn!(
                target: "retrieval",
                identifier = %identifier,
                error = %e,
                "latest-valid lookup failed"
            ),
        }
        result
    }

    /// Like [`Retrieval::get_latest_valid`], with the storage read moved to the
    /// blocking pool and bounded by `timeout`.
    ///
    /// An elapsed deadline is [`StoreError::Timeout`], never "no qualifying value".
    pub async fn fetch_latest_valid(
        &self,
        identifier: &QueryId,
        now: Timestamp,
        max_age: Duration,
        timeout: Duration,
    ) -> Result<Option<RetrievedValue>, StoreError> {
        let this = self.clone();
        let id = *identifier;
        let task =
            tokio::task::spawn_blocking(move || this.get_latest_valid(&id, now, max_age));
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(StoreError::Backend(format!("retrieval task failed: {join}"))),
            Err(_) => {
                let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                retrieval_metrics().inc_lookups("timeout");
                tracing::warn!(
                    target: "retrieval",
                    identifier = %identifier,
                    millis,
                    "latest-valid lookup timed out"
                );
                Err(StoreError::Timeout { millis })
            }
        }
    }

    /// Exact lookup by nonce with no freshness filtering. Disputed records are returned.
    pub fn get_specific(&self, identifier: &QueryId, nonce: u64) -> Result<Option<Submission>, StoreError> {
        self.store.get_specific(identifier, nonce)
    }

    /// The newest non-disputed value regardless of age, as a `found` flag view.
    pub fn get_current_value(&self, identifier: &QueryId) -> Result<CurrentValue, StoreError> {
        let snap = self.store.list_submissions(identifier)?;
        Ok(CurrentValue::from(select_current(&snap).map(Submission::to_retrieved)))
    }

    /// The newest non-disputed value submitted strictly before `timestamp`.
    pub fn get_data_before(
        &self,
        identifier: &QueryId,
        timestamp: Timestamp,
    ) -> Result<Option<RetrievedValue>, StoreError> {
        let snap = self.store.list_submissions(identifier)?;
        Ok(select_before(&snap, timestamp).map(Submission::to_retrieved))
    }

    /// Number of submissions, disputed ones included.
    pub fn value_count(&self, identifier: &QueryId) -> Result<usize, StoreError> {
        Ok(self.store.list_submissions(identifier)?.len())
    }

    /// The submission time at a listing position.
    pub fn timestamp_by_index(
        &self,
        identifier: &QueryId,
        index: usize,
    ) -> Result<Option<Timestamp>, StoreError> {
        Ok(self
            .store
            .list_submissions(identifier)?
            .get(index)
            .map(|s| s.submitted_at))
    }

    /// The full listing, oldest first.
    pub fn history(&self, identifier: &QueryId) -> Result<SubmissionSnapshot, StoreError> {
        self.store.list_submissions(identifier)
    }
}
