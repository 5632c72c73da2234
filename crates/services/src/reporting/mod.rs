// Path: crates/services/src/reporting/mod.rs
//! Submission and dispute ingress for the reporting network.
//!
//! The gateway trusts the reporter identity it is handed. It does not trust the
//! identifier: a submission must carry the query payload, and the payload must
//! hash to the identifier before anything is written.

use oraclegate_api::query::{decode_payload, derive_identifier, QueryPayload};
use oraclegate_api::storage::ValueStore;
use oraclegate_telemetry::error_metrics;
use oraclegate_types::app::{Address, QueryId, Submission};
use oraclegate_types::error::{ErrorCode, ReportingError};
use std::sync::Arc;

/// A decoded query payload, as recorded for an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryData {
    /// The query kind tag.
    pub kind: String,
    /// The encoded parameter tuple.
    pub params: Vec<u8>,
}

pub struct ReportingGateway {
    store: Arc<dyn ValueStore>,
}

impl ReportingGateway {
    pub fn new(store: Arc<dyn ValueStore>) -> Self {
        Self { store }
    }

    fn fail(err: ReportingError) -> ReportingError {
        error_metrics().inc_error("reporting", err.code());
        err
    }

    /// Accepts a reporter's value for `identifier`.
    ///
    /// Order of checks: the payload must be a well-formed `(string, bytes)` tuple,
    /// it must hash to `identifier`, and then the store applies its nonce and
    /// size rules. A rejected submission leaves no trace, except that a valid
    /// payload may already have been recorded for the identifier.
    pub fn submit_value(
        &self,
        reporter: Address,
        identifier: QueryId,
        value: Vec<u8>,
        nonce: u64,
        query_payload: &[u8],
    ) -> Result<Submission, ReportingError> {
        let (kind, _) = decode_payload(query_payload).map_err(|e| {
            tracing::warn!(
                target: "reporting",
                identifier = %identifier,
                reporter = %reporter,
                error = %e,
                "malformed query payload"
            );
            Self::fail(ReportingError::MalformedPayload(e))
        })?;

        let derived = derive_identifier(&QueryPayload::from_bytes(query_payload.to_vec()));
        if derived != identifier {
            tracing::warn!(
                target: "reporting",
                expected = %identifier,
                derived = %derived,
                reporter = %reporter,
                "identifier does not match payload"
            );
            return Err(Self::fail(ReportingError::IdentifierMismatch {
                expected: identifier,
                derived,
            }));
        }

        if self
            .store
            .record_query_payload(&identifier, query_payload)
            .map_err(|e| Self::fail(e.into()))?
        {
            tracing::info!(target: "reporting", identifier = %identifier, kind = %kind, "new query");
        }

        let submission = self
            .store
            .submit(identifier, value, reporter, nonce)
            .map_err(|e| Self::fail(e.into()))?;
        tracing::info!(
            target: "reporting",
            identifier = %identifier,
            reporter = %reporter,
            nonce,
            submitted_at = submission.submitted_at,
            "value submitted"
        );
        Ok(submission)
    }

    /// Disputes the earliest submission carrying `nonce`.
    pub fn begin_dispute(&self, identifier: &QueryId, nonce: u64) -> Result<Submission, ReportingError> {
        let s = self
            .store
            .mark_disputed(identifier, nonce)
            .map_err(|e| Self::fail(e.into()))?;
        tracing::info!(target: "reporting", identifier = %identifier, nonce, reporter = %s.reporter, "dispute opened");
        Ok(s)
    }

    /// Disputes one reporter's submission exactly.
    pub fn begin_dispute_for(
        &self,
        identifier: &QueryId,
        reporter: &Address,
        nonce: u64,
    ) -> Result<Submission, ReportingError> {
        let s = self
            .store
            .mark_disputed_by(identifier, reporter, nonce)
            .map_err(|e| Self::fail(e.into()))?;
        tracing::info!(target: "reporting", identifier = %identifier, nonce, reporter = %reporter, "dispute opened");
        Ok(s)
    }

    /// The query behind `identifier`, if any reporter has supplied it.
    pub fn query_data(&self, identifier: &QueryId) -> Result<Option<QueryData>, ReportingError> {
        let Some(raw) = self.store.query_payload(identifier)? else {
            return Ok(None);
        };
        let (kind, params) = decode_payload(&raw)?;
        Ok(Some(QueryData { kind, params }))
    }
}
