// Path: crates/services/src/consumer/mod.rs
//! Conditional consumers.
//!
//! A condition is a query kind with a registered parameter shape, value shape
//! and staleness bound. Evaluating it yields one of three outcomes, and
//! [`ConditionalConsumer::act_once`] runs a dependent action at most once per
//! identifier on top of that.

use crate::retrieval::Retrieval;
use async_trait::async_trait;
use dashmap::DashMap;
use oraclegate_api::abi::{AbiType, AbiValue};
use oraclegate_api::query::{
    decode_value, query_id, DecodedValue, QueryParameters, QueryPayload, ValueShape,
};
use oraclegate_api::storage::{ActedMarkerStore, ValueStore};
use oraclegate_telemetry::{consumer_metrics, error_metrics};
use oraclegate_types::app::{QueryId, RetrievedValue, Timestamp};
use oraclegate_types::config::OracleConfig;
use oraclegate_types::error::{ActionError, ConsumerError, DecodeError, ErrorCode, StoreError};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Everything a consumer needs to know about one query kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConditionSpec {
    /// The query kind tag.
    pub kind: String,
    /// The parameter tuple the kind is queried with.
    pub parameter_shape: Vec<AbiType>,
    /// The layout reporters must use for values.
    pub value_shape: ValueShape,
    /// Values older than this are not trusted.
    pub max_age: Duration,
}

/// Registered conditions, keyed by kind.
#[derive(Clone, Debug, Default)]
pub struct ConditionRegistry {
    specs: BTreeMap<String, ConditionSpec>,
}

impl ConditionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `spec`, returning the one it replaced.
    pub fn register(&mut self, spec: ConditionSpec) -> Option<ConditionSpec> {
        self.specs.insert(spec.kind.clone(), spec)
    }

    pub fn get(&self, kind: &str) -> Result<&ConditionSpec, ConsumerError> {
        self.specs
            .get(kind)
            .ok_or_else(|| ConsumerError::UnknownKind(kind.to_string()))
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    /// Replaces every registered staleness bound with the configured one.
    pub fn apply_config(&mut self, cfg: &OracleConfig) {
        for spec in self.specs.values_mut() {
            spec.max_age = cfg.max_age_for(&spec.kind);
        }
    }
}

/// The result of evaluating a condition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConditionOutcome {
    /// No qualifying value has been reported yet.
    Unsatisfied,
    /// A qualifying value decoded against the registered shape.
    Satisfied(DecodedValue),
    /// A qualifying value exists but does not decode. A reporter or
    /// integration fault, never the same thing as "not yet reported".
    Indeterminate(DecodeError),
}

impl ConditionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unsatisfied => "unsatisfied",
            Self::Satisfied(_) => "satisfied",
            Self::Indeterminate(_) => "indeterminate",
        }
    }

    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied(_))
    }
}

/// An outcome together with the identifier and the value it was derived from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Evaluation {
    pub identifier: QueryId,
    pub retrieved: Option<RetrievedValue>,
    pub outcome: ConditionOutcome,
}

/// The dependent action gated by a condition.
#[async_trait]
pub trait ReleaseAction: Send + Sync {
    /// Runs the action for a satisfied condition.
    ///
    /// Returning `Err` leaves the condition un-acted, so a later call may run it
    /// again. An action that can partially succeed must tolerate that.
    async fn execute(
        &self,
        identifier: &QueryId,
        value: &DecodedValue,
        retrieved: &RetrievedValue,
    ) -> Result<(), ActionError>;
}

/// What [`ConditionalConsumer::act_once`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionReport {
    /// The condition is not satisfied yet; nothing ran.
    Pending,
    /// The reported value is malformed; nothing ran.
    Indeterminate(DecodeError),
    /// The action ran and the marker was written at `at`.
    Executed { at: Timestamp },
    /// The action had already run at `at`; nothing ran.
    AlreadyActed { at: Timestamp },
}

/// Evaluates registered conditions against the value store and guards
/// dependent actions with persistent "already acted" markers.
pub struct ConditionalConsumer {
    registry: ConditionRegistry,
    retrieval: Retrieval,
    markers: Arc<dyn ActedMarkerStore>,
    io_timeout: Duration,
    locks: ActLocks,
}

impl ConditionalConsumer {
    pub fn new(
        registry: ConditionRegistry,
        store: Arc<dyn ValueStore>,
        markers: Arc<dyn ActedMarkerStore>,
        io_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            retrieval: Retrieval::new(store),
            markers,
            io_timeout,
            locks: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &ConditionRegistry {
        &self.registry
    }

    /// Builds the payload and identifier of `kind` queried with `params`.
    ///
    /// `params` must match the registered parameter shape exactly.
    pub fn identifier_for(
        &self,
        kind: &str,
        params: &[AbiValue],
    ) -> Result<(QueryPayload, QueryId), ConsumerError> {
        let spec = self.registry.get(kind)?;
        let params = QueryParameters::new(spec.parameter_shape.clone(), params.to_vec());
        Ok(query_id(kind, &params)?)
    }

    /// Evaluates `kind` for `params` as of `now`.
    ///
    /// Storage failures and timeouts are errors. They never become `Unsatisfied`.
    pub async fn evaluate_condition(
        &self,
        kind: &str,
        params: &[AbiValue],
        now: Timestamp,
    ) -> Result<Evaluation, ConsumerError> {
        let spec = self.registry.get(kind)?;
        let (_, identifier) = self.identifier_for(kind, params)?;
        self.evaluate(spec, identifier, now).await
    }

    async fn evaluate(
        &self,
        spec: &ConditionSpec,
        identifier: QueryId,
        now: Timestamp,
    ) -> Result<Evaluation, ConsumerError> {
        let retrieved = self
            .retrieval
            .fetch_latest_valid(&identifier, now, spec.max_age, self.io_timeout)
            .await
            .inspect_err(|e| error_metrics().inc_error("consumer", e.code()))?;

        let outcome = match &retrieved {
            None => ConditionOutcome::Unsatisfied,
            Some(r) => match decode_value(&r.value, &spec.value_shape) {
                Ok(decoded) => ConditionOutcome::Satisfied(decoded),
                Err(e) => {
                    tracing::warn!(
                        target: "consumer",
                        kind = %spec.kind,
                        identifier = %identifier,
                        reporter = %r.reporter,
                        error = %e,
                        "reported value does not match the registered shape"
                    );
                    ConditionOutcome::Indeterminate(e)
                }
            },
        };
        consumer_metrics().inc_evaluations(&spec.kind, outcome.label());
        tracing::debug!(
            target: "consumer",
            kind = %spec.kind,
            identifier = %identifier,
            now,
            outcome = outcome.label(),
            "condition evaluated"
        );
        Ok(Evaluation {
            identifier,
            retrieved,
            outcome,
        })
    }

    /// Runs `action` the first time the condition is observed satisfied.
    ///
    /// Calls for the same identifier are serialized. The marker is written only
    /// after the action returns `Ok`, so a failed or cancelled action can be
    /// retried. If the marker write itself fails, the action has run but the
    /// next call will run it again. Marker reads and writes run on the blocking
    /// pool under the configured I/O timeout.
    pub async fn act_once(
        &self,
        kind: &str,
        params: &[AbiValue],
        now: Timestamp,
        action: &dyn ReleaseAction,
    ) -> Result<ActionReport, ConsumerError> {
        let spec = self.registry.get(kind)?;
        let (_, identifier) = self.identifier_for(kind, params)?;

        let slot = LockSlot::acquire(&self.locks, identifier);
        let _guard = slot.lock().lock().await;
        self.act_locked(spec, identifier, now, action).await
    }

    async fn act_locked(
        &self,
        spec: &ConditionSpec,
        identifier: QueryId,
        now: Timestamp,
        action: &dyn ReleaseAction,
    ) -> Result<ActionReport, ConsumerError> {
        let kind = spec.kind.as_str();
        if let Some(at) = self.marker_io(move |m| m.acted_at(&identifier)).await? {
            tracing::debug!(target: "consumer", kind, identifier = %identifier, at, "already acted");
            return Ok(ActionReport::AlreadyActed { at });
        }

        let evaluation = self.evaluate(spec, identifier, now).await?;
        let Some(retrieved) = evaluation.retrieved.as_ref() else {
            return Ok(ActionReport::Pending);
        };
        let decoded = match evaluation.outcome {
            ConditionOutcome::Unsatisfied => return Ok(ActionReport::Pending),
            ConditionOutcome::Indeterminate(e) => return Ok(ActionReport::Indeterminate(e)),
            ConditionOutcome::Satisfied(decoded) => decoded,
        };

        if let Err(e) = action.execute(&identifier, &decoded, retrieved).await {
            error_metrics().inc_error("consumer", e.code());
            tracing::warn!(
                target: "consumer",
                kind,
                identifier = %identifier,
                error = %e,
                "dependent action did not run"
            );
            return Err(e.into());
        }

        match self.marker_io(move |m| m.mark_acted(&identifier, now)).await {
            Ok(true) => {}
            Ok(false) => {
                // Another process sharing the marker store got there first.
                let at = self
                    .marker_io(move |m| m.acted_at(&identifier))
                    .await?
                    .unwrap_or(now);
                tracing::warn!(target: "consumer", kind, identifier = %identifier, at, "marker already present after action");
                return Ok(ActionReport::AlreadyActed { at });
            }
            Err(e) => {
                error_metrics().inc_error("consumer", e.code());
                tracing::error!(
                    target: "consumer",
                    kind,
                    identifier = %identifier,
                    error = %e,
                    "action executed but the marker could not be written"
                );
                return Err(e.into());
            }
        }

        consumer_metrics().inc_actions_executed(kind);
        tracing::info!(
            target: "consumer",
            kind,
            identifier = %identifier,
            reporter = %retrieved.reporter,
            submitted_at = retrieved.submitted_at,
            at = now,
            "dependent action executed"
        );
        Ok(ActionReport::Executed { at: now })
    }

    /// Runs a marker store operation on the blocking pool, bounded by the I/O timeout.
    ///
    /// A write that outlives the deadline may still land; the caller sees `Timeout`.
    async fn marker_io<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ActedMarkerStore) -> Result<T, StoreError> + Send + 'static,
    {
        let markers = self.markers.clone();
        let task = tokio::task::spawn_blocking(move || op(&*markers));
        match tokio::time::timeout(self.io_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(StoreError::Backend(format!("marker task failed: {join}"))),
            Err(_) => {
                let millis = u64::try_from(self.io_timeout.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(target: "consumer", millis, "marker store timed out");
                Err(StoreError::Timeout { millis })
            }
        }
    }

    /// When the action for `identifier` ran, if it has.
    pub fn acted_at(&self, identifier: &QueryId) -> Result<Option<Timestamp>, ConsumerError> {
        Ok(self.markers.acted_at(identifier)?)
    }
}

type ActLocks = DashMap<QueryId, Arc<tokio::sync::Mutex<()>>>;

/// A handle on one identifier's entry in the lock map.
///
/// Dropping the last handle removes the entry, including when the owning
/// future is cancelled.
struct LockSlot<'a> {
    locks: &'a ActLocks,
    identifier: QueryId,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl<'a> LockSlot<'a> {
    fn acquire(locks: &'a ActLocks, identifier: QueryId) -> Self {
        let lock = locks.entry(identifier).or_default().value().clone();
        Self {
            locks,
            identifier,
            lock,
        }
    }

    fn lock(&self) -> &tokio::sync::Mutex<()> {
        &self.lock
    }
}

impl Drop for LockSlot<'_> {
    fn drop(&mut self) {
        // The map holds one reference and this slot the other.
        self.locks.remove_if(&self.identifier, |_, l| {
            Arc::ptr_eq(l, &self.lock) && Arc::strong_count(l) == 2
        });
    }
}

#[cfg(test)]
mod tests;
