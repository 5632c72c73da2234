// Path: crates/services/src/consumer/tests.rs
use super::*;
use oraclegate_api::query::encode_value;
use oraclegate_api::time::ManualClock;
use oraclegate_storage::{MemoryMarkerStore, MemoryValueStore};
use oraclegate_types::app::{Address, U256};
use oraclegate_types::config::OracleConfig;
use oraclegate_types::error::StoreError;
use std::sync::atomic::{AtomicUsize, Ordering};

const KIND: &str = "flag";
const R1: Address = Address([1; 20]);

fn flag_spec() -> ConditionSpec {
    ConditionSpec {
        kind: KIND.into(),
        parameter_shape: vec![AbiType::Uint(256)],
        value_shape: ValueShape::new([("raised", AbiType::Bool)]),
        max_age: Duration::from_secs(50),
    }
}

fn params(n: u64) -> Vec<AbiValue> {
    vec![AbiValue::Uint(U256::from(n))]
}

struct Fixture {
    store: Arc<MemoryValueStore>,
    markers: Arc<MemoryMarkerStore>,
    consumer: ConditionalConsumer,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryValueStore::new(Arc::new(ManualClock::new(100))));
    let markers = Arc::new(MemoryMarkerStore::default());
    let mut registry = ConditionRegistry::new();
    registry.register(flag_spec());
    let consumer = ConditionalConsumer::new(
        registry,
        store.clone(),
        markers.clone(),
        Duration::from_secs(2),
    );
    Fixture {
        store,
        markers,
        consumer,
    }
}

fn report(f: &Fixture, n: u64, value: Vec<u8>, nonce: u64) -> QueryId {
    let (_, id) = f.consumer.identifier_for(KIND, &params(n)).unwrap();
    f.store.submit(id, value, R1, nonce).unwrap();
    id
}

fn flag_value(raised: bool) -> Vec<u8> {
    encode_value(&[AbiValue::Bool(raised)], &flag_spec().value_shape).unwrap()
}

#[derive(Default)]
struct CountingAction {
    runs: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl ReleaseAction for CountingAction {
    async fn execute(
        &self,
        _identifier: &QueryId,
        value: &DecodedValue,
        _retrieved: &RetrievedValue,
    ) -> Result<(), ActionError> {
        value.bool_at(0).map_err(|e| ActionError::Failed(e.to_string()))?;
        if self.fail {
            return Err(ActionError::Failed("escrow offline".into()));
        }
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn three_way_outcome() {
    let f = fixture();
    let unreported = f.consumer.evaluate_condition(KIND, &params(1), 100).await.unwrap();
    assert_eq!(unreported.outcome, ConditionOutcome::Unsatisfied);
    assert!(unreported.retrieved.is_none());

    report(&f, 2, flag_value(true), 0);
    let ok = f.consumer.evaluate_condition(KIND, &params(2), 100).await.unwrap();
    match &ok.outcome {
        ConditionOutcome::Satisfied(v) => assert!(v.bool_at(0).unwrap()),
        other => panic!("expected satisfied, got {other:?}"),
    }
    assert_eq!(ok.retrieved.as_ref().unwrap().reporter, R1);

    report(&f, 3, vec![0xde, 0xad], 0);
    let bad = f.consumer.evaluate_condition(KIND, &params(3), 100).await.unwrap();
    assert!(matches!(bad.outcome, ConditionOutcome::Indeterminate(_)));
    assert_eq!(bad.outcome.label(), "indeterminate");
}

#[tokio::test]
async fn stale_value_is_unsatisfied() {
    let f = fixture();
    report(&f, 1, flag_value(true), 0);
    let e = f.consumer.evaluate_condition(KIND, &params(1), 151).await.unwrap();
    assert_eq!(e.outcome, ConditionOutcome::Unsatisfied);
}

#[tokio::test]
async fn action_runs_exactly_once() {
    let f = fixture();
    let id = report(&f, 1, flag_value(true), 0);
    let action = CountingAction::default();

    let first = f.consumer.act_once(KIND, &params(1), 110, &action).await.unwrap();
    assert_eq!(first, ActionReport::Executed { at: 110 });
    let second = f.consumer.act_once(KIND, &params(1), 120, &action).await.unwrap();
    assert_eq!(second, ActionReport::AlreadyActed { at: 110 });

    assert_eq!(action.runs.load(Ordering::SeqCst), 1);
    assert_eq!(f.consumer.acted_at(&id).unwrap(), Some(110));
    assert_eq!(f.markers.acted_at(&id).unwrap(), Some(110));
}

#[tokio::test]
async fn concurrent_callers_share_one_execution() {
    let f = Arc::new(fixture());
    report(&f, 1, flag_value(true), 0);
    let action = Arc::new(CountingAction::default());

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let f = f.clone();
            let action = action.clone();
            tokio::spawn(async move {
                f.consumer
                    .act_once(KIND, &params(1), 110, action.as_ref())
                    .await
                    .unwrap()
            })
        })
        .collect();
    let mut executed = 0;
    for t in tasks {
        if matches!(t.await.unwrap(), ActionReport::Executed { .. }) {
            executed += 1;
        }
    }
    assert_eq!(executed, 1);
    assert_eq!(action.runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn pending_and_indeterminate_leave_no_marker() {
    let f = fixture();
    let action = CountingAction::default();
    let pending = f.consumer.act_once(KIND, &params(1), 100, &action).await.unwrap();
    assert_eq!(pending, ActionReport::Pending);

    let id = report(&f, 2, vec![7; 3], 0);
    let bad = f.consumer.act_once(KIND, &params(2), 100, &action).await.unwrap();
    assert!(matches!(bad, ActionReport::Indeterminate(_)));
    assert_eq!(f.markers.acted_at(&id).unwrap(), None);
    assert_eq!(action.runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_action_can_be_retried() {
    let f = fixture();
    let id = report(&f, 1, flag_value(true), 0);
    let broken = CountingAction {
        fail: true,
        ..Default::default()
    };
    let err = f
        .consumer
        .act_once(KIND, &params(1), 110, &broken)
        .await
        .unwrap_err();
    assert!(matches!(err, ConsumerError::Action(ActionError::Failed(_))));
    assert_eq!(f.markers.acted_at(&id).unwrap(), None);

    let working = CountingAction::default();
    let report = f.consumer.act_once(KIND, &params(1), 120, &working).await.unwrap();
    assert_eq!(report, ActionReport::Executed { at: 120 });
}

#[tokio::test]
async fn disputed_value_stops_the_action() {
    let f = fixture();
    let id = report(&f, 1, flag_value(true), 0);
    f.store.mark_disputed(&id, 0).unwrap();
    let action = CountingAction::default();
    let r = f.consumer.act_once(KIND, &params(1), 110, &action).await.unwrap();
    assert_eq!(r, ActionReport::Pending);
}

#[tokio::test]
async fn unknown_kind_and_bad_params_are_errors() {
    let f = fixture();
    let err = f
        .consumer
        .evaluate_condition("nope", &params(1), 100)
        .await
        .unwrap_err();
    assert!(matches!(err, ConsumerError::UnknownKind(k) if k == "nope"));

    let err = f
        .consumer
        .evaluate_condition(KIND, &[AbiValue::Bool(true)], 100)
        .await
        .unwrap_err();
    assert!(matches!(err, ConsumerError::Encoding(_)));

    let err = f.consumer.identifier_for(KIND, &[]).unwrap_err();
    assert!(matches!(err, ConsumerError::Encoding(_)));
}

struct BrokenStore;

impl ValueStore for BrokenStore {
    fn submit(&self, _: QueryId, _: Vec<u8>, _: Address, _: u64) -> Result<oraclegate_types::app::Submission, StoreError> {
        Err(StoreError::Backend("disk gone".into()))
    }
    fn mark_disputed(&self, _: &QueryId, _: u64) -> Result<oraclegate_types::app::Submission, StoreError> {
        Err(StoreError::Backend("disk gone".into()))
    }
    fn mark_disputed_by(
        &self,
        _: &QueryId,
        _: &Address,
        _: u64,
    ) -> Result<oraclegate_types::app::Submission, StoreError> {
        Err(StoreError::Backend("disk gone".into()))
    }
    fn list_submissions(
        &self,
        _: &QueryId,
    ) -> Result<oraclegate_api::storage::SubmissionSnapshot, StoreError> {
        Err(StoreError::Backend("disk gone".into()))
    }
    fn record_query_payload(&self, _: &QueryId, _: &[u8]) -> Result<bool, StoreError> {
        Err(StoreError::Backend("disk gone".into()))
    }
    fn query_payload(&self, _: &QueryId) -> Result<Option<Vec<u8>>, StoreError> {
        Err(StoreError::Backend("disk gone".into()))
    }
}

#[tokio::test]
async fn storage_failure_is_not_unsatisfied() {
    let mut registry = ConditionRegistry::new();
    registry.register(flag_spec());
    let consumer = ConditionalConsumer::new(
        registry,
        Arc::new(BrokenStore),
        Arc::new(MemoryMarkerStore::default()),
        Duration::from_secs(1),
    );
    let err = consumer
        .evaluate_condition(KIND, &params(1), 100)
        .await
        .unwrap_err();
    match err {
        ConsumerError::Store(e) => assert!(e.is_transient()),
        other => panic!("expected store error, got {other:?}"),
    }
}

struct SlowMarkers {
    inner: MemoryMarkerStore,
    delay: Duration,
}

impl ActedMarkerStore for SlowMarkers {
    fn acted_at(&self, identifier: &QueryId) -> Result<Option<Timestamp>, StoreError> {
        std::thread::sleep(self.delay);
        self.inner.acted_at(identifier)
    }

    fn mark_acted(&self, identifier: &QueryId, at: Timestamp) -> Result<bool, StoreError> {
        self.inner.mark_acted(identifier, at)
    }
}

#[tokio::test]
async fn slow_marker_store_is_a_timeout_and_nothing_runs() {
    let store = Arc::new(MemoryValueStore::new(Arc::new(ManualClock::new(100))));
    let mut registry = ConditionRegistry::new();
    registry.register(flag_spec());
    let markers = SlowMarkers {
        inner: MemoryMarkerStore::default(),
        delay: Duration::from_millis(200),
    };
    let consumer = ConditionalConsumer::new(
        registry,
        store.clone(),
        Arc::new(markers),
        Duration::from_millis(20),
    );
    let (_, id) = consumer.identifier_for(KIND, &params(1)).unwrap();
    store.submit(id, flag_value(true), R1, 0).unwrap();

    let action = CountingAction::default();
    let err = consumer
        .act_once(KIND, &params(1), 110, &action)
        .await
        .unwrap_err();
    match err {
        ConsumerError::Store(e @ StoreError::Timeout { millis: 20 }) => assert!(e.is_transient()),
        other => panic!("expected marker timeout, got {other:?}"),
    }
    assert_eq!(action.runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn lock_entries_are_dropped_after_use() {
    let f = Arc::new(fixture());
    report(&f, 1, flag_value(true), 0);
    let action = Arc::new(CountingAction::default());

    f.consumer.act_once(KIND, &params(1), 110, action.as_ref()).await.unwrap();
    f.consumer.act_once(KIND, &params(2), 110, action.as_ref()).await.unwrap();
    assert!(f.consumer.locks.is_empty());

    let tasks: Vec<_> = (0..8u64)
        .map(|i| {
            let f = f.clone();
            let action = action.clone();
            tokio::spawn(async move {
                f.consumer
                    .act_once(KIND, &params(i % 3), 120, action.as_ref())
                    .await
                    .unwrap()
            })
        })
        .collect();
    for t in tasks {
        t.await.unwrap();
    }
    assert!(f.consumer.locks.is_empty());
    assert_eq!(action.runs.load(Ordering::SeqCst), 1);
}

struct StallingAction;

#[async_trait]
impl ReleaseAction for StallingAction {
    async fn execute(
        &self,
        _identifier: &QueryId,
        _value: &DecodedValue,
        _retrieved: &RetrievedValue,
    ) -> Result<(), ActionError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }
}

#[tokio::test]
async fn cancelled_call_leaves_no_lock_and_no_marker() {
    let f = fixture();
    let id = report(&f, 1, flag_value(true), 0);
    let stalled = tokio::time::timeout(
        Duration::from_millis(20),
        f.consumer.act_once(KIND, &params(1), 110, &StallingAction),
    )
    .await;
    assert!(stalled.is_err());
    assert!(f.consumer.locks.is_empty());
    assert_eq!(f.markers.acted_at(&id).unwrap(), None);

    let action = CountingAction::default();
    let report = f.consumer.act_once(KIND, &params(1), 120, &action).await.unwrap();
    assert_eq!(report, ActionReport::Executed { at: 120 });
}

#[test]
fn config_overrides_registered_bounds() {
    let mut registry = ConditionRegistry::new();
    registry.register(flag_spec());
    let cfg = OracleConfig::from_toml_str(
        "[retrieval]\nmax_age_secs = 10\n[storage]\nbackend = \"memory\"\n[[conditions]]\nkind = \"flag\"\nmax_age_secs = 999\n",
    )
    .unwrap();
    registry.apply_config(&cfg);
    assert_eq!(registry.get(KIND).unwrap().max_age, Duration::from_secs(999));
    assert_eq!(registry.kinds().collect::<Vec<_>>(), vec![KIND]);
    assert!(registry.register(flag_spec()).is_some());
}
