// Path: crates/telemetry/src/prometheus.rs
//! A concrete implementation of the metrics sinks using the Prometheus crate.

use crate::sinks::*;
use once_cell::sync::OnceCell;
use prometheus::{
    exponential_buckets, register_histogram, register_int_counter, register_int_counter_vec,
    Encoder, Histogram, IntCounter, IntCounterVec, TextEncoder,
};

// --- Metric Statics ---
// Collectors are held in OnceCells and initialized exactly once by `install`.

static STORAGE_SUBMISSIONS_ACCEPTED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static STORAGE_SUBMISSIONS_REJECTED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static STORAGE_DISPUTES_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static STORAGE_BYTES_WRITTEN_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static STORAGE_WRITE_DURATION_SECONDS: OnceCell<Histogram> = OnceCell::new();
static RETRIEVAL_LOOKUPS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static RETRIEVAL_SKIPPED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static RETRIEVAL_LOOKUP_DURATION_SECONDS: OnceCell<Histogram> = OnceCell::new();
static CONSUMER_EVALUATIONS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static CONSUMER_ACTIONS_EXECUTED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

#[derive(Debug, Clone, Copy)]
pub struct PrometheusSink;

/// Fetches a collector, skipping the observation if `install()` has not run.
macro_rules! get_metric {
    ($metric:ident) => {
        match $metric.get() {
            Some(m) => m,
            None => return,
        }
    };
}

impl StorageMetricsSink for PrometheusSink {
    fn inc_submissions_accepted(&self) {
        get_metric!(STORAGE_SUBMISSIONS_ACCEPTED_TOTAL).inc();
    }
    fn inc_submissions_rejected(&self, reason: &'static str) {
        get_metric!(STORAGE_SUBMISSIONS_REJECTED_TOTAL)
            .with_label_values(&[reason])
            .inc();
    }
    fn inc_disputes(&self) {
        get_metric!(STORAGE_DISPUTES_TOTAL).inc();
    }
    fn inc_bytes_written_total(&self, bytes: u64) {
        get_metric!(STORAGE_BYTES_WRITTEN_TOTAL).inc_by(bytes);
    }
    fn observe_write_duration(&self, duration_secs: f64) {
        get_metric!(STORAGE_WRITE_DURATION_SECONDS).observe(duration_secs);
    }
}

impl RetrievalMetricsSink for PrometheusSink {
    fn inc_lookups(&self, outcome: &'static str) {
        get_metric!(RETRIEVAL_LOOKUPS_TOTAL)
            .with_label_values(&[outcome])
            .inc();
    }
    fn inc_skipped(&self, reason: &'static str, count: u64) {
        get_metric!(RETRIEVAL_SKIPPED_TOTAL)
            .with_label_values(&[reason])
            .inc_by(count);
    }
    fn observe_lookup_duration(&self, duration_secs: f64) {
        get_metric!(RETRIEVAL_LOOKUP_DURATION_SECONDS).observe(duration_secs);
    }
}

impl ConsumerMetricsSink for PrometheusSink {
    fn inc_evaluations(&self, kind: &str, outcome: &'static str) {
        get_metric!(CONSUMER_EVALUATIONS_TOTAL)
            .with_label_values(&[kind, outcome])
            .inc();
    }
    fn inc_actions_executed(&self, kind: &str) {
        get_metric!(CONSUMER_ACTIONS_EXECUTED_TOTAL)
            .with_label_values(&[kind])
            .inc();
    }
}

impl ErrorMetricsSink for PrometheusSink {
    fn inc_error(&self, kind: &'static str, variant: &'static str) {
        get_metric!(ERRORS_TOTAL)
            .with_label_values(&[kind, variant])
            .inc();
    }
}

fn already_registered<T>(_: T) -> prometheus::Error {
    prometheus::Error::AlreadyReg
}

/// Initializes all Prometheus metrics collectors and returns a static reference to the sink.
/// This function must be called only once at application startup.
///
/// The concrete type is returned so callers can hand it to every sink slot
/// (`sinks::SINK` and the storage crate's own) without upcasting.
pub fn install() -> Result<&'static PrometheusSink, prometheus::Error> {
    STORAGE_SUBMISSIONS_ACCEPTED_TOTAL
        .set(register_int_counter!(
            "oraclegate_storage_submissions_accepted_total",
            "Total submissions appended to the value store."
        )?)
        .map_err(already_registered)?;
    STORAGE_SUBMISSIONS_REJECTED_TOTAL
        .set(register_int_counter_vec!(
            "oraclegate_storage_submissions_rejected_total",
            "Total submissions rejected by the value store.",
            &["reason"]
        )?)
        .map_err(already_registered)?;
    STORAGE_DISPUTES_TOTAL
        .set(register_int_counter!(
            "oraclegate_storage_disputes_total",
            "Total submissions newly marked disputed."
        )?)
        .map_err(already_registered)?;
    STORAGE_BYTES_WRITTEN_TOTAL
        .set(register_int_counter!(
            "oraclegate_storage_bytes_written_total",
            "Total value bytes written to the store."
        )?)
        .map_err(already_registered)?;
    STORAGE_WRITE_DURATION_SECONDS
        .set(register_histogram!(
            "oraclegate_storage_write_duration_seconds",
            "Latency of a single store write transaction.",
            exponential_buckets(0.0001, 2.0, 16)?
        )?)
        .map_err(already_registered)?;
    RETRIEVAL_LOOKUPS_TOTAL
        .set(register_int_counter_vec!(
            "oraclegate_retrieval_lookups_total",
            "Total latest-valid lookups, by outcome.",
            &["outcome"]
        )?)
        .map_err(already_registered)?;
    RETRIEVAL_SKIPPED_TOTAL
        .set(register_int_counter_vec!(
            "oraclegate_retrieval_skipped_total",
            "Submissions skipped during retrieval scans, by reason.",
            &["reason"]
        )?)
        .map_err(already_registered)?;
    RETRIEVAL_LOOKUP_DURATION_SECONDS
        .set(register_histogram!(
            "oraclegate_retrieval_lookup_duration_seconds",
            "Latency of latest-valid lookups including the storage read.",
            exponential_buckets(0.0001, 2.0, 16)?
        )?)
        .map_err(already_registered)?;
    CONSUMER_EVALUATIONS_TOTAL
        .set(register_int_counter_vec!(
            "oraclegate_consumer_evaluations_total",
            "Total condition evaluations, by kind and outcome.",
            &["kind", "outcome"]
        )?)
        .map_err(already_registered)?;
    CONSUMER_ACTIONS_EXECUTED_TOTAL
        .set(register_int_counter_vec!(
            "oraclegate_consumer_actions_executed_total",
            "Total dependent actions executed, by kind.",
            &["kind"]
        )?)
        .map_err(already_registered)?;
    ERRORS_TOTAL
        .set(register_int_counter_vec!(
            "oraclegate_errors_total",
            "Total number of errors, categorized by type and variant.",
            &["kind", "variant"]
        )?)
        .map_err(already_registered)?;

    static SINK: PrometheusSink = PrometheusSink;
    Ok(&SINK)
}

/// Renders every registered metric in the Prometheus text exposition format.
pub fn render() -> Result<String, prometheus::Error> {
    let mut buf = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buf)?;
    String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
