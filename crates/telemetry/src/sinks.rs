// Path: crates/telemetry/src/sinks.rs
//! Defines abstract traits for metrics reporting, decoupling core logic from the backend.

use once_cell::sync::OnceCell;

// --- Static Sink Access ---

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the global `MetricsSink` implementation.
pub static SINK: OnceCell<&'static dyn MetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns a static reference to the configured error metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn error_metrics() -> &'static dyn ErrorMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured retrieval metrics sink.
pub fn retrieval_metrics() -> &'static dyn RetrievalMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured consumer metrics sink.
pub fn consumer_metrics() -> &'static dyn ConsumerMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

// --- Trait Definitions ---

/// A sink for metrics related to the value store.
pub trait StorageMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter of accepted submissions.
    fn inc_submissions_accepted(&self);
    /// Increments the counter of rejected submissions, labeled by reason.
    fn inc_submissions_rejected(&self, reason: &'static str);
    /// Increments the counter of submissions newly marked disputed.
    fn inc_disputes(&self);
    /// Increments the total number of value bytes written.
    fn inc_bytes_written_total(&self, bytes: u64);
    /// Observes the latency of a single write transaction.
    fn observe_write_duration(&self, duration_secs: f64);
}
impl StorageMetricsSink for NopSink {
    fn inc_submissions_accepted(&self) {}
    fn inc_submissions_rejected(&self, _reason: &'static str) {}
    fn inc_disputes(&self) {}
    fn inc_bytes_written_total(&self, _bytes: u64) {}
    fn observe_write_duration(&self, _duration_secs: f64) {}
}

/// A sink for metrics related to latest-valid retrieval.
pub trait RetrievalMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter of lookups, labeled by outcome (`found`, `none`, `error`).
    fn inc_lookups(&self, outcome: &'static str);
    /// Increments the counter of records skipped during a scan, labeled by reason.
    fn inc_skipped(&self, reason: &'static str, count: u64);
    /// Observes the latency of a retrieval including the storage read.
    fn observe_lookup_duration(&self, duration_secs: f64);
}
impl RetrievalMetricsSink for NopSink {
    fn inc_lookups(&self, _outcome: &'static str) {}
    fn inc_skipped(&self, _reason: &'static str, _count: u64) {}
    fn observe_lookup_duration(&self, _duration_secs: f64) {}
}

/// A sink for metrics related to conditional consumers.
pub trait ConsumerMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter of condition evaluations, labeled by kind and outcome.
    fn inc_evaluations(&self, kind: &str, outcome: &'static str);
    /// Increments a counter of dependent actions executed, labeled by kind.
    fn inc_actions_executed(&self, kind: &str);
}
impl ConsumerMetricsSink for NopSink {
    fn inc_evaluations(&self, _kind: &str, _outcome: &'static str) {}
    fn inc_actions_executed(&self, _kind: &str) {}
}

/// A sink for recording structured error metrics.
pub trait ErrorMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for a specific error, categorized by its kind and variant.
    fn inc_error(&self, kind: &'static str, variant: &'static str);
}
impl ErrorMetricsSink for NopSink {
    fn inc_error(&self, _kind: &'static str, _variant: &'static str) {}
}

/// A unified sink that implements all domain-specific traits, providing a single
/// point of implementation for metrics backends like Prometheus.
pub trait MetricsSink:
    StorageMetricsSink + RetrievalMetricsSink + ConsumerMetricsSink + ErrorMetricsSink
{
}

// Blanket implementation to allow any type that implements all sub-traits
// to be used as a `MetricsSink`.
impl<T> MetricsSink for T where
    T: StorageMetricsSink + RetrievalMetricsSink + ConsumerMetricsSink + ErrorMetricsSink
{
}
