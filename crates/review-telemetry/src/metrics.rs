//! Prometheus metrics for Review-Chain components.
//!
//! All metrics follow the naming convention: `rc_<component>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // WORKFLOW METRICS
    // =========================================================================

    /// Committed transitions by event name
    pub static ref WORKFLOW_TRANSITIONS: CounterVec = CounterVec::new(
        Opts::new("rc_workflow_transitions_total", "Committed workflow transitions"),
        &["event"]
    ).expect("metric creation failed");

    /// Rejected operations by operation and error kind
    pub static ref WORKFLOW_REJECTIONS: CounterVec = CounterVec::new(
        Opts::new("rc_workflow_rejections_total", "Rejected workflow operations"),
        &["operation", "kind"]
    ).expect("metric creation failed");

    // =========================================================================
    // AUDIT METRICS
    // =========================================================================

    /// Audit records persisted
    pub static ref AUDIT_RECORDS_WRITTEN: Counter = Counter::new(
        "rc_audit_records_written_total",
        "Audit records written to the store"
    ).expect("metric creation failed");

    /// Deliveries the store recognized as duplicates
    pub static ref AUDIT_DUPLICATES: Counter = Counter::new(
        "rc_audit_duplicates_total",
        "Audit writes skipped as duplicates"
    ).expect("metric creation failed");

    /// Failed write attempts that were retried
    pub static ref AUDIT_WRITE_RETRIES: Counter = Counter::new(
        "rc_audit_write_retries_total",
        "Audit write attempts retried after a failure"
    ).expect("metric creation failed");

    /// Envelopes abandoned after exhausting retries
    pub static ref AUDIT_DEAD_LETTERS: Counter = Counter::new(
        "rc_audit_dead_letters_total",
        "Audit envelopes moved to the dead-letter list"
    ).expect("metric creation failed");

    /// Store write latency
    pub static ref AUDIT_WRITE_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "rc_audit_write_duration_seconds",
            "Time spent writing one audit record"
        ).buckets(exponential_buckets(0.0001, 2.0, 14).expect("valid buckets"))
    ).expect("metric creation failed");
}

/// Handle for the metrics registry
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(WORKFLOW_TRANSITIONS.clone()),
        Box::new(WORKFLOW_REJECTIONS.clone()),
        Box::new(AUDIT_RECORDS_WRITTEN.clone()),
        Box::new(AUDIT_DUPLICATES.clone()),
        Box::new(AUDIT_WRITE_RETRIES.clone()),
        Box::new(AUDIT_DEAD_LETTERS.clone()),
        Box::new(AUDIT_WRITE_DURATION.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

// =============================================================================
// RECORDING FUNCTIONS
// =============================================================================

pub fn record_transition(event: &str) {
    WORKFLOW_TRANSITIONS.with_label_values(&[event]).inc();
}

pub fn record_rejection(operation: &str, kind: &str) {
    WORKFLOW_REJECTIONS.with_label_values(&[operation, kind]).inc();
}

/// Record one successful write and how long it took.
pub fn record_audit_written(seconds: f64) {
    AUDIT_RECORDS_WRITTEN.inc();
    AUDIT_WRITE_DURATION.observe(seconds);
}

pub fn record_audit_duplicate() {
    AUDIT_DUPLICATES.inc();
}

pub fn record_audit_retry() {
    AUDIT_WRITE_RETRIES.inc();
}

pub fn record_audit_dead_letter() {
    AUDIT_DEAD_LETTERS.inc();
}
