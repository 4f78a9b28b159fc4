//! Observability infrastructure for the performance suite
//!
//! Provides:
//! - Prometheus metrics (run lifecycle, sample ingestion, storage retries,
//!   evaluation and recommendation latency)
//! - Structured JSON logging of lifecycle events with tracing

use crate::models::{ContainerKey, Run, RunId, SlaVerdict};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for in-process computations (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<SuiteMetricsInner> = OnceLock::new();

struct SuiteMetricsInner {
    runs_started: IntCounter,
    runs_completed: IntCounterVec,
    runs_failed: IntCounter,
    active_run: IntGauge,
    samples_ingested: IntCounter,
    samples_rejected: IntCounterVec,
    utilization_samples: IntCounter,
    storage_retries: IntCounter,
    recommendations: IntGauge,
    evaluation_seconds: Histogram,
    recommendation_seconds: Histogram,
}

impl SuiteMetricsInner {
    fn new() -> Self {
        Self {
            runs_started: register_int_counter!(
                "perf_suite_runs_started_total",
                "Total number of performance-test runs started"
            )
            .expect("Failed to register runs_started"),

            runs_completed: register_int_counter_vec!(
                "perf_suite_runs_completed_total",
                "Total number of runs completed, by SLA verdict",
                &["verdict"]
            )
            .expect("Failed to register runs_completed"),

            runs_failed: register_int_counter!(
                "perf_suite_runs_failed_total",
                "Total number of runs that ended without a verdict"
            )
            .expect("Failed to register runs_failed"),

            active_run: register_int_gauge!(
                "perf_suite_active_run",
                "1 while a performance-test run is active"
            )
            .expect("Failed to register active_run"),

            samples_ingested: register_int_counter!(
                "perf_suite_samples_ingested_total",
                "Latency samples accepted for running runs"
            )
            .expect("Failed to register samples_ingested"),

            samples_rejected: register_int_counter_vec!(
                "perf_suite_samples_rejected_total",
                "Latency samples rejected, by error kind",
                &["kind"]
            )
            .expect("Failed to register samples_rejected"),

            utilization_samples: register_int_counter!(
                "perf_suite_utilization_samples_total",
                "Container utilization samples recorded"
            )
            .expect("Failed to register utilization_samples"),

            storage_retries: register_int_counter!(
                "perf_suite_storage_retries_total",
                "Sample store calls retried after StorageUnavailable"
            )
            .expect("Failed to register storage_retries"),

            recommendations: register_int_gauge!(
                "perf_suite_recommendations",
                "Containers covered by the most recent recommendation pass"
            )
            .expect("Failed to register recommendations"),

            evaluation_seconds: register_histogram!(
                "perf_suite_sla_evaluation_seconds",
                "Time spent evaluating a run's samples against the SLA",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register sla_evaluation_seconds"),

            recommendation_seconds: register_histogram!(
                "perf_suite_recommendation_seconds",
                "Time spent computing resource recommendations",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register recommendation_seconds"),
        }
    }
}

/// Suite metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct SuiteMetrics {
    _private: (),
}

impl Default for SuiteMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SuiteMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(SuiteMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &SuiteMetricsInner {
        GLOBAL_METRICS.get_or_init(SuiteMetricsInner::new)
    }

    pub fn inc_runs_started(&self) {
        self.inner().runs_started.inc();
        self.inner().active_run.set(1);
    }

    pub fn inc_runs_completed(&self, verdict: SlaVerdict) {
        self.inner()
            .runs_completed
            .with_label_values(&[verdict.as_str()])
            .inc();
        self.inner().active_run.set(0);
    }

    pub fn inc_runs_failed(&self) {
        self.inner().runs_failed.inc();
        self.inner().active_run.set(0);
    }

    pub fn inc_samples_ingested(&self) {
        self.inner().samples_ingested.inc();
    }

    pub fn inc_samples_rejected(&self, kind: &str) {
        self.inner()
            .samples_rejected
            .with_label_values(&[kind])
            .inc();
    }

    pub fn inc_utilization_samples(&self, count: u64) {
        self.inner().utilization_samples.inc_by(count);
    }

    pub fn inc_storage_retries(&self) {
        self.inner().storage_retries.inc();
    }

    pub fn set_recommendations(&self, count: i64) {
        self.inner().recommendations.set(count);
    }

    pub fn observe_evaluation_latency(&self, duration_secs: f64) {
        self.inner().evaluation_seconds.observe(duration_secs);
    }

    pub fn observe_recommendation_latency(&self, duration_secs: f64) {
        self.inner().recommendation_seconds.observe(duration_secs);
    }
}

/// Structured logger for run lifecycle and recommendation events
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_run_started(&self, run: &Run) {
        info!(
            event = "run_started",
            service = %self.service,
            run_id = %run.id,
            name = %run.name,
            target_users = run.target_users,
            requested_duration_secs = run.requested_duration.as_secs(),
            "Performance test started"
        );
    }

    /// Log a run reaching a terminal state
    pub fn log_run_finished(&self, run: &Run) {
        match run.sla_verdict {
            Some(verdict) => info!(
                event = "run_completed",
                service = %self.service,
                run_id = %run.id,
                name = %run.name,
                verdict = verdict.as_str(),
                p95_latency_ms = ?run.p95_latency_ms,
                failure_rate_percent = ?run.failure_rate_percent,
                "Performance test completed"
            ),
            None => warn!(
                event = "run_failed",
                service = %self.service,
                run_id = %run.id,
                name = %run.name,
                reason = ?run.failure_reason,
                "Performance test ended without a verdict"
            ),
        }
    }

    pub fn log_sample_rejected(&self, run_id: RunId, kind: &str) {
        warn!(
            event = "sample_rejected",
            service = %self.service,
            run_id = %run_id,
            kind = %kind,
            "Rejected latency sample"
        );
    }

    pub fn log_recommendations(&self, produced: usize, skipped: &[ContainerKey]) {
        info!(
            event = "recommendations_computed",
            service = %self.service,
            produced = produced,
            skipped = skipped.len(),
            "Computed resource recommendations"
        );
    }

    pub fn log_startup(&self, version: &str) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            "Performance suite backend started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Performance suite backend shutting down"
        );
    }
}
