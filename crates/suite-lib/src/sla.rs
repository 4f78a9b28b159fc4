//! SLA evaluation of a completed run's latency/error samples
//!
//! Pure and deterministic: the verdict depends only on the multiset of
//! samples, never on their ingestion order.

use crate::error::{Result, SuiteError};
use crate::models::{LatencySample, RunResults, SlaVerdict};
use crate::stats::{mean, percentile_sorted, sorted_copy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default p95 latency ceiling in milliseconds
pub const DEFAULT_MAX_P95_LATENCY_MS: f64 = 50.0;

/// Default failure-rate ceiling in percent
pub const DEFAULT_MAX_FAILURE_RATE_PERCENT: f64 = 1.0;

/// Per-environment SLA thresholds; both bounds are inclusive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaPolicy {
    #[serde(default = "default_max_p95_latency_ms")]
    pub max_p95_latency_ms: f64,
    #[serde(default = "default_max_failure_rate_percent")]
    pub max_failure_rate_percent: f64,
}

fn default_max_p95_latency_ms() -> f64 {
    DEFAULT_MAX_P95_LATENCY_MS
}

fn default_max_failure_rate_percent() -> f64 {
    DEFAULT_MAX_FAILURE_RATE_PERCENT
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self {
            max_p95_latency_ms: DEFAULT_MAX_P95_LATENCY_MS,
            max_failure_rate_percent: DEFAULT_MAX_FAILURE_RATE_PERCENT,
        }
    }
}

impl SlaPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.max_p95_latency_ms.is_nan() || self.max_p95_latency_ms <= 0.0 {
            return Err(SuiteError::validation("max_p95_latency_ms must be positive"));
        }
        if !(0.0..=100.0).contains(&self.max_failure_rate_percent) {
            return Err(SuiteError::validation(
                "max_failure_rate_percent must be within [0, 100]",
            ));
        }
        Ok(())
    }
}

/// Outcome of evaluating a run's samples
#[derive(Debug, Clone, PartialEq)]
pub struct SlaEvaluation {
    pub p95_latency_ms: f64,
    pub failure_rate_percent: f64,
    pub verdict: SlaVerdict,
    pub results: RunResults,
}

/// Stateless evaluator bound to one policy
#[derive(Debug, Clone, Default)]
pub struct SlaEvaluator {
    policy: SlaPolicy,
}

impl SlaEvaluator {
    pub fn new(policy: SlaPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SlaPolicy {
        &self.policy
    }

    /// Evaluate a sample set collected over `elapsed`
    ///
    /// Fails with `InsufficientData` when no samples were recorded.
    pub fn evaluate(&self, samples: &[LatencySample], elapsed: Duration) -> Result<SlaEvaluation> {
        let total = samples.len();
        if total == 0 {
            return Err(SuiteError::insufficient_data(
                "run recorded no latency samples",
            ));
        }

        let failed = samples.iter().filter(|s| !s.success).count();
        let latencies: Vec<f64> = samples.iter().map(|s| s.latency_ms).collect();
        let sorted = sorted_copy(&latencies);

        // Non-empty, so every order statistic exists
        let p95 = percentile_sorted(&sorted, 0.95).unwrap_or_default();
        let median = percentile_sorted(&sorted, 0.50).unwrap_or_default();
        let failure_rate = 100.0 * failed as f64 / total as f64;

        let verdict = if p95 <= self.policy.max_p95_latency_ms
            && failure_rate <= self.policy.max_failure_rate_percent
        {
            SlaVerdict::Pass
        } else {
            SlaVerdict::Fail
        };

        let elapsed_secs = elapsed.as_secs_f64();
        let throughput = if elapsed_secs > 0.0 {
            total as f64 / elapsed_secs
        } else {
            0.0
        };

        Ok(SlaEvaluation {
            p95_latency_ms: p95,
            failure_rate_percent: failure_rate,
            verdict,
            results: RunResults {
                total_requests: total as u64,
                failed_requests: failed as u64,
                min_latency_ms: sorted[0],
                max_latency_ms: sorted[total - 1],
                median_latency_ms: median,
                average_latency_ms: mean(&sorted).unwrap_or_default(),
                throughput_rps: throughput,
            },
        })
    }
}
