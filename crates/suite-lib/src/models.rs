//! Core data models for the performance suite

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Opaque unique identifier of a performance-test run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a run id from its string form
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle state of a run
///
/// `Pending` is never observable: `start_run` admits a run directly into `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completing,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completing => "completing",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal SLA verdict of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SlaVerdict {
    Pass,
    Fail,
}

impl SlaVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlaVerdict::Pass => "PASS",
            SlaVerdict::Fail => "FAIL",
        }
    }
}

/// Parameters accepted by `start_run`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub name: String,
    #[serde(alias = "targetUsers")]
    pub users: i64,
    /// Human readable span such as `5m` or `90s`
    pub duration: String,
}

/// One performance-test execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub id: RunId,
    pub name: String,
    pub target_users: u32,
    #[serde(with = "humantime_serde")]
    pub requested_duration: Duration,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p95_latency_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_rate_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sla_verdict: Option<SlaVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<RunResults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// Detailed figures computed when a run completes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResults {
    pub total_requests: u64,
    pub failed_requests: u64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    pub median_latency_ms: f64,
    pub average_latency_ms: f64,
    pub throughput_rps: f64,
}

/// One latency/error observation recorded for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencySample {
    pub latency_ms: f64,
    pub success: bool,
    pub recorded_at: DateTime<Utc>,
}

impl LatencySample {
    pub fn new(latency_ms: f64, success: bool) -> Self {
        Self {
            latency_ms,
            success,
            recorded_at: Utc::now(),
        }
    }
}

/// Identity of a container whose utilization is tracked
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerKey {
    pub namespace: String,
    pub pod: String,
    pub container: String,
}

impl ContainerKey {
    pub fn new(
        namespace: impl Into<String>,
        pod: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            pod: pod.into(),
            container: container.into(),
        }
    }
}

impl fmt::Display for ContainerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.pod, self.container)
    }
}

/// One observation of a container's actual CPU/memory consumption
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilizationSample {
    pub pod_id: String,
    pub namespace: String,
    pub container_name: String,
    pub cpu_milli_used: u32,
    pub memory_mebi_used: u32,
    /// CPU request configured for the container when observed
    pub cpu_milli_requested: u32,
    /// Memory request configured for the container when observed
    pub memory_mebi_requested: u32,
    pub observed_at: DateTime<Utc>,
}

impl UtilizationSample {
    pub fn key(&self) -> ContainerKey {
        ContainerKey::new(&self.namespace, &self.pod_id, &self.container_name)
    }
}

/// Suggested resource request for one container, recomputed on demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecommendation {
    pub pod: String,
    pub container: String,
    pub namespace: String,
    pub current_cpu: u32,
    pub suggested_cpu: u32,
    pub current_memory: u32,
    pub suggested_memory: u32,
    pub cpu_saving: u32,
    pub memory_saving: u32,
    pub cpu_saving_percent: f64,
    pub memory_saving_percent: f64,
    pub sample_count: usize,
}

/// Aggregate over every container that produced a recommendation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSummary {
    pub containers: usize,
    pub optimized_containers: usize,
    pub skipped_containers: usize,
    pub average_cpu_saving_percent: f64,
    pub average_memory_saving_percent: f64,
    pub total_current_cpu: u64,
    pub total_suggested_cpu: u64,
    pub total_current_memory: u64,
    pub total_suggested_memory: u64,
}

/// Serde adapter for `Duration` using humantime notation (`5m`, `1h 30m`)
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
