//! Resource right-sizing recommendations
//!
//! For every container observed in the rolling window the engine takes the
//! p90 of CPU and memory usage, adds headroom, and applies a floor:
//!
//! ```text
//! suggested = max(round(p90 * headroom_factor), floor)
//! saving%   = clamp(100 * (current - suggested) / current, 0, 100)
//! ```
//!
//! Containers with fewer than `min_samples` observations are skipped rather
//! than reported with degenerate values. Output is a pure function of the
//! window contents and is emitted in key order.

use crate::error::{Result, SuiteError};
use crate::health::{components, HealthRegistry};
use crate::models::{ContainerKey, RecommendationSummary, ResourceRecommendation, UtilizationSample};
use crate::observability::{StructuredLogger, SuiteMetrics};
use crate::retry::RetryPolicy;
use crate::stats::{percentile, round_to};
use crate::store::SampleStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default headroom above observed p90 (20%)
pub const DEFAULT_HEADROOM_FACTOR: f64 = 1.2;

/// Default CPU floor in millicores (10m)
pub const DEFAULT_MIN_CPU_MILLICORES: u32 = 10;

/// Default memory floor in mebibytes
pub const DEFAULT_MIN_MEMORY_MEBIBYTES: u32 = 32;

/// Default minimum samples per container
pub const DEFAULT_MIN_SAMPLES: usize = 10;

/// Default rolling window (7 days)
pub const DEFAULT_WINDOW_SECS: u64 = 7 * 24 * 60 * 60;

/// Quantile of observed usage that recommendations are sized from
const USAGE_QUANTILE: f64 = 0.90;

/// Recommendation policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationPolicy {
    #[serde(default = "default_headroom_factor")]
    pub headroom_factor: f64,
    #[serde(default = "default_min_cpu_millicores")]
    pub min_cpu_millicores: u32,
    #[serde(default = "default_min_memory_mebibytes")]
    pub min_memory_mebibytes: u32,
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_headroom_factor() -> f64 {
    DEFAULT_HEADROOM_FACTOR
}

fn default_min_cpu_millicores() -> u32 {
    DEFAULT_MIN_CPU_MILLICORES
}

fn default_min_memory_mebibytes() -> u32 {
    DEFAULT_MIN_MEMORY_MEBIBYTES
}

fn default_min_samples() -> usize {
    DEFAULT_MIN_SAMPLES
}

fn default_window_secs() -> u64 {
    DEFAULT_WINDOW_SECS
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        Self {
            headroom_factor: DEFAULT_HEADROOM_FACTOR,
            min_cpu_millicores: DEFAULT_MIN_CPU_MILLICORES,
            min_memory_mebibytes: DEFAULT_MIN_MEMORY_MEBIBYTES,
            min_samples: DEFAULT_MIN_SAMPLES,
            window_secs: DEFAULT_WINDOW_SECS,
        }
    }
}

impl RecommendationPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.headroom_factor.is_nan() || self.headroom_factor < 1.0 {
            return Err(SuiteError::validation("headroom_factor must be at least 1.0"));
        }
        if self.min_samples == 0 {
            return Err(SuiteError::validation("min_samples must be at least 1"));
        }
        if self.window_secs == 0 {
            return Err(SuiteError::validation("window_secs must be positive"));
        }
        Ok(())
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Compute the recommendation for one container from its window samples
pub fn compute_recommendation(
    key: &ContainerKey,
    samples: &[UtilizationSample],
    policy: &RecommendationPolicy,
) -> Result<ResourceRecommendation> {
    if samples.len() < policy.min_samples {
        return Err(SuiteError::insufficient_data(format!(
            "{} has {} samples in the window, {} required",
            key,
            samples.len(),
            policy.min_samples
        )));
    }

    let cpu: Vec<f64> = samples.iter().map(|s| s.cpu_milli_used as f64).collect();
    let memory: Vec<f64> = samples.iter().map(|s| s.memory_mebi_used as f64).collect();
    let p90_cpu = percentile(&cpu, USAGE_QUANTILE).unwrap_or_default();
    let p90_memory = percentile(&memory, USAGE_QUANTILE).unwrap_or_default();

    let suggested_cpu = suggest(p90_cpu, policy.headroom_factor, policy.min_cpu_millicores);
    let suggested_memory = suggest(p90_memory, policy.headroom_factor, policy.min_memory_mebibytes);

    // Current allocation is whatever the newest observation reported
    let newest = samples
        .iter()
        .max_by_key(|s| (s.observed_at, s.cpu_milli_requested, s.memory_mebi_requested))
        .ok_or_else(|| SuiteError::insufficient_data(format!("{} has no samples", key)))?;
    let current_cpu = newest.cpu_milli_requested;
    let current_memory = newest.memory_mebi_requested;

    Ok(ResourceRecommendation {
        pod: key.pod.clone(),
        container: key.container.clone(),
        namespace: key.namespace.clone(),
        current_cpu,
        suggested_cpu,
        current_memory,
        suggested_memory,
        cpu_saving: current_cpu.saturating_sub(suggested_cpu),
        memory_saving: current_memory.saturating_sub(suggested_memory),
        cpu_saving_percent: saving_percent(current_cpu, suggested_cpu),
        memory_saving_percent: saving_percent(current_memory, suggested_memory),
        sample_count: samples.len(),
    })
}

fn suggest(p90: f64, headroom_factor: f64, floor: u32) -> u32 {
    let scaled = (p90 * headroom_factor).round();
    let scaled = if scaled >= u32::MAX as f64 {
        u32::MAX
    } else {
        scaled as u32
    };
    scaled.max(floor)
}

/// Saving relative to the current allocation, never negative
pub fn saving_percent(current: u32, suggested: u32) -> f64 {
    if current == 0 {
        return 0.0;
    }
    let raw = 100.0 * (current as f64 - suggested as f64) / current as f64;
    round_to(raw.clamp(0.0, 100.0), 1)
}

/// Aggregate over the containers that produced a recommendation
pub fn summarize(recommendations: &[ResourceRecommendation], skipped: usize) -> RecommendationSummary {
    let count = recommendations.len();
    let average = |values: Vec<f64>| -> f64 {
        if count == 0 {
            0.0
        } else {
            round_to(values.iter().sum::<f64>() / count as f64, 1)
        }
    };

    RecommendationSummary {
        containers: count,
        optimized_containers: recommendations
            .iter()
            .filter(|r| r.cpu_saving > 0 || r.memory_saving > 0)
            .count(),
        skipped_containers: skipped,
        average_cpu_saving_percent: average(
            recommendations.iter().map(|r| r.cpu_saving_percent).collect(),
        ),
        average_memory_saving_percent: average(
            recommendations.iter().map(|r| r.memory_saving_percent).collect(),
        ),
        total_current_cpu: recommendations.iter().map(|r| r.current_cpu as u64).sum(),
        total_suggested_cpu: recommendations.iter().map(|r| r.suggested_cpu as u64).sum(),
        total_current_memory: recommendations.iter().map(|r| r.current_memory as u64).sum(),
        total_suggested_memory: recommendations
            .iter()
            .map(|r| r.suggested_memory as u64)
            .sum(),
    }
}

/// Recommendations for every eligible container plus the keys that were skipped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationReport {
    pub recommendations: Vec<ResourceRecommendation>,
    pub skipped: Vec<ContainerKey>,
    pub summary: RecommendationSummary,
}

/// Computes recommendations on demand from the sample store
pub struct RecommendationEngine {
    store: Arc<dyn SampleStore>,
    policy: RecommendationPolicy,
    retry: RetryPolicy,
    metrics: SuiteMetrics,
    logger: StructuredLogger,
    health: Option<HealthRegistry>,
}

impl RecommendationEngine {
    pub fn new(store: Arc<dyn SampleStore>, policy: RecommendationPolicy, retry: RetryPolicy) -> Self {
        Self {
            store,
            policy,
            retry,
            metrics: SuiteMetrics::new(),
            logger: StructuredLogger::new("perf-suite"),
            health: None,
        }
    }

    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn policy(&self) -> &RecommendationPolicy {
        &self.policy
    }

    fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let window = chrono::Duration::from_std(self.policy.window())
            .unwrap_or_else(|_| chrono::Duration::days(7));
        now - window
    }

    /// Record a batch of utilization samples, all or nothing on validation
    pub async fn record_utilization(&self, samples: Vec<UtilizationSample>) -> Result<usize> {
        if let Some(bad) = samples
            .iter()
            .find(|s| s.pod_id.trim().is_empty() || s.container_name.trim().is_empty())
        {
            return Err(SuiteError::validation(format!(
                "utilization sample for namespace '{}' requires podId and containerName",
                bad.namespace
            )));
        }

        let count = samples.len();
        for sample in samples {
            let result = self
                .retry
                .run("append_utilization", &self.metrics, || {
                    self.store.append_utilization(sample.clone())
                })
                .await;
            self.record_storage(&result).await;
            result?;
        }
        self.metrics.inc_utilization_samples(count as u64);
        Ok(count)
    }

    /// Recommendation for a single container
    pub async fn recommend(&self, key: &ContainerKey) -> Result<ResourceRecommendation> {
        let since = self.window_start(Utc::now());
        let samples = self.window_samples(key, since).await?;
        compute_recommendation(key, &samples, &self.policy)
    }

    async fn window_samples(
        &self,
        key: &ContainerKey,
        since: DateTime<Utc>,
    ) -> Result<Vec<UtilizationSample>> {
        let result = self
            .retry
            .run("utilization_in_window", &self.metrics, || {
                self.store.utilization_in_window(key, since)
            })
            .await;
        self.record_storage(&result).await;
        result
    }

    async fn record_storage<T>(&self, result: &Result<T>) {
        if let Some(health) = &self.health {
            health.record_storage_result(result).await;
        }
    }

    /// Recommendations for every container in the window, optionally one namespace
    pub async fn recommend_all(&self, namespace: Option<&str>) -> Result<RecommendationReport> {
        self.recommend_all_at(Utc::now(), namespace).await
    }

    /// Same as [`recommend_all`](Self::recommend_all) with an explicit clock
    pub async fn recommend_all_at(
        &self,
        now: DateTime<Utc>,
        namespace: Option<&str>,
    ) -> Result<RecommendationReport> {
        let timer = Instant::now();
        let since = self.window_start(now);

        let keys = self
            .retry
            .run("container_keys", &self.metrics, || self.store.container_keys(since))
            .await;
        self.record_storage(&keys).await;
        let mut keys = keys?;
        keys.retain(|k| namespace.map_or(true, |ns| k.namespace == ns));
        keys.sort();

        let mut recommendations = Vec::with_capacity(keys.len());
        let mut skipped = Vec::new();
        for key in keys {
            let samples = self.window_samples(&key, since).await?;

            match compute_recommendation(&key, &samples, &self.policy) {
                Ok(rec) => recommendations.push(rec),
                Err(SuiteError::InsufficientData(reason)) => {
                    debug!(container = %key, reason = %reason, "Skipping container");
                    skipped.push(key);
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(health) = &self.health {
            health.set_healthy(components::RECOMMENDER).await;
        }

        let summary = summarize(&recommendations, skipped.len());
        self.metrics.set_recommendations(recommendations.len() as i64);
        self.metrics
            .observe_recommendation_latency(timer.elapsed().as_secs_f64());
        self.logger.log_recommendations(recommendations.len(), &skipped);

        Ok(RecommendationReport {
            recommendations,
            skipped,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::ComponentStatus;
    use crate::models::{LatencySample, RunId};
    use crate::store::{async_trait, InMemorySampleStore};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn sample(pod: &str, cpu_used: u32, mem_used: u32, cpu_req: u32, mem_req: u32) -> UtilizationSample {
        UtilizationSample {
            pod_id: pod.to_string(),
            namespace: "default".to_string(),
            container_name: "app".to_string(),
            cpu_milli_used: cpu_used,
            memory_mebi_used: mem_used,
            cpu_milli_requested: cpu_req,
            memory_mebi_requested: mem_req,
            observed_at: Utc::now(),
        }
    }

    fn key(pod: &str) -> ContainerKey {
        ContainerKey::new("default", pod, "app")
    }

    /// Ten samples whose p90 (rank index 8) is `p90`
    fn history(pod: &str, p90: u32, cpu_req: u32) -> Vec<UtilizationSample> {
        let mut samples: Vec<_> = (0..8)
            .map(|i| sample(pod, p90 / 2 + i, 100, cpu_req, 512))
            .collect();
        samples.push(sample(pod, p90, 200, cpu_req, 512));
        samples.push(sample(pod, p90 * 2, 220, cpu_req, 512));
        samples
    }

    #[test]
    fn test_cpu_scenario_from_p90() {
        let samples = history("api", 200, 500);
        let rec = compute_recommendation(&key("api"), &samples, &RecommendationPolicy::default()).unwrap();

        assert_eq!(rec.current_cpu, 500);
        assert_eq!(rec.suggested_cpu, 240);
        assert_eq!(rec.cpu_saving, 260);
        assert_eq!(rec.cpu_saving_percent, 52.0);
        // memory p90 is 200Mi, suggested 240Mi against 512Mi
        assert_eq!(rec.suggested_memory, 240);
        assert_eq!(rec.memory_saving_percent, 53.1);
    }

    #[test]
    fn test_too_few_samples_insufficient() {
        let samples: Vec<_> = (0..9).map(|_| sample("api", 100, 100, 500, 512)).collect();
        let err = compute_recommendation(&key("api"), &samples, &RecommendationPolicy::default())
            .unwrap_err();
        assert_eq!(err.kind(), "insufficient_data_error");
    }

    #[test]
    fn test_saving_never_negative() {
        // Usage above the current request: suggestion exceeds allocation
        let samples: Vec<_> = (0..10).map(|_| sample("hot", 900, 1000, 500, 512)).collect();
        let rec = compute_recommendation(&key("hot"), &samples, &RecommendationPolicy::default()).unwrap();

        assert_eq!(rec.suggested_cpu, 1080);
        assert_eq!(rec.cpu_saving_percent, 0.0);
        assert_eq!(rec.cpu_saving, 0);
        assert_eq!(rec.memory_saving_percent, 0.0);
    }

    #[test]
    fn test_floors_apply() {
        let samples: Vec<_> = (0..10).map(|_| sample("idle", 1, 2, 250, 256)).collect();
        let rec = compute_recommendation(&key("idle"), &samples, &RecommendationPolicy::default()).unwrap();

        assert_eq!(rec.suggested_cpu, DEFAULT_MIN_CPU_MILLICORES);
        assert_eq!(rec.suggested_memory, DEFAULT_MIN_MEMORY_MEBIBYTES);
        assert_eq!(rec.cpu_saving_percent, 96.0);
    }

    #[test]
    fn test_saving_percent_bounds() {
        let cases = [(0, 10), (1, 0), (100, 100), (100, 250), (u32::MAX, 1), (7, 3)];
        for (current, suggested) in cases {
            let pct = saving_percent(current, suggested);
            assert!((0.0..=100.0).contains(&pct), "{} -> {} gave {}", current, suggested, pct);
        }
    }

    #[test]
    fn test_generated_histories_stay_in_bounds() {
        let policy = RecommendationPolicy::default();
        let mut rng = StdRng::seed_from_u64(42);

        for round in 0..500 {
            // Requests at zero, under the floors, or ordinary
            let cpu_req = match round % 4 {
                0 => 0,
                1 => rng.gen_range(1..DEFAULT_MIN_CPU_MILLICORES),
                _ => rng.gen_range(1..=4000),
            };
            let mem_req = match round % 3 {
                0 => 0,
                1 => rng.gen_range(1..DEFAULT_MIN_MEMORY_MEBIBYTES),
                _ => rng.gen_range(1..=8192),
            };
            // Usage below, at, or above the request
            let cpu_ceiling = cpu_req.max(1) * rng.gen_range(1..=3);
            let mem_ceiling = mem_req.max(1) * rng.gen_range(1..=3);

            let n = rng.gen_range(policy.min_samples..=60);
            let samples: Vec<_> = (0..n)
                .map(|_| {
                    sample(
                        "gen",
                        rng.gen_range(0..=cpu_ceiling),
                        rng.gen_range(0..=mem_ceiling),
                        cpu_req,
                        mem_req,
                    )
                })
                .collect();

            let rec = compute_recommendation(&key("gen"), &samples, &policy).unwrap();
            assert!(
                (0.0..=100.0).contains(&rec.cpu_saving_percent),
                "cpu {} -> {} gave {}",
                rec.current_cpu,
                rec.suggested_cpu,
                rec.cpu_saving_percent
            );
            assert!(
                (0.0..=100.0).contains(&rec.memory_saving_percent),
                "memory {} -> {} gave {}",
                rec.current_memory,
                rec.suggested_memory,
                rec.memory_saving_percent
            );
            assert!(rec.suggested_cpu >= DEFAULT_MIN_CPU_MILLICORES);
            assert!(rec.suggested_memory >= DEFAULT_MIN_MEMORY_MEBIBYTES);
            if rec.current_cpu == 0 {
                assert_eq!(rec.cpu_saving_percent, 0.0);
            }
        }
    }

    #[test]
    fn test_current_taken_from_newest_sample() {
        let mut samples = history("api", 200, 500);
        let mut newest = sample("api", 150, 100, 400, 384);
        newest.observed_at = Utc::now() + chrono::Duration::seconds(5);
        samples.insert(0, newest);

        let rec = compute_recommendation(&key("api"), &samples, &RecommendationPolicy::default()).unwrap();
        assert_eq!(rec.current_cpu, 400);
        assert_eq!(rec.current_memory, 384);
    }

    #[test]
    fn test_recompute_is_deterministic() {
        let samples = history("api", 300, 800);
        let mut reversed = samples.clone();
        reversed.reverse();
        let policy = RecommendationPolicy::default();

        let a = compute_recommendation(&key("api"), &samples, &policy).unwrap();
        let b = compute_recommendation(&key("api"), &reversed, &policy).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_summary_is_unweighted_mean() {
        let policy = RecommendationPolicy::default();
        let a = compute_recommendation(&key("a"), &history("a", 200, 500), &policy).unwrap();
        let b = compute_recommendation(&key("b"), &vec![sample("b", 900, 1000, 500, 512); 10], &policy)
            .unwrap();

        let summary = summarize(&[a, b], 3);
        assert_eq!(summary.containers, 2);
        assert_eq!(summary.optimized_containers, 1);
        assert_eq!(summary.skipped_containers, 3);
        assert_eq!(summary.average_cpu_saving_percent, 26.0);
        assert_eq!(summary.total_current_cpu, 1000);
        assert_eq!(summary.total_suggested_cpu, 240 + 1080);
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(&[], 0);
        assert_eq!(summary, RecommendationSummary::default());
    }

    #[test]
    fn test_policy_validation() {
        assert!(RecommendationPolicy::default().validate().is_ok());
        let low = RecommendationPolicy {
            headroom_factor: 0.8,
            ..Default::default()
        };
        assert!(low.validate().is_err());
    }

    #[tokio::test]
    async fn test_engine_skips_sparse_containers() {
        let store = Arc::new(InMemorySampleStore::default());
        for s in history("api", 200, 500) {
            store.append_utilization(s).await.unwrap();
        }
        for _ in 0..3 {
            store.append_utilization(sample("sparse", 50, 50, 100, 128)).await.unwrap();
        }

        let engine = RecommendationEngine::new(store, RecommendationPolicy::default(), RetryPolicy::none());
        let report = engine.recommend_all(None).await.unwrap();

        assert_eq!(report.recommendations.len(), 1);
        assert_eq!(report.recommendations[0].pod, "api");
        assert_eq!(report.skipped, vec![key("sparse")]);
        assert_eq!(report.summary.average_cpu_saving_percent, 52.0);

        let err = engine.recommend(&key("sparse")).await.unwrap_err();
        assert_eq!(err.kind(), "insufficient_data_error");
    }

    #[tokio::test]
    async fn test_record_utilization_rejects_whole_batch() {
        let store = Arc::new(InMemorySampleStore::default());
        let engine = RecommendationEngine::new(
            store.clone(),
            RecommendationPolicy::default(),
            RetryPolicy::none(),
        );

        let mut bad = sample("api", 10, 10, 100, 128);
        bad.container_name = String::new();
        let err = engine
            .record_utilization(vec![sample("api", 10, 10, 100, 128), bad])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
        assert_eq!(store.stats().utilization_samples, 0);

        let recorded = engine
            .record_utilization(history("api", 100, 400))
            .await
            .unwrap();
        assert_eq!(recorded, 10);
        assert_eq!(store.stats().utilization_samples, 10);
    }

    #[tokio::test]
    async fn test_engine_namespace_filter_and_order() {
        let store = Arc::new(InMemorySampleStore::default());
        for pod in ["web", "api"] {
            for s in history(pod, 100, 400) {
                store.append_utilization(s).await.unwrap();
            }
        }
        let mut other = history("db", 100, 400);
        for s in other.iter_mut() {
            s.namespace = "data".to_string();
        }
        for s in other {
            store.append_utilization(s).await.unwrap();
        }

        let engine = RecommendationEngine::new(store, RecommendationPolicy::default(), RetryPolicy::none());
        let all = engine.recommend_all(None).await.unwrap();
        let pods: Vec<_> = all.recommendations.iter().map(|r| r.pod.as_str()).collect();
        assert_eq!(pods, vec!["db", "api", "web"]);

        let scoped = engine.recommend_all(Some("default")).await.unwrap();
        assert_eq!(scoped.recommendations.len(), 2);
        assert_eq!(engine.recommend_all(None).await.unwrap(), all);
    }

    /// Store whose window reads always fail
    struct UnavailableWindowStore {
        inner: InMemorySampleStore,
    }

    #[async_trait]
    impl SampleStore for UnavailableWindowStore {
        async fn append_latency(&self, run_id: RunId, sample: LatencySample) -> Result<()> {
            self.inner.append_latency(run_id, sample).await
        }

        async fn latency_samples(&self, run_id: RunId) -> Result<Vec<LatencySample>> {
            self.inner.latency_samples(run_id).await
        }

        async fn append_utilization(&self, sample: UtilizationSample) -> Result<()> {
            self.inner.append_utilization(sample).await
        }

        async fn utilization_in_window(
            &self,
            _key: &ContainerKey,
            _since: DateTime<Utc>,
        ) -> Result<Vec<UtilizationSample>> {
            Err(SuiteError::storage("time-series store timeout"))
        }

        async fn container_keys(&self, since: DateTime<Utc>) -> Result<Vec<ContainerKey>> {
            self.inner.container_keys(since).await
        }
    }

    #[tokio::test]
    async fn test_window_read_failure_degrades_store() {
        let health = HealthRegistry::new();
        health.register_all().await;

        let store = Arc::new(UnavailableWindowStore {
            inner: InMemorySampleStore::default(),
        });
        let engine = RecommendationEngine::new(
            store,
            RecommendationPolicy::default(),
            RetryPolicy {
                max_attempts: 2,
                initial_backoff_ms: 1,
                max_backoff_ms: 2,
            },
        )
        .with_health(health.clone());
        engine.record_utilization(history("api", 200, 500)).await.unwrap();

        let err = engine.recommend_all(None).await.unwrap_err();
        assert_eq!(err.kind(), "storage_unavailable_error");
        let report = health.health().await;
        assert_eq!(report.status, ComponentStatus::Degraded);
        assert_eq!(
            report.components[components::SAMPLE_STORE].status,
            ComponentStatus::Degraded
        );

        health.set_healthy(components::SAMPLE_STORE).await;
        let err = engine.recommend(&key("api")).await.unwrap_err();
        assert_eq!(err.kind(), "storage_unavailable_error");
        assert_eq!(health.health().await.status, ComponentStatus::Degraded);
    }
}
