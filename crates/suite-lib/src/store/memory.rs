//! In-process sample store
//!
//! - Sharded maps so concurrent appends for different runs or containers
//!   rarely contend
//! - Per-container ring buffers with FIFO eviction by age and size
//! - Optional JSON persistence of utilization history

use super::{async_trait, SampleStore};
use crate::error::{Result, SuiteError};
use crate::models::{ContainerKey, LatencySample, RunId, UtilizationSample};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default utilization retention (7 days)
const DEFAULT_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default cap on samples kept per container
const DEFAULT_MAX_SAMPLES: usize = 100_000;

/// Configuration for the in-memory store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// How long utilization samples are retained
    pub retention: Duration,
    /// Maximum number of utilization samples per container
    pub max_samples_per_container: usize,
    /// Path for persisting utilization history (optional)
    pub persistence_path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION,
            max_samples_per_container: DEFAULT_MAX_SAMPLES,
            persistence_path: None,
        }
    }
}

/// Sample store held entirely in process memory
pub struct InMemorySampleStore {
    latency: DashMap<RunId, Vec<LatencySample>>,
    utilization: DashMap<ContainerKey, VecDeque<UtilizationSample>>,
    config: StoreConfig,
    dirty: AtomicBool,
}

impl Default for InMemorySampleStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl InMemorySampleStore {
    /// A per-container capacity of zero is raised to one
    pub fn new(mut config: StoreConfig) -> Self {
        config.max_samples_per_container = config.max_samples_per_container.max(1);
        Self {
            latency: DashMap::new(),
            utilization: DashMap::new(),
            config,
            dirty: AtomicBool::new(false),
        }
    }

    /// Create a store and load any utilization history persisted at the configured path
    pub fn with_persistence(config: StoreConfig) -> Result<Self> {
        let store = Self::new(config);

        if let Some(path) = store.config.persistence_path.clone() {
            if path.exists() {
                if let Err(e) = store.load_from_disk(&path) {
                    warn!(error = %e, path = %path.display(), "Failed to load persisted samples, starting fresh");
                }
            }
        }

        Ok(store)
    }

    fn retention_cutoff(&self) -> DateTime<Utc> {
        let retention = chrono::Duration::from_std(self.config.retention)
            .unwrap_or_else(|_| chrono::Duration::days(7));
        Utc::now() - retention
    }

    /// Returns false when the sample is already outside the retention window
    fn push_utilization(&self, sample: UtilizationSample, cutoff: DateTime<Utc>) -> bool {
        if sample.observed_at < cutoff {
            return false;
        }
        let mut entry = self.utilization.entry(sample.key()).or_default();
        let samples = entry.value_mut();

        while samples.len() >= self.config.max_samples_per_container {
            samples.pop_front();
        }
        samples.push_back(sample);

        while let Some(front) = samples.front() {
            if front.observed_at < cutoff {
                samples.pop_front();
            } else {
                break;
            }
        }
        true
    }

    /// Drop utilization samples older than the retention window
    pub fn evict_expired(&self) -> usize {
        let cutoff = self.retention_cutoff();
        let mut evicted = 0;

        for mut entry in self.utilization.iter_mut() {
            let before = entry.len();
            entry.retain(|s| s.observed_at >= cutoff);
            evicted += before - entry.len();
        }
        self.utilization.retain(|_, samples| !samples.is_empty());

        if evicted > 0 {
            self.dirty.store(true, Ordering::Release);
            debug!(evicted, "Evicted expired utilization samples");
        }
        evicted
    }

    /// Write utilization history to disk if persistence is enabled and data changed
    pub fn flush(&self) -> Result<()> {
        let Some(path) = self.config.persistence_path.as_ref() else {
            return Ok(());
        };
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        if let Err(e) = self.save_to_disk(path) {
            self.dirty.store(true, Ordering::Release);
            return Err(e);
        }
        debug!(path = %path.display(), "Utilization samples flushed to disk");
        Ok(())
    }

    fn save_to_disk(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let samples: Vec<UtilizationSample> = self
            .utilization
            .iter()
            .flat_map(|entry| entry.value().iter().cloned().collect::<Vec<_>>())
            .collect();
        let json = serde_json::to_vec(&samples)?;

        // Write atomically using temp file
        let temp_path = path.with_extension("tmp");
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
        std::fs::rename(&temp_path, path)?;

        Ok(())
    }

    fn load_from_disk(&self, path: &Path) -> Result<()> {
        let data = std::fs::read(path)?;
        let samples: Vec<UtilizationSample> = serde_json::from_slice(&data)?;
        let cutoff = self.retention_cutoff();

        let mut loaded = 0usize;
        for sample in samples {
            if self.push_utilization(sample, cutoff) {
                loaded += 1;
            }
        }

        info!(path = %path.display(), samples = loaded, "Loaded utilization samples from disk");
        Ok(())
    }

    /// Get statistics about the store
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            runs: self.latency.len(),
            latency_samples: self.latency.iter().map(|e| e.len()).sum(),
            containers: self.utilization.len(),
            utilization_samples: self.utilization.iter().map(|e| e.len()).sum(),
            retention_seconds: self.config.retention.as_secs(),
        }
    }
}

#[async_trait]
impl SampleStore for InMemorySampleStore {
    async fn append_latency(&self, run_id: RunId, sample: LatencySample) -> Result<()> {
        if !sample.latency_ms.is_finite() || sample.latency_ms < 0.0 {
            return Err(SuiteError::validation(format!(
                "latency must be a non-negative number, got {}",
                sample.latency_ms
            )));
        }
        self.latency.entry(run_id).or_default().push(sample);
        Ok(())
    }

    async fn latency_samples(&self, run_id: RunId) -> Result<Vec<LatencySample>> {
        Ok(self
            .latency
            .get(&run_id)
            .map(|samples| samples.value().clone())
            .unwrap_or_default())
    }

    async fn append_utilization(&self, sample: UtilizationSample) -> Result<()> {
        if sample.pod_id.is_empty() || sample.container_name.is_empty() {
            return Err(SuiteError::validation(
                "utilization sample requires podId and containerName",
            ));
        }
        let cutoff = self.retention_cutoff();
        if self.push_utilization(sample, cutoff) {
            self.dirty.store(true, Ordering::Release);
        } else {
            debug!("Dropped utilization sample older than the retention window");
        }
        Ok(())
    }

    async fn utilization_in_window(
        &self,
        key: &ContainerKey,
        since: DateTime<Utc>,
    ) -> Result<Vec<UtilizationSample>> {
        Ok(self
            .utilization
            .get(key)
            .map(|samples| {
                samples
                    .iter()
                    .filter(|s| s.observed_at >= since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn container_keys(&self, since: DateTime<Utc>) -> Result<Vec<ContainerKey>> {
        let mut keys: Vec<ContainerKey> = self
            .utilization
            .iter()
            .filter(|entry| entry.value().iter().any(|s| s.observed_at >= since))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// Store statistics
#[derive(Debug, Clone)]
pub struct StoreStats {
    /// Runs with at least one latency sample
    pub runs: usize,
    pub latency_samples: usize,
    /// Containers with retained utilization history
    pub containers: usize,
    pub utilization_samples: usize,
    pub retention_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utilization(pod: &str, cpu: u32, age: chrono::Duration) -> UtilizationSample {
        UtilizationSample {
            pod_id: pod.to_string(),
            namespace: "default".to_string(),
            container_name: "app".to_string(),
            cpu_milli_used: cpu,
            memory_mebi_used: 128,
            cpu_milli_requested: 500,
            memory_mebi_requested: 512,
            observed_at: Utc::now() - age,
        }
    }

    #[tokio::test]
    async fn test_latency_append_and_snapshot() {
        let store = InMemorySampleStore::default();
        let run = RunId::new();

        store.append_latency(run, LatencySample::new(12.0, true)).await.unwrap();
        store.append_latency(run, LatencySample::new(48.0, false)).await.unwrap();

        let snapshot = store.latency_samples(run).await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(store.latency_samples(RunId::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_negative_latency_rejected() {
        let store = InMemorySampleStore::default();
        let err = store
            .append_latency(RunId::new(), LatencySample::new(-1.0, true))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[tokio::test]
    async fn test_window_filters_old_samples() {
        let store = InMemorySampleStore::default();
        store
            .append_utilization(utilization("pod-a", 100, chrono::Duration::hours(30)))
            .await
            .unwrap();
        store
            .append_utilization(utilization("pod-a", 200, chrono::Duration::minutes(5)))
            .await
            .unwrap();

        let key = ContainerKey::new("default", "pod-a", "app");
        let since = Utc::now() - chrono::Duration::hours(24);
        let window = store.utilization_in_window(&key, since).await.unwrap();

        assert_eq!(window.len(), 1);
        assert_eq!(window[0].cpu_milli_used, 200);
    }

    #[tokio::test]
    async fn test_retention_evicts_expired() {
        let store = InMemorySampleStore::new(StoreConfig {
            retention: Duration::from_secs(3600),
            ..Default::default()
        });
        store
            .append_utilization(utilization("pod-a", 100, chrono::Duration::hours(2)))
            .await
            .unwrap();
        store
            .append_utilization(utilization("pod-b", 100, chrono::Duration::minutes(1)))
            .await
            .unwrap();

        // pod-a's only sample is older than the retention window
        assert_eq!(store.stats().containers, 1);
        assert_eq!(store.evict_expired(), 0);
    }

    #[tokio::test]
    async fn test_capacity_limit() {
        let store = InMemorySampleStore::new(StoreConfig {
            max_samples_per_container: 5,
            ..Default::default()
        });
        for cpu in 0..10 {
            store
                .append_utilization(utilization("pod-a", cpu, chrono::Duration::zero()))
                .await
                .unwrap();
        }

        let key = ContainerKey::new("default", "pod-a", "app");
        let since = Utc::now() - chrono::Duration::hours(1);
        let window = store.utilization_in_window(&key, since).await.unwrap();
        assert_eq!(window.len(), 5);
        assert_eq!(window[0].cpu_milli_used, 5);
    }

    #[tokio::test]
    async fn test_zero_capacity_keeps_newest_sample() {
        let store = InMemorySampleStore::new(StoreConfig {
            max_samples_per_container: 0,
            ..Default::default()
        });
        for cpu in [10, 20] {
            store
                .append_utilization(utilization("pod-a", cpu, chrono::Duration::zero()))
                .await
                .unwrap();
        }

        let key = ContainerKey::new("default", "pod-a", "app");
        let since = Utc::now() - chrono::Duration::hours(1);
        let window = store.utilization_in_window(&key, since).await.unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].cpu_milli_used, 20);
    }

    #[tokio::test]
    async fn test_container_keys_sorted() {
        let store = InMemorySampleStore::default();
        for pod in ["pod-c", "pod-a", "pod-b"] {
            store
                .append_utilization(utilization(pod, 10, chrono::Duration::zero()))
                .await
                .unwrap();
        }

        let keys = store
            .container_keys(Utc::now() - chrono::Duration::hours(1))
            .await
            .unwrap();
        let pods: Vec<_> = keys.iter().map(|k| k.pod.as_str()).collect();
        assert_eq!(pods, vec!["pod-a", "pod-b", "pod-c"]);
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.json");
        let config = StoreConfig {
            persistence_path: Some(path.clone()),
            ..Default::default()
        };

        let store = InMemorySampleStore::with_persistence(config.clone()).unwrap();
        store
            .append_utilization(utilization("pod-a", 150, chrono::Duration::minutes(1)))
            .await
            .unwrap();
        store.flush().unwrap();
        assert!(path.exists());

        let reloaded = InMemorySampleStore::with_persistence(config).unwrap();
        let stats = reloaded.stats();
        assert_eq!(stats.containers, 1);
        assert_eq!(stats.utilization_samples, 1);
    }
}
