//! Sample storage behind an injected interface
//!
//! The orchestrator and the recommendation engine only see the
//! [`SampleStore`] trait. Implementations may be backed by a time-series
//! database; callers assume every call can block on that dependency and
//! can fail with `StorageUnavailable`.

mod memory;

pub use memory::{InMemorySampleStore, StoreConfig, StoreStats};

use crate::error::Result;
use crate::models::{ContainerKey, LatencySample, RunId, UtilizationSample};
use chrono::{DateTime, Utc};

pub use async_trait::async_trait;

/// Append-only storage of run latency samples and container utilization
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Append one latency observation to a run's sample set
    async fn append_latency(&self, run_id: RunId, sample: LatencySample) -> Result<()>;

    /// Snapshot of every latency observation recorded for a run
    async fn latency_samples(&self, run_id: RunId) -> Result<Vec<LatencySample>>;

    /// Record one utilization observation
    async fn append_utilization(&self, sample: UtilizationSample) -> Result<()>;

    /// Utilization observations for `key` observed at or after `since`
    async fn utilization_in_window(
        &self,
        key: &ContainerKey,
        since: DateTime<Utc>,
    ) -> Result<Vec<UtilizationSample>>;

    /// Every container with at least one observation at or after `since`
    async fn container_keys(&self, since: DateTime<Utc>) -> Result<Vec<ContainerKey>>;
}
