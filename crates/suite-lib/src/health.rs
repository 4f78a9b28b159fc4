//! Component health for liveness and readiness probes
//!
//! The sample store is the only component whose health changes at runtime:
//! it degrades when a storage call exhausts its retries and recovers on
//! the next success.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Component status, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Operational, but a dependency is misbehaving
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            checked_at: Utc::now(),
        }
    }

    pub fn healthy() -> Self {
        Self::new(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Overall status is the worst component status; no components is healthy
    pub fn compute_status(components: &BTreeMap<String, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|h| h.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy)
    }
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Names under which suite components report
pub mod components {
    pub const ORCHESTRATOR: &str = "orchestrator";
    pub const SAMPLE_STORE: &str = "sample_store";
    pub const RECOMMENDER: &str = "recommender";

    pub const ALL: [&str; 3] = [ORCHESTRATOR, SAMPLE_STORE, RECOMMENDER];
}

#[derive(Debug, Default)]
struct RegistryState {
    components: BTreeMap<String, ComponentHealth>,
    ready: bool,
}

/// Shared registry of component health; clones observe the same state
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component as healthy
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    /// Add every suite component as healthy
    pub async fn register_all(&self) {
        for name in components::ALL {
            self.register(name).await;
        }
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.state
            .write()
            .await
            .components
            .insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    /// Degrade the sample store on a retryable failure, restore it on success
    pub async fn record_storage_result<T>(&self, result: &Result<T>) {
        match result {
            Err(e) if e.is_retryable() => {
                self.set_degraded(components::SAMPLE_STORE, e.to_string())
                    .await;
            }
            Err(_) => {}
            Ok(_) => {
                let mut state = self.state.write().await;
                if let Some(health) = state.components.get_mut(components::SAMPLE_STORE) {
                    if health.status != ComponentStatus::Healthy {
                        *health = ComponentHealth::healthy();
                    }
                }
            }
        }
    }

    pub async fn set_ready(&self, ready: bool) {
        self.state.write().await.ready = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.state.read().await.components.clone();
        HealthResponse {
            status: HealthResponse::compute_status(&components),
            components,
        }
    }

    /// Ready once initialized, and only while nothing is unhealthy
    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;
        let overall = HealthResponse::compute_status(&state.components);

        let reason = if !state.ready {
            Some("Service not yet initialized")
        } else if overall == ComponentStatus::Unhealthy {
            Some("A component is unhealthy")
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason: reason.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SuiteError;

    #[tokio::test]
    async fn test_empty_registry_is_healthy() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());
    }

    #[tokio::test]
    async fn test_register_all_components() {
        let registry = HealthRegistry::new();
        registry.register_all().await;

        let health = registry.health().await;
        for name in components::ALL {
            assert_eq!(health.components[name].status, ComponentStatus::Healthy);
        }
    }

    #[tokio::test]
    async fn test_worst_component_wins() {
        let registry = HealthRegistry::new();
        registry.register_all().await;

        registry
            .set_degraded(components::RECOMMENDER, "Slow window scan")
            .await;
        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);

        registry
            .set_unhealthy(components::SAMPLE_STORE, "Store unreachable")
            .await;
        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_storage_result_degrades_and_recovers() {
        let registry = HealthRegistry::new();
        registry.register_all().await;

        let failure: Result<()> = Err(SuiteError::storage("connection refused"));
        registry.record_storage_result(&failure).await;
        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert!(health.components[components::SAMPLE_STORE]
            .message
            .as_deref()
            .unwrap_or_default()
            .contains("connection refused"));

        registry.record_storage_result(&Ok(())).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_non_storage_errors_do_not_degrade() {
        let registry = HealthRegistry::new();
        registry.register_all().await;

        let failure: Result<()> = Err(SuiteError::validation("bad"));
        registry.record_storage_result(&failure).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_readiness() {
        let registry = HealthRegistry::new();
        registry.register_all().await;

        let before = registry.readiness().await;
        assert!(!before.ready);
        assert!(before.reason.is_some());

        registry.set_ready(true).await;
        assert!(registry.readiness().await.ready);

        // Degraded is still ready
        registry
            .set_degraded(components::SAMPLE_STORE, "Retrying")
            .await;
        assert!(registry.readiness().await.ready);

        registry
            .set_unhealthy(components::SAMPLE_STORE, "Failed")
            .await;
        assert!(!registry.readiness().await.ready);
    }
}
