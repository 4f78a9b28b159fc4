//! Core library for the CI/CD performance suite
//!
//! This crate provides the core functionality for:
//! - Performance-test run lifecycle with a single active run
//! - SLA evaluation of collected latency samples
//! - Resource right-sizing recommendations from container utilization
//! - Sample storage with retention and optional persistence
//! - Health checks and observability

pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod orchestrator;
pub mod recommend;
pub mod retry;
pub mod sla;
pub mod stats;
pub mod store;

pub use error::{Result, SuiteError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{StructuredLogger, SuiteMetrics};
pub use orchestrator::{OrchestratorConfig, RunOrchestrator};
pub use recommend::{RecommendationEngine, RecommendationPolicy, RecommendationReport};
pub use retry::RetryPolicy;
pub use sla::{SlaEvaluation, SlaEvaluator, SlaPolicy};
pub use store::{InMemorySampleStore, SampleStore, StoreConfig, StoreStats};
