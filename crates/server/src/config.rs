//! Backend configuration
//!
//! Sources, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. `perf-suite.toml` in the working directory, or the file named by `SUITE_CONFIG`
//! 3. Environment variables prefixed with `SUITE_`, nested keys joined by `__`
//!    (for example `SUITE_SLA__MAX_P95_LATENCY_MS=75`)

use anyhow::{bail, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use suite_lib::{
    OrchestratorConfig, RecommendationPolicy, RetryPolicy, SlaPolicy, StoreConfig,
};

/// Config file looked up in the working directory when `SUITE_CONFIG` is unset
const DEFAULT_CONFIG_FILE: &str = "perf-suite";

/// Backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SuiteConfig {
    /// Port for the REST API, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Service name attached to structured log events
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Stop runs automatically once their requested duration elapses
    #[serde(default = "default_auto_stop_runs")]
    pub auto_stop_runs: bool,

    /// Allow the browser dashboard to call the API from another origin
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,

    #[serde(default)]
    pub sla: SlaPolicy,

    #[serde(default)]
    pub recommendation: RecommendationPolicy,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub retry: RetryPolicy,
}

/// Sample store settings
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    #[serde(default = "default_max_samples_per_container")]
    pub max_samples_per_container: usize,

    /// Utilization history is kept in memory only when unset
    #[serde(default)]
    pub persistence_path: Option<PathBuf>,

    /// Interval between eviction and flush passes
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
}

fn default_api_port() -> u16 {
    5000
}

fn default_service_name() -> String {
    "perf-suite".to_string()
}

fn default_auto_stop_runs() -> bool {
    true
}

fn default_enable_cors() -> bool {
    true
}

fn default_retention_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_max_samples_per_container() -> usize {
    100_000
}

fn default_flush_interval_secs() -> u64 {
    60
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            retention_secs: default_retention_secs(),
            max_samples_per_container: default_max_samples_per_container(),
            persistence_path: None,
            flush_interval_secs: default_flush_interval_secs(),
        }
    }
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            service_name: default_service_name(),
            auto_stop_runs: default_auto_stop_runs(),
            enable_cors: default_enable_cors(),
            sla: SlaPolicy::default(),
            recommendation: RecommendationPolicy::default(),
            storage: StorageSettings::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl SuiteConfig {
    /// Load configuration from the environment and config file
    pub fn load() -> Result<Self> {
        let file = std::env::var_os("SUITE_CONFIG").map(PathBuf::from);
        Self::load_from(file.as_deref())
    }

    /// Load configuration with an explicit config file; the file must exist
    pub fn load_from(file: Option<&Path>) -> Result<Self> {
        let builder = config::Config::builder();
        let builder = match file {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let settings = builder
            .add_source(
                config::Environment::with_prefix("SUITE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: SuiteConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.sla.validate()?;
        self.recommendation.validate()?;
        if self.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        if self.storage.retention_secs == 0 {
            bail!("storage.retention_secs must be positive");
        }
        if self.storage.max_samples_per_container == 0 {
            bail!("storage.max_samples_per_container must be positive");
        }
        if self.storage.flush_interval_secs == 0 {
            bail!("storage.flush_interval_secs must be positive");
        }
        Ok(())
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            sla: self.sla.clone(),
            retry: self.retry.clone(),
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            retention: Duration::from_secs(self.storage.retention_secs),
            max_samples_per_container: self.storage.max_samples_per_container,
            persistence_path: self.storage.persistence_path.clone(),
        }
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.storage.flush_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = SuiteConfig::default();
        assert_eq!(config.api_port, 5000);
        assert!(config.auto_stop_runs);
        assert!(config.enable_cors);
        assert_eq!(config.sla.max_p95_latency_ms, 50.0);
        assert_eq!(config.sla.max_failure_rate_percent, 1.0);
        assert_eq!(config.recommendation.min_samples, 10);
        assert_eq!(config.store_config().retention, Duration::from_secs(604_800));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_overrides_nested_sections() {
        let file = write_config(
            r#"
api_port = 8088
service_name = "perf-staging"
enable_cors = false

[sla]
max_p95_latency_ms = 120.0

[recommendation]
headroom_factor = 1.5

[storage]
persistence_path = "/var/lib/perf-suite/utilization.json"
"#,
        );

        let config = SuiteConfig::load_from(Some(file.path())).unwrap();
        assert_eq!(config.api_port, 8088);
        assert_eq!(config.service_name, "perf-staging");
        assert!(!config.enable_cors);
        assert_eq!(config.sla.max_p95_latency_ms, 120.0);
        // untouched keys keep their defaults
        assert_eq!(config.sla.max_failure_rate_percent, 1.0);
        assert_eq!(config.recommendation.headroom_factor, 1.5);
        assert_eq!(config.recommendation.min_cpu_millicores, 10);
        assert_eq!(
            config.store_config().persistence_path,
            Some(PathBuf::from("/var/lib/perf-suite/utilization.json"))
        );
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let file = write_config("[sla]\nmax_failure_rate_percent = 150.0\n");
        assert!(SuiteConfig::load_from(Some(file.path())).is_err());

        let file = write_config("[retry]\nmax_attempts = 0\n");
        assert!(SuiteConfig::load_from(Some(file.path())).is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(SuiteConfig::load_from(Some(&missing)).is_err());
    }
}
