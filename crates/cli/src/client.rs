//! API client for the performance suite backend

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// Error returned by the backend, carrying its `{kind, message}` body
#[derive(Debug, thiserror::Error)]
#[error("API error ({status}): {kind}: {message}")]
pub struct ApiError {
    pub status: u16,
    pub kind: String,
    pub message: String,
}

/// API client for the suite backend
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = match serde_json::from_str::<ErrorBody>(&body) {
                Ok(parsed) => ApiError {
                    status: status.as_u16(),
                    kind: parsed.kind,
                    message: parsed.message,
                },
                Err(_) => ApiError {
                    status: status.as_u16(),
                    kind: "unknown".to_string(),
                    message: body,
                },
            };
            return Err(err.into());
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn list_runs(&self) -> Result<Vec<Run>> {
        self.get("api/performance/tests").await
    }

    pub async fn get_run(&self, id: &str) -> Result<Run> {
        self.get(&format!("api/performance/tests/{}", id)).await
    }

    pub async fn run_results(&self, id: &str) -> Result<RunResults> {
        self.get(&format!("api/performance/results/{}", id)).await
    }

    pub async fn start_run(&self, request: &StartRequest) -> Result<Run> {
        self.post("api/performance/start", request).await
    }

    pub async fn stop_run(&self, id: Option<String>) -> Result<Run> {
        self.post("api/performance/stop", &StopRequest { id }).await
    }

    pub async fn ingest_sample(&self, id: &str, sample: &LatencySample) -> Result<Accepted> {
        self.post(&format!("api/performance/tests/{}/samples", id), sample)
            .await
    }

    pub async fn recommendations(&self, namespace: Option<&str>) -> Result<Vec<Recommendation>> {
        let mut url = self
            .base_url
            .join("api/optimization/data")
            .context("Invalid path")?;
        if let Some(ns) = namespace {
            url.query_pairs_mut().append_pair("namespace", ns);
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    pub async fn summary(&self) -> Result<RecommendationSummary> {
        self.get("api/optimization/summary").await
    }

    pub async fn health(&self) -> Result<ServiceHealth> {
        self.get("api/health").await
    }
}

// API request and response types

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ErrorBody {
    kind: String,
    message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRequest {
    pub name: String,
    pub users: i64,
    pub duration: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencySample {
    pub latency_ms: f64,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Accepted {
    pub accepted: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub id: String,
    pub name: String,
    pub target_users: u32,
    pub requested_duration: String,
    pub status: String,
    pub started_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p95_latency_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_rate_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sla_verdict: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResults {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sla_verdict: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p95_latency_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_rate_percent: Option<f64>,
    pub total_requests: u64,
    pub failed_requests: u64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    pub median_latency_ms: f64,
    pub average_latency_ms: f64,
    pub throughput_rps: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub pod: String,
    pub container: String,
    pub namespace: String,
    pub current_cpu: u32,
    pub suggested_cpu: u32,
    pub current_memory: u32,
    pub suggested_memory: u32,
    pub cpu_saving_percent: f64,
    pub memory_saving_percent: f64,
    pub sample_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
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

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    pub status: String,
    pub service: String,
    pub active_run: Option<String>,
    pub timestamp: String,
}
