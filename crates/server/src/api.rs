//! REST API for performance runs, recommendations, health and metrics

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use suite_lib::{
    health::{ComponentStatus, HealthRegistry},
    RecommendationEngine, RecommendationSummary, ResourceRecommendation, Run, RunConfig, RunId,
    RunOrchestrator, RunResults, SlaVerdict, SuiteError, UtilizationSample,
};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Shared application state
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub orchestrator: Arc<RunOrchestrator>,
    pub recommender: Arc<RecommendationEngine>,
    pub service_name: String,
    /// Schedule a stop when a run's requested duration elapses
    pub auto_stop_runs: bool,
    /// Answer cross-origin requests from the dashboard
    pub enable_cors: bool,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        orchestrator: Arc<RunOrchestrator>,
        recommender: Arc<RecommendationEngine>,
    ) -> Self {
        Self {
            health_registry,
            orchestrator,
            recommender,
            service_name: "perf-suite".to_string(),
            auto_stop_runs: true,
            enable_cors: true,
        }
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn with_auto_stop(mut self, enabled: bool) -> Self {
        self.auto_stop_runs = enabled;
        self
    }

    pub fn with_cors(mut self, enabled: bool) -> Self {
        self.enable_cors = enabled;
        self
    }
}

/// Error body returned for every failed request
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

/// Handler error mapped onto an HTTP status
#[derive(Debug)]
pub enum ApiError {
    Suite(SuiteError),
    Internal(String),
}

impl From<SuiteError> for ApiError {
    fn from(err: SuiteError) -> Self {
        ApiError::Suite(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Suite(SuiteError::validation(rejection.body_text()))
    }
}

/// HTTP status for each error kind
pub fn status_for(err: &SuiteError) -> StatusCode {
    match err {
        SuiteError::Validation(_) => StatusCode::BAD_REQUEST,
        SuiteError::NotFound(_) => StatusCode::NOT_FOUND,
        SuiteError::Conflict(_) | SuiteError::InvalidState(_) => StatusCode::CONFLICT,
        SuiteError::InsufficientData(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SuiteError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Suite(err) => (
                status_for(&err),
                ErrorBody {
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                },
            ),
            ApiError::Internal(message) => {
                error!(error = %message, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        kind: "internal_error".to_string(),
                        message,
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

fn parse_run_id(raw: &str) -> ApiResult<RunId> {
    RunId::parse(raw)
        .ok_or_else(|| SuiteError::not_found(format!("run {} does not exist", raw)).into())
}

/// Health check response - returns 200 if healthy, 503 if degraded/unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> ApiResult<impl IntoResponse> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceHealth {
    status: ComponentStatus,
    service: String,
    active_run: Option<RunId>,
    timestamp: DateTime<Utc>,
}

/// Dashboard-facing service status
async fn api_health(State(state): State<Arc<AppState>>) -> Json<ServiceHealth> {
    let health = state.health_registry.health().await;
    let active_run = state.orchestrator.current_run().await.map(|run| run.id);

    Json(ServiceHealth {
        status: health.status,
        service: state.service_name.clone(),
        active_run,
        timestamp: Utc::now(),
    })
}

async fn list_runs(State(state): State<Arc<AppState>>) -> Json<Vec<Run>> {
    Json(state.orchestrator.list_runs().await)
}

async fn get_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Run>> {
    let run_id = parse_run_id(&id)?;
    Ok(Json(state.orchestrator.get_run(run_id).await?))
}

async fn start_run(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RunConfig>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Run>)> {
    let Json(config) = payload?;
    let run = state.orchestrator.start_run(config).await?;

    if state.auto_stop_runs {
        // Detached: the task ends on its own once the stop completes
        drop(state.orchestrator.schedule_auto_stop(&run));
    }

    info!(run_id = %run.id, name = %run.name, "Run started via API");
    Ok((StatusCode::CREATED, Json(run)))
}

#[derive(Debug, Deserialize)]
struct StopRequest {
    id: Option<String>,
}

/// Stop the named run, or the current one when no id is given
async fn stop_run(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult<Json<Run>> {
    let target = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        let request: StopRequest = serde_json::from_slice(&body)
            .map_err(|e| SuiteError::validation(format!("invalid stop request: {}", e)))?;
        request.id.as_deref().map(parse_run_id).transpose()?
    };

    // A client disconnect must not abandon a stop halfway through
    let orchestrator = Arc::clone(&state.orchestrator);
    let run = tokio::spawn(async move {
        match target {
            Some(run_id) => orchestrator.stop_run(run_id).await,
            None => orchestrator.stop_current().await,
        }
    })
    .await
    .map_err(|e| ApiError::Internal(format!("stop task failed: {}", e)))??;

    Ok(Json(run))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunResultsResponse {
    id: RunId,
    name: String,
    sla_verdict: Option<SlaVerdict>,
    p95_latency_ms: Option<f64>,
    failure_rate_percent: Option<f64>,
    #[serde(flatten)]
    results: RunResults,
}

async fn run_results(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<RunResultsResponse>> {
    let run_id = parse_run_id(&id)?;
    let results = state.orchestrator.run_results(run_id).await?;
    let run = state.orchestrator.get_run(run_id).await?;

    Ok(Json(RunResultsResponse {
        id: run.id,
        name: run.name,
        sla_verdict: run.sla_verdict,
        p95_latency_ms: run.p95_latency_ms,
        failure_rate_percent: run.failure_rate_percent,
        results,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatencyInput {
    #[serde(alias = "latency_ms")]
    latency_ms: f64,
    #[serde(default = "default_success")]
    success: bool,
}

fn default_success() -> bool {
    true
}

/// Either `{"samples": [...]}` or a single sample object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Batch<T> {
    Many { samples: Vec<T> },
    One(T),
}

impl<T> Batch<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Batch::Many { samples } => samples,
            Batch::One(sample) => vec![sample],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Accepted {
    pub accepted: usize,
}

/// Samples are applied in order; the first rejected one ends the request
async fn ingest_samples(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<Batch<LatencyInput>>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Accepted>)> {
    let run_id = parse_run_id(&id)?;
    let Json(batch) = payload?;

    let mut accepted = 0;
    for sample in batch.into_vec() {
        state
            .orchestrator
            .ingest_sample(run_id, sample.latency_ms, sample.success)
            .await?;
        accepted += 1;
    }

    Ok((StatusCode::ACCEPTED, Json(Accepted { accepted })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UtilizationInput {
    pod_id: String,
    #[serde(default = "default_namespace")]
    namespace: String,
    container_name: String,
    cpu_milli_used: u32,
    memory_mebi_used: u32,
    cpu_milli_requested: u32,
    memory_mebi_requested: u32,
    observed_at: Option<DateTime<Utc>>,
}

fn default_namespace() -> String {
    "default".to_string()
}

impl From<UtilizationInput> for UtilizationSample {
    fn from(input: UtilizationInput) -> Self {
        UtilizationSample {
            pod_id: input.pod_id,
            namespace: input.namespace,
            container_name: input.container_name,
            cpu_milli_used: input.cpu_milli_used,
            memory_mebi_used: input.memory_mebi_used,
            cpu_milli_requested: input.cpu_milli_requested,
            memory_mebi_requested: input.memory_mebi_requested,
            observed_at: input.observed_at.unwrap_or_else(Utc::now),
        }
    }
}

async fn record_utilization(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Batch<UtilizationInput>>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Accepted>)> {
    let Json(batch) = payload?;
    let samples = batch.into_vec().into_iter().map(Into::into).collect();
    let accepted = state.recommender.record_utilization(samples).await?;
    Ok((StatusCode::ACCEPTED, Json(Accepted { accepted })))
}

#[derive(Debug, Deserialize)]
struct NamespaceFilter {
    namespace: Option<String>,
}

async fn recommendations(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<NamespaceFilter>,
) -> ApiResult<Json<Vec<ResourceRecommendation>>> {
    let report = state
        .recommender
        .recommend_all(filter.namespace.as_deref())
        .await?;
    Ok(Json(report.recommendations))
}

async fn recommendation_summary(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<NamespaceFilter>,
) -> ApiResult<Json<RecommendationSummary>> {
    let report = state
        .recommender
        .recommend_all(filter.namespace.as_deref())
        .await?;
    Ok(Json(report.summary))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let enable_cors = state.enable_cors;
    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/health", get(api_health))
        .route("/api/performance/tests", get(list_runs))
        .route("/api/performance/tests/:id", get(get_run))
        .route("/api/performance/tests/:id/samples", post(ingest_samples))
        .route("/api/performance/start", post(start_run))
        .route("/api/performance/stop", post(stop_run))
        .route("/api/performance/results/:id", get(run_results))
        .route("/api/optimization/data", get(recommendations))
        .route("/api/optimization/summary", get(recommendation_summary))
        .route("/api/optimization/samples", post(record_utilization))
        .with_state(state);

    if enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
