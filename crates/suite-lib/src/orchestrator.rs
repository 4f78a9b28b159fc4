//! Performance-test run lifecycle
//!
//! State machine: `Pending -> Running -> Completing -> {Completed, Failed}`.
//!
//! - The process-wide current-run slot admits a new run only when it is
//!   empty or holds a terminal run; the check and the replacement happen
//!   under one lock.
//! - Ingestion holds a shared lock on the run's state for the duration of
//!   the store append, so concurrent ingesters never wait on each other.
//!   `stop_run` takes the exclusive lock to leave `Running`, which means the
//!   snapshot it reads afterwards can no longer grow.
//! - Stopping a terminal run returns it unchanged.

use crate::error::{Result, SuiteError};
use crate::health::HealthRegistry;
use crate::models::{LatencySample, Run, RunConfig, RunId, RunResults, RunStatus};
use crate::observability::{StructuredLogger, SuiteMetrics};
use crate::retry::RetryPolicy;
use crate::sla::{SlaEvaluator, SlaPolicy};
use crate::store::SampleStore;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Orchestrator settings
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    pub sla: SlaPolicy,
    pub retry: RetryPolicy,
}

/// One run plus the locks that guard its transitions
struct RunSlot {
    id: RunId,
    state: RwLock<Run>,
    /// Serializes concurrent stop requests for this run
    stop_lock: Mutex<()>,
}

/// Owns the single-active-run invariant and every run's state machine
pub struct RunOrchestrator {
    store: Arc<dyn SampleStore>,
    evaluator: SlaEvaluator,
    retry: RetryPolicy,
    current: Mutex<Option<Arc<RunSlot>>>,
    runs: DashMap<RunId, Arc<RunSlot>>,
    history: RwLock<Vec<RunId>>,
    health: Option<HealthRegistry>,
    metrics: SuiteMetrics,
    logger: StructuredLogger,
}

impl RunOrchestrator {
    pub fn new(store: Arc<dyn SampleStore>, config: OrchestratorConfig) -> Self {
        Self {
            store,
            evaluator: SlaEvaluator::new(config.sla),
            retry: config.retry,
            current: Mutex::new(None),
            runs: DashMap::new(),
            history: RwLock::new(Vec::new()),
            health: None,
            metrics: SuiteMetrics::new(),
            logger: StructuredLogger::new("perf-suite"),
        }
    }

    /// Report sample store failures to the health registry
    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn sla_policy(&self) -> &SlaPolicy {
        self.evaluator.policy()
    }

    /// Start a new run; fails with `Conflict` while another run is active
    pub async fn start_run(&self, config: RunConfig) -> Result<Run> {
        let (name, target_users, requested_duration) = validate_config(&config)?;

        let mut current = self.current.lock().await;
        if let Some(active) = current.as_ref() {
            let status = active.state.read().await.status;
            if !status.is_terminal() {
                return Err(SuiteError::Conflict(format!(
                    "run {} is already {}",
                    active.id, status
                )));
            }
        }

        let run = Run {
            id: RunId::new(),
            name,
            target_users,
            requested_duration,
            status: RunStatus::Running,
            started_at: Utc::now(),
            ended_at: None,
            p95_latency_ms: None,
            failure_rate_percent: None,
            sla_verdict: None,
            results: None,
            failure_reason: None,
        };

        let slot = Arc::new(RunSlot {
            id: run.id,
            state: RwLock::new(run.clone()),
            stop_lock: Mutex::new(()),
        });
        self.runs.insert(run.id, slot.clone());
        self.history.write().await.push(run.id);
        *current = Some(slot);
        drop(current);

        self.metrics.inc_runs_started();
        self.logger.log_run_started(&run);
        Ok(run)
    }

    /// Append one latency observation to the running run
    pub async fn ingest_sample(&self, run_id: RunId, latency_ms: f64, success: bool) -> Result<()> {
        let result = self.try_ingest(run_id, latency_ms, success).await;
        match &result {
            Ok(()) => self.metrics.inc_samples_ingested(),
            Err(e) => {
                self.metrics.inc_samples_rejected(e.kind());
                self.logger.log_sample_rejected(run_id, e.kind());
            }
        }
        result
    }

    async fn try_ingest(&self, run_id: RunId, latency_ms: f64, success: bool) -> Result<()> {
        if !latency_ms.is_finite() || latency_ms < 0.0 {
            return Err(SuiteError::validation(format!(
                "latencyMs must be a non-negative number, got {}",
                latency_ms
            )));
        }

        let slot = self.slot(run_id)?;
        let state = slot.state.read().await;
        if state.status != RunStatus::Running {
            return Err(SuiteError::invalid_state(format!(
                "run {} is {}, samples are no longer accepted",
                run_id, state.status
            )));
        }

        let sample = LatencySample::new(latency_ms, success);
        let result = self
            .retry
            .run("append_latency", &self.metrics, || {
                self.store.append_latency(run_id, sample.clone())
            })
            .await;
        self.record_storage(&result).await;

        // The shared guard is held until the append has landed
        drop(state);
        result
    }

    /// Stop a run and compute its verdict
    ///
    /// Calling this again on a terminal run returns the stored result
    /// without re-evaluating.
    pub async fn stop_run(&self, run_id: RunId) -> Result<Run> {
        let slot = self.slot(run_id)?;
        let _stopping = slot.stop_lock.lock().await;

        {
            let state = slot.state.read().await;
            if state.status.is_terminal() {
                debug!(run_id = %run_id, status = %state.status, "Run already stopped");
                return Ok(state.clone());
            }
        }

        let (started_at, ended_at) = {
            let mut state = slot.state.write().await;
            if state.status == RunStatus::Running {
                state.status = RunStatus::Completing;
                state.ended_at = Some(Utc::now());
            }
            (state.started_at, state.ended_at.unwrap_or_else(Utc::now))
        };
        info!(run_id = %run_id, "Run completing, evaluating samples");

        let snapshot = self
            .retry
            .run("latency_samples", &self.metrics, || {
                self.store.latency_samples(run_id)
            })
            .await;
        self.record_storage(&snapshot).await;

        let samples = match snapshot {
            Ok(samples) => samples,
            Err(e) => {
                self.finish(&slot, |run| {
                    run.status = RunStatus::Failed;
                    run.failure_reason = Some(format!("sample snapshot unavailable: {}", e));
                })
                .await;
                return Err(e);
            }
        };

        let elapsed = (ended_at - started_at).to_std().unwrap_or(Duration::ZERO);
        let timer = Instant::now();
        let evaluation = self.evaluator.evaluate(&samples, elapsed);
        self.metrics
            .observe_evaluation_latency(timer.elapsed().as_secs_f64());

        let run = match evaluation {
            Ok(eval) => {
                self.finish(&slot, |run| {
                    run.status = RunStatus::Completed;
                    run.p95_latency_ms = Some(eval.p95_latency_ms);
                    run.failure_rate_percent = Some(eval.failure_rate_percent);
                    run.sla_verdict = Some(eval.verdict);
                    run.results = Some(eval.results);
                })
                .await
            }
            Err(e) => {
                self.finish(&slot, |run| {
                    run.status = RunStatus::Failed;
                    run.failure_reason = Some(e.to_string());
                })
                .await
            }
        };

        Ok(run)
    }

    /// Stop whichever run is active; `NotFound` when none is
    pub async fn stop_current(&self) -> Result<Run> {
        let not_running = || SuiteError::not_found("no performance test is running");
        let active = self.current.lock().await.clone().ok_or_else(not_running)?;
        if active.state.read().await.status.is_terminal() {
            return Err(not_running());
        }
        self.stop_run(active.id).await
    }

    /// Apply the terminal transition, free the current slot, and report it
    async fn finish(&self, slot: &Arc<RunSlot>, apply: impl FnOnce(&mut Run)) -> Run {
        let run = {
            let mut state = slot.state.write().await;
            apply(&mut *state);
            state.clone()
        };

        {
            let mut current = self.current.lock().await;
            if current.as_ref().map(|s| s.id) == Some(slot.id) {
                *current = None;
            }
        }

        match run.sla_verdict {
            Some(verdict) => self.metrics.inc_runs_completed(verdict),
            None => self.metrics.inc_runs_failed(),
        }
        self.logger.log_run_finished(&run);
        run
    }

    pub async fn get_run(&self, run_id: RunId) -> Result<Run> {
        let slot = self.slot(run_id)?;
        let run = slot.state.read().await.clone();
        Ok(run)
    }

    /// Detailed results of a completed run
    pub async fn run_results(&self, run_id: RunId) -> Result<RunResults> {
        let run = self.get_run(run_id).await?;
        match (run.status, run.results) {
            (RunStatus::Completed, Some(results)) => Ok(results),
            (RunStatus::Failed, _) => Err(SuiteError::invalid_state(format!(
                "run {} failed without results: {}",
                run_id,
                run.failure_reason.unwrap_or_default()
            ))),
            (status, _) => Err(SuiteError::invalid_state(format!(
                "run {} is {}, results are available once it completes",
                run_id, status
            ))),
        }
    }

    /// Every run, newest first
    pub async fn list_runs(&self) -> Vec<Run> {
        let ids = self.history.read().await.clone();
        let mut runs = Vec::with_capacity(ids.len());
        for id in ids.into_iter().rev() {
            if let Some(slot) = self.runs.get(&id).map(|s| s.value().clone()) {
                runs.push(slot.state.read().await.clone());
            }
        }
        runs
    }

    /// The active run, if any
    pub async fn current_run(&self) -> Option<Run> {
        let slot = self.current.lock().await.clone()?;
        let run = slot.state.read().await.clone();
        (!run.status.is_terminal()).then_some(run)
    }

    /// Stop `run` once its requested duration has elapsed
    pub fn schedule_auto_stop(self: &Arc<Self>, run: &Run) -> tokio::task::JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        let run_id = run.id;
        let duration = run.requested_duration;

        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            match orchestrator.stop_run(run_id).await {
                Ok(run) => debug!(run_id = %run_id, status = %run.status, "Auto-stop finished"),
                Err(e) => warn!(run_id = %run_id, error = %e, "Auto-stop failed"),
            }
        })
    }

    fn slot(&self, run_id: RunId) -> Result<Arc<RunSlot>> {
        self.runs
            .get(&run_id)
            .map(|s| s.value().clone())
            .ok_or_else(|| SuiteError::not_found(format!("run {} does not exist", run_id)))
    }

    async fn record_storage<T>(&self, result: &Result<T>) {
        if let Some(health) = &self.health {
            health.record_storage_result(result).await;
        }
    }
}

fn validate_config(config: &RunConfig) -> Result<(String, u32, Duration)> {
    let name = config.name.trim();
    if name.is_empty() {
        return Err(SuiteError::validation("name must not be empty"));
    }
    if config.users <= 0 {
        return Err(SuiteError::validation(format!(
            "users must be positive, got {}",
            config.users
        )));
    }
    let users = u32::try_from(config.users)
        .map_err(|_| SuiteError::validation(format!("users out of range: {}", config.users)))?;
    let duration = humantime::parse_duration(config.duration.trim()).map_err(|e| {
        SuiteError::validation(format!("invalid duration {:?}: {}", config.duration, e))
    })?;
    if duration.is_zero() {
        return Err(SuiteError::validation("duration must be positive"));
    }
    Ok((name.to_string(), users, duration))
}
