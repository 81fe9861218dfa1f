//! Orchestration engine — one pass over the due configurations.
//!
//! Each due configuration runs as an independent unit of work under a
//! bounded worker pool; the only shared mutable state is the mutex-guarded
//! summary accumulator. No per-configuration error ever escapes the pass —
//! the only failure surfaced to the caller is an unreachable store before
//! the due set could be fetched.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use brandpulse_core::config::SchedulerConfig;
use brandpulse_core::error::Result;
use brandpulse_core::traits::Collaborators;

use crate::dispatch::DispatchTable;
use crate::model::{AutomationConfig, AutomationType, Job};
use crate::recurrence::compute_next_run;
use crate::retry::run_with_retry;
use crate::store::OrchestratorDb;

/// Outcome of one configuration's pipeline within a pass.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub config_id: String,
    pub job_id: String,
    pub job_type: AutomationType,
    pub success: bool,
    pub duration_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregated result of one `run_once` pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Configurations whose pipeline ran to a terminal job state.
    pub processed: usize,
    /// Configurations abandoned at the deadline — still due next pass.
    pub skipped: usize,
    pub results: Vec<RunOutcome>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }
}

/// The automation orchestrator.
pub struct Orchestrator {
    db: Arc<OrchestratorDb>,
    dispatch: Arc<DispatchTable>,
    workers: usize,
    max_attempts: u32,
    deadline: Option<Duration>,
}

impl Orchestrator {
    /// Wire the engine from its store, collaborator set, and settings.
    pub fn new(
        db: Arc<OrchestratorDb>,
        collaborators: Collaborators,
        settings: &SchedulerConfig,
    ) -> Self {
        let dispatch = Arc::new(DispatchTable::new(
            collaborators,
            db.clone(),
            settings.alert_window_secs,
        ));
        Self {
            db,
            dispatch,
            workers: settings.workers.max(1),
            max_attempts: settings.max_attempts.max(1),
            deadline: (settings.deadline_secs > 0)
                .then(|| Duration::from_secs(settings.deadline_secs)),
        }
    }

    /// Run one scheduling pass at `now`: select the due set, execute each
    /// configuration, and return the aggregated summary.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<RunSummary> {
        // The sole catastrophic failure path: no due set, no pass.
        let configs = self.db.due_configs(now)?;
        if configs.is_empty() {
            tracing::debug!("No due configurations");
            return Ok(RunSummary::default());
        }
        tracing::info!("📅 {} due configuration(s)", configs.len());

        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let results = Arc::new(Mutex::new(Vec::with_capacity(configs.len())));
        let skipped = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(configs.len());
        for config in configs {
            let semaphore = semaphore.clone();
            let results = results.clone();
            let skipped = skipped.clone();
            let db = self.db.clone();
            let dispatch = self.dispatch.clone();
            let deadline = self.deadline;
            let max_attempts = self.max_attempts;

            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                if deadline.is_some_and(|d| started.elapsed() > d) {
                    tracing::warn!(
                        "⏱ Deadline reached, leaving config {} for the next pass",
                        config.id
                    );
                    skipped.fetch_add(1, Ordering::SeqCst);
                    return;
                }
                let outcome = process_config(&db, &dispatch, &config, now, max_attempts).await;
                if let Ok(mut guard) = results.lock() {
                    guard.push(outcome);
                }
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("Worker task aborted: {e}");
            }
        }

        let results = results
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .unwrap_or_default();
        let summary = RunSummary {
            processed: results.len(),
            skipped: skipped.load(Ordering::SeqCst),
            results,
        };
        tracing::info!(
            "🏁 Pass complete: {} ok, {} failed, {} skipped",
            summary.succeeded(),
            summary.failed(),
            summary.skipped
        );
        Ok(summary)
    }
}

/// One configuration's pipeline: job record, retried dispatch, finalize,
/// advance schedule. Never returns an error — every failure ends up inside
/// the outcome.
async fn process_config(
    db: &OrchestratorDb,
    dispatch: &DispatchTable,
    config: &AutomationConfig,
    now: DateTime<Utc>,
    max_attempts: u32,
) -> RunOutcome {
    tracing::info!(
        "🔔 Running {} for config {}",
        config.automation_type.as_str(),
        config.id
    );

    let job = Job::start(config, now);
    if let Err(e) = db.create_job(&job) {
        tracing::warn!("⚠️ Failed to record job for config {}: {e}", config.id);
    }

    let clock = Instant::now();
    let outcome = run_with_retry(|| dispatch.execute(config), max_attempts).await;
    let duration_ms = clock.elapsed().as_millis() as i64;

    let (success, result, error) = match outcome {
        Ok(value) => {
            match db.complete_job(&job.id, &value, duration_ms) {
                Ok(true) => {}
                Ok(false) => tracing::warn!("Job {} was already finalized", job.id),
                Err(e) => tracing::warn!("⚠️ Failed to finalize job {}: {e}", job.id),
            }
            tracing::info!(
                "✅ {} completed in {duration_ms}ms",
                config.automation_type.as_str()
            );
            (true, Some(value), None)
        }
        Err(e) => {
            let message = e.to_string();
            match db.fail_job(&job.id, &message, duration_ms) {
                Ok(true) => {}
                Ok(false) => tracing::warn!("Job {} was already finalized", job.id),
                Err(e) => tracing::warn!("⚠️ Failed to finalize job {}: {e}", job.id),
            }
            tracing::warn!(
                "❌ {} failed for config {}: {message}",
                config.automation_type.as_str(),
                config.id
            );
            (false, None, Some(message))
        }
    };

    // Failure does not block future runs: the schedule advances either way,
    // so a broken configuration waits for its next natural slot instead of
    // retrying every poll.
    let next_run = compute_next_run(config.frequency, config.schedule_time, now);
    if let Err(e) = db.update_schedule(&config.id, now, next_run) {
        tracing::warn!("⚠️ Failed to advance schedule for config {}: {e}", config.id);
    }

    RunOutcome {
        config_id: config.id.clone(),
        job_id: job.id,
        job_type: config.automation_type,
        success,
        duration_ms,
        result,
        error,
    }
}
