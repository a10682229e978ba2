//! Per-job processing loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::{info_span, Instrument};

use crate::broadcast::{JobEventBroadcaster, JobEventTracker};
use crate::config::schema::{Config, OutputConfig};
use crate::error::StoreError;
use crate::generation::{GenerationClient, GenerationError};
use crate::jobs::record::JobStatus;
use crate::jobs::registry::{read_record, write_record, JobRegistry, SharedRecord};
use crate::prompt::build_prompt;
use crate::sanitize::{hash_path, redact_path};
use crate::storage::FileStore;

/// Failure of a single file. Recorded on the job, never propagated.
#[derive(Debug, Error)]
enum FileFault {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Timeouts and naming used by the engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub store_timeout: Duration,
    pub generation_timeout: Duration,
    pub output: OutputConfig,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            store_timeout: config.jobs.store_timeout(),
            generation_timeout: config.generation.timeout(),
            output: config.output.clone(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(10),
            generation_timeout: Duration::from_secs(30),
            output: OutputConfig::default(),
        }
    }
}

/// Inputs captured from the record before the loop starts.
struct JobPlan {
    project_id: String,
    file_ids: Vec<String>,
    agent_config: Value,
}

/// Drives one job from `starting` to a terminal status.
///
/// Files are handled strictly in order. The record's write lock is only held
/// for the in-memory update after each file, never across an await.
pub struct ProcessingEngine {
    registry: Arc<JobRegistry>,
    store: Arc<dyn FileStore>,
    client: Arc<dyn GenerationClient>,
    settings: EngineSettings,
    events: JobEventBroadcaster,
}

impl ProcessingEngine {
    pub fn new(
        registry: Arc<JobRegistry>,
        store: Arc<dyn FileStore>,
        client: Arc<dyn GenerationClient>,
        settings: EngineSettings,
        events: JobEventBroadcaster,
    ) -> Self {
        Self {
            registry,
            store,
            client,
            settings,
            events,
        }
    }

    /// Runs the job to completion. Must be called at most once per job.
    pub async fn run(&self, job_id: &str) {
        let Some(shared) = self.registry.get(job_id) else {
            log::warn!("Engine asked to run unknown job {}", job_id);
            return;
        };

        let plan = {
            let record = read_record(&shared);
            if record.status() != JobStatus::Starting {
                log::warn!(
                    "Job {} is {} and cannot be started again",
                    job_id,
                    record.status()
                );
                return;
            }
            JobPlan {
                project_id: record.project_id().to_string(),
                file_ids: record.file_ids().to_vec(),
                agent_config: record.agent_config().clone(),
            }
        };

        let span = info_span!(
            "job",
            job_id = %job_id,
            project = %plan.project_id,
            files = plan.file_ids.len()
        );
        self.run_plan(job_id, &shared, plan).instrument(span).await;
    }

    async fn run_plan(&self, job_id: &str, shared: &SharedRecord, plan: JobPlan) {
        let tracker = self.events.track(job_id, plan.file_ids.len());

        if let Err(e) = self.preflight(&plan.project_id).await {
            self.fault(shared, &tracker, &format!("Pre-flight check failed: {}", e));
            return;
        }

        if plan.file_ids.is_empty() {
            self.fault(shared, &tracker, "Job has no files to process");
            return;
        }

        if let Err(e) = write_record(shared).transition(JobStatus::Processing) {
            log::error!("Job {} could not enter processing: {}", job_id, e);
            return;
        }
        tracker.started();
        log::info!(
            "Job {} started: {} files in project {}",
            job_id,
            plan.file_ids.len(),
            plan.project_id
        );

        for file_id in &plan.file_ids {
            if read_record(shared).cancel_requested() {
                self.finish_cancelled(job_id, shared, &tracker);
                return;
            }

            let outcome = self
                .process_file(&plan.project_id, file_id, &plan.agent_config)
                .instrument(info_span!("process_file", file = %file_id))
                .await;

            let (recorded, processed) = {
                let mut record = write_record(shared);
                let recorded = match &outcome {
                    Ok(path) => record.record_success(file_id, path.clone()),
                    Err(e) => record.record_failure(file_id, &e.to_string()),
                };
                (recorded, record.processed_count())
            };

            if let Err(e) = recorded {
                log::error!("Job {} failed to record file {}: {}", job_id, file_id, e);
                continue;
            }

            match outcome {
                Ok(path) => {
                    log::debug!(
                        "Job {}: {} -> {} ({})",
                        job_id,
                        file_id,
                        redact_path(&path),
                        hash_path(&path)
                    );
                    tracker.file_succeeded(file_id, &path, processed);
                }
                Err(e) => {
                    log::warn!("Job {}: file {} failed: {}", job_id, file_id, e);
                    tracker.file_failed(file_id, &e.to_string(), processed);
                }
            }
        }

        // A cancel that landed while the last file was in flight still wins.
        // Checked under the write lock so no request slips in before the transition.
        let mut record = write_record(shared);
        let outcome = if record.cancel_requested() {
            JobStatus::Cancelled
        } else {
            record.outcome()
        };
        match record.transition(outcome) {
            Ok(()) => {
                log::info!(
                    "Job {} finished as {} ({} ok, {} failed)",
                    job_id,
                    outcome,
                    record.results().len(),
                    record.errors().len()
                );
                tracker.finished(outcome, record.processed_count());
            }
            Err(e) => log::error!("Job {} could not be finalized: {}", job_id, e),
        }
    }

    async fn preflight(&self, project_id: &str) -> Result<(), StoreError> {
        let store_timeout = self.settings.store_timeout;
        tokio::time::timeout(store_timeout, self.store.check_project(project_id))
            .await
            .map_err(|_| StoreError::Timeout(store_timeout))?
    }

    async fn process_file(
        &self,
        project_id: &str,
        file_id: &str,
        agent_config: &Value,
    ) -> Result<PathBuf, FileFault> {
        let store_timeout = self.settings.store_timeout;

        let content = tokio::time::timeout(store_timeout, self.store.read_file(project_id, file_id))
            .await
            .map_err(|_| StoreError::Timeout(store_timeout))??;

        let prompt = build_prompt(file_id, &content, agent_config);

        let generation_timeout = self.settings.generation_timeout;
        let generated = tokio::time::timeout(
            generation_timeout,
            self.client.generate(&prompt, agent_config),
        )
        .await
        .map_err(|_| GenerationError::Timeout(generation_timeout))??;

        let output_name = self.settings.output.output_name(file_id);
        let path = tokio::time::timeout(
            store_timeout,
            self.store
                .write_output(project_id, &output_name, generated.as_bytes()),
        )
        .await
        .map_err(|_| StoreError::Timeout(store_timeout))??;

        Ok(path)
    }

    fn finish_cancelled(&self, job_id: &str, shared: &SharedRecord, tracker: &JobEventTracker) {
        let mut record = write_record(shared);
        match record.transition(JobStatus::Cancelled) {
            Ok(()) => {
                log::info!(
                    "Job {} cancelled after {}/{} files",
                    job_id,
                    record.processed_count(),
                    record.total_files()
                );
                tracker.finished(JobStatus::Cancelled, record.processed_count());
            }
            Err(e) => log::error!("Job {} could not be cancelled: {}", job_id, e),
        }
    }

    fn fault(&self, shared: &SharedRecord, tracker: &JobEventTracker, message: &str) {
        let mut record = write_record(shared);
        match record.fail(message) {
            Ok(()) => {
                log::error!("Job {} aborted: {}", record.id(), message);
                tracker.finished(JobStatus::Error, record.processed_count());
            }
            Err(e) => log::error!("Job {} could not be faulted: {}", record.id(), e),
        }
    }
}
