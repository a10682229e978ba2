//! Public entry point for submitting and observing jobs.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;

use crate::broadcast::{JobEvent, JobEventBroadcaster};
use crate::config::schema::Config;
use crate::error::JobError;
use crate::generation::GenerationClient;
use crate::jobs::cancel::{CancelOutcome, CancellationController};
use crate::jobs::engine::{EngineSettings, ProcessingEngine};
use crate::jobs::projector::{project, project_shared, JobSnapshot};
use crate::jobs::reaper::JobReaper;
use crate::jobs::record::JobRecord;
use crate::jobs::registry::JobRegistry;
use crate::storage::FileStore;

/// Job orchestration facade.
///
/// `submit` spawns the job onto the current tokio runtime and returns as soon
/// as the record is registered. Status and cancel never wait on a running job.
#[derive(Clone)]
pub struct JobService {
    registry: Arc<JobRegistry>,
    engine: Arc<ProcessingEngine>,
    cancellation: Arc<CancellationController>,
    client: Arc<dyn GenerationClient>,
    events: JobEventBroadcaster,
}

impl JobService {
    pub fn new(
        store: Arc<dyn FileStore>,
        client: Arc<dyn GenerationClient>,
        settings: EngineSettings,
        event_capacity: usize,
    ) -> Self {
        let registry = Arc::new(JobRegistry::new());
        let events = JobEventBroadcaster::new(event_capacity);
        let engine = ProcessingEngine::new(
            Arc::clone(&registry),
            store,
            Arc::clone(&client),
            settings,
            events.clone(),
        );

        Self {
            cancellation: Arc::new(CancellationController::new(Arc::clone(&registry))),
            engine: Arc::new(engine),
            registry,
            client,
            events,
        }
    }

    pub fn from_config(
        config: &Config,
        store: Arc<dyn FileStore>,
        client: Arc<dyn GenerationClient>,
    ) -> Self {
        Self::new(
            store,
            client,
            EngineSettings::from_config(config),
            config.jobs.event_capacity,
        )
    }

    /// Validates the request, registers a job and starts it in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(
        &self,
        project_id: &str,
        file_ids: Vec<String>,
        agent_config: Option<Value>,
    ) -> Result<String, JobError> {
        if project_id.trim().is_empty() {
            return Err(JobError::InvalidInput("project id is required".to_string()));
        }
        if file_ids.is_empty() {
            return Err(JobError::InvalidInput(
                "at least one file id is required".to_string(),
            ));
        }
        if let Some(pos) = file_ids.iter().position(|f| f.trim().is_empty()) {
            return Err(JobError::InvalidInput(format!(
                "file id at position {} is blank",
                pos
            )));
        }
        let agent_config = match agent_config {
            Some(Value::Null) | None => {
                return Err(JobError::InvalidInput(
                    "agent configuration is required".to_string(),
                ))
            }
            Some(config) => config,
        };
        if !self.client.is_configured() {
            return Err(JobError::NotConfigured(
                "set an endpoint and API key for the generation service".to_string(),
            ));
        }

        let record = JobRecord::new(project_id, file_ids, agent_config);
        let job_id = record.id().to_string();
        let total = record.total_files();
        self.registry.put(record);
        self.events.track(&job_id, total).submitted();

        log::info!(
            "Submitted job {} for project {} ({} files)",
            job_id,
            project_id,
            total
        );

        let engine = Arc::clone(&self.engine);
        let spawned_id = job_id.clone();
        tokio::spawn(async move {
            engine.run(&spawned_id).await;
        });

        Ok(job_id)
    }

    pub fn get_status(&self, job_id: &str) -> Result<JobSnapshot, JobError> {
        self.registry
            .get(job_id)
            .map(|shared| project_shared(&shared))
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    /// Requests cooperative cancellation. Repeated requests are accepted.
    pub fn cancel(&self, job_id: &str) -> Result<(), JobError> {
        match self.cancellation.request_cancel(job_id)? {
            CancelOutcome::Requested | CancelOutcome::AlreadyRequested => Ok(()),
        }
    }

    /// Snapshots of all known jobs, newest first, optionally for one project.
    pub fn list_jobs(&self, project_id: Option<&str>) -> Vec<JobSnapshot> {
        let mut jobs = Vec::new();
        self.registry.for_each(|record| {
            if project_id.map_or(true, |p| record.project_id() == p) {
                jobs.push(project(record));
            }
        });
        jobs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        jobs
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    /// Creates a reaper over this service's registry. Call `start` on it to
    /// begin periodic eviction of finished jobs.
    pub fn reaper(&self, retention: chrono::Duration, interval: std::time::Duration) -> JobReaper {
        JobReaper::new(Arc::clone(&self.registry), retention, interval)
    }
}
