//! Job record and its state machine.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::JobError;

/// Status of a batch job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Starting,
    Processing,
    Completed,
    CompletedWithErrors,
    Error,
    Cancelled,
}

impl JobStatus {
    /// Returns true if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed
                | JobStatus::CompletedWithErrors
                | JobStatus::Error
                | JobStatus::Cancelled
        )
    }

    /// Returns whether `self -> next` is a legal transition.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Starting, JobStatus::Processing) => true,
            (JobStatus::Starting, JobStatus::Error) => true,
            (JobStatus::Processing, next) => next.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Starting => "starting",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::CompletedWithErrors => "completed_with_errors",
            JobStatus::Error => "error",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file that was generated successfully.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileResult {
    pub file_id: String,
    pub output_path: PathBuf,
    pub processed_at: DateTime<Utc>,
}

/// A file that failed; the batch continued past it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileFailure {
    pub file_id: String,
    pub error_message: String,
    pub timestamp: DateTime<Utc>,
}

/// Mutable state of one batch job.
///
/// Only the engine running the job writes to it, always under the record's
/// lock in the registry. Once the status is terminal nothing changes.
#[derive(Debug, Clone)]
pub struct JobRecord {
    id: String,
    project_id: String,
    file_ids: Vec<String>,
    agent_config: serde_json::Value,
    status: JobStatus,
    processed_count: usize,
    results: Vec<FileResult>,
    errors: Vec<FileFailure>,
    cancel_requested: bool,
    fault: Option<String>,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// Creates a record in `starting` state with a fresh id.
    pub fn new(project_id: &str, file_ids: Vec<String>, agent_config: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            file_ids,
            agent_config,
            status: JobStatus::Starting,
            processed_count: 0,
            results: Vec::new(),
            errors: Vec::new(),
            cancel_requested: false,
            fault: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn file_ids(&self) -> &[String] {
        &self.file_ids
    }

    pub fn agent_config(&self) -> &serde_json::Value {
        &self.agent_config
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn processed_count(&self) -> usize {
        self.processed_count
    }

    pub fn total_files(&self) -> usize {
        self.file_ids.len()
    }

    pub fn results(&self) -> &[FileResult] {
        &self.results
    }

    pub fn errors(&self) -> &[FileFailure] {
        &self.errors
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested
    }

    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `round(100 * processed / total)`, 0 for an empty job.
    pub fn progress_percent(&self) -> u8 {
        let total = self.file_ids.len();
        if total == 0 {
            return 0;
        }
        let percent = (self.processed_count as f64 * 100.0 / total as f64).round();
        percent.clamp(0.0, 100.0) as u8
    }

    /// Moves to `next`, stamping `ended_at` when `next` is terminal.
    pub fn transition(&mut self, next: JobStatus) -> Result<(), JobError> {
        if !self.status.can_transition_to(next) {
            return Err(JobError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.ended_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Records a successful file and advances the counter together.
    pub fn record_success(&mut self, file_id: &str, output_path: PathBuf) -> Result<(), JobError> {
        self.ensure_processing()?;
        self.results.push(FileResult {
            file_id: file_id.to_string(),
            output_path,
            processed_at: Utc::now(),
        });
        self.processed_count += 1;
        Ok(())
    }

    /// Records a failed file and advances the counter together.
    pub fn record_failure(&mut self, file_id: &str, message: &str) -> Result<(), JobError> {
        self.ensure_processing()?;
        self.errors.push(FileFailure {
            file_id: file_id.to_string(),
            error_message: message.to_string(),
            timestamp: Utc::now(),
        });
        self.processed_count += 1;
        Ok(())
    }

    /// Sets the cancel flag. Fails on a terminal record, which stays untouched.
    pub fn request_cancel(&mut self) -> Result<(), JobError> {
        if self.is_terminal() {
            return Err(JobError::AlreadyTerminal {
                job_id: self.id.clone(),
                status: self.status,
            });
        }
        self.cancel_requested = true;
        Ok(())
    }

    /// Final status for a loop that ran to the end without cancellation.
    pub fn outcome(&self) -> JobStatus {
        match (self.results.is_empty(), self.errors.is_empty()) {
            (_, true) => JobStatus::Completed,
            (false, false) => JobStatus::CompletedWithErrors,
            (true, false) => JobStatus::Error,
        }
    }

    /// Aborts the job with a whole-job fault.
    pub fn fail(&mut self, message: &str) -> Result<(), JobError> {
        self.transition(JobStatus::Error)?;
        self.fault = Some(message.to_string());
        Ok(())
    }

    fn ensure_processing(&self) -> Result<(), JobError> {
        if self.status != JobStatus::Processing {
            return Err(JobError::NotProcessing {
                job_id: self.id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }
}
