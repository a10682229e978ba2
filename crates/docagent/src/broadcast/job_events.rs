//! Job event broadcaster for real-time progress streaming.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::jobs::JobStatus;

/// What happened to a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobEventKind {
    Submitted,
    Started,
    FileSucceeded,
    FileFailed,
    Finished,
}

impl std::fmt::Display for JobEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobEventKind::Submitted => write!(f, "Submitted"),
            JobEventKind::Started => write!(f, "Started"),
            JobEventKind::FileSucceeded => write!(f, "File succeeded"),
            JobEventKind::FileFailed => write!(f, "File failed"),
            JobEventKind::Finished => write!(f, "Finished"),
        }
    }
}

/// Progress event for a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEvent {
    pub job_id: String,
    pub kind: JobEventKind,
    /// Job status after the event was applied.
    pub status: JobStatus,
    pub processed_count: usize,
    pub total_files: usize,
    /// File the event refers to, for per-file events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    /// Output location (set on file success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    /// Human-readable message describing the event.
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl JobEvent {
    pub fn new(
        job_id: &str,
        kind: JobEventKind,
        status: JobStatus,
        processed_count: usize,
        total_files: usize,
        message: &str,
    ) -> Self {
        Self {
            job_id: job_id.to_string(),
            kind,
            status,
            processed_count,
            total_files,
            file_id: None,
            output_path: None,
            message: message.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_file(mut self, file_id: &str) -> Self {
        self.file_id = Some(file_id.to_string());
        self
    }

    pub fn with_output(mut self, output_path: &Path) -> Self {
        self.output_path = Some(output_path.display().to_string());
        self
    }
}

/// Broadcasts job events to any number of subscribers.
#[derive(Clone)]
pub struct JobEventBroadcaster {
    sender: Arc<broadcast::Sender<JobEvent>>,
}

impl JobEventBroadcaster {
    /// Creates a broadcaster with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends an event to all subscribers.
    pub fn send(&self, event: JobEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }

    /// Creates a tracker bound to one job.
    pub fn track(&self, job_id: &str, total_files: usize) -> JobEventTracker {
        JobEventTracker {
            job_id: job_id.to_string(),
            total_files,
            sender: Arc::clone(&self.sender),
        }
    }
}

impl Default for JobEventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Emits events for a single job.
pub struct JobEventTracker {
    job_id: String,
    total_files: usize,
    sender: Arc<broadcast::Sender<JobEvent>>,
}

impl JobEventTracker {
    fn event(&self, kind: JobEventKind, status: JobStatus, processed: usize, message: &str) -> JobEvent {
        JobEvent::new(&self.job_id, kind, status, processed, self.total_files, message)
    }

    pub fn submitted(&self) {
        let event = self.event(
            JobEventKind::Submitted,
            JobStatus::Starting,
            0,
            "Job accepted",
        );
        let _ = self.sender.send(event);
    }

    pub fn started(&self) {
        let event = self.event(
            JobEventKind::Started,
            JobStatus::Processing,
            0,
            "Processing started",
        );
        let _ = self.sender.send(event);
    }

    pub fn file_succeeded(&self, file_id: &str, output_path: &Path, processed: usize) {
        let event = self
            .event(
                JobEventKind::FileSucceeded,
                JobStatus::Processing,
                processed,
                "File processed",
            )
            .with_file(file_id)
            .with_output(output_path);
        let _ = self.sender.send(event);
    }

    pub fn file_failed(&self, file_id: &str, error: &str, processed: usize) {
        let event = self
            .event(JobEventKind::FileFailed, JobStatus::Processing, processed, error)
            .with_file(file_id);
        let _ = self.sender.send(event);
    }

    pub fn finished(&self, status: JobStatus, processed: usize) {
        let message = format!("Job finished: {}", status);
        let event = self.event(JobEventKind::Finished, status, processed, &message);
        let _ = self.sender.send(event);
    }
}
