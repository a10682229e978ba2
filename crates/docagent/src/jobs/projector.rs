//! Read-only job snapshots for API responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::jobs::record::{FileFailure, FileResult, JobRecord, JobStatus};
use crate::jobs::registry::{read_record, SharedRecord};

/// Consistent copy of a job's observable state at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: String,
    pub project_id: String,
    pub status: JobStatus,
    pub progress_percent: u8,
    pub processed_count: usize,
    pub total_files: usize,
    pub results: Vec<FileResult>,
    pub errors: Vec<FileFailure>,
    pub cancel_requested: bool,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Whole-job fault message, set only when the job aborted outright.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
}

impl JobSnapshot {
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Builds a snapshot from a record the caller already holds.
pub fn project(record: &JobRecord) -> JobSnapshot {
    JobSnapshot {
        id: record.id().to_string(),
        project_id: record.project_id().to_string(),
        status: record.status(),
        progress_percent: record.progress_percent(),
        processed_count: record.processed_count(),
        total_files: record.total_files(),
        results: record.results().to_vec(),
        errors: record.errors().to_vec(),
        cancel_requested: record.cancel_requested(),
        started_at: record.started_at(),
        ended_at: record.ended_at(),
        fault: record.fault().map(str::to_string),
    }
}

/// Snapshots a registered record under its read lock.
pub fn project_shared(shared: &SharedRecord) -> JobSnapshot {
    project(&read_record(shared))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_project_fresh_record() {
        let record = JobRecord::new(
            "proj",
            vec!["a.txt".to_string(), "b.txt".to_string()],
            serde_json::json!({}),
        );
        let snapshot = project(&record);

        assert_eq!(snapshot.id, record.id());
        assert_eq!(snapshot.status, JobStatus::Starting);
        assert_eq!(snapshot.total_files, 2);
        assert_eq!(snapshot.processed_count, 0);
        assert_eq!(snapshot.progress_percent, 0);
        assert!(snapshot.ended_at.is_none());
        assert!(!snapshot.is_finished());
    }

    #[test]
    fn test_snapshot_is_detached_from_record() {
        let mut record = JobRecord::new("proj", vec!["a".to_string()], serde_json::json!({}));
        record.transition(JobStatus::Processing).unwrap();
        let before = project(&record);

        record.record_success("a", PathBuf::from("/out/a.md")).unwrap();
        assert_eq!(before.processed_count, 0);
        assert!(before.results.is_empty());

        let after = project(&record);
        assert_eq!(after.processed_count, 1);
        assert_eq!(after.progress_percent, 100);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let mut record = JobRecord::new("proj", vec!["a".to_string()], serde_json::json!({}));
        record.transition(JobStatus::Processing).unwrap();
        record.record_failure("a", "upstream returned 500").unwrap();
        record.transition(record.outcome()).unwrap();

        let json = serde_json::to_value(project(&record)).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["progressPercent"], 100);
        assert_eq!(json["totalFiles"], 1);
        assert_eq!(json["errors"][0]["fileId"], "a");
        assert_eq!(json["errors"][0]["errorMessage"], "upstream returned 500");
        assert!(json.get("endedAt").is_some());
        assert!(json.get("fault").is_none());
    }
}
