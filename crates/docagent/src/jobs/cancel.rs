//! Cooperative cancellation.
//!
//! Cancelling only raises a flag on the record. The engine looks at it before
//! starting each file, so an upstream call already in flight runs to the end.

use std::sync::Arc;

use crate::error::JobError;
use crate::jobs::registry::{write_record, JobRegistry};

/// Outcome of a cancellation request against a known job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The flag is set; the engine will stop at the next file boundary.
    Requested,
    /// The flag had already been set by an earlier request.
    AlreadyRequested,
}

pub struct CancellationController {
    registry: Arc<JobRegistry>,
}

impl CancellationController {
    pub fn new(registry: Arc<JobRegistry>) -> Self {
        Self { registry }
    }

    /// Requests cancellation of a job.
    ///
    /// Fails with `NotFound` for unknown ids and `AlreadyTerminal` when the
    /// job has finished; neither case mutates anything.
    pub fn request_cancel(&self, job_id: &str) -> Result<CancelOutcome, JobError> {
        let shared = self
            .registry
            .get(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

        let mut record = write_record(&shared);
        let already = record.cancel_requested();
        record.request_cancel()?;

        if already {
            log::debug!("Cancellation already requested for job {}", job_id);
            Ok(CancelOutcome::AlreadyRequested)
        } else {
            log::info!(
                "Cancellation requested for job {} ({}/{} files processed)",
                job_id,
                record.processed_count(),
                record.total_files()
            );
            Ok(CancelOutcome::Requested)
        }
    }
}
