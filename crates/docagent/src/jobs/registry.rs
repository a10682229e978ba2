//! In-memory job registry.
//!
//! Each record sits behind its own lock so that a reader never sees a
//! half-applied update. The map lock is only held long enough to look up or
//! swap entries; it is always taken before a record lock, never after.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::jobs::record::JobRecord;

/// A registered record, shared between its engine and any readers.
pub type SharedRecord = Arc<RwLock<JobRecord>>;

/// Acquires a record for reading, recovering from a poisoned lock.
pub fn read_record(record: &SharedRecord) -> RwLockReadGuard<'_, JobRecord> {
    match record.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("Job record lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Acquires a record for writing, recovering from a poisoned lock.
pub fn write_record(record: &SharedRecord) -> RwLockWriteGuard<'_, JobRecord> {
    match record.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("Job record lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Concurrency-safe map from job id to record. Storage only, no policy.
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, SharedRecord>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn map_read(&self) -> RwLockReadGuard<'_, HashMap<String, SharedRecord>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn map_write(&self) -> RwLockWriteGuard<'_, HashMap<String, SharedRecord>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Registers a record under its own id and returns the shared handle.
    pub fn put(&self, record: JobRecord) -> SharedRecord {
        let id = record.id().to_string();
        let shared = Arc::new(RwLock::new(record));
        self.map_write().insert(id, Arc::clone(&shared));
        shared
    }

    pub fn get(&self, job_id: &str) -> Option<SharedRecord> {
        self.map_read().get(job_id).cloned()
    }

    pub fn delete(&self, job_id: &str) -> Option<SharedRecord> {
        self.map_write().remove(job_id)
    }

    pub fn len(&self) -> usize {
        self.map_read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map_read().is_empty()
    }

    /// Calls `f` with a consistent view of every registered record.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&JobRecord),
    {
        let records: Vec<SharedRecord> = self.map_read().values().cloned().collect();
        for record in &records {
            f(&read_record(record));
        }
    }

    /// Evicts terminal jobs that ended before `cutoff`. Running jobs are never
    /// touched. Returns the number of evicted jobs.
    pub fn reap_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut jobs = self.map_write();
        let before = jobs.len();
        jobs.retain(|_, record| {
            let record = read_record(record);
            match record.ended_at() {
                Some(ended_at) if record.is_terminal() => ended_at >= cutoff,
                _ => true,
            }
        });
        before - jobs.len()
    }
}
