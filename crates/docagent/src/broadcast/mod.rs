//! Broadcasting of job lifecycle events for live observers.
//!
//! Observers are optional: the registry stays the source of truth, and
//! events sent with no subscriber are dropped.

pub mod job_events;

pub use job_events::{JobEvent, JobEventBroadcaster, JobEventKind, JobEventTracker};
