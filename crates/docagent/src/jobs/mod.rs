//! Job orchestration: records, registry, engine and the service facade.

pub mod cancel;
pub mod engine;
pub mod projector;
pub mod reaper;
pub mod record;
pub mod registry;
pub mod service;

pub use cancel::{CancelOutcome, CancellationController};
pub use engine::{EngineSettings, ProcessingEngine};
pub use projector::{project, JobSnapshot};
pub use reaper::JobReaper;
pub use record::{FileFailure, FileResult, JobRecord, JobStatus};
pub use registry::JobRegistry;
pub use service::JobService;
