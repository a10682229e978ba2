pub mod broadcast;
pub mod config;
pub mod error;
pub mod generation;
pub mod jobs;
pub mod logging;
pub mod prompt;
pub mod sanitize;
pub mod secrets;
pub mod storage;

pub use broadcast::{JobEvent, JobEventBroadcaster, JobEventKind};
pub use config::{default_config_path, load_config, load_config_from_str, Config};
pub use error::{ConfigError, DocagentError, JobError, Result, StoreError};
pub use generation::{GenerationClient, GenerationError, HttpGenerationClient};
pub use jobs::{JobService, JobSnapshot, JobStatus};
pub use logging::{init_logging, LogFormat};
pub use secrets::{resolve_api_key, resolve_secret, resolve_secret_optional, SecretError};
pub use storage::{FileStore, FsFileStore};
