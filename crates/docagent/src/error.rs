use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::generation::GenerationError;
use crate::jobs::JobStatus;
use crate::secrets::SecretError;

#[derive(Error, Debug)]
pub enum DocagentError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Secret error: {0}")]
    Secret(#[from] SecretError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

/// Errors returned synchronously by the job service.
///
/// Per-file failures never surface here; they are recorded on the job.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Generation service is not configured: {0}")]
    NotConfigured(String),

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job {job_id} already finished with status {status}")]
    AlreadyTerminal { job_id: String, status: JobStatus },

    #[error("Invalid job transition from {from} to {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("Job {job_id} is {status}; file results can only be recorded while processing")]
    NotProcessing { job_id: String, status: JobStatus },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("File '{file_id}' not found in project '{project_id}'")]
    NotFound { project_id: String, file_id: String },

    #[error("Project '{0}' is not available")]
    ProjectUnavailable(String),

    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage operation timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, DocagentError>;
