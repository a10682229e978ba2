use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// Root directory holding one subdirectory per project.
    pub projects_directory: String,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    pub fn projects_path(&self) -> PathBuf {
        PathBuf::from(&self.projects_directory)
    }
}

/// Text-generation service settings.
///
/// The API key is resolved from `api_key`, `api_key_file` or `api_key_env_var`,
/// in that order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Chat completions URL. Empty means the service is not configured.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_file: Option<String>,
    #[serde(default = "default_api_key_env_var")]
    pub api_key_env_var: Option<String>,
    /// Upper bound for a single generation call.
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env_var() -> Option<String> {
    Some("DOCAGENT_API_KEY".to_string())
}

fn default_generation_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            model: default_model(),
            api_key: None,
            api_key_file: None,
            api_key_env_var: default_api_key_env_var(),
            timeout_secs: default_generation_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Longest supported retention, ten years.
pub const MAX_RETENTION_HOURS: u64 = 87_600;

/// Job orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Upper bound for a single file store read or write.
    #[serde(default = "default_store_timeout")]
    pub store_timeout_secs: u64,
    /// How long finished jobs stay queryable.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,
    #[serde(default = "default_reap_interval")]
    pub reap_interval_secs: u64,
    /// Capacity of the job event broadcast channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_store_timeout() -> u64 {
    10
}

fn default_retention_hours() -> u64 {
    24
}

fn default_reap_interval() -> u64 {
    300
}

fn default_event_capacity() -> usize {
    100
}

impl JobsConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    /// `None` when `retention_hours` does not fit a `chrono::Duration`.
    pub fn retention(&self) -> Option<chrono::Duration> {
        i64::try_from(self.retention_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            store_timeout_secs: default_store_timeout(),
            retention_hours: default_retention_hours(),
            reap_interval_secs: default_reap_interval(),
            event_capacity: default_event_capacity(),
        }
    }
}

/// Naming of generated output files: `<stem>_<suffix>.<extension>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_suffix")]
    pub suffix: String,
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_suffix() -> String {
    "processed".to_string()
}

fn default_extension() -> String {
    "md".to_string()
}

impl OutputConfig {
    /// Output file name for a source file id.
    pub fn output_name(&self, file_id: &str) -> String {
        let stem = match file_id.rfind('.') {
            Some(pos) if pos > 0 => &file_id[..pos],
            _ => file_id,
        };
        format!("{}_{}.{}", stem, self.suffix, self.extension)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: default_suffix(),
            extension: default_extension(),
        }
    }
}
