use std::path::{Path, PathBuf};

use crate::config::schema::{Config, MAX_RETENTION_HOURS};
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

/// Default location: `<config dir>/docagent/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("docagent").join("config.json"))
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(invalid(format!(
            "Unsupported config version: {}",
            config.version
        )));
    }

    if config.projects_directory.trim().is_empty() {
        return Err(invalid("projects_directory must not be empty"));
    }

    let generation = &config.generation;
    let endpoint = generation.endpoint.trim();
    if !endpoint.is_empty() && !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
    {
        return Err(invalid(format!(
            "generation.endpoint must be an http(s) URL, got '{}'",
            crate::sanitize::redact_url(endpoint)
        )));
    }
    if generation.timeout_secs == 0 || generation.connect_timeout_secs == 0 {
        return Err(invalid("generation timeouts must be greater than zero"));
    }

    if config.jobs.store_timeout_secs == 0 {
        return Err(invalid("jobs.store_timeout_secs must be greater than zero"));
    }
    if config.jobs.retention_hours > MAX_RETENTION_HOURS {
        return Err(invalid(format!(
            "jobs.retention_hours must be at most {}",
            MAX_RETENTION_HOURS
        )));
    }
    if config.jobs.reap_interval_secs == 0 {
        return Err(invalid("jobs.reap_interval_secs must be greater than zero"));
    }
    if config.jobs.event_capacity == 0 {
        return Err(invalid("jobs.event_capacity must be greater than zero"));
    }

    // Output parts end up in file names
    for (key, value) in [
        ("output.suffix", &config.output.suffix),
        ("output.extension", &config.output.extension),
    ] {
        if value.is_empty() || value.contains('/') || value.contains('\\') || value.contains("..")
        {
            return Err(invalid(format!(
                "{} must be a plain name without path separators",
                key
            )));
        }
    }

    Ok(())
}
