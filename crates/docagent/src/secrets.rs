//! Resolution of the generation API key.
//!
//! The key can come from three places, checked in this order:
//!
//! 1. **Direct value** in the config (`api_key`), for local experiments
//! 2. **File reference** (`api_key_file`), e.g. a mounted container secret
//! 3. **Env var reference** (`api_key_env_var`, default `DOCAGENT_API_KEY`)

use secrecy::SecretString;
use std::fs;

use crate::config::schema::GenerationConfig;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need one of: direct value, file path, or env var name)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// Resolves a secret from the first non-empty source.
///
/// File contents and env values are trimmed, since both commonly carry a
/// trailing newline.
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString> {
    if let Some(value) = direct.filter(|v| !v.is_empty()) {
        return Ok(SecretString::from(value.to_string()));
    }

    if let Some(path) = file_path.filter(|p| !p.is_empty()) {
        let expanded = expand_home(path);
        return fs::read_to_string(&expanded)
            .map(|content| SecretString::from(content.trim().to_string()))
            .map_err(|e| SecretError::FileReadError {
                path: expanded,
                source: e,
            });
    }

    if let Some(var_name) = env_var.filter(|v| !v.is_empty()) {
        return match std::env::var(var_name) {
            Ok(value) => Ok(SecretString::from(value.trim().to_string())),
            Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                name: var_name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                name: var_name.to_string(),
            }),
        };
    }

    Err(SecretError::NoSourceProvided)
}

/// Like [`resolve_secret`], but a missing source yields `None`.
pub fn resolve_secret_optional(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<Option<SecretString>> {
    match resolve_secret(direct, file_path, env_var) {
        Ok(secret) => Ok(Some(secret)),
        Err(SecretError::NoSourceProvided) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn has_secret_source(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> bool {
    direct.is_some_and(|s| !s.is_empty())
        || file_path.is_some_and(|s| !s.is_empty())
        || env_var.is_some_and(|s| !s.is_empty())
}

/// Resolves the API key for the generation service.
///
/// An unset env var is not an error here: the service then simply reports
/// itself as not configured and job submission is refused. An unreadable
/// key file is still an error.
pub fn resolve_api_key(settings: &GenerationConfig) -> Result<Option<SecretString>> {
    let direct = settings.api_key.as_deref();
    let file_path = settings.api_key_file.as_deref();
    let env_var = settings.api_key_env_var.as_deref();

    if !has_secret_source(direct, file_path, env_var) {
        log::warn!("No API key source configured, job submission will be refused");
        return Ok(None);
    }

    match resolve_secret_optional(direct, file_path, env_var) {
        Err(SecretError::EnvVarNotSet { name }) => {
            log::warn!("API key env var {} is not set", name);
            Ok(None)
        }
        other => other,
    }
}

/// Expands a leading `~` to the user's home directory.
///
/// `~user/path` is not supported.
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            let home = home.to_string_lossy();
            if path == "~" {
                return home.into_owned();
            }
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}
