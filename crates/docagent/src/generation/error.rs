use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while generating text for a single file.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Upstream returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Request to generation service failed: {0}")]
    Transport(String),

    #[error("Failed to parse generation response: {0}")]
    ResponseParse(String),

    #[error("Generation service not configured: {0}")]
    NotConfigured(String),
}

impl GenerationError {
    /// Returns true for failures that may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            GenerationError::Timeout(_) | GenerationError::Transport(_) => true,
            GenerationError::Upstream { status, .. } => *status == 429 || *status >= 500,
            GenerationError::ResponseParse(_) | GenerationError::NotConfigured(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GenerationError::Timeout(Duration::from_secs(30)).is_transient());
        assert!(GenerationError::Transport("reset".into()).is_transient());
        assert!(GenerationError::Upstream {
            status: 503,
            body: String::new()
        }
        .is_transient());
        assert!(GenerationError::Upstream {
            status: 429,
            body: String::new()
        }
        .is_transient());
        assert!(!GenerationError::Upstream {
            status: 401,
            body: String::new()
        }
        .is_transient());
        assert!(!GenerationError::ResponseParse("no choices".into()).is_transient());
    }
}
