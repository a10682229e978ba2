use async_trait::async_trait;

use super::error::GenerationError;

/// A text-generation service. One call per file.
///
/// Implementations must be safe to share across concurrently running jobs.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generates text for `prompt`. `agent_config` is the job's opaque agent
    /// configuration, passed through unchanged.
    async fn generate(
        &self,
        prompt: &str,
        agent_config: &serde_json::Value,
    ) -> Result<String, GenerationError>;

    /// Returns false when no usable endpoint or credentials are set.
    fn is_configured(&self) -> bool;
}
