use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::StoreError;

/// Project file storage used by the job engine.
///
/// Implementations must be safe to share across concurrently running jobs.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Reads the raw bytes of a project file.
    async fn read_file(&self, project_id: &str, file_id: &str) -> Result<Vec<u8>, StoreError>;

    /// Writes a generated output and returns where it landed.
    async fn write_output(
        &self,
        project_id: &str,
        file_name: &str,
        content: &[u8],
    ) -> Result<PathBuf, StoreError>;

    /// Verifies the project is reachable before any file is attempted.
    async fn check_project(&self, project_id: &str) -> Result<(), StoreError>;
}
