//! Scripted collaborators.
//!
//! Both fakes are configured up front; tests then inspect what the engine
//! asked of them.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, Semaphore};

use docagent::storage::FileStore;
use docagent::{GenerationClient, GenerationError, StoreError};

/// Extracts the file name line written by `prompt::build_prompt`.
pub fn file_name_from_prompt(prompt: &str) -> String {
    prompt
        .lines()
        .find_map(|line| line.strip_prefix("File name: "))
        .unwrap_or_default()
        .to_string()
}

/// In-memory store. Unknown file ids read as `NotFound`.
#[derive(Default)]
pub struct ScriptedStore {
    files: HashMap<String, Vec<u8>>,
    failing_writes: HashSet<String>,
    slow_reads: HashMap<String, Duration>,
    project_down: bool,
    pub writes: Mutex<Vec<(String, String)>>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, file_id: &str, content: &str) -> Self {
        self.files
            .insert(file_id.to_string(), content.as_bytes().to_vec());
        self
    }

    pub fn with_files(mut self, file_ids: &[&str]) -> Self {
        for id in file_ids {
            self.files
                .insert(id.to_string(), format!("content of {}", id).into_bytes());
        }
        self
    }

    /// Writes for this output name fail with a permission error.
    pub fn failing_write(mut self, output_name: &str) -> Self {
        self.failing_writes.insert(output_name.to_string());
        self
    }

    /// Reads of this file id stall for `delay` before answering.
    pub fn slow_read(mut self, file_id: &str, delay: Duration) -> Self {
        self.slow_reads.insert(file_id.to_string(), delay);
        self
    }

    pub fn project_down(mut self) -> Self {
        self.project_down = true;
        self
    }

    pub fn written_names(&self) -> Vec<String> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl FileStore for ScriptedStore {
    async fn read_file(&self, project_id: &str, file_id: &str) -> Result<Vec<u8>, StoreError> {
        if let Some(delay) = self.slow_reads.get(file_id) {
            tokio::time::sleep(*delay).await;
        }
        self.files
            .get(file_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                project_id: project_id.to_string(),
                file_id: file_id.to_string(),
            })
    }

    async fn write_output(
        &self,
        project_id: &str,
        file_name: &str,
        content: &[u8],
    ) -> Result<PathBuf, StoreError> {
        let path = PathBuf::from("/projects")
            .join(project_id)
            .join("outputs")
            .join(file_name);
        if self.failing_writes.contains(file_name) {
            return Err(StoreError::WriteFile {
                path,
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.writes.lock().unwrap().push((
            file_name.to_string(),
            String::from_utf8_lossy(content).into_owned(),
        ));
        Ok(path)
    }

    async fn check_project(&self, project_id: &str) -> Result<(), StoreError> {
        if self.project_down {
            return Err(StoreError::ProjectUnavailable(project_id.to_string()));
        }
        Ok(())
    }
}

/// Handle for a gated client: observe entered calls and release them.
pub struct GateControl {
    pub entered: mpsc::UnboundedReceiver<String>,
    permits: Arc<Semaphore>,
}

impl GateControl {
    /// Waits until the client has started generating for some file.
    pub async fn next_entered(&mut self) -> String {
        tokio::time::timeout(Duration::from_secs(5), self.entered.recv())
            .await
            .expect("no generation call started")
            .expect("gate closed")
    }

    pub fn release(&self, calls: usize) {
        self.permits.add_permits(calls);
    }
}

/// Generation client whose behavior is scripted per file name.
pub struct ScriptedClient {
    configured: bool,
    failing: HashSet<String>,
    delay: Option<Duration>,
    gate: Option<(mpsc::UnboundedSender<String>, Arc<Semaphore>)>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            configured: true,
            failing: HashSet::new(),
            delay: None,
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    /// Calls for these file names return an upstream 500.
    pub fn failing_for(mut self, file_ids: &[&str]) -> Self {
        self.failing = file_ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every call blocks until released through the returned control.
    pub fn gated(mut self) -> (Self, GateControl) {
        let (tx, rx) = mpsc::unbounded_channel();
        let permits = Arc::new(Semaphore::new(0));
        self.gate = Some((tx, Arc::clone(&permits)));
        (
            self,
            GateControl {
                entered: rx,
                permits,
            },
        )
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(&self, prompt: &str, _agent_config: &Value) -> Result<String, GenerationError> {
        let file_name = file_name_from_prompt(prompt);
        self.calls.lock().unwrap().push(file_name.clone());

        if let Some((entered, permits)) = &self.gate {
            let _ = entered.send(file_name.clone());
            permits
                .acquire()
                .await
                .map_err(|e| GenerationError::Transport(e.to_string()))?
                .forget();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(&file_name) {
            return Err(GenerationError::Upstream {
                status: 500,
                body: format!("model crashed on {}", file_name),
            });
        }
        Ok(format!("# Generated\n\nSummary of {}", file_name))
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}
