//! Service wiring and polling helpers.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use docagent::jobs::EngineSettings;
use docagent::{FileStore, GenerationClient, JobService, JobSnapshot};

use super::fakes::{ScriptedClient, ScriptedStore};

pub struct TestHarness {
    pub service: JobService,
    pub store: Arc<ScriptedStore>,
    pub client: Arc<ScriptedClient>,
}

impl TestHarness {
    pub fn new(store: ScriptedStore, client: ScriptedClient) -> Self {
        Self::with_settings(store, client, EngineSettings::default())
    }

    pub fn with_settings(store: ScriptedStore, client: ScriptedClient, settings: EngineSettings) -> Self {
        let store = Arc::new(store);
        let client = Arc::new(client);
        let service = JobService::new(
            Arc::clone(&store) as Arc<dyn FileStore>,
            Arc::clone(&client) as Arc<dyn GenerationClient>,
            settings,
            64,
        );
        Self {
            service,
            store,
            client,
        }
    }

    pub fn submit(&self, file_ids: &[&str]) -> String {
        self.service
            .submit("proj", ids(file_ids), Some(agent_config()))
            .expect("submit failed")
    }

    pub async fn wait(&self, job_id: &str) -> JobSnapshot {
        wait_for_terminal(&self.service, job_id).await
    }
}

pub fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

pub fn agent_config() -> Value {
    json!({
        "name": "Summarizer",
        "instructions": "Summarize the document in three bullet points."
    })
}

/// Polls until the job reaches a terminal status, checking the counter
/// invariants on every snapshot seen along the way.
pub async fn wait_for_terminal(service: &JobService, job_id: &str) -> JobSnapshot {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let snapshot = service.get_status(job_id).expect("job disappeared");
        assert_counters(&snapshot);
        if snapshot.is_finished() {
            return snapshot;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {} did not finish: {:?}",
            job_id,
            snapshot.status
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub fn assert_counters(snapshot: &JobSnapshot) {
    assert_eq!(
        snapshot.processed_count,
        snapshot.results.len() + snapshot.errors.len(),
        "processed count out of sync"
    );
    assert!(snapshot.processed_count <= snapshot.total_files);
    assert_eq!(snapshot.is_finished(), snapshot.ended_at.is_some());
}
