//! Application state.

use std::sync::Arc;

use vstitch_jobs::{JobExecutor, JobRegistry};
use vstitch_media::ProcessRunner;
use vstitch_store::{ArtifactStore, StoreError};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub registry: Arc<JobRegistry>,
    pub store: Arc<ArtifactStore>,
    pub executor: JobExecutor,
    pub http: reqwest::Client,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, StoreError> {
        let store = ArtifactStore::new(config.artifact_root.clone());
        store.ensure_root().await?;

        let registry = Arc::new(JobRegistry::new());
        let runner = ProcessRunner::new().with_program(config.encoder_binary.clone());
        let executor = JobExecutor::new(Arc::clone(&registry), runner);

        Ok(Self {
            config,
            registry,
            store: Arc::new(store),
            executor,
            http: reqwest::Client::new(),
        })
    }
}
