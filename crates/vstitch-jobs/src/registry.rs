//! In-memory job registry.
//!
//! The registry is the only state shared across concurrent units. The map
//! lock is held just long enough to look an entry up or insert one; each
//! entry carries its own lock, so status polls read concurrently while the
//! owning executor is the single writer. Nothing here blocks for the
//! duration of processing.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use vstitch_models::{Job, JobId, JobState};

/// Result type for registry transitions.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors from registry lookups and transitions.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("job not found: {0}")]
    NotFound(JobId),

    #[error("job {id} is already {state}, refusing transition")]
    InvalidTransition { id: JobId, state: JobState },
}

/// In-memory mapping from job id to job state.
///
/// Entries persist for the life of the process; only their on-disk
/// artifacts are reclaimed. The registry does not survive a restart.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Arc<Mutex<Job>>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new job record, returning its id.
    pub async fn create(&self, job: Job) -> JobId {
        let id = job.id.clone();
        let mut jobs = self.jobs.write().await;
        jobs.insert(id.clone(), Arc::new(Mutex::new(job)));
        id
    }

    /// Snapshot a job record for status reporting.
    pub async fn get(&self, id: &JobId) -> Option<Job> {
        let entry = self.entry(id).await?;
        let job = entry.lock().await;
        Some(job.clone())
    }

    /// Number of registered jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Move a pending job into `Processing`.
    pub async fn mark_processing(&self, id: &JobId) -> RegistryResult<()> {
        self.transition(id, |job| {
            if job.state != JobState::Pending {
                return Err(RegistryError::InvalidTransition {
                    id: job.id.clone(),
                    state: job.state,
                });
            }
            job.start();
            Ok(())
        })
        .await
    }

    /// Record a successful stitch and where the output landed.
    pub async fn complete(&self, id: &JobId, output_path: PathBuf) -> RegistryResult<()> {
        self.transition(id, |job| {
            if job.state.is_terminal() {
                return Err(RegistryError::InvalidTransition {
                    id: job.id.clone(),
                    state: job.state,
                });
            }
            job.complete(output_path);
            Ok(())
        })
        .await
    }

    /// Record a failed stitch, preserving the diagnostic text.
    pub async fn fail(&self, id: &JobId, error: impl Into<String>) -> RegistryResult<()> {
        let error = error.into();
        self.transition(id, move |job| {
            if job.state.is_terminal() {
                return Err(RegistryError::InvalidTransition {
                    id: job.id.clone(),
                    state: job.state,
                });
            }
            job.fail(error);
            Ok(())
        })
        .await
    }

    async fn entry(&self, id: &JobId) -> Option<Arc<Mutex<Job>>> {
        let jobs = self.jobs.read().await;
        jobs.get(id).cloned()
    }

    async fn transition<F>(&self, id: &JobId, apply: F) -> RegistryResult<()>
    where
        F: FnOnce(&mut Job) -> RegistryResult<()>,
    {
        let entry = self
            .entry(id)
            .await
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;

        let mut job = entry.lock().await;
        apply(&mut job).map_err(|e| {
            warn!(job_id = %id, "{}", e);
            e
        })
    }
}
