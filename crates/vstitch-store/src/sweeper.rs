//! Background retention sweeping of aged artifacts.
//!
//! The sweeper runs independently of job state: every artifact older than
//! the retention window is deleted, including outputs of jobs the registry
//! still reports complete. Callers that poll after the window has elapsed
//! get an "artifact expired" answer and must re-submit.

use std::time::Duration;

use tokio::fs;
use tokio::time::interval;
use tracing::{debug, error, info};

use crate::artifacts::ArtifactStore;

/// Retention sweeper service.
pub struct RetentionSweeper {
    store: ArtifactStore,
    sweep_interval: Duration,
    retention: Duration,
    enabled: bool,
}

impl RetentionSweeper {
    /// Create a sweeper over `store` that runs every `sweep_interval` and
    /// reclaims artifacts older than `retention`.
    pub fn new(store: ArtifactStore, sweep_interval: Duration, retention: Duration) -> Self {
        // Kill-switch for environments that manage the temp dir themselves
        let enabled = std::env::var("ENABLE_RETENTION_SWEEP")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        Self {
            store,
            sweep_interval,
            retention,
            enabled,
        }
    }

    /// Start the background sweep loop.
    ///
    /// Runs indefinitely and should be spawned as a background task.
    pub async fn run(&self) {
        if !self.enabled {
            info!("Retention sweeping is disabled");
            return;
        }

        info!(
            "Starting retention sweeper (interval: {:?}, retention: {:?})",
            self.sweep_interval, self.retention
        );

        let mut ticker = interval(self.sweep_interval);

        loop {
            ticker.tick().await;

            match self.sweep_once().await {
                Ok(0) => {}
                Ok(n) => info!("Retention sweep reclaimed {} artifact(s)", n),
                Err(e) => error!("Retention sweep error: {}", e),
            }
        }
    }

    /// Run a single sweep cycle (also used directly by tests).
    ///
    /// Idempotent and safe to run concurrently with job execution and
    /// retrieval: deletion is delete-if-present, and a file vanishing
    /// between listing and removal is not an error.
    pub async fn sweep_once(&self) -> anyhow::Result<usize> {
        let root = self.store.root().to_path_buf();

        let mut job_dirs = match fs::read_dir(&root).await {
            Ok(rd) => rd,
            // Nothing has been written yet
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut reclaimed = 0usize;

        while let Some(job_dir) = job_dirs.next_entry().await? {
            let dir_path = job_dir.path();
            if !job_dir.file_type().await?.is_dir() {
                continue;
            }

            let mut entries = match fs::read_dir(&dir_path).await {
                Ok(rd) => rd,
                Err(_) => continue,
            };

            let mut aged = Vec::new();
            let mut remaining = 0usize;

            while let Some(entry) = entries.next_entry().await? {
                let age = entry
                    .metadata()
                    .await
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .and_then(|mtime| mtime.elapsed().ok());

                match age {
                    Some(age) if age >= self.retention => aged.push(entry.path()),
                    // Unreadable metadata: leave the file for a later sweep
                    _ => remaining += 1,
                }
            }

            reclaimed += self.store.delete(&aged).await;

            if remaining == 0 && !aged.is_empty() {
                // Last artifact gone; drop the now-empty job directory
                if let Err(e) = fs::remove_dir(&dir_path).await {
                    debug!("Job dir {} not removed: {}", dir_path.display(), e);
                }
            }
        }

        Ok(reclaimed)
    }
}
