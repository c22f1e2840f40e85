//! Per-job execution pipeline.
//!
//! One executor task runs per job, spawned at submission and never awaited
//! by the request path. The task is a hard firewall: every failure inside
//! it ends as a `Failed` record on the job, nothing propagates out.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use vstitch_media::{stitch_args, ProcessRunner, StitchPlan};
use vstitch_models::JobId;

use crate::registry::JobRegistry;

/// Spawns and drives one stitch per job.
#[derive(Clone)]
pub struct JobExecutor {
    registry: Arc<JobRegistry>,
    runner: ProcessRunner,
}

impl JobExecutor {
    pub fn new(registry: Arc<JobRegistry>, runner: ProcessRunner) -> Self {
        Self { registry, runner }
    }

    /// Hand a job off to its own execution task.
    ///
    /// Returns the task handle; the submission path drops it (the job is
    /// observed via the registry), tests may await it.
    pub fn spawn(&self, id: JobId, plan: StitchPlan) -> JoinHandle<()> {
        let registry = Arc::clone(&self.registry);
        let runner = self.runner.clone();

        tokio::spawn(async move {
            Self::execute(registry, runner, id, plan).await;
        })
    }

    /// Run the pipeline: Processing -> encoder -> Complete | Failed.
    async fn execute(registry: Arc<JobRegistry>, runner: ProcessRunner, id: JobId, plan: StitchPlan) {
        if let Err(e) = registry.mark_processing(&id).await {
            error!(job_id = %id, "Could not start job: {}", e);
            return;
        }

        let args = stitch_args(&plan);
        debug!(job_id = %id, "Encoder argv: {} {}", runner.program(), args.join(" "));

        let outcome = match runner.run(&args).await {
            Ok(out) if out.success() => {
                // The encoder must actually have written the declared output
                if tokio::fs::metadata(&plan.output).await.is_ok() {
                    registry.complete(&id, plan.output.clone()).await
                } else {
                    registry
                        .fail(&id, "encoder exited successfully but wrote no output")
                        .await
                }
            }
            Ok(out) => {
                let detail = if out.stderr.is_empty() {
                    format!("encoder exited with status {:?}", out.exit_code)
                } else {
                    // diagnostic text preserved verbatim for the caller
                    out.stderr
                };
                registry.fail(&id, detail).await
            }
            Err(e) => registry.fail(&id, e.to_string()).await,
        };

        match outcome {
            Ok(()) => {
                let state = registry.get(&id).await.map(|j| j.state);
                info!(job_id = %id, state = ?state, "Stitch job finished");
            }
            Err(e) => error!(job_id = %id, "Failed to record job outcome: {}", e),
        }
    }
}
