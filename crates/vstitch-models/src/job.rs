//! Job records and the stitch job state machine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::Quality;

/// Unique identifier for a stitch job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State of a stitch job.
///
/// `Complete` and `Failed` are terminal; no transition leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Job is created but not yet picked up by its executor
    #[default]
    Pending,
    /// Job's executor is running the encoder
    Processing,
    /// Encoder finished and the output artifact was written
    Complete,
    /// Encoder failed or the pipeline hit an error
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Processing => "processing",
            JobState::Complete => "complete",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Complete | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One asynchronous request to stitch a still image and audio into a video.
///
/// Records live in the in-memory registry for the life of the process; they
/// are never deleted, only their on-disk artifacts are reclaimed.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Current state
    #[serde(default)]
    pub state: JobState,

    /// Quality preset the job was submitted with
    #[serde(default)]
    pub quality: Quality,

    /// Path of the output artifact, set on transition to `Complete`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    /// Encoder diagnostic text, set on transition to `Failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Started at timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// Completed at timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a new pending job.
    pub fn new(quality: Quality) -> Self {
        let now = Utc::now();

        Self {
            id: JobId::new(),
            state: JobState::Pending,
            quality,
            output_path: None,
            error: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    /// Move the job into `Processing`.
    pub fn start(&mut self) {
        self.state = JobState::Processing;
        self.started_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    /// Mark the job complete and record where the output landed.
    pub fn complete(&mut self, output_path: PathBuf) {
        self.state = JobState::Complete;
        self.output_path = Some(output_path);
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    /// Mark the job failed, preserving the encoder's diagnostic text.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.state = JobState::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_creation() {
        let job = Job::new(Quality::Medium);

        assert_eq!(job.state, JobState::Pending);
        assert_eq!(job.quality, Quality::Medium);
        assert!(job.output_path.is_none());
        assert!(job.error.is_none());
    }

    #[test]
    fn test_job_ids_are_unique() {
        let a = Job::new(Quality::Low);
        let b = Job::new(Quality::Low);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_job_state_transitions() {
        let mut job = Job::new(Quality::Low);

        job.start();
        assert_eq!(job.state, JobState::Processing);
        assert!(job.started_at.is_some());
        assert!(!job.state.is_terminal());

        job.complete(PathBuf::from("/tmp/out.mp4"));
        assert_eq!(job.state, JobState::Complete);
        assert_eq!(job.output_path.as_deref(), Some(std::path::Path::new("/tmp/out.mp4")));
        assert!(job.state.is_terminal());
    }

    #[test]
    fn test_job_failure_keeps_error_text() {
        let mut job = Job::new(Quality::High);
        job.start();
        job.fail("moov atom not found");

        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error.as_deref(), Some("moov atom not found"));
        assert!(job.state.is_terminal());
    }

    #[test]
    fn test_state_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&JobState::Pending).unwrap(), "\"pending\"");
        assert_eq!(serde_json::to_string(&JobState::Complete).unwrap(), "\"complete\"");
        assert_eq!(JobState::Failed.as_str(), "failed");
    }
}
