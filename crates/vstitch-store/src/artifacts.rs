//! On-disk artifact namespace, one directory per job.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use vstitch_models::{ArtifactKind, JobId};

use crate::error::{StoreError, StoreResult};

/// Fallback extension for image uploads with no usable filename.
pub const DEFAULT_IMAGE_EXT: &str = ".jpg";
/// Fallback extension for audio uploads with no usable filename.
pub const DEFAULT_AUDIO_EXT: &str = ".mp3";
/// Extension of the stitched output.
pub const OUTPUT_EXT: &str = ".mp4";

/// Derive a safe file extension (with leading dot) from a client-supplied
/// filename, falling back when the name has none or it looks hostile.
pub fn file_extension(filename: Option<&str>, fallback: &str) -> String {
    let ext = filename
        .map(Path::new)
        .and_then(Path::extension)
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext {
        Some(e) if !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()) => {
            format!(".{e}")
        }
        _ => fallback.to_string(),
    }
}

/// Artifact store over a dedicated temp directory.
///
/// Paths are partitioned by job id, so concurrent jobs never contend on the
/// same file. Files are only ever reclaimed by the retention sweeper or by
/// failed-submission cleanup, never by the request path that consumed them.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `root`. The directory is created lazily by
    /// [`ensure_root`](Self::ensure_root) or the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if it does not exist yet.
    pub async fn ensure_root(&self) -> StoreResult<()> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StoreError::RootUnavailable {
                root: self.root.display().to_string(),
                source,
            })
    }

    /// Directory holding all of one job's artifacts.
    pub fn job_dir(&self, job_id: &JobId) -> PathBuf {
        self.root.join(job_id.as_str())
    }

    /// Derive the collision-free path for one artifact.
    ///
    /// The same (job, kind, index) tuple always yields the same path;
    /// distinct indexes yield distinct paths for multi-audio jobs.
    pub fn allocate(
        &self,
        job_id: &JobId,
        kind: ArtifactKind,
        index: Option<usize>,
        ext: &str,
    ) -> PathBuf {
        let name = match index {
            Some(i) => format!("{}-{}{}", kind.as_str(), i, ext),
            None => format!("{}{}", kind.as_str(), ext),
        };
        self.job_dir(job_id).join(name)
    }

    /// Persist bytes at `path`, creating parent directories as needed.
    pub async fn write(&self, path: &Path, bytes: &[u8]) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(path, bytes).await?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    /// Delete files if present.
    ///
    /// Already-missing files are not an error; a denied deletion is logged
    /// and skipped. Returns how many files were actually removed.
    pub async fn delete(&self, paths: &[PathBuf]) -> usize {
        let mut removed = 0;
        for path in paths {
            match fs::remove_file(path).await {
                Ok(()) => {
                    debug!("Removed artifact {}", path.display());
                    removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!("Failed to remove artifact {}: {}", path.display(), e);
                }
            }
        }
        removed
    }

    /// Remove a job's whole directory.
    ///
    /// Used when a submission fails before its job record exists, so no
    /// job id would ever reference the partial artifacts. Best effort.
    pub async fn remove_job_dir(&self, job_id: &JobId) {
        let dir = self.job_dir(job_id);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => debug!("Removed job dir {}", dir.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove job dir {}: {}", dir.display(), e),
        }
    }
}
