//! Job-scoped artifact storage and retention sweeping.
//!
//! This crate provides:
//! - A temp-file namespace keyed by job id (one directory per job)
//! - Tolerant deletion used by both cleanup paths
//! - The periodic retention sweeper that reclaims aged artifacts

pub mod artifacts;
pub mod error;
pub mod sweeper;

pub use artifacts::{file_extension, ArtifactStore};
pub use error::{StoreError, StoreResult};
pub use sweeper::RetentionSweeper;
