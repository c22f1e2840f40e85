//! FFmpeg boundary for the vstitch backend.
//!
//! This crate provides:
//! - Stitch command construction (image + audio tracks -> encoder argv)
//! - A process runner that captures exit status and output streams
//! - Remote audio download to the artifact namespace

pub mod download;
pub mod error;
pub mod runner;
pub mod stitch;

pub use download::download_to;
pub use error::{MediaError, MediaResult};
pub use runner::{ProcessOutput, ProcessRunner};
pub use stitch::{stitch_args, StitchPlan};
