//! Quality presets and their encoder bitrates.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Bitrate pair for the `low` preset (video, audio).
pub const LOW_BITRATES: (&str, &str) = ("500k", "96k");
/// Bitrate pair for the `medium` preset.
pub const MEDIUM_BITRATES: (&str, &str) = ("1000k", "128k");
/// Bitrate pair for the `high` preset.
pub const HIGH_BITRATES: (&str, &str) = ("2000k", "192k");

/// Quality selector for a stitch job.
///
/// Maps to a fixed (video-bitrate, audio-bitrate) pair. Unrecognized
/// selector strings fall back to `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    #[default]
    Low,
    Medium,
    High,
}

impl Quality {
    /// Parse a client-supplied selector, falling back to `Low`.
    pub fn from_param(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Quality::High,
            "medium" => Quality::Medium,
            _ => Quality::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
        }
    }

    /// The (video-bitrate, audio-bitrate) pair for this preset.
    pub fn bitrates(&self) -> (&'static str, &'static str) {
        match self {
            Quality::Low => LOW_BITRATES,
            Quality::Medium => MEDIUM_BITRATES,
            Quality::High => HIGH_BITRATES,
        }
    }
}
