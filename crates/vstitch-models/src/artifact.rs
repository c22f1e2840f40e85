//! Artifact roles within a job's temp namespace.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a file inside a job's artifact directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// The still image the video loops over
    InputImage,
    /// One audio track (a job may have several)
    InputAudio,
    /// The stitched video the encoder produces
    OutputVideo,
}

impl ArtifactKind {
    /// File-name stem used inside the job directory.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::InputImage => "input-image",
            ArtifactKind::InputAudio => "input-audio",
            ArtifactKind::OutputVideo => "output-video",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_stems() {
        assert_eq!(ArtifactKind::InputImage.as_str(), "input-image");
        assert_eq!(ArtifactKind::InputAudio.as_str(), "input-audio");
        assert_eq!(ArtifactKind::OutputVideo.as_str(), "output-video");
    }

    #[test]
    fn test_kind_serializes_kebab_case() {
        assert_eq!(serde_json::to_string(&ArtifactKind::OutputVideo).unwrap(), "\"output-video\"");
    }
}
