//! Stitch command construction.
//!
//! Builds the FFmpeg argument list that loops a still image over the job's
//! audio and muxes them into a single video. With several audio tracks the
//! argv concatenates them into one stream first; the video stream is always
//! mapped from the image input, never from an audio input.

use std::path::PathBuf;

use vstitch_models::Quality;

/// Video codec for stitched output (H.264).
pub const VIDEO_CODEC: &str = "libx264";
/// Audio codec for stitched output.
pub const AUDIO_CODEC: &str = "aac";
/// Pixel format broadly supported by players.
pub const PIXEL_FORMAT: &str = "yuv420p";
/// Encoder tune profile for a looped still image.
pub const STILL_IMAGE_TUNE: &str = "stillimage";

/// Everything the executor needs to run one stitch.
///
/// `audio` holds at least one track; submission validation rejects empty
/// audio before a plan is built.
#[derive(Debug, Clone)]
pub struct StitchPlan {
    /// Still image input
    pub image: PathBuf,
    /// Audio inputs, in playback order
    pub audio: Vec<PathBuf>,
    /// Where the encoder writes the stitched video
    pub output: PathBuf,
    /// Video bitrate, e.g. "1000k"
    pub video_bitrate: String,
    /// Audio bitrate, e.g. "128k"
    pub audio_bitrate: String,
}

impl StitchPlan {
    /// Build a plan with the bitrate pair of a quality preset.
    pub fn new(
        image: PathBuf,
        audio: Vec<PathBuf>,
        output: PathBuf,
        quality: Quality,
    ) -> Self {
        let (video_bitrate, audio_bitrate) = quality.bitrates();
        Self {
            image,
            audio,
            output,
            video_bitrate: video_bitrate.to_string(),
            audio_bitrate: audio_bitrate.to_string(),
        }
    }
}

/// Build the encoder argv for a stitch plan.
///
/// Input 0 is the looped image; inputs 1..=N are the audio tracks. Video is
/// mapped only from input 0. For N >= 2 the audio streams run through a
/// `concat` filter and the labeled result is the sole audio source.
pub fn stitch_args(plan: &StitchPlan) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-loop".into(),
        "1".into(),
        "-i".into(),
        plan.image.to_string_lossy().into_owned(),
    ];

    for audio in &plan.audio {
        args.push("-i".into());
        args.push(audio.to_string_lossy().into_owned());
    }

    if plan.audio.len() > 1 {
        let inputs: String = (1..=plan.audio.len()).map(|i| format!("[{i}:a]")).collect();
        args.push("-filter_complex".into());
        args.push(format!(
            "{inputs}concat=n={}:v=0:a=1[aout]",
            plan.audio.len()
        ));
        args.push("-map".into());
        args.push("0:v".into());
        args.push("-map".into());
        args.push("[aout]".into());
    } else {
        args.push("-map".into());
        args.push("0:v".into());
        args.push("-map".into());
        args.push("1:a".into());
    }

    args.extend([
        "-c:v".into(),
        VIDEO_CODEC.into(),
        "-b:v".into(),
        plan.video_bitrate.clone(),
        "-tune".into(),
        STILL_IMAGE_TUNE.into(),
        "-c:a".into(),
        AUDIO_CODEC.into(),
        "-b:a".into(),
        plan.audio_bitrate.clone(),
        "-pix_fmt".into(),
        PIXEL_FORMAT.into(),
        "-shortest".into(),
        plan.output.to_string_lossy().into_owned(),
    ]);

    args
}
