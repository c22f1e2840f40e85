//! Stitch submission and status handlers.
//!
//! Submission validates the request, persists every input through the
//! artifact store, registers a pending job, and hands off to the executor
//! without awaiting it. Status answers polls against the registry and
//! streams the finished artifact while it still exists.

use axum::body::{Body, Bytes};
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tracing::info;
use url::Url;

use vstitch_media::{download_to, StitchPlan};
use vstitch_models::{ArtifactKind, Job, JobId, JobState, Quality};
use vstitch_store::artifacts::{DEFAULT_AUDIO_EXT, DEFAULT_IMAGE_EXT, OUTPUT_EXT};
use vstitch_store::file_extension;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Response returned when a job is accepted.
#[derive(Serialize)]
pub struct SubmitResponse {
    pub message: String,
    pub job_id: JobId,
}

/// Status poll response for every non-streaming outcome.
#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StatusResponse {
    fn state(state: JobState) -> Self {
        Self {
            status: state.as_str(),
            error: None,
            detail: None,
        }
    }

    fn failed(error: Option<String>) -> Self {
        Self {
            status: JobState::Failed.as_str(),
            error: Some(error.unwrap_or_else(|| "An unknown error occurred.".to_string())),
            detail: None,
        }
    }

    fn expired() -> Self {
        Self {
            status: JobState::Complete.as_str(),
            error: None,
            detail: Some("artifact expired".to_string()),
        }
    }
}

/// One uploaded file field.
struct Upload {
    bytes: Bytes,
    filename: Option<String>,
}

/// Parsed and validated submission.
struct Submission {
    image: Upload,
    audio_files: Vec<Upload>,
    audio_urls: Vec<String>,
    quality: Quality,
}

/// POST /stitch/submit
///
/// Accepts a multipart form with one `image` file, either `audio` file
/// field(s) or an `audio_urls` JSON array (mutually exclusive), and an
/// optional `quality` selector. Returns the job id without waiting for
/// encoding.
pub async fn submit_stitch(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let submission = parse_submission(multipart).await?;

    // Inputs land on disk before the job record exists; if anything fails
    // here no job id will ever reference the partials, so clean them up now
    // instead of leaving them for the sweeper.
    let job = Job::new(submission.quality);
    let plan = match persist_inputs(&state, &job.id, &submission).await {
        Ok(plan) => plan,
        Err(e) => {
            state.store.remove_job_dir(&job.id).await;
            return Err(e);
        }
    };

    let id = state.registry.create(job).await;
    // Fire and forget: the job is observed through the registry, never
    // through this handle.
    let _ = state.executor.spawn(id.clone(), plan);

    info!(job_id = %id, quality = submission.quality.as_str(), "Stitch job accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            message: "Stitching job accepted.".to_string(),
            job_id: id,
        }),
    ))
}

/// GET /stitch/status/{job_id}
pub async fn stitch_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let id = JobId::from_string(job_id);
    let job = state
        .registry
        .get(&id)
        .await
        .ok_or_else(|| ApiError::not_found("Job ID not found."))?;

    match job.state {
        JobState::Pending | JobState::Processing => {
            Ok(Json(StatusResponse::state(job.state)).into_response())
        }
        JobState::Failed => Ok(Json(StatusResponse::failed(job.error)).into_response()),
        JobState::Complete => {
            let Some(output) = job.output_path else {
                return Ok(Json(StatusResponse::expired()).into_response());
            };
            stream_artifact(&output).await
        }
    }
}

/// Stream a finished artifact, or report it expired if the sweeper already
/// reclaimed the file. Expiry is a normal outcome, not an error.
async fn stream_artifact(output: &std::path::Path) -> ApiResult<Response> {
    let file = match tokio::fs::File::open(output).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Json(StatusResponse::expired()).into_response());
        }
        Err(e) => {
            return Err(ApiError::internal(format!(
                "could not open {}: {e}",
                output.display()
            )));
        }
    };

    let content_length = file.metadata().await.ok().map(|m| m.len());
    let body = Body::from_stream(ReaderStream::new(file));

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"stitched_video.mp4\"",
        );
    if let Some(len) = content_length {
        builder = builder.header(header::CONTENT_LENGTH, len);
    }

    builder
        .body(body)
        .map_err(|e| ApiError::internal(e.to_string()))
}

/// Pull the submission apart and validate it. No artifacts are written and
/// no job is created unless this succeeds.
async fn parse_submission(mut multipart: Multipart) -> ApiResult<Submission> {
    let mut image: Option<Upload> = None;
    let mut audio_files: Vec<Upload> = Vec::new();
    let mut audio_urls: Option<Vec<String>> = None;
    let mut quality = Quality::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => {
                let filename = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("reading image field: {e}")))?;
                image = Some(Upload { bytes, filename });
            }
            Some("audio") => {
                let filename = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("reading audio field: {e}")))?;
                audio_files.push(Upload { bytes, filename });
            }
            Some("audio_urls") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("reading audio_urls field: {e}")))?;
                let urls: Vec<String> = serde_json::from_str(&raw).map_err(|_| {
                    ApiError::validation("audio_urls must be a JSON array of URLs")
                })?;
                audio_urls = Some(urls);
            }
            Some("quality") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("reading quality field: {e}")))?;
                quality = Quality::from_param(&raw);
            }
            _ => {}
        }
    }

    let image = image.ok_or_else(|| ApiError::validation("an image file is required"))?;
    if image.bytes.is_empty() {
        return Err(ApiError::validation("image file is empty"));
    }

    // The two audio input modes are mutually exclusive for one job
    if audio_urls.is_some() && !audio_files.is_empty() {
        return Err(ApiError::validation(
            "supply either uploaded audio files or audio_urls, not both",
        ));
    }

    let audio_urls = audio_urls.unwrap_or_default();
    if audio_files.is_empty() && audio_urls.is_empty() {
        return Err(ApiError::validation("at least one audio input is required"));
    }

    for raw in &audio_urls {
        let parsed = Url::parse(raw)
            .map_err(|_| ApiError::validation(format!("not a valid URL: {raw}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::validation(format!(
                "audio URLs must be http(s): {raw}"
            )));
        }
    }

    Ok(Submission {
        image,
        audio_files,
        audio_urls,
        quality,
    })
}

/// Write every input into the job's artifact namespace and derive the plan.
async fn persist_inputs(
    state: &AppState,
    job_id: &JobId,
    submission: &Submission,
) -> ApiResult<StitchPlan> {
    let image_ext = file_extension(submission.image.filename.as_deref(), DEFAULT_IMAGE_EXT);
    let image_path = state
        .store
        .allocate(job_id, ArtifactKind::InputImage, None, &image_ext);
    state.store.write(&image_path, &submission.image.bytes).await?;

    let mut audio_paths = Vec::with_capacity(
        submission.audio_files.len() + submission.audio_urls.len(),
    );

    for (index, upload) in submission.audio_files.iter().enumerate() {
        let ext = file_extension(upload.filename.as_deref(), DEFAULT_AUDIO_EXT);
        let path = state
            .store
            .allocate(job_id, ArtifactKind::InputAudio, Some(index), &ext);
        state.store.write(&path, &upload.bytes).await?;
        audio_paths.push(path);
    }

    for (index, raw) in submission.audio_urls.iter().enumerate() {
        let ext = url_extension(raw);
        let path = state
            .store
            .allocate(job_id, ArtifactKind::InputAudio, Some(index), &ext);
        download_to(&state.http, raw, &path)
            .await
            .map_err(ApiError::from)?;
        audio_paths.push(path);
    }

    let output = state
        .store
        .allocate(job_id, ArtifactKind::OutputVideo, None, OUTPUT_EXT);

    Ok(StitchPlan::new(
        image_path,
        audio_paths,
        output,
        submission.quality,
    ))
}

/// Best-effort extension from the last path segment of an audio URL.
fn url_extension(raw: &str) -> String {
    let segment = Url::parse(raw)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|s| s.last().map(str::to_string))
        });
    file_extension(segment.as_deref(), DEFAULT_AUDIO_EXT)
}
