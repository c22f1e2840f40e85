//! End-to-end submit -> poll -> retrieve flow against a stub encoder.

use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::util::ServiceExt;
use wiremock::matchers::{method, path as url_path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vstitch_api::{create_router, ApiConfig, AppState};
use vstitch_store::RetentionSweeper;

const BOUNDARY: &str = "vstitchtestboundary";

/// Stub that writes its last argument (the declared output path) and exits
/// zero, like a well-behaved encoder. Sleeps briefly so the first poll can
/// observe a non-terminal state.
const OK_ENCODER: &str =
    "#!/bin/sh\nsleep 1\nfor last in \"$@\"; do :; done\nprintf 'videobytes' > \"$last\"\n";

/// Stub that fails with a diagnostic on stderr.
const FAILING_ENCODER: &str = "#!/bin/sh\necho 'encoder blew up' >&2\nexit 1\n";

fn write_script(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("encoder.sh");
    std::fs::write(&path, body).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

async fn test_state(dir: &Path, encoder: &str) -> AppState {
    let script = write_script(dir, encoder);
    let config = ApiConfig {
        artifact_root: dir.join("artifacts"),
        encoder_binary: script.to_string_lossy().into_owned(),
        ..ApiConfig::default()
    };
    AppState::new(config).await.unwrap()
}

/// Build a multipart body; `filename: None` marks a plain text field.
fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, bytes) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match filename {
            Some(f) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn submit(router: &Router, parts: &[(&str, Option<&str>, &[u8])]) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/stitch/submit")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn poll_status(router: &Router, job_id: &str) -> axum::response::Response {
    let request = Request::builder()
        .method("GET")
        .uri(format!("/stitch/status/{job_id}"))
        .body(Body::empty())
        .unwrap();
    router.clone().oneshot(request).await.unwrap()
}

/// Poll until the job leaves pending/processing. Returns the terminal
/// response (JSON for failed/expired, the video stream for complete).
async fn poll_until_terminal(router: &Router, job_id: &str) -> axum::response::Response {
    for _ in 0..200 {
        let response = poll_status(router, job_id).await;

        let is_video = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v == "video/mp4")
            .unwrap_or(false);
        if is_video {
            return response;
        }

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        match json["status"].as_str() {
            Some("pending") | Some("processing") => {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            _ => {
                // rebuild a JSON response for the caller
                return axum::response::Response::builder()
                    .status(StatusCode::OK)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(bytes))
                    .unwrap();
            }
        }
    }
    panic!("job {job_id} never reached a terminal state");
}

fn image_part<'a>() -> (&'a str, Option<&'a str>, &'a [u8]) {
    ("image", Some("cover.jpg"), b"jpegbytes".as_slice())
}

fn audio_part<'a>(name: &'a str) -> (&'a str, Option<&'a str>, &'a [u8]) {
    ("audio", Some(name), b"mp3bytes".as_slice())
}

#[tokio::test]
async fn submit_then_stream_output() {
    let dir = tempfile::TempDir::new().unwrap();
    let state = test_state(dir.path(), OK_ENCODER).await;
    let router = create_router(state);

    let (status, json) = submit(&router, &[image_part(), audio_part("track.mp3"), ("quality", None, b"high")]).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let job_id = json["job_id"].as_str().unwrap().to_string();

    // Immediately queryable, not yet terminal (the stub sleeps first)
    let response = poll_status(&router, &job_id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let early: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(matches!(
        early["status"].as_str(),
        Some("pending") | Some("processing")
    ));

    // Terminal response streams exactly the bytes the encoder produced
    let response = poll_until_terminal(&router, &job_id).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "video/mp4"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"stitched_video.mp4\""
    );
    let video = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&video[..], b"videobytes");

    // The artifact is still there afterwards; only the sweeper reclaims it
    let response = poll_until_terminal(&router, &job_id).await;
    let video = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&video[..], b"videobytes");
}

#[tokio::test]
async fn failed_job_reports_encoder_stderr() {
    let dir = tempfile::TempDir::new().unwrap();
    let state = test_state(dir.path(), FAILING_ENCODER).await;
    let router = create_router(state);

    let (status, json) = submit(&router, &[image_part(), audio_part("track.mp3")]).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let job_id = json["job_id"].as_str().unwrap().to_string();

    let response = poll_until_terminal(&router, &job_id).await;
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(json["status"], "failed");
    assert_eq!(json["error"].as_str().map(str::trim), Some("encoder blew up"));
}

#[tokio::test]
async fn submission_without_audio_is_rejected_before_any_job() {
    let dir = tempfile::TempDir::new().unwrap();
    let state = test_state(dir.path(), OK_ENCODER).await;
    let artifact_root = state.config.artifact_root.clone();
    let router = create_router(state);

    let (status, json) = submit(&router, &[image_part()]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["detail"].as_str().unwrap().contains("audio"));

    // no job dir was created
    let entries: Vec<_> = std::fs::read_dir(&artifact_root).unwrap().collect();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn mixing_uploads_and_urls_is_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    let state = test_state(dir.path(), OK_ENCODER).await;
    let artifact_root = state.config.artifact_root.clone();
    let router = create_router(state);

    let (status, json) = submit(
        &router,
        &[
            image_part(),
            audio_part("track.mp3"),
            ("audio_urls", None, br#"["https://example.com/a.mp3"]"#),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["detail"].as_str().unwrap().contains("not both"));

    let entries: Vec<_> = std::fs::read_dir(&artifact_root).unwrap().collect();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let dir = tempfile::TempDir::new().unwrap();
    let state = test_state(dir.path(), OK_ENCODER).await;
    let router = create_router(state);

    let response = poll_status(&router, "no-such-job").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn swept_artifact_reports_expired_not_failed() {
    let dir = tempfile::TempDir::new().unwrap();
    let state = test_state(dir.path(), OK_ENCODER).await;
    let store = (*state.store).clone();
    let router = create_router(state);

    let (_, json) = submit(&router, &[image_part(), audio_part("track.mp3")]).await;
    let job_id = json["job_id"].as_str().unwrap().to_string();

    // run to completion
    let response = poll_until_terminal(&router, &job_id).await;
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "video/mp4"
    );

    // sweep everything regardless of job state
    let sweeper = RetentionSweeper::new(store, Duration::from_secs(60), Duration::ZERO);
    assert!(sweeper.sweep_once().await.unwrap() > 0);

    // the job still reports complete, with the expiry detail
    let response = poll_status(&router, &job_id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "complete");
    assert_eq!(json["detail"], "artifact expired");
}

#[tokio::test]
async fn concurrent_submissions_stay_isolated() {
    let dir = tempfile::TempDir::new().unwrap();
    let state = test_state(dir.path(), OK_ENCODER).await;
    let router = create_router(state);

    let (status_a, json_a) = submit(&router, &[image_part(), audio_part("a.mp3"), ("quality", None, b"medium")]).await;
    let (status_b, json_b) = submit(&router, &[image_part(), audio_part("b.mp3"), ("quality", None, b"medium")]).await;
    assert_eq!(status_a, StatusCode::ACCEPTED);
    assert_eq!(status_b, StatusCode::ACCEPTED);

    let id_a = json_a["job_id"].as_str().unwrap().to_string();
    let id_b = json_b["job_id"].as_str().unwrap().to_string();
    assert_ne!(id_a, id_b);

    let response_a = poll_until_terminal(&router, &id_a).await;
    let response_b = poll_until_terminal(&router, &id_b).await;

    for response in [response_a, response_b] {
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "video/mp4"
        );
        let video = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&video[..], b"videobytes");
    }
}

#[tokio::test]
async fn audio_urls_are_downloaded_and_stitched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(url_path("/one.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"audio-one".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(url_path("/two.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"audio-two".to_vec()))
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let state = test_state(dir.path(), OK_ENCODER).await;
    let router = create_router(state);

    let urls = format!(r#"["{0}/one.mp3", "{0}/two.mp3"]"#, server.uri());
    let (status, json) = submit(
        &router,
        &[image_part(), ("audio_urls", None, urls.as_bytes())],
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let job_id = json["job_id"].as_str().unwrap().to_string();
    let response = poll_until_terminal(&router, &job_id).await;
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "video/mp4"
    );
}

#[tokio::test]
async fn unreachable_audio_url_rejects_submission() {
    let dir = tempfile::TempDir::new().unwrap();
    let state = test_state(dir.path(), OK_ENCODER).await;
    let artifact_root = state.config.artifact_root.clone();
    let router = create_router(state);

    let (status, json) = submit(
        &router,
        &[
            image_part(),
            ("audio_urls", None, br#"["http://127.0.0.1:1/gone.mp3"]"#),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["detail"].as_str().unwrap().contains("download failed"));

    // the partial job dir was cleaned up eagerly, not left for the sweeper
    let entries: Vec<_> = std::fs::read_dir(&artifact_root).unwrap().collect();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn malformed_audio_urls_field_is_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    let state = test_state(dir.path(), OK_ENCODER).await;
    let router = create_router(state);

    let (status, _) = submit(
        &router,
        &[image_part(), ("audio_urls", None, b"not-json")],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = submit(
        &router,
        &[image_part(), ("audio_urls", None, br#"["ftp://example.com/a.mp3"]"#)],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
