//! API request handlers

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use serde_json::Value;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use super::models::{ApiError, ProcessVideoRequest};
use super::server::AppState;
use crate::error::CaptionError;
use crate::pipeline::JobRequest;

/// Filename offered to the client for the captioned video.
pub const DOWNLOAD_FILENAME: &str = "video-with-captions.mp4";

/// Handle health check requests
pub async fn health() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "captioner",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Run the pipeline for one video and stream the captioned result back.
///
/// A body that is not valid JSON is treated like a missing `video_url`.
pub async fn process_video(
    State(state): State<AppState>,
    payload: Result<Json<ProcessVideoRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            warn!("Rejected request body: {}", rejection);
            ProcessVideoRequest::default()
        }
    };

    let request = JobRequest::parse(payload.video_url.as_deref()).inspect_err(|e| {
        warn!("Invalid process-video request: {}", e);
    })?;

    let result = state.pipeline.run(&request).await?;

    let file = File::open(result.video.path())
        .await
        .map_err(CaptionError::from)?;
    let length = file.metadata().await.map_err(CaptionError::from)?.len();

    info!(
        run_id = %result.video.run_id(),
        "Sending captioned video ({} bytes)", length
    );

    // The video owns the run workspace; keep it alive until the body is sent.
    let video = result.video;
    let stream = ReaderStream::new(file).map(move |chunk| {
        let _workspace = &video;
        chunk
    });

    let headers = [
        (header::CONTENT_TYPE, "video/mp4".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", DOWNLOAD_FILENAME),
        ),
        (header::CONTENT_LENGTH, length.to_string()),
    ];

    Ok((headers, Body::from_stream(stream)).into_response())
}
