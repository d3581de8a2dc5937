//! Request and response bodies

use crate::error::CaptionError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct ProcessVideoRequest {
    #[serde(default)]
    pub video_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A failed request, rendered as `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError(pub CaptionError);

impl From<CaptionError> for ApiError {
    fn from(err: CaptionError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    pub fn message(&self) -> String {
        match &self.0 {
            CaptionError::Validation(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = ApiError(CaptionError::Validation("video_url is required".to_string()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "video_url is required");
    }

    #[test]
    fn test_stage_failure_maps_to_server_error() {
        let err = ApiError(CaptionError::TranscriptionFailed("job 1: bad audio".to_string()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Transcription failed: job 1: bad audio");
    }

    #[test]
    fn test_request_without_url_deserializes() {
        let request: ProcessVideoRequest = serde_json::from_str("{}").unwrap();
        assert!(request.video_url.is_none());
    }
}
