use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptionError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Failed to fetch source video: {0}")]
    Fetch(String),

    #[error("External tool failed: {0}")]
    ExternalTool(String),

    #[error("Audio upload failed: {0}")]
    Upload(String),

    #[error("Transcription submission failed: {0}")]
    Submission(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Transcription {job_id} did not finish within {}s", .waited.as_secs())]
    TranscriptionTimeout { job_id: String, waited: Duration },

    #[error("Status query for transcription {job_id} failed: {source}")]
    StatusQuery {
        job_id: String,
        #[source]
        source: Box<CaptionError>,
    },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CaptionError {
    /// Stable name used in logs.
    ///
    /// `api`, `http` and `json` are raw client failures; the pipeline only
    /// surfaces them from polling wrapped in `StatusQuery`.
    pub fn kind(&self) -> &'static str {
        match self {
            CaptionError::Validation(_) => "validation",
            CaptionError::Fetch(_) => "fetch",
            CaptionError::ExternalTool(_) => "external_tool",
            CaptionError::Upload(_) => "upload",
            CaptionError::Submission(_) => "submission",
            CaptionError::TranscriptionFailed(_) => "transcription_failed",
            CaptionError::TranscriptionTimeout { .. } => "transcription_timeout",
            CaptionError::StatusQuery { .. } => "status_query",
            CaptionError::Api { .. } => "api",
            CaptionError::Config(_) => "config",
            CaptionError::Io(_) => "io",
            CaptionError::Http(_) => "http",
            CaptionError::Json(_) => "json",
        }
    }

    /// Whether a status query that failed this way may be attempted again.
    pub fn is_transient(&self) -> bool {
        match self {
            CaptionError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            CaptionError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// True when the caller supplied bad input rather than the run failing.
    pub fn is_client_error(&self) -> bool {
        matches!(self, CaptionError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, CaptionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_errors_transient_on_server_side() {
        let err = CaptionError::Api {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(err.is_transient());

        let err = CaptionError::Api {
            status: 429,
            message: "slow down".to_string(),
        };
        assert!(err.is_transient());

        let err = CaptionError::Api {
            status: 404,
            message: "no such transcript".to_string(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn test_stage_failures_are_not_transient() {
        assert!(!CaptionError::TranscriptionFailed("bad audio".to_string()).is_transient());
        assert!(!CaptionError::Upload("refused".to_string()).is_transient());
    }

    #[test]
    fn test_only_validation_is_client_error() {
        assert!(CaptionError::Validation("video_url is required".to_string()).is_client_error());
        assert!(!CaptionError::Fetch("404".to_string()).is_client_error());
    }

    #[test]
    fn test_timeout_message() {
        let err = CaptionError::TranscriptionTimeout {
            job_id: "abc".to_string(),
            waited: Duration::from_secs(90),
        };
        assert_eq!(err.to_string(), "Transcription abc did not finish within 90s");
        assert_eq!(err.kind(), "transcription_timeout");
    }

    #[test]
    fn test_status_query_wraps_cause() {
        let err = CaptionError::StatusQuery {
            job_id: "abc".to_string(),
            source: Box::new(CaptionError::Api {
                status: 404,
                message: "not found".to_string(),
            }),
        };
        assert_eq!(err.kind(), "status_query");
        assert!(!err.is_transient());
        assert_eq!(
            err.to_string(),
            "Status query for transcription abc failed: API error (404): not found"
        );
    }
}
