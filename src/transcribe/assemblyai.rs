use crate::config::DEFAULT_ASSEMBLYAI_URL;
use crate::error::{CaptionError, Result};
use crate::transcribe::{JobId, TranscriptJob, TranscriptionService, UploadReference};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Body, Response};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound for a single status query; uploads are left unbounded.
const STATUS_TIMEOUT: Duration = Duration::from_secs(30);

/// AssemblyAI v2 REST client.
pub struct AssemblyAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    language_code: Option<String>,
}

impl AssemblyAiClient {
    /// Create a new client with the given API key.
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key,
            base_url: DEFAULT_ASSEMBLYAI_URL.to_string(),
            language_code: None,
        }
    }

    /// Point the client at another endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the spoken language instead of relying on the service default.
    pub fn with_language(mut self, language_code: String) -> Self {
        self.language_code = Some(language_code);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// Best-effort extraction of the service's error message.
async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&body) {
        return format!("{} ({})", api_error.error, status);
    }
    if body.is_empty() {
        status.to_string()
    } else {
        format!("{} ({})", body, status)
    }
}

#[async_trait]
impl TranscriptionService for AssemblyAiClient {
    async fn upload(&self, audio: &Path) -> Result<UploadReference> {
        let file = File::open(audio).await.map_err(|e| {
            CaptionError::Upload(format!("cannot open {}: {e}", audio.display()))
        })?;

        debug!("Uploading {} to AssemblyAI", audio.display());

        let response = self
            .client
            .post(self.url("upload"))
            .header(AUTHORIZATION, &self.api_key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(Body::from(file))
            .send()
            .await
            .map_err(|e| CaptionError::Upload(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CaptionError::Upload(error_message(response).await));
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| CaptionError::Upload(format!("unexpected response: {e}")))?;
        Ok(UploadReference(parsed.upload_url))
    }

    async fn submit(&self, upload: &UploadReference) -> Result<JobId> {
        let request = TranscriptRequest {
            audio_url: &upload.0,
            language_code: self.language_code.as_deref(),
        };

        let response = self
            .client
            .post(self.url("transcript"))
            .header(AUTHORIZATION, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CaptionError::Submission(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CaptionError::Submission(error_message(response).await));
        }

        let parsed: SubmitResponse = response
            .json()
            .await
            .map_err(|e| CaptionError::Submission(format!("unexpected response: {e}")))?;
        Ok(parsed.id)
    }

    async fn status(&self, job_id: &JobId) -> Result<TranscriptJob> {
        let response = self
            .client
            .get(self.url(&format!("transcript/{}", job_id)))
            .header(AUTHORIZATION, &self.api_key)
            .timeout(STATUS_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CaptionError::Api {
                status: status.as_u16(),
                message: error_message(response).await,
            });
        }

        let body = response.text().await?;
        debug!(
            "AssemblyAI status response: {}",
            body.chars().take(200).collect::<String>()
        );
        Ok(serde_json::from_str(&body)?)
    }

    fn name(&self) -> &'static str {
        "AssemblyAI"
    }
}

// API request/response types

#[derive(Debug, Serialize)]
struct TranscriptRequest<'a> {
    audio_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    language_code: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: JobId,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: String,
}
