pub mod assemblyai;
pub mod poll;

pub use assemblyai::AssemblyAiClient;
pub use poll::{poll_until_complete, PollOutcome, PollPolicy};

use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tracing::info;

/// Where the service stored an uploaded audio payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReference(pub String);

/// Identifier of a remote transcription job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for UploadReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Error,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// No further transitions happen after a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Error => write!(f, "error"),
            JobStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Snapshot of a remote job as returned by a status query.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptJob {
    pub id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A speech-to-text service with asynchronous job semantics.
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Stream an audio file to the service.
    async fn upload(&self, audio: &Path) -> Result<UploadReference>;

    /// Start a transcription job for an uploaded payload.
    async fn submit(&self, upload: &UploadReference) -> Result<JobId>;

    /// Query the current state of a job.
    async fn status(&self, job_id: &JobId) -> Result<TranscriptJob>;

    fn name(&self) -> &'static str;
}

/// Upload, submit and wait for the transcript of an audio file.
pub async fn transcribe(
    service: &dyn TranscriptionService,
    audio: &Path,
    policy: &PollPolicy,
) -> Result<PollOutcome> {
    let upload = service.upload(audio).await?;
    info!("Uploaded audio to {}", service.name());

    let job_id = service.submit(&upload).await?;
    info!("Submitted transcription job {}", job_id);

    poll_until_complete(service, &job_id, policy).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_parsing() {
        let job: TranscriptJob =
            serde_json::from_str(r#"{"id":"abc","status":"completed","text":"Hi"}"#).unwrap();
        assert_eq!(job.id, JobId("abc".to_string()));
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.text.as_deref(), Some("Hi"));
    }

    #[test]
    fn test_unknown_status_is_not_terminal() {
        let job: TranscriptJob =
            serde_json::from_str(r#"{"id":"abc","status":"archived","text":null}"#).unwrap();
        assert_eq!(job.status, JobStatus::Unknown);
        assert!(!job.status.is_terminal());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Error.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }
}
