//! Shared fixtures: a transcoder that never shells out and a mocked
//! AssemblyAI + video host.

#![allow(dead_code)]

use async_trait::async_trait;
use captioner::error::{CaptionError, Result};
use captioner::media::{AudioMetadata, Transcoder};
use captioner::pipeline::{Pipeline, PipelineConfig};
use captioner::transcribe::{AssemblyAiClient, PollPolicy};
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_KEY: &str = "test-key";
pub const JOB_ID: &str = "job-123";
pub const UPLOAD_URL: &str = "https://cdn.assemblyai.test/upload/abc";
pub const SOURCE_BYTES: &[u8] = b"\x00\x00\x00\x18ftypmp42 fake source video";

/// Records every call and writes placeholder artifacts.
#[derive(Default)]
pub struct FakeTranscoder {
    pub fail_extract: bool,
    pub fail_burn: bool,
    pub extract_calls: AtomicUsize,
    pub burn_calls: AtomicUsize,
    pub captions_seen: Mutex<Option<String>>,
}

impl FakeTranscoder {
    pub fn failing_extract() -> Self {
        Self {
            fail_extract: true,
            ..Self::default()
        }
    }

    pub fn failing_burn() -> Self {
        Self {
            fail_burn: true,
            ..Self::default()
        }
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    pub fn burn_calls(&self) -> usize {
        self.burn_calls.load(Ordering::SeqCst)
    }

    pub fn captions_seen(&self) -> Option<String> {
        self.captions_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn extract_audio(&self, video: &Path, audio: &Path) -> Result<AudioMetadata> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        assert!(video.exists(), "source video must exist before extraction");

        if self.fail_extract {
            return Err(CaptionError::ExternalTool(
                "FFmpeg audio extraction failed (exit status: 1): Invalid data".to_string(),
            ));
        }

        std::fs::write(audio, b"RIFF fake pcm")?;
        Ok(AudioMetadata {
            duration: Duration::from_secs(4),
            sample_rate: 16_000,
            channels: 1,
        })
    }

    async fn burn_captions(&self, video: &Path, captions: &Path, output: &Path) -> Result<()> {
        self.burn_calls.fetch_add(1, Ordering::SeqCst);

        let captions_text = std::fs::read_to_string(captions)?;
        *self.captions_seen.lock().unwrap() = Some(captions_text.clone());

        if self.fail_burn {
            // Leave a truncated output behind, as a killed encoder would.
            std::fs::write(output, b"partial")?;
            return Err(CaptionError::ExternalTool(
                "FFmpeg caption burn-in failed (exit status: 1): Unable to open subtitles".to_string(),
            ));
        }

        let mut rendered = std::fs::read(video)?;
        rendered.extend_from_slice(b"\n[burned]\n");
        rendered.extend_from_slice(captions_text.as_bytes());
        std::fs::write(output, rendered)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

pub fn fast_policy() -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(10),
        max_wait: Duration::from_secs(5),
        max_transport_errors: 2,
    }
}

pub fn build_pipeline(
    server: &MockServer,
    transcoder: Arc<FakeTranscoder>,
    work_dir: &TempDir,
    poll_policy: PollPolicy,
) -> Pipeline {
    let client = AssemblyAiClient::new(API_KEY.to_string())
        .with_base_url(format!("{}/v2", server.uri()));

    Pipeline::new(
        transcoder,
        Arc::new(client),
        PipelineConfig {
            work_dir: work_dir.path().to_path_buf(),
            poll_policy,
            show_progress: false,
        },
    )
}

pub fn video_url(server: &MockServer) -> String {
    format!("{}/media/clip.mp4", server.uri())
}

pub async fn mount_source_video(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/media/clip.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(SOURCE_BYTES.to_vec()))
        .mount(server)
        .await;
}

pub async fn mount_upload_and_submit(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v2/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "upload_url": UPLOAD_URL })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v2/transcript"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": JOB_ID, "status": "queued" })),
        )
        .mount(server)
        .await;
}

/// `processing` for the first `pending` polls, then `completed` with `text`.
pub async fn mount_status_sequence(server: &MockServer, pending: u64, text: &str) {
    let status_path = format!("/v2/transcript/{}", JOB_ID);

    if pending > 0 {
        Mock::given(method("GET"))
            .and(path(status_path.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": JOB_ID,
                "status": "processing",
                "text": null
            })))
            .up_to_n_times(pending)
            .with_priority(1)
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path(status_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": JOB_ID,
            "status": "completed",
            "text": text
        })))
        .with_priority(2)
        .mount(server)
        .await;
}

pub async fn mount_status_error(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/v2/transcript/{}", JOB_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": JOB_ID,
            "status": "error",
            "text": null,
            "error": "Audio file contains no speech"
        })))
        .expect(1)
        .mount(server)
        .await;
}

pub fn is_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}
