pub mod ffmpeg;

pub use ffmpeg::{check_ffmpeg, escape_filter_path, inspect_wav, FfmpegTranscoder};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Sample rate expected by the transcription service.
pub const SPEECH_SAMPLE_RATE: u32 = 16_000;

/// Metadata about an audio file.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioMetadata {
    pub duration: Duration,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Media transformations run by an external tool.
///
/// Both operations write a new file and leave their inputs untouched. They
/// either produce a complete artifact or fail; nothing is retried here.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Extract mono 16kHz audio with no video stream.
    async fn extract_audio(&self, video: &Path, audio: &Path) -> Result<AudioMetadata>;

    /// Render the subtitle file onto the video frames.
    async fn burn_captions(&self, video: &Path, captions: &Path, output: &Path) -> Result<()>;

    fn name(&self) -> &'static str;
}
