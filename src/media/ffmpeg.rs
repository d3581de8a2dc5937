use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{CaptionError, Result};

use super::{AudioMetadata, Transcoder, SPEECH_SAMPLE_RATE};

/// Number of stderr lines kept in tool failure messages.
const STDERR_TAIL_LINES: usize = 5;

/// Check if FFmpeg is installed and accessible.
pub async fn check_ffmpeg(ffmpeg: &str) -> Result<()> {
    let output = Command::new(ffmpeg)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| {
            CaptionError::ExternalTool(format!(
                "FFmpeg not found at '{ffmpeg}'. Install it with: brew install ffmpeg (macOS) or apt install ffmpeg (Linux). Error: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(CaptionError::ExternalTool(
            "FFmpeg check failed".to_string(),
        ));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// Read the WAV header and report the stream layout.
pub fn inspect_wav(path: &Path) -> Result<AudioMetadata> {
    let reader = hound::WavReader::open(path).map_err(|e| {
        CaptionError::ExternalTool(format!(
            "Extracted audio {} is not a readable WAV file: {e}",
            path.display()
        ))
    })?;

    let spec = reader.spec();
    let duration = if spec.sample_rate > 0 {
        Duration::from_secs_f64(f64::from(reader.duration()) / f64::from(spec.sample_rate))
    } else {
        Duration::ZERO
    };

    Ok(AudioMetadata {
        duration,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// Escape a path for use as the `subtitles` filter argument.
///
/// The value is parsed twice by FFmpeg: once as a filter option value and once
/// as part of the filtergraph, so special characters need both levels.
pub fn escape_filter_path(path: &Path) -> String {
    let raw = path.to_string_lossy();

    let mut option_level = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '\'' | ':') {
            option_level.push('\\');
        }
        option_level.push(c);
    }

    let mut graph_level = String::with_capacity(option_level.len());
    for c in option_level.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            graph_level.push('\\');
        }
        graph_level.push(c);
    }

    graph_level
}

/// Transcoder backed by the `ffmpeg` command line tool.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    ffmpeg: PathBuf,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.ffmpeg);
        command
            .arg("-y")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    async fn run(&self, mut command: Command, action: &str) -> Result<()> {
        let output = command.output().await.map_err(|e| {
            CaptionError::ExternalTool(format!(
                "Failed to run {} for {action}: {e}",
                self.ffmpeg.display()
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaptionError::ExternalTool(format!(
                "FFmpeg {action} failed ({}): {}",
                output.status,
                stderr_tail(&stderr)
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn extract_audio(&self, video: &Path, audio: &Path) -> Result<AudioMetadata> {
        info!("Extracting audio from {}", video.display());

        let mut command = self.command();
        command
            .arg("-i")
            .arg(video)
            .args(["-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1"])
            .arg(audio);
        self.run(command, "audio extraction").await?;

        let metadata = inspect_wav(audio)?;
        if metadata.channels != 1 || metadata.sample_rate != SPEECH_SAMPLE_RATE {
            return Err(CaptionError::ExternalTool(format!(
                "Extracted audio has {} channel(s) at {}Hz, expected mono at {}Hz",
                metadata.channels, metadata.sample_rate, SPEECH_SAMPLE_RATE
            )));
        }

        info!(
            "Audio extracted to {} ({:.1}s)",
            audio.display(),
            metadata.duration.as_secs_f64()
        );
        Ok(metadata)
    }

    async fn burn_captions(&self, video: &Path, captions: &Path, output: &Path) -> Result<()> {
        info!("Burning captions from {} into video", captions.display());

        let filter = format!("subtitles={}", escape_filter_path(captions));
        debug!("FFmpeg video filter: {}", filter);

        let mut command = self.command();
        command
            .arg("-i")
            .arg(video)
            .arg("-vf")
            .arg(&filter)
            .arg(output);
        self.run(command, "caption burn-in").await?;

        info!("Captioned video written to {}", output.display());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join(" | ")
}
