use crate::config::Config;
use crate::error::{CaptionError, Result};
use crate::fetch::VideoFetcher;
use crate::media::{FfmpegTranscoder, Transcoder};
use crate::subtitle::{render_caption, SrtFormatter, SubtitleFormatter};
use crate::transcribe::{transcribe, AssemblyAiClient, JobId, PollPolicy, TranscriptionService};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

const SOURCE_VIDEO: &str = "source.mp4";
const EXTRACTED_AUDIO: &str = "audio.wav";
const CAPTION_STEM: &str = "caption";
const OUTPUT_VIDEO: &str = "output.mp4";

/// A validated request to caption one remote video.
#[derive(Debug, Clone)]
pub struct JobRequest {
    video_url: Url,
}

impl JobRequest {
    /// Validate the raw `video_url` parameter.
    pub fn parse(video_url: Option<&str>) -> Result<Self> {
        let raw = video_url
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CaptionError::Validation("video_url is required".to_string()))?;

        let video_url = Url::parse(raw).map_err(|e| {
            CaptionError::Validation(format!("video_url is not a valid URL: {e}"))
        })?;

        if !matches!(video_url.scheme(), "http" | "https") {
            return Err(CaptionError::Validation(format!(
                "video_url must use http or https, got '{}'",
                video_url.scheme()
            )));
        }

        Ok(Self { video_url })
    }

    pub fn video_url(&self) -> &Url {
        &self.video_url
    }
}

/// Configuration for the captioning pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Parent directory of every run workspace.
    pub work_dir: PathBuf,
    /// Status polling bounds for the transcription job.
    pub poll_policy: PollPolicy,
    /// Show progress spinners.
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir(),
            poll_policy: PollPolicy::default(),
            show_progress: true,
        }
    }
}

/// Statistics from one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub total_time: Duration,
    pub fetch_time: Duration,
    pub extraction_time: Duration,
    pub transcription_time: Duration,
    pub burn_time: Duration,
    /// Size of the downloaded source video.
    pub source_bytes: u64,
    /// Size of the captioned output video.
    pub output_bytes: u64,
    pub audio_duration: Duration,
    /// Number of status queries issued for the transcription job.
    pub polls: u32,
    pub provider: String,
}

/// Result of a successful run.
#[derive(Debug)]
pub struct PipelineResult {
    pub video: CaptionedVideo,
    pub job_id: JobId,
    pub transcript: String,
    pub stats: PipelineStats,
}

/// Temporary directory holding every artifact of a single run.
///
/// Each run gets its own directory so concurrent runs never share paths. The
/// directory and its contents are removed when this value is dropped.
#[derive(Debug)]
pub struct RunWorkspace {
    run_id: Uuid,
    dir: TempDir,
}

impl RunWorkspace {
    pub fn create(work_dir: &Path, run_id: Uuid) -> Result<Self> {
        std::fs::create_dir_all(work_dir)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("captioner-run-{}-", run_id.simple()))
            .tempdir_in(work_dir)
            .map_err(|e| {
                CaptionError::Io(std::io::Error::other(format!(
                    "Failed to create run workspace in {}: {}",
                    work_dir.display(),
                    e
                )))
            })?;

        debug!("Using run workspace: {:?}", dir.path());
        Ok(Self { run_id, dir })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn source_video(&self) -> PathBuf {
        self.path().join(SOURCE_VIDEO)
    }

    pub fn audio(&self) -> PathBuf {
        self.path().join(EXTRACTED_AUDIO)
    }

    pub fn captions(&self) -> PathBuf {
        self.path()
            .join(format!("{}.{}", CAPTION_STEM, SrtFormatter.extension()))
    }

    pub fn output_video(&self) -> PathBuf {
        self.path().join(OUTPUT_VIDEO)
    }
}

impl Drop for RunWorkspace {
    fn drop(&mut self) {
        // TempDir deletes the directory itself
        debug!("Cleaning up run workspace: {:?}", self.dir.path());
    }
}

/// The final artifact of a run.
///
/// Owns the run workspace: temporary files stay on disk until this value is
/// dropped, which lets the caller stream the video before cleanup.
#[derive(Debug)]
pub struct CaptionedVideo {
    path: PathBuf,
    workspace: RunWorkspace,
}

impl CaptionedVideo {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn run_id(&self) -> Uuid {
        self.workspace.run_id()
    }

    /// Copy the video out of the run workspace.
    pub async fn persist(&self, dest: &Path) -> Result<u64> {
        Ok(tokio::fs::copy(&self.path, dest).await?)
    }
}

/// Check that a stage produced a non-empty file.
async fn ensure_artifact(path: &Path, fail: fn(String) -> CaptionError) -> Result<u64> {
    let size = tokio::fs::metadata(path)
        .await
        .map_err(|e| fail(format!("{} was not created: {}", path.display(), e)))?
        .len();
    if size == 0 {
        return Err(fail(format!("{} is empty", path.display())));
    }
    Ok(size)
}

fn stage_spinner(progress: &Option<MultiProgress>, message: &'static str) -> Option<ProgressBar> {
    progress.as_ref().map(|mp| {
        let pb = mp.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    })
}

/// Fetch, transcribe, caption and re-encode one video at a time.
pub struct Pipeline {
    fetcher: VideoFetcher,
    transcoder: Arc<dyn Transcoder>,
    transcriber: Arc<dyn TranscriptionService>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        transcriber: Arc<dyn TranscriptionService>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            fetcher: VideoFetcher::default(),
            transcoder,
            transcriber,
            config,
        }
    }

    /// Use a custom fetcher for source videos.
    pub fn with_fetcher(mut self, fetcher: VideoFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Wire FFmpeg and AssemblyAI from the loaded configuration.
    pub fn from_config(config: &Config, show_progress: bool) -> Result<Self> {
        config.validate()?;

        let api_key = config.assemblyai_api_key.clone().ok_or_else(|| {
            CaptionError::Config(
                "AssemblyAI API key not set. Set ASSEMBLYAI_API_KEY environment variable."
                    .to_string(),
            )
        })?;

        let mut client = AssemblyAiClient::new(api_key).with_base_url(&config.assemblyai_base_url);
        if let Some(ref language) = config.language_code {
            client = client.with_language(language.clone());
        }

        let pipeline_config = PipelineConfig {
            work_dir: config.work_dir(),
            poll_policy: config.poll_policy(),
            show_progress,
        };

        Ok(Self::new(
            Arc::new(FfmpegTranscoder::new(&config.ffmpeg_path)),
            Arc::new(client),
            pipeline_config,
        ))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage for one request.
    ///
    /// The first failing stage aborts the run and every temporary artifact is
    /// deleted before the error is returned.
    pub async fn run(&self, request: &JobRequest) -> Result<PipelineResult> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", run_id = %run_id, video_url = %request.video_url());

        async {
            let result = self.execute(request, run_id).await;
            if let Err(ref e) = result {
                error!(kind = e.kind(), "Pipeline failed: {}", e);
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, request: &JobRequest, run_id: Uuid) -> Result<PipelineResult> {
        let start_time = Instant::now();
        let workspace = RunWorkspace::create(&self.config.work_dir, run_id)?;

        let multi_progress = if self.config.show_progress {
            Some(MultiProgress::new())
        } else {
            None
        };

        // Stage 1: fetch
        info!("Stage 1/6: Fetching source video");
        let fetch_start = Instant::now();
        let pb = stage_spinner(&multi_progress, "Downloading video...");

        let source = workspace.source_video();
        self.fetcher.fetch(request.video_url(), &source).await?;
        let source_bytes = ensure_artifact(&source, CaptionError::Fetch).await?;

        if let Some(pb) = pb {
            pb.finish_with_message(format!("✓ Downloaded {} bytes", source_bytes));
        }
        let fetch_time = fetch_start.elapsed();

        // Stage 2: audio extraction
        info!("Stage 2/6: Extracting audio with {}", self.transcoder.name());
        let extraction_start = Instant::now();
        let pb = stage_spinner(&multi_progress, "Extracting audio...");

        let audio = workspace.audio();
        let audio_metadata = self.transcoder.extract_audio(&source, &audio).await?;
        ensure_artifact(&audio, CaptionError::ExternalTool).await?;

        if let Some(pb) = pb {
            pb.finish_with_message(format!(
                "✓ Audio extracted ({:.1}s)",
                audio_metadata.duration.as_secs_f64()
            ));
        }
        let extraction_time = extraction_start.elapsed();

        // Stage 3: transcription
        info!("Stage 3/6: Transcribing with {}", self.transcriber.name());
        let transcription_start = Instant::now();
        let pb = stage_spinner(&multi_progress, "Waiting for transcript...");

        let outcome = transcribe(self.transcriber.as_ref(), &audio, &self.config.poll_policy).await?;

        if let Some(pb) = pb {
            pb.finish_with_message(format!(
                "✓ Transcribed {} characters",
                outcome.text.chars().count()
            ));
        }
        let transcription_time = transcription_start.elapsed();
        info!(
            "Transcription {} complete after {} polls in {:.2}s",
            outcome.job_id,
            outcome.polls,
            transcription_time.as_secs_f64()
        );

        // Stage 4: caption file
        info!("Stage 4/6: Rendering caption file");
        let captions = workspace.captions();
        tokio::fs::write(&captions, render_caption(&outcome.text)).await?;
        ensure_artifact(&captions, |msg| CaptionError::Io(std::io::Error::other(msg))).await?;

        // Stage 5: burn-in
        info!("Stage 5/6: Burning captions into video");
        let burn_start = Instant::now();
        let pb = stage_spinner(&multi_progress, "Burning captions...");

        let output = workspace.output_video();
        self.transcoder
            .burn_captions(&source, &captions, &output)
            .await?;
        let output_bytes = ensure_artifact(&output, CaptionError::ExternalTool).await?;

        if let Some(pb) = pb {
            pb.finish_with_message("✓ Captions burned in");
        }
        let burn_time = burn_start.elapsed();

        // Stage 6: hand over
        info!("Stage 6/6: Captioned video ready ({} bytes)", output_bytes);

        let stats = PipelineStats {
            total_time: start_time.elapsed(),
            fetch_time,
            extraction_time,
            transcription_time,
            burn_time,
            source_bytes,
            output_bytes,
            audio_duration: audio_metadata.duration,
            polls: outcome.polls,
            provider: self.transcriber.name().to_string(),
        };

        Ok(PipelineResult {
            video: CaptionedVideo {
                path: output,
                workspace,
            },
            job_id: outcome.job_id,
            transcript: outcome.text,
            stats,
        })
    }
}

/// Print a summary of the pipeline results.
pub fn print_summary(result: &PipelineResult, output: &Path) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                      Captioned Video Ready                     ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Output:     {}", output.display());
    println!("  Size:       {} bytes", result.stats.output_bytes);
    println!("  Provider:   {}", result.stats.provider);
    println!("  Job:        {}", result.job_id);
    println!(
        "  Duration:   {:.1}s audio",
        result.stats.audio_duration.as_secs_f64()
    );
    println!();
    println!("  Timing:");
    println!("    Fetch:       {:.2}s", result.stats.fetch_time.as_secs_f64());
    println!(
        "    Extract:     {:.2}s",
        result.stats.extraction_time.as_secs_f64()
    );
    println!(
        "    Transcribe:  {:.2}s ({} polls)",
        result.stats.transcription_time.as_secs_f64(),
        result.stats.polls
    );
    println!("    Burn:        {:.2}s", result.stats.burn_time.as_secs_f64());
    println!(
        "    Total:       {:.2}s",
        result.stats.total_time.as_secs_f64()
    );
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.work_dir, std::env::temp_dir());
        assert_eq!(config.poll_policy.interval, Duration::from_secs(3));
        assert!(config.show_progress);
    }

    #[test]
    fn test_job_request_requires_url() {
        for raw in [None, Some(""), Some("   ")] {
            match JobRequest::parse(raw) {
                Err(CaptionError::Validation(msg)) => assert_eq!(msg, "video_url is required"),
                other => panic!("Expected Validation error, got: {other:?}"),
            }
        }
    }

    #[test]
    fn test_job_request_rejects_bad_urls() {
        assert!(matches!(
            JobRequest::parse(Some("not a url")),
            Err(CaptionError::Validation(_))
        ));
        assert!(matches!(
            JobRequest::parse(Some("file:///etc/passwd")),
            Err(CaptionError::Validation(_))
        ));
    }

    #[test]
    fn test_job_request_accepts_http() {
        let request = JobRequest::parse(Some(" https://cdn.example.com/clip.mp4 ")).unwrap();
        assert_eq!(request.video_url().as_str(), "https://cdn.example.com/clip.mp4");
    }

    #[test]
    fn test_workspaces_are_unique_and_removed_on_drop() {
        let parent = TempDir::new().unwrap();

        let first = RunWorkspace::create(parent.path(), Uuid::new_v4()).unwrap();
        let second = RunWorkspace::create(parent.path(), Uuid::new_v4()).unwrap();
        assert_ne!(first.path(), second.path());
        assert_eq!(first.source_video().file_name().unwrap(), "source.mp4");
        assert_eq!(first.captions().file_name().unwrap(), "caption.srt");
        assert_eq!(first.output_video().parent().unwrap(), first.path());

        let first_path = first.path().to_path_buf();
        std::fs::write(first.audio(), b"pcm").unwrap();
        drop(first);

        assert!(!first_path.exists());
        assert!(second.path().exists());
    }

    #[test]
    fn test_workspace_creates_missing_work_dir() {
        let parent = TempDir::new().unwrap();
        let nested = parent.path().join("a").join("b");

        let workspace = RunWorkspace::create(&nested, Uuid::new_v4()).unwrap();
        assert!(workspace.path().starts_with(&nested));
    }

    #[tokio::test]
    async fn test_ensure_artifact() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.wav");
        assert!(matches!(
            ensure_artifact(&missing, CaptionError::ExternalTool).await,
            Err(CaptionError::ExternalTool(_))
        ));

        let empty = dir.path().join("empty.mp4");
        std::fs::write(&empty, b"").unwrap();
        assert!(matches!(
            ensure_artifact(&empty, CaptionError::Fetch).await,
            Err(CaptionError::Fetch(_))
        ));

        let full = dir.path().join("full.mp4");
        std::fs::write(&full, b"1234").unwrap();
        assert_eq!(ensure_artifact(&full, CaptionError::Fetch).await.unwrap(), 4);
    }
}
