use anyhow::{Context, Result};
use captioner::api::start_http_server;
use captioner::config::Config;
use captioner::media::check_ffmpeg;
use captioner::pipeline::{print_summary, JobRequest, Pipeline};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "captioner")]
#[command(version, about = "Burn speech-to-text captions into videos")]
#[command(long_about = "Download a video, transcribe it with AssemblyAI and burn the transcript into the frames with FFmpeg.")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API
    Serve {
        /// Address to listen on (overrides configuration)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Caption a single video and write the result locally
    Run {
        /// URL of the source video
        video_url: String,

        /// Output video file
        #[arg(short, long, default_value = "video-with-captions.mp4")]
        output: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Load and validate configuration
    let config = Config::load().context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;

    check_ffmpeg(&config.ffmpeg_path)
        .await
        .context("FFmpeg is required")?;

    match cli.command {
        Command::Serve { bind } => {
            let bind_address = bind.unwrap_or_else(|| config.bind_address.clone());
            let pipeline = Pipeline::from_config(&config, false)?;

            info!("Work dir: {}", pipeline.config().work_dir.display());
            info!(
                "Polling:  every {}s, up to {}s",
                config.poll_interval_secs, config.max_wait_secs
            );

            start_http_server(Arc::new(pipeline), &bind_address).await
        }
        Command::Run { video_url, output } => {
            let request = JobRequest::parse(Some(video_url.as_str()))?;
            let pipeline = Pipeline::from_config(&config, true)?;

            info!("Input:  {}", request.video_url());
            info!("Output: {}", output.display());

            let result = pipeline
                .run(&request)
                .await
                .context("Captioning failed")?;
            result
                .video
                .persist(&output)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;

            print_summary(&result, &output);
            Ok(())
        }
    }
}
