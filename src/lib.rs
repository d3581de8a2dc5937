pub mod api;
pub mod config;
pub mod error;
pub mod fetch;
pub mod media;
pub mod pipeline;
pub mod subtitle;
pub mod transcribe;

pub use config::Config;
pub use error::{CaptionError, Result};
pub use pipeline::{
    print_summary, CaptionedVideo, JobRequest, Pipeline, PipelineConfig, PipelineResult,
    PipelineStats,
};
