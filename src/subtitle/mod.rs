pub mod srt;

pub use srt::{format_timestamp, SrtFormatter};

use std::time::Duration;

/// End of the single caption cue, independent of the video's length.
pub const CAPTION_CUE_END: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    pub index: usize,
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

pub trait SubtitleFormatter {
    fn format(&self, entries: &[SubtitleEntry]) -> String;
    fn extension(&self) -> &'static str;
}

/// The caption track for a transcript: one cue, `00:00:00,000 --> 00:00:10,000`,
/// carrying the whole text verbatim.
pub fn caption_entries(transcript: &str) -> Vec<SubtitleEntry> {
    vec![SubtitleEntry {
        index: 1,
        start: Duration::ZERO,
        end: CAPTION_CUE_END,
        text: transcript.to_string(),
    }]
}

/// Render a transcript as an SRT caption file.
pub fn render_caption(transcript: &str) -> String {
    SrtFormatter.format(&caption_entries(transcript))
}
