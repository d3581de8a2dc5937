use crate::error::{CaptionError, Result};
use crate::transcribe::PollPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default AssemblyAI v2 endpoint.
pub const DEFAULT_ASSEMBLYAI_URL: &str = "https://api.assemblyai.com/v2";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub assemblyai_api_key: Option<String>,
    pub assemblyai_base_url: String,
    pub bind_address: String,
    pub work_dir: Option<PathBuf>,
    pub ffmpeg_path: String,
    pub poll_interval_secs: u64,
    pub max_wait_secs: u64,
    pub max_transport_errors: u32,
    pub language_code: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assemblyai_api_key: None,
            assemblyai_base_url: DEFAULT_ASSEMBLYAI_URL.to_string(),
            bind_address: "0.0.0.0:3000".to_string(),
            work_dir: None,
            ffmpeg_path: "ffmpeg".to_string(),
            poll_interval_secs: 3,
            max_wait_secs: 30 * 60,
            max_transport_errors: 3,
            language_code: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                config = toml::from_str::<Config>(&contents).map_err(|e| {
                    CaptionError::Config(format!("{}: {}", config_path.display(), e))
                })?;
            }
        }

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Override fields from environment-style variables.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("ASSEMBLYAI_API_KEY").or_else(|| lookup("ASSEMBLY_API_KEY")) {
            self.assemblyai_api_key = Some(key);
        }
        if let Some(url) = lookup("CAPTIONER_ASSEMBLYAI_URL") {
            self.assemblyai_base_url = url;
        }
        if let Some(bind) = lookup("CAPTIONER_BIND") {
            self.bind_address = bind;
        } else if let Some(port) = lookup("PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.bind_address = format!("0.0.0.0:{}", port);
            }
        }
        if let Some(dir) = lookup("CAPTIONER_WORK_DIR") {
            self.work_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = lookup("CAPTIONER_FFMPEG") {
            self.ffmpeg_path = path;
        }
        if let Some(secs) = lookup("CAPTIONER_POLL_INTERVAL_SECS").and_then(|s| s.parse().ok()) {
            self.poll_interval_secs = secs;
        }
        if let Some(secs) = lookup("CAPTIONER_MAX_WAIT_SECS").and_then(|s| s.parse().ok()) {
            self.max_wait_secs = secs;
        }
        if let Some(n) = lookup("CAPTIONER_MAX_TRANSPORT_ERRORS").and_then(|s| s.parse().ok()) {
            self.max_transport_errors = n;
        }
        if let Some(lang) = lookup("CAPTIONER_LANGUAGE") {
            self.language_code = Some(lang);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.assemblyai_api_key.as_deref().map_or(true, str::is_empty) {
            return Err(CaptionError::Config(
                "ASSEMBLYAI_API_KEY not set. Export it with: export ASSEMBLYAI_API_KEY=..."
                    .to_string(),
            ));
        }

        if self.poll_interval_secs == 0 {
            return Err(CaptionError::Config(
                "Poll interval must be greater than 0".to_string(),
            ));
        }

        if self.max_wait_secs < self.poll_interval_secs {
            return Err(CaptionError::Config(format!(
                "Maximum wait ({}s) must be at least one poll interval ({}s)",
                self.max_wait_secs, self.poll_interval_secs
            )));
        }

        Ok(())
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_wait: Duration::from_secs(self.max_wait_secs),
            max_transport_errors: self.max_transport_errors,
        }
    }

    /// Directory under which each run creates its own workspace.
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("captioner").join("config.toml"))
    }
}
