use crate::error::{CaptionError, Result};
use futures::StreamExt;
use reqwest::Url;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Downloads source videos over HTTP(S).
#[derive(Debug, Clone, Default)]
pub struct VideoFetcher {
    client: reqwest::Client,
}

impl VideoFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Stream `url` into `dest`, returning the number of bytes written.
    ///
    /// The file is complete and flushed when this returns `Ok`.
    pub async fn fetch(&self, url: &Url, dest: &Path) -> Result<u64> {
        info!("Downloading {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| CaptionError::Fetch(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CaptionError::Fetch(format!("{url} returned {status}")));
        }

        let mut file = File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| CaptionError::Fetch(format!("{url}: {e}")))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;

        if written == 0 {
            return Err(CaptionError::Fetch(format!("{url} returned an empty body")));
        }

        debug!("Downloaded {} bytes to {}", written, dest.display());
        Ok(written)
    }
}
