//! Network fetchers for model assets

use super::progress::DownloadProgress;
use super::AssetDescriptor;
use crate::error::{VoiceError, VoiceResult};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::{debug, info, warn};

/// Downloads one asset to a destination file.
///
/// `dest` is a scratch path; the cache renames it into place once the
/// fetch returns successfully.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns the number of bytes written.
    async fn fetch(&self, asset: &AssetDescriptor, dest: &Path) -> VoiceResult<u64>;
}

/// HTTP(S) fetcher streaming the response body to disk.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    retries: usize,
    backoff_base_ms: u64,
}

impl HttpFetcher {
    pub fn new(retries: usize) -> VoiceResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("voice-tts/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self::with_client(client, retries))
    }

    pub fn with_client(client: reqwest::Client, retries: usize) -> Self {
        Self {
            client,
            retries,
            backoff_base_ms: 500,
        }
    }

    /// Override the first backoff delay. Mostly useful in tests.
    pub fn with_backoff_base(mut self, millis: u64) -> Self {
        self.backoff_base_ms = millis;
        self
    }

    async fn download_once(&self, asset: &AssetDescriptor, dest: &Path) -> VoiceResult<u64> {
        debug!("GET {}", asset.url);
        let response = self
            .client
            .get(&asset.url)
            .send()
            .await?
            .error_for_status()?;

        let mut progress = DownloadProgress::new(asset.name.clone(), response.content_length());
        let mut file = tokio::fs::File::create(dest).await?;
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            // A body cut short arrives as a stream error
            let chunk = chunk.map_err(|e| {
                VoiceError::Integrity(format!(
                    "{}: body interrupted after {} bytes: {}",
                    asset.name,
                    progress.downloaded(),
                    e
                ))
            })?;
            file.write_all(&chunk).await?;
            progress.advance(chunk.len() as u64);
        }
        file.flush().await?;
        file.sync_all().await?;

        let written = progress.downloaded();
        if let Some(total) = progress.total() {
            if written != total {
                return Err(VoiceError::Integrity(format!(
                    "{}: received {} of {} bytes",
                    asset.name, written, total
                )));
            }
        }
        Ok(written)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, asset: &AssetDescriptor, dest: &Path) -> VoiceResult<u64> {
        info!("⬇️ Downloading {}...", asset.name);

        // First attempt plus `retries` more.
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(self.backoff_base_ms / 2)
            .max_delay(Duration::from_secs(30))
            .map(jitter)
            .take(self.retries);

        let mut attempt = 0usize;
        let written = Retry::spawn(strategy, || {
            attempt += 1;
            let n = attempt;
            async move {
                self.download_once(asset, dest).await.map_err(|e| {
                    warn!("⚠️ Download of {} failed (attempt {}): {}", asset.name, n, e);
                    e
                })
            }
        })
        .await?;

        info!("✅ Downloaded {} ({} bytes)", asset.name, written);
        Ok(written)
    }
}
