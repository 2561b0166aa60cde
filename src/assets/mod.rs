//! Asset Cache
//!
//! Makes sure the model files the engine needs exist on local storage,
//! downloading whatever is missing. A file at its final path is always
//! complete: downloads land in a `.part` sibling and are renamed into place
//! only after every byte arrived.

pub mod fetch;
pub mod progress;

pub use fetch::{Fetcher, HttpFetcher};
pub use progress::DownloadProgress;

use crate::error::{VoiceError, VoiceResult};
use futures::future::try_join_all;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const MODEL_URL: &str =
    "https://github.com/thewh1teagle/kokoro-onnx/releases/download/model-files-v1.0/kokoro-v1.0.onnx";
pub const VOICES_URL: &str =
    "https://github.com/thewh1teagle/kokoro-onnx/releases/download/model-files-v1.0/voices-v1.0.bin";

pub const MODEL_FILE: &str = "kokoro-v1.0.onnx";
pub const VOICES_FILE: &str = "voices-v1.0.bin";

/// A named binary resource with a remote source and a local home.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    pub name: String,
    pub url: String,
    pub path: PathBuf,
    /// Exact byte length, when known ahead of time.
    pub expected_size: Option<u64>,
}

impl AssetDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            path: path.into(),
            expected_size: None,
        }
    }

    pub fn with_expected_size(mut self, size: u64) -> Self {
        self.expected_size = Some(size);
        self
    }

    /// Scratch path used while the download is in flight.
    pub fn partial_path(&self) -> PathBuf {
        let mut name: OsString = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from(&self.name));
        name.push(".part");
        self.path.with_file_name(name)
    }

    /// True when the local file exists and, if a size is known, matches it.
    pub fn is_materialized(&self) -> bool {
        match std::fs::metadata(&self.path) {
            Ok(meta) if meta.is_file() => match self.expected_size {
                Some(size) if meta.len() != size => {
                    warn!(
                        "⚠️ {} has {} bytes, expected {}; fetching again",
                        self.name,
                        meta.len(),
                        size
                    );
                    false
                }
                _ => true,
            },
            _ => false,
        }
    }
}

/// Model weights and voice embeddings for the Kokoro engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineAssets {
    pub model: AssetDescriptor,
    pub voices: AssetDescriptor,
}

impl EngineAssets {
    /// The fixed Kokoro v1.0 release files, cached under `model_dir`.
    pub fn kokoro(model_dir: &Path) -> Self {
        Self {
            model: AssetDescriptor::new(MODEL_FILE, MODEL_URL, model_dir.join(MODEL_FILE)),
            voices: AssetDescriptor::new(VOICES_FILE, VOICES_URL, model_dir.join(VOICES_FILE)),
        }
    }

    pub fn all(&self) -> [AssetDescriptor; 2] {
        [self.model.clone(), self.voices.clone()]
    }
}

/// Resolves asset descriptors to local paths, fetching missing files.
#[derive(Clone)]
pub struct AssetCache {
    fetcher: Arc<dyn Fetcher>,
}

impl std::fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCache").finish()
    }
}

impl AssetCache {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    /// Returns one local path per descriptor, in input order.
    ///
    /// Present files cause no network access. Missing ones are fetched
    /// concurrently; the first failure aborts the call.
    pub async fn ensure(&self, assets: &[AssetDescriptor]) -> VoiceResult<Vec<PathBuf>> {
        try_join_all(assets.iter().map(|asset| self.ensure_one(asset))).await
    }

    async fn ensure_one(&self, asset: &AssetDescriptor) -> VoiceResult<PathBuf> {
        if asset.is_materialized() {
            debug!("{} already cached at {}", asset.name, asset.path.display());
            return Ok(asset.path.clone());
        }

        if let Some(parent) = asset.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let partial = asset.partial_path();
        match self.fetch_into_place(asset, &partial).await {
            Ok(()) => {
                info!("📦 {} ready at {}", asset.name, asset.path.display());
                Ok(asset.path.clone())
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                Err(e)
            }
        }
    }

    async fn fetch_into_place(&self, asset: &AssetDescriptor, partial: &Path) -> VoiceResult<()> {
        let written = self.fetcher.fetch(asset, partial).await?;
        if let Some(expected) = asset.expected_size {
            if written != expected {
                return Err(VoiceError::Integrity(format!(
                    "{}: downloaded {} bytes, expected {}",
                    asset.name, written, expected
                )));
            }
        }
        tokio::fs::rename(partial, &asset.path).await?;
        Ok(())
    }
}
