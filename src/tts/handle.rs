//! Lazy, single-flight engine handle

use super::{EngineLoader, SpeechEngine};
use crate::assets::{AssetCache, EngineAssets};
use crate::error::{VoiceError, VoiceResult};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

/// Process-wide handle to the synthesis engine.
///
/// The first [`get`](Self::get) resolves the assets and constructs the
/// engine; concurrent first callers wait on that one construction and all
/// observe the same instance. A failed construction is not cached, so the
/// next call tries again.
pub struct EngineHandle {
    assets: EngineAssets,
    cache: AssetCache,
    loader: Arc<dyn EngineLoader>,
    engine: OnceCell<Arc<dyn SpeechEngine>>,
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("assets", &self.assets)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl EngineHandle {
    pub fn new(assets: EngineAssets, cache: AssetCache, loader: Arc<dyn EngineLoader>) -> Self {
        Self {
            assets,
            cache,
            loader,
            engine: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.initialized()
    }

    pub async fn get(&self) -> VoiceResult<Arc<dyn SpeechEngine>> {
        let engine = self.engine.get_or_try_init(|| self.construct()).await?;
        Ok(engine.clone())
    }

    async fn construct(&self) -> VoiceResult<Arc<dyn SpeechEngine>> {
        let paths = self.cache.ensure(&self.assets.all()).await?;
        let [model, voices]: [PathBuf; 2] = paths
            .try_into()
            .map_err(|_| VoiceError::Asset("asset cache returned wrong path count".to_string()))?;

        info!("🧠 Loading Kokoro model...");
        let loader = self.loader.clone();
        let engine = tokio::task::spawn_blocking(move || loader.load(&model, &voices)).await??;
        info!("✅ Model loaded ({})", engine.name());
        Ok(engine)
    }
}
