//! TTS (Text-to-Speech) Module
//!
//! The synthesis engine itself is an opaque runtime behind [`SpeechEngine`].
//! [`EngineHandle`] builds it once, from cached assets, on first use.

use crate::config::Config;
use crate::error::VoiceResult;
use crate::voices::Language;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub mod command;
pub mod handle;
pub mod kokoro;

pub use command::{CommandEngine, CommandLoader};
pub use handle::EngineHandle;
pub use kokoro::{KokoroEngine, KokoroLoader};

/// Decoded PCM audio, interleaved when `channels > 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Audio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Audio {
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            channels: 1,
        }
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / (self.sample_rate as f32 * self.channels as f32)
    }
}

/// One synthesis call
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: String,
    pub speed: f32,
    pub language: Language,
}

/// Trait for TTS engines
///
/// Calls block for the full synthesis; async callers offload them.
pub trait SpeechEngine: Send + Sync + std::fmt::Debug {
    fn synthesize(&self, request: &SynthesisRequest) -> VoiceResult<Audio>;

    /// Get the engine name
    fn name(&self) -> &str;
}

/// Builds an engine from resolved model and voice files.
pub trait EngineLoader: Send + Sync {
    fn load(&self, model: &Path, voices: &Path) -> VoiceResult<Arc<dyn SpeechEngine>>;
}

/// Factory for the configured engine loader
///
/// The model runs in-process unless an external runtime command is configured.
pub fn create_loader(config: &Config) -> Arc<dyn EngineLoader> {
    match config.engine_command.as_deref().map(str::trim) {
        Some(command) if !command.is_empty() => {
            info!("🛠️ Using external Kokoro runtime '{}'", command);
            Arc::new(CommandLoader::new(command))
        }
        _ => {
            info!("🛠️ Using in-process Kokoro engine");
            Arc::new(KokoroLoader::new())
        }
    }
}
