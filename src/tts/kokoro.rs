//! In-process Kokoro-82M backend (ONNX runtime via `kokoro-tts`)

use super::{Audio, EngineLoader, SpeechEngine, SynthesisRequest};
use crate::error::{VoiceError, VoiceResult};
use kokoro_tts::{KokoroTts, Voice};
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::debug;

/// Kokoro v1.0 renders mono audio at this rate.
pub const SAMPLE_RATE: u32 = 24_000;

/// Fail early, with a readable message, on missing or empty asset files.
pub fn check_assets(model: &Path, voices: &Path) -> VoiceResult<()> {
    for path in [model, voices] {
        let meta = std::fs::metadata(path).map_err(|e| {
            VoiceError::Engine(format!("Kokoro asset missing at {}: {}", path.display(), e))
        })?;
        if meta.len() == 0 {
            return Err(VoiceError::Engine(format!(
                "Kokoro asset is empty: {}",
                path.display()
            )));
        }
    }
    Ok(())
}

/// Map a catalog voice id onto the runtime's voice table.
pub fn voice_for(id: &str, speed: f32) -> Option<Voice> {
    let voice = match id {
        "af_heart" => Voice::AfHeart(speed),
        "af_alloy" => Voice::AfAlloy(speed),
        "af_aoede" => Voice::AfAoede(speed),
        "af_bella" => Voice::AfBella(speed),
        "af_jessica" => Voice::AfJessica(speed),
        "af_kore" => Voice::AfKore(speed),
        "af_nicole" => Voice::AfNicole(speed),
        "af_nova" => Voice::AfNova(speed),
        "af_river" => Voice::AfRiver(speed),
        "af_sarah" => Voice::AfSarah(speed),
        "af_sky" => Voice::AfSky(speed),
        "am_adam" => Voice::AmAdam(speed),
        "am_echo" => Voice::AmEcho(speed),
        "am_eric" => Voice::AmEric(speed),
        "am_fenrir" => Voice::AmFenrir(speed),
        "am_liam" => Voice::AmLiam(speed),
        "am_michael" => Voice::AmMichael(speed),
        "am_onyx" => Voice::AmOnyx(speed),
        "am_puck" => Voice::AmPuck(speed),
        "am_santa" => Voice::AmSanta(speed),
        "bf_alice" => Voice::BfAlice(speed),
        "bf_emma" => Voice::BfEmma(speed),
        "bf_isabella" => Voice::BfIsabella(speed),
        "bf_lily" => Voice::BfLily(speed),
        "bm_daniel" => Voice::BmDaniel(speed),
        "bm_fable" => Voice::BmFable(speed),
        "bm_george" => Voice::BmGeorge(speed),
        "bm_lewis" => Voice::BmLewis(speed),
        _ => return None,
    };
    Some(voice)
}

/// Loads the model and voice embeddings into an in-process [`KokoroEngine`].
#[derive(Debug, Clone, Default)]
pub struct KokoroLoader;

impl KokoroLoader {
    pub fn new() -> Self {
        Self
    }
}

impl EngineLoader for KokoroLoader {
    /// Blocks on the runtime; call from a blocking task.
    fn load(&self, model: &Path, voices: &Path) -> VoiceResult<Arc<dyn SpeechEngine>> {
        check_assets(model, voices)?;

        let runtime = current_runtime()?;
        let tts = runtime
            .block_on(KokoroTts::new(model, voices))
            .map_err(|e| VoiceError::Engine(format!("Failed to load Kokoro model: {:?}", e)))?;

        Ok(Arc::new(KokoroEngine { tts, runtime }))
    }
}

/// Kokoro-82M running inside this process.
pub struct KokoroEngine {
    tts: KokoroTts,
    runtime: Handle,
}

impl std::fmt::Debug for KokoroEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KokoroEngine").finish()
    }
}

impl SpeechEngine for KokoroEngine {
    fn synthesize(&self, request: &SynthesisRequest) -> VoiceResult<Audio> {
        let voice = voice_for(&request.voice, request.speed).ok_or_else(|| {
            VoiceError::Engine(format!("Voice '{}' is not in the Kokoro model", request.voice))
        })?;

        debug!(
            "📢 Kokoro synthesizing {} chars (voice {}, lang {}, speed {})",
            request.text.chars().count(),
            request.voice,
            request.language,
            request.speed
        );

        let (samples, took) = self
            .runtime
            .block_on(self.tts.synth(&request.text, voice))
            .map_err(|e| VoiceError::Engine(format!("Kokoro synthesis failed: {:?}", e)))?;
        debug!("Synthesized {} samples in {:?}", samples.len(), took);

        Ok(Audio::mono(samples, SAMPLE_RATE))
    }

    fn name(&self) -> &str {
        "kokoro"
    }
}

fn current_runtime() -> VoiceResult<Handle> {
    Handle::try_current()
        .map_err(|e| VoiceError::Engine(format!("Kokoro needs a Tokio runtime: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voices::VoiceCatalog;

    #[test]
    fn test_every_catalog_voice_is_known_to_the_model() {
        for voice in VoiceCatalog::kokoro().iter() {
            assert!(voice_for(&voice.id, 1.0).is_some(), "{} unmapped", voice.id);
        }
        assert!(voice_for("zz_nobody", 1.0).is_none());
    }

    #[test]
    fn test_check_assets() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("kokoro-v1.0.onnx");
        let voices = dir.path().join("voices-v1.0.bin");
        std::fs::write(&model, b"onnx").unwrap();

        assert!(matches!(
            check_assets(&model, &voices),
            Err(VoiceError::Engine(_))
        ));

        std::fs::write(&voices, b"").unwrap();
        assert!(check_assets(&model, &voices).is_err());

        std::fs::write(&voices, b"npz").unwrap();
        assert!(check_assets(&model, &voices).is_ok());
    }

    #[test]
    fn test_loader_rejects_missing_assets_before_loading() {
        let dir = tempfile::tempdir().unwrap();
        let err = KokoroLoader::new()
            .load(&dir.path().join("model.onnx"), &dir.path().join("voices.bin"))
            .unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_loader_outside_runtime_is_engine_error() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.onnx");
        let voices = dir.path().join("voices.bin");
        std::fs::write(&model, b"onnx").unwrap();
        std::fs::write(&voices, b"npz").unwrap();

        let err = KokoroLoader::new().load(&model, &voices).unwrap_err();
        assert!(matches!(err, VoiceError::Engine(_)));
    }
}
