//! Mock engine, loader, sink and fetcher for testing
//!
//! Each records what it was asked to do so tests can verify the call flow.

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use voice_tts::assets::{AssetDescriptor, Fetcher};
use voice_tts::audio::AudioSink;
use voice_tts::tts::{Audio, EngineLoader, SpeechEngine, SynthesisRequest};
use voice_tts::{VoiceError, VoiceResult};

/// Mock engine that records every synthesis request
#[derive(Debug, Default)]
pub struct MockEngine {
    pub requests: Mutex<Vec<SynthesisRequest>>,
}

impl MockEngine {
    pub fn requests(&self) -> Vec<SynthesisRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl SpeechEngine for MockEngine {
    fn synthesize(&self, request: &SynthesisRequest) -> VoiceResult<Audio> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(Audio::mono(vec![0.0; 240], 24_000))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Hands out one shared [`MockEngine`] and counts constructions
#[derive(Default)]
pub struct MockLoader {
    pub engine: Arc<MockEngine>,
    pub loads: AtomicUsize,
    pub should_fail: bool,
}

impl MockLoader {
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl EngineLoader for MockLoader {
    fn load(&self, model: &Path, voices: &Path) -> VoiceResult<Arc<dyn SpeechEngine>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(VoiceError::Engine("Mock engine failure".to_string()));
        }
        assert!(model.exists(), "model must be cached before load");
        assert!(voices.exists(), "voices must be cached before load");
        Ok(self.engine.clone())
    }
}

/// Sink that records played buffers instead of making sound
#[derive(Default)]
pub struct MockSink {
    pub played: Mutex<Vec<Audio>>,
}

impl MockSink {
    pub fn play_count(&self) -> usize {
        self.played.lock().unwrap().len()
    }
}

impl AudioSink for MockSink {
    fn play_and_wait(&self, audio: Audio) -> VoiceResult<()> {
        self.played.lock().unwrap().push(audio);
        Ok(())
    }
}

/// Fetcher that writes placeholder bytes and counts calls
#[derive(Default)]
pub struct MockFetcher {
    pub calls: AtomicUsize,
}

impl MockFetcher {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, asset: &AssetDescriptor, dest: &Path) -> VoiceResult<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::fs::write(dest, asset.name.as_bytes()).await?;
        Ok(asset.name.len() as u64)
    }
}
