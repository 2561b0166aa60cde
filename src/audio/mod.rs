//! Audio output
//!
//! Synthesized speech is handed to an [`AudioSink`], which plays it and
//! returns only once playback has finished.

pub mod engine;

pub use engine::SoundEngine;

use crate::error::VoiceResult;
use crate::tts::Audio;

/// Blocking "play and wait" output.
pub trait AudioSink: Send + Sync {
    fn play_and_wait(&self, audio: Audio) -> VoiceResult<()>;
}
