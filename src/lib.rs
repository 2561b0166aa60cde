//! Voice TTS Library
//!
//! Local Kokoro text-to-speech exposed as three tools (`speak`,
//! `list_voices`, `set_default_voice`) over a stdio tool protocol.

pub mod assets;
pub mod audio;
pub mod config;
pub mod error;
pub mod mcp;
pub mod session;
pub mod tools;
pub mod tts;
pub mod voices;

pub use error::{VoiceError, VoiceResult};
