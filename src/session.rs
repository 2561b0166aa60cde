//! Per-process session state

use crate::error::VoiceResult;
use std::sync::RwLock;

/// Mutable session settings shared by all in-flight tool calls.
///
/// Lives for the process lifetime and is never persisted.
#[derive(Debug)]
pub struct SessionState {
    default_voice: RwLock<String>,
}

impl SessionState {
    pub fn new(default_voice: impl Into<String>) -> Self {
        Self {
            default_voice: RwLock::new(default_voice.into()),
        }
    }

    pub fn default_voice(&self) -> VoiceResult<String> {
        Ok(self.default_voice.read()?.clone())
    }

    /// Swap the default voice, returning the previous one.
    ///
    /// Callers validate `voice` against the catalog first.
    pub fn set_default_voice(&self, voice: impl Into<String>) -> VoiceResult<String> {
        let mut guard = self.default_voice.write()?;
        Ok(std::mem::replace(&mut *guard, voice.into()))
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(crate::voices::DEFAULT_VOICE)
    }
}
