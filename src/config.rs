use crate::error::VoiceResult;
use crate::voices::{VoiceCatalog, DEFAULT_VOICE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the model weights and voice embeddings are cached
    pub model_dir: PathBuf,
    /// Voice used by `speak` when the caller names none
    pub default_voice: String,
    /// External Kokoro runtime executable; unset runs the model in-process
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_command: Option<String>,
    /// Extra attempts after a failed asset download
    pub download_retries: usize,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("voice-tts/models"),
            default_voice: DEFAULT_VOICE.to_string(),
            engine_command: None,
            download_retries: 3,
            log_level: "INFO".to_string(),
        }
    }
}

impl Config {
    /// Load config from the default location, or create default
    pub fn load() -> VoiceResult<Self> {
        Self::load_from(&config_path())
    }

    /// Load config from `path`. Missing files give defaults; corrupt files are
    /// moved aside and also give defaults.
    pub fn load_from(path: &Path) -> VoiceResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                // Graceful degradation: log warning and use defaults
                warn!("⚠️ Config file corrupted or invalid, using defaults: {}", e);
                // Backup corrupt file for debugging
                let backup_path = path.with_extension("json.corrupt");
                let _ = std::fs::rename(path, &backup_path);
                Ok(Self::default())
            }
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> VoiceResult<()> {
        self.save_to(&config_path())
    }

    pub fn save_to(&self, path: &Path) -> VoiceResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Replace a default voice the catalog does not know.
    pub fn sanitize(&mut self, catalog: &VoiceCatalog) {
        if !catalog.contains(&self.default_voice) {
            warn!(
                "⚠️ Unknown default voice '{}', falling back to {}",
                self.default_voice, DEFAULT_VOICE
            );
            self.default_voice = DEFAULT_VOICE.to_string();
        }
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voice-tts")
        .join("config.json")
}
