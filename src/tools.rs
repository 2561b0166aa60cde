//! Tool Surface
//!
//! The three operations exposed to calling agents: `speak`, `list_voices`
//! and `set_default_voice`. Caller mistakes (unknown voice, empty filter
//! result, out of range speed) come back as descriptive text so the agent
//! can react; infrastructure failures come back as errors.

use crate::audio::AudioSink;
use crate::error::{VoiceError, VoiceResult};
use crate::session::SessionState;
use crate::tts::{EngineHandle, SynthesisRequest};
use crate::voices::{language_of, Language, VoiceCatalog};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

pub const MIN_SPEED: f32 = 0.5;
pub const MAX_SPEED: f32 = 2.0;

/// Characters of input echoed back by `speak`.
pub const PREVIEW_CHARS: usize = 80;

#[derive(Debug, Clone, Deserialize)]
pub struct SpeakArgs {
    pub text: String,
    #[serde(default)]
    pub voice: String,
    #[serde(default = "default_speed")]
    pub speed: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListVoicesArgs {
    #[serde(default = "default_language_filter")]
    pub language: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetDefaultVoiceArgs {
    pub voice: String,
}

fn default_speed() -> f32 {
    1.0
}

fn default_language_filter() -> String {
    "en".to_string()
}

/// Name, description and JSON schema of one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// The voice a `speak` call will use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVoice {
    pub id: String,
    pub language: Language,
}

/// Context object shared by every tool invocation.
pub struct VoiceTools {
    catalog: Arc<VoiceCatalog>,
    session: SessionState,
    engine: Arc<EngineHandle>,
    sink: Arc<dyn AudioSink>,
}

impl VoiceTools {
    pub fn new(
        catalog: Arc<VoiceCatalog>,
        session: SessionState,
        engine: Arc<EngineHandle>,
        sink: Arc<dyn AudioSink>,
    ) -> Self {
        Self {
            catalog,
            session,
            engine,
            sink,
        }
    }

    pub fn catalog(&self) -> &VoiceCatalog {
        &self.catalog
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// An explicit voice wins over the session default.
    pub fn resolve_voice(&self, requested: &str) -> VoiceResult<ResolvedVoice> {
        let id = if requested.is_empty() {
            self.session.default_voice()?
        } else {
            requested.to_string()
        };
        let language = language_of(&id);
        Ok(ResolvedVoice { id, language })
    }

    /// Synthesize `text` and play it, returning once playback has finished.
    pub async fn speak(&self, text: &str, voice: &str, speed: f32) -> VoiceResult<String> {
        if text.trim().is_empty() {
            return Ok("Nothing to speak: text is empty.".to_string());
        }
        if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
            return Ok(format!(
                "Invalid speed {}: must be between {} and {}.",
                speed, MIN_SPEED, MAX_SPEED
            ));
        }

        let resolved = self.resolve_voice(voice)?;
        if !self.catalog.contains(&resolved.id) {
            return Ok(self.unknown_voice(&resolved.id));
        }

        info!(
            "🗣️ speak: {} chars with {} ({})",
            text.chars().count(),
            resolved.id,
            resolved.language
        );

        let engine = self.engine.get().await?;
        let request = SynthesisRequest {
            text: text.to_string(),
            voice: resolved.id.clone(),
            speed,
            language: resolved.language,
        };
        let audio = tokio::task::spawn_blocking(move || engine.synthesize(&request)).await??;
        debug!("Synthesized {:.1}s of audio", audio.duration_secs());

        let sink = self.sink.clone();
        tokio::task::spawn_blocking(move || sink.play_and_wait(audio)).await??;

        Ok(format!("Spoke aloud ({}): {}", resolved.id, preview(text)))
    }

    pub fn list_voices(&self, language: &str) -> VoiceResult<String> {
        let default_voice = self.session.default_voice()?;
        let lines: Vec<String> = self
            .catalog
            .filter(language)
            .into_iter()
            .map(|v| {
                let marker = if v.id == default_voice { " (default)" } else { "" };
                format!("  {}: {}{}", v.id, v.label, marker)
            })
            .collect();

        if lines.is_empty() {
            return Ok(format!(
                "No voices found for language filter '{}'. Use 'all' to see everything.",
                language
            ));
        }
        Ok(format!("Available voices:\n{}", lines.join("\n")))
    }

    pub fn set_default_voice(&self, voice: &str) -> VoiceResult<String> {
        let Some(label) = self.catalog.label_of(voice) else {
            return Ok(self.unknown_voice(voice));
        };
        let previous = self.session.set_default_voice(voice)?;
        info!("🎙️ Default voice {} -> {}", previous, voice);
        Ok(format!("Default voice set to: {} ({})", voice, label))
    }

    fn unknown_voice(&self, voice: &str) -> String {
        format!(
            "Unknown voice '{}'. Available: {}",
            voice,
            self.catalog.sorted_ids().join(", ")
        )
    }

    /// Dispatch a named tool with JSON arguments.
    pub async fn call(&self, name: &str, arguments: Value) -> VoiceResult<String> {
        debug!("🔧 tool call: {}", name);
        match name {
            "speak" => {
                let args: SpeakArgs = parse_args(arguments)?;
                self.speak(&args.text, &args.voice, args.speed).await
            }
            "list_voices" => {
                let args: ListVoicesArgs = parse_args(arguments)?;
                self.list_voices(&args.language)
            }
            "set_default_voice" => {
                let args: SetDefaultVoiceArgs = parse_args(arguments)?;
                self.set_default_voice(&args.voice)
            }
            other => Err(VoiceError::UnknownTool(other.to_string())),
        }
    }

    pub fn definitions() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "speak".to_string(),
                description: "Speak text aloud using Kokoro neural text-to-speech. \
                    Call this tool to read your response to the user out loud."
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The text to speak. Should be plain conversational text, not markdown or code."
                        },
                        "voice": {
                            "type": "string",
                            "default": "",
                            "description": "Voice ID to use (e.g. af_heart, am_adam). Leave empty for default."
                        },
                        "speed": {
                            "type": "number",
                            "default": 1.0,
                            "minimum": MIN_SPEED,
                            "maximum": MAX_SPEED,
                            "description": "Speech speed multiplier. 1.0 is normal, 0.8 is slower, 1.2 is faster."
                        }
                    },
                    "required": ["text"]
                }),
            },
            ToolDefinition {
                name: "list_voices".to_string(),
                description: "List available TTS voices.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "language": {
                            "type": "string",
                            "default": "en",
                            "description": "Filter by language prefix. 'en' for all English, 'a' for American, 'b' for British, or 'all' for everything."
                        }
                    }
                }),
            },
            ToolDefinition {
                name: "set_default_voice".to_string(),
                description: "Change the default voice for this session.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "voice": {
                            "type": "string",
                            "description": "Voice ID to set as default (e.g. af_heart, am_adam, bf_alice)."
                        }
                    },
                    "required": ["voice"]
                }),
            },
        ]
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(arguments: Value) -> VoiceResult<T> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| VoiceError::InvalidArguments(e.to_string()))
}

/// First [`PREVIEW_CHARS`] characters of `text`, with an ellipsis if cut.
pub fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
