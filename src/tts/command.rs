//! Kokoro backend driving an external runtime binary
//!
//! Used instead of the in-process engine when `engine_command` is set.

use super::kokoro::check_assets;
use super::{Audio, EngineLoader, SpeechEngine, SynthesisRequest};
use crate::error::{VoiceError, VoiceResult};
use rodio::Source;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::{debug, error};

/// Loads [`CommandEngine`] instances for a given runtime command.
#[derive(Debug, Clone)]
pub struct CommandLoader {
    command: String,
}

impl CommandLoader {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl EngineLoader for CommandLoader {
    fn load(&self, model: &Path, voices: &Path) -> VoiceResult<Arc<dyn SpeechEngine>> {
        check_assets(model, voices)?;

        Ok(Arc::new(CommandEngine {
            command: self.command.clone(),
            model_path: model.to_path_buf(),
            voices_path: voices.to_path_buf(),
        }))
    }
}

/// Kokoro-82M synthesis through an external ONNX runtime.
#[derive(Debug)]
pub struct CommandEngine {
    command: String,
    model_path: PathBuf,
    voices_path: PathBuf,
}

impl CommandEngine {
    fn build_command(&self, request: &SynthesisRequest, wav_path: &Path) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.arg("-")
            .arg(wav_path)
            .arg("--model")
            .arg(&self.model_path)
            .arg("--voices")
            .arg(&self.voices_path)
            .arg("--voice")
            .arg(&request.voice)
            .arg("--speed")
            .arg(request.speed.to_string())
            .arg("--lang")
            .arg(request.language.code())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }

    fn temp_wav_path() -> VoiceResult<PathBuf> {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| VoiceError::Engine(format!("Time error: {}", e)))?
            .as_nanos();
        Ok(std::env::temp_dir().join(format!(
            "voice_tts_{}_{}.wav",
            std::process::id(),
            nanos
        )))
    }

    fn run(&self, request: &SynthesisRequest, wav_path: &Path) -> VoiceResult<Audio> {
        let mut child = self.build_command(request, wav_path).spawn().map_err(|e| {
            error!("❌ Failed to spawn {}: {}", self.command, e);
            VoiceError::Engine(format!("Failed to spawn {}: {}", self.command, e))
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(request.text.as_bytes())?;
            stdin.flush()?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VoiceError::Engine(format!(
                "{} failed with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        if !wav_path.exists() {
            return Err(VoiceError::Engine("Kokoro output file not created".to_string()));
        }

        decode_wav(wav_path)
    }
}

impl SpeechEngine for CommandEngine {
    fn synthesize(&self, request: &SynthesisRequest) -> VoiceResult<Audio> {
        debug!(
            "📢 Kokoro synthesizing {} chars (voice {}, lang {}, speed {})",
            request.text.chars().count(),
            request.voice,
            request.language,
            request.speed
        );

        let wav_path = Self::temp_wav_path()?;
        let result = self.run(request, &wav_path);
        let _ = std::fs::remove_file(&wav_path);
        result
    }

    fn name(&self) -> &str {
        "kokoro-command"
    }
}

/// Decode a WAV file into float samples.
pub fn decode_wav(path: &Path) -> VoiceResult<Audio> {
    let file = std::fs::File::open(path)?;
    let decoder = rodio::Decoder::new(BufReader::new(file))
        .map_err(|e| VoiceError::Engine(format!("Unreadable WAV {}: {}", path.display(), e)))?;
    let sample_rate = decoder.sample_rate();
    let channels = decoder.channels();
    let samples: Vec<f32> = decoder.convert_samples::<f32>().collect();
    Ok(Audio {
        samples,
        sample_rate,
        channels,
    })
}
