//! Sound Engine for speech playback
//!
//! Uses a channel-based architecture to handle rodio's non-Send stream.
//! The engine spawns a dedicated audio thread that owns the playback infrastructure.

use super::AudioSink;
use crate::error::{VoiceError, VoiceResult};
use crate::tts::Audio;
use rodio::buffer::SamplesBuffer;
use std::sync::mpsc;
use std::thread;
use tracing::{debug, error, info, warn};

/// Commands sent to the audio thread
enum AudioCommand {
    PlayWait(Audio, mpsc::Sender<VoiceResult<()>>),
}

/// Thread-safe handle to the sound engine
#[derive(Clone)]
pub struct SoundEngine {
    sender: mpsc::Sender<AudioCommand>,
}

impl std::fmt::Debug for SoundEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundEngine").finish()
    }
}

impl SoundEngine {
    pub fn new() -> VoiceResult<Self> {
        let (sender, receiver) = mpsc::channel::<AudioCommand>();

        // Spawn dedicated audio thread
        thread::Builder::new()
            .name("voice-tts-audio".to_string())
            .spawn(move || {
                Self::audio_thread(receiver);
            })?;

        Ok(Self { sender })
    }

    fn audio_thread(receiver: mpsc::Receiver<AudioCommand>) {
        use rodio::OutputStream;

        // Initialize audio output on this thread
        let (stream, stream_handle) = match OutputStream::try_default() {
            Ok(s) => s,
            Err(e) => {
                warn!("🔇 Failed to initialize audio output: {}", e);
                Self::reject_all(receiver, format!("no audio output device: {}", e));
                return;
            }
        };

        // Keep stream alive
        let _stream = stream;
        info!("🔊 Audio thread started");

        while let Ok(cmd) = receiver.recv() {
            match cmd {
                AudioCommand::PlayWait(audio, resp) => {
                    let result = match rodio::Sink::try_new(&stream_handle) {
                        Ok(sink) => {
                            debug!(
                                "🔊 Playing {:.1}s of audio at {} Hz",
                                audio.duration_secs(),
                                audio.sample_rate
                            );
                            sink.append(SamplesBuffer::new(
                                audio.channels,
                                audio.sample_rate,
                                audio.samples,
                            ));
                            sink.sleep_until_end();
                            Ok(())
                        }
                        Err(e) => {
                            error!("❌ Failed to create audio sink: {}", e);
                            Err(VoiceError::Audio(e.to_string()))
                        }
                    };
                    let _ = resp.send(result);
                }
            }
        }

        info!("🔇 Audio thread stopped");
    }

    fn reject_all(receiver: mpsc::Receiver<AudioCommand>, reason: String) {
        while let Ok(cmd) = receiver.recv() {
            match cmd {
                AudioCommand::PlayWait(_, resp) => {
                    let _ = resp.send(Err(VoiceError::Audio(reason.clone())));
                }
            }
        }
    }

    /// Play samples and wait for completion (Sync/Blocking)
    pub fn play_sync(&self, audio: Audio) -> VoiceResult<()> {
        if audio.samples.is_empty() {
            return Ok(());
        }
        if audio.sample_rate == 0 || audio.channels == 0 {
            return Err(VoiceError::Audio(format!(
                "invalid format: {} Hz, {} channels",
                audio.sample_rate, audio.channels
            )));
        }

        let (tx, rx) = mpsc::channel();
        self.sender
            .send(AudioCommand::PlayWait(audio, tx))
            .map_err(|e| VoiceError::Audio(format!("Audio thread disconnected: {}", e)))?;

        rx.recv()
            .map_err(|e| VoiceError::Audio(format!("Audio thread disconnected: {}", e)))?
    }
}

impl AudioSink for SoundEngine {
    fn play_and_wait(&self, audio: Audio) -> VoiceResult<()> {
        self.play_sync(audio)
    }
}
