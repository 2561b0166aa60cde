#![allow(dead_code)]

pub mod mock_tts;

use mock_tts::{MockFetcher, MockLoader, MockSink};
use serde_json::Value;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Arc;
use tempfile::TempDir;
use voice_tts::assets::{AssetCache, EngineAssets};
use voice_tts::session::SessionState;
use voice_tts::tools::VoiceTools;
use voice_tts::tts::EngineHandle;
use voice_tts::voices::VoiceCatalog;

/// In-process tool surface wired to mocks
pub struct Harness {
    pub temp_dir: TempDir,
    pub tools: Arc<VoiceTools>,
    pub loader: Arc<MockLoader>,
    pub fetcher: Arc<MockFetcher>,
    pub sink: Arc<MockSink>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_loader(MockLoader::default())
    }

    pub fn with_loader(loader: MockLoader) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let loader = Arc::new(loader);
        let fetcher = Arc::new(MockFetcher::default());
        let sink = Arc::new(MockSink::default());

        let engine = EngineHandle::new(
            EngineAssets::kokoro(&temp_dir.path().join("models")),
            AssetCache::new(fetcher.clone()),
            loader.clone(),
        );
        let tools = VoiceTools::new(
            Arc::new(VoiceCatalog::kokoro()),
            SessionState::default(),
            Arc::new(engine),
            sink.clone(),
        );

        Self {
            temp_dir,
            tools: Arc::new(tools),
            loader,
            fetcher,
            sink,
        }
    }
}

/// The real binary, talking the tool protocol over pipes
pub struct TestContext {
    pub temp_dir: TempDir,
    pub child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl TestContext {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let bin_path = env!("CARGO_BIN_EXE_voice-tts");

        // Isolate config and model cache inside the temp dir
        let mut child = Command::new(bin_path)
            .arg("--config")
            .arg(temp_dir.path().join("config.json"))
            .arg("--model-dir")
            .arg(temp_dir.path().join("models"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to spawn voice-tts");

        let stdin = child.stdin.take();
        let stdout = BufReader::new(child.stdout.take().expect("stdout piped"));

        TestContext {
            temp_dir,
            child,
            stdin,
            stdout,
        }
    }

    pub fn send(&mut self, message: &Value) {
        let stdin = self.stdin.as_mut().expect("stdin still open");
        writeln!(stdin, "{}", message).expect("Failed to write request");
        stdin.flush().expect("Failed to flush request");
    }

    pub fn send_raw(&mut self, line: &str) {
        let stdin = self.stdin.as_mut().expect("stdin still open");
        writeln!(stdin, "{}", line).expect("Failed to write request");
        stdin.flush().expect("Failed to flush request");
    }

    pub fn read_response(&mut self) -> Value {
        let mut line = String::new();
        self.stdout
            .read_line(&mut line)
            .expect("Failed to read response");
        assert!(!line.is_empty(), "server closed stdout");
        serde_json::from_str(&line).expect("response is JSON")
    }

    pub fn request(&mut self, message: Value) -> Value {
        self.send(&message);
        self.read_response()
    }

    /// Close stdin and wait for a clean exit.
    pub fn finish(mut self) -> std::process::ExitStatus {
        drop(self.stdin.take());
        self.child.wait().expect("Failed to wait for voice-tts")
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
