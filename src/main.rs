//! Voice TTS - speak text aloud from a tool-calling agent
//!
//! Serves the tool protocol on stdin/stdout. All diagnostics go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};
use voice_tts::assets::{AssetCache, EngineAssets, HttpFetcher};
use voice_tts::audio::SoundEngine;
use voice_tts::config::{config_path, Config};
use voice_tts::mcp::McpServer;
use voice_tts::session::SessionState;
use voice_tts::tools::VoiceTools;
use voice_tts::tts::{create_loader, EngineHandle};
use voice_tts::voices::VoiceCatalog;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the cached model files
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Initial default voice
    #[arg(long)]
    voice: Option<String>,

    /// External Kokoro runtime executable (runs the model in-process when unset)
    #[arg(long)]
    engine_command: Option<String>,

    /// Write the effective configuration to the config file and exit
    #[arg(long)]
    write_config: bool,
}

fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level.to_lowercase()).unwrap_or_else(|_| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging first (stdout is the protocol channel). RUST_LOG wins,
    // then --verbose, then the config file's level once it is loaded.
    let from_env = std::env::var_os(EnvFilter::DEFAULT_ENV).is_some();
    let initial = if from_env {
        EnvFilter::from_default_env()
    } else if args.verbose {
        level_filter("debug")
    } else {
        level_filter("info")
    };
    let (filter, filter_handle) = reload::Layer::new(initial);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_ansi(false))
        .try_init()?;

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load().context("failed to load config")?,
    };
    if let Some(dir) = args.model_dir {
        config.model_dir = dir;
    }
    if let Some(voice) = args.voice {
        config.default_voice = voice;
    }
    if let Some(command) = args.engine_command {
        config.engine_command = Some(command);
    }

    if !from_env && !args.verbose {
        filter_handle.modify(|filter| *filter = level_filter(&config.log_level))?;
    }

    info!("🔈 Voice TTS v{} starting...", env!("CARGO_PKG_VERSION"));

    let catalog = Arc::new(VoiceCatalog::kokoro());
    config.sanitize(&catalog);

    if args.write_config {
        match &args.config {
            Some(path) => config.save_to(path)?,
            None => config.save()?,
        }
        let path = args.config.unwrap_or_else(config_path);
        info!("💾 Configuration written to {}", path.display());
        return Ok(());
    }

    info!("  - Model directory: {}", config.model_dir.display());
    info!("  - Default voice: {}", config.default_voice);

    let fetcher = HttpFetcher::new(config.download_retries)?;
    let engine = EngineHandle::new(
        EngineAssets::kokoro(&config.model_dir),
        AssetCache::new(Arc::new(fetcher)),
        create_loader(&config),
    );
    let sink = SoundEngine::new()?;

    let tools = VoiceTools::new(
        catalog,
        SessionState::new(config.default_voice.clone()),
        Arc::new(engine),
        Arc::new(sink),
    );

    McpServer::new(Arc::new(tools)).serve_stdio().await?;

    info!("👋 Voice TTS stopped");
    Ok(())
}
