//! WIS STT - command line entry point.

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use wis_common::config::Config;
use wis_common::logging::init_logging;
use wis_stt::audio::{reader_stream, DEFAULT_CHUNK_SIZE};
use wis_stt::{
    AudioTranscriber, FileAudio, SpeechCapabilities, TeeAudio, TranscriptionResult, WisStt,
};

/// Stream audio to a WIS server, failing over to a backup endpoint.
#[derive(Parser, Debug)]
#[command(name = "wis-stt")]
#[command(version)]
#[command(about = "Stream audio to a WIS server with backup failover.", long_about = None)]
struct Cli {
    /// Config file (default: ~/.wis-stt/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Transcribe 16-bit mono 16 kHz PCM (raw or .wav); "-" reads stdin
    Transcribe {
        file: PathBuf,

        /// Primary endpoint, overrides the config
        #[arg(long)]
        url: Option<String>,

        /// Backup endpoint, overrides the config
        #[arg(long)]
        backup_url: Option<String>,

        /// Language, overrides the config
        #[arg(short, long)]
        language: Option<String>,

        /// Upload chunk size in bytes
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the audio capabilities declared to the host
    Capabilities,

    /// Validate the configuration and print the effective values
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load_with_env(cli.config.as_deref())?;

    match cli.command {
        Commands::Transcribe {
            file,
            url,
            backup_url,
            language,
            chunk_size,
            json,
        } => {
            if let Some(url) = url {
                config.stt.url = url;
            }
            if let Some(backup_url) = backup_url {
                config.stt.backup_url = backup_url;
            }
            if let Some(language) = language {
                config.stt.language = language;
            }
            config.validate()?;
            init_logging(&config.observability);

            tracing::info!("WIS STT v{}", env!("CARGO_PKG_VERSION"));
            transcribe(&config, &file, chunk_size, json).await
        }
        Commands::Capabilities => {
            let caps = SpeechCapabilities::for_language(config.stt.language.clone());
            println!("{}", serde_json::to_string_pretty(&caps)?);
            Ok(())
        }
        Commands::CheckConfig => {
            config.validate()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn transcribe(config: &Config, file: &Path, chunk_size: usize, json: bool) -> Result<()> {
    let stt = WisStt::new(&config.stt).context("Failed to build HTTP client")?;
    let metadata = stt.capabilities().default_metadata();

    let outcome = if file == Path::new("-") {
        // stdin can only be read once; record it as it streams so the backup gets a copy.
        let audio = TeeAudio::new(reader_stream(tokio::io::stdin(), chunk_size));
        stt.process_audio_stream(&metadata, &audio).await
    } else {
        ensure!(file.is_file(), "Audio file not found: {}", file.display());
        let audio = FileAudio::pcm(file).chunk_size(chunk_size);
        stt.process_audio_stream(&metadata, &audio).await
    };

    match outcome {
        Ok(result) => {
            if json {
                println!("{}", serde_json::to_string(&result)?);
            } else {
                println!("{}", result.text);
            }
            Ok(())
        }
        Err(e) => {
            if json {
                let mut report = serde_json::to_value(TranscriptionResult::failed())?;
                report["error"] = serde_json::Value::String(e.to_string());
                println!("{report}");
            }
            Err(anyhow::Error::new(e).context("Transcription failed"))
        }
    }
}
