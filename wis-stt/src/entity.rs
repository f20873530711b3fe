//! The speech-to-text entity a host registers.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::Instrument;
use wis_common::logging::generate_trace_id;
use wis_common::SttConfig;

use crate::audio::AudioSource;
use crate::error::TranscriptionError;
use crate::failover::{EndpointSet, FailoverCoordinator};
use crate::forwarder::{HttpForwarder, StreamForwarder};
use crate::request::{TranscriptionParams, TranscriptionResult};

/// Container format of the incoming audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Ogg,
}

/// Codec of the incoming audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Pcm,
    Opus,
}

/// Channel layout of the incoming audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioChannel {
    Mono,
    Stereo,
}

/// What the host says about an utterance before streaming it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechMetadata {
    pub language: String,
    pub format: AudioFormat,
    pub codec: AudioCodec,
    pub bit_rate: u16,
    pub sample_rate: u32,
    pub channel: AudioChannel,
}

/// Static capability declaration exposed to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeechCapabilities {
    pub languages: Vec<String>,
    pub formats: Vec<AudioFormat>,
    pub codecs: Vec<AudioCodec>,
    pub bit_rates: Vec<u16>,
    pub sample_rates: Vec<u32>,
    pub channels: Vec<AudioChannel>,
}

impl SpeechCapabilities {
    /// 16-bit mono PCM WAV at 16 kHz in a single language.
    pub fn for_language(language: impl Into<String>) -> Self {
        Self {
            languages: vec![language.into()],
            formats: vec![AudioFormat::Wav],
            codecs: vec![AudioCodec::Pcm],
            bit_rates: vec![16],
            sample_rates: vec![16_000],
            channels: vec![AudioChannel::Mono],
        }
    }

    pub fn supports(&self, metadata: &SpeechMetadata) -> bool {
        self.languages.contains(&metadata.language)
            && self.formats.contains(&metadata.format)
            && self.codecs.contains(&metadata.codec)
            && self.bit_rates.contains(&metadata.bit_rate)
            && self.sample_rates.contains(&metadata.sample_rate)
            && self.channels.contains(&metadata.channel)
    }

    /// Metadata describing audio this entity accepts in `language`.
    pub fn default_metadata(&self) -> SpeechMetadata {
        SpeechMetadata {
            language: self.languages.first().cloned().unwrap_or_default(),
            format: AudioFormat::Wav,
            codec: AudioCodec::Pcm,
            bit_rate: 16,
            sample_rate: 16_000,
            channel: AudioChannel::Mono,
        }
    }
}

/// Speech-to-text capability a host calls into.
#[async_trait]
pub trait AudioTranscriber: Send + Sync {
    /// Human-readable entity name.
    fn name(&self) -> &str;

    /// Stable identifier derived from the host's entry id.
    fn unique_id(&self) -> &str;

    fn capabilities(&self) -> SpeechCapabilities;

    /// Transcribe one utterance.
    async fn process_audio_stream(
        &self,
        metadata: &SpeechMetadata,
        source: &dyn AudioSource,
    ) -> Result<TranscriptionResult, TranscriptionError>;
}

/// WIS speech-to-text entity.
///
/// Holds only its configuration and the failover coordinator, so one value
/// can serve concurrent utterances.
#[derive(Clone)]
pub struct WisStt {
    name: String,
    unique_id: String,
    language: String,
    endpoints: EndpointSet,
    params: TranscriptionParams,
    coordinator: FailoverCoordinator,
}

impl WisStt {
    /// Build the entity with an HTTP forwarder configured from `config`.
    pub fn new(config: &SttConfig) -> Result<Self, TranscriptionError> {
        let forwarder = HttpForwarder::from_config(config)?;
        Ok(Self::with_forwarder(config, Arc::new(forwarder)))
    }

    /// Build the entity around any forwarder.
    pub fn with_forwarder(config: &SttConfig, forwarder: Arc<dyn StreamForwarder>) -> Self {
        let unique_id: String = config.entry_id.chars().take(7).collect();
        Self {
            name: format!("WIS STT {} ({})", config.url, config.language),
            unique_id: format!("{unique_id}-stt"),
            language: config.language.clone(),
            endpoints: EndpointSet::from_config(config),
            params: TranscriptionParams::from_config(config),
            coordinator: FailoverCoordinator::new(forwarder),
        }
    }

    pub fn endpoints(&self) -> &EndpointSet {
        &self.endpoints
    }
}

#[async_trait]
impl AudioTranscriber for WisStt {
    fn name(&self) -> &str {
        &self.name
    }

    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn capabilities(&self) -> SpeechCapabilities {
        SpeechCapabilities::for_language(self.language.clone())
    }

    async fn process_audio_stream(
        &self,
        metadata: &SpeechMetadata,
        source: &dyn AudioSource,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        let span = tracing::info_span!(
            "transcription",
            trace_id = %generate_trace_id(),
            entity = %self.unique_id
        );

        async move {
            tracing::debug!(?metadata, "Processing audio stream");
            if !self.capabilities().supports(metadata) {
                tracing::warn!(?metadata, "Audio does not match declared capabilities");
            }

            let result = self
                .coordinator
                .transcribe(&self.endpoints, &self.params, source)
                .await?;

            tracing::info!(text = %result.text, "Audio processing complete");
            Ok::<_, TranscriptionError>(result)
        }
        .instrument(span)
        .await
    }
}
