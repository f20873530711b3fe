//! Request and result types plus the fixed wire parameters.

use serde::Serialize;
use wis_common::SttConfig;

use crate::audio::AudioStream;

/// Audio framing headers sent with every request.
///
/// The host only ever hands over 16-bit mono PCM at 16 kHz.
pub const AUDIO_HEADERS: [(&str, &str); 4] = [
    ("x-audio-codec", "pcm"),
    ("x-audio-channel", "1"),
    ("x-audio-bits", "16"),
    ("x-audio-sample-rate", "16000"),
];

/// Per-entry model parameters, sent as query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionParams {
    pub model: String,
    pub language: String,
    pub detect_language: bool,
    pub beam_size: u32,
    pub speaker: String,
    pub save_audio: bool,
}

impl TranscriptionParams {
    pub fn from_config(config: &SttConfig) -> Self {
        Self {
            model: config.model.clone(),
            language: config.language.clone(),
            detect_language: config.detect_language,
            beam_size: config.beam_size,
            speaker: config.speaker.clone(),
            save_audio: config.save_audio,
        }
    }

    /// Query pairs in wire order.
    ///
    /// The configured language is used as both `return_language` and
    /// `force_language`. Booleans are spelled `True`/`False`, which is what
    /// WIS servers parse.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("model", self.model.clone()),
            ("detect_language", bool_param(self.detect_language).into()),
            ("return_language", self.language.clone()),
            ("force_language", self.language.clone()),
            ("beam_size", self.beam_size.to_string()),
            ("speaker", self.speaker.clone()),
            ("save_audio", bool_param(self.save_audio).into()),
        ]
    }
}

fn bool_param(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// One attempt's worth of input: parameters plus a stream that is consumed
/// by the attempt.
pub struct TranscriptionRequest {
    pub params: TranscriptionParams,
    pub audio: AudioStream,
}

impl TranscriptionRequest {
    pub fn new(params: TranscriptionParams, audio: AudioStream) -> Self {
        Self { params, audio }
    }
}

impl std::fmt::Debug for TranscriptionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptionRequest")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Terminal state of a transcription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultState {
    Success,
    Error,
}

/// Recognized text and its state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptionResult {
    pub text: String,
    pub state: ResultState,
}

impl TranscriptionResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            state: ResultState::Success,
        }
    }

    /// Empty result reported to a host that expects a value even on failure.
    pub fn failed() -> Self {
        Self {
            text: String::new(),
            state: ResultState::Error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == ResultState::Success
    }
}
