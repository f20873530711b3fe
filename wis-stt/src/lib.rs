//! WIS STT - speech-to-text adapter for WIS transcription servers.
//!
//! Streams 16-bit mono PCM audio to a WIS endpoint and returns the
//! recognized text. If the primary endpoint fails, the utterance is sent
//! once more to a backup endpoint.
//!
//! ## Architecture
//!
//! ```text
//! host → WisStt → FailoverCoordinator → HttpForwarder → primary
//!                        │                     └──────→ backup (on failure)
//!                        └── AudioSource::open() per attempt
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod audio;
pub mod entity;
pub mod error;
pub mod failover;
pub mod forwarder;
pub mod request;

pub use audio::{AudioSource, AudioStream, BufferedAudio, FileAudio, TeeAudio};
pub use entity::{
    AudioChannel, AudioCodec, AudioFormat, AudioTranscriber, SpeechCapabilities, SpeechMetadata,
    WisStt,
};
pub use error::{TranscriptionError, TranscriptionErrorKind};
pub use failover::{EndpointSet, FailoverCoordinator};
pub use forwarder::{ForwarderOptions, HttpForwarder, StreamForwarder};
pub use request::{
    ResultState, TranscriptionParams, TranscriptionRequest, TranscriptionResult, AUDIO_HEADERS,
};
