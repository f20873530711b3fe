//! Transcription error taxonomy.

use thiserror::Error;

/// Why a single endpoint attempt failed.
///
/// The failover coordinator treats every variant the same way; the variants
/// exist so callers can branch on the cause without parsing messages.
#[derive(Error, Debug)]
pub enum TranscriptionError {
    /// Connection refused, timeout, TLS failure, or the audio stream broke
    /// while uploading.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with something other than 200.
    #[error("HTTP status error: {status}")]
    HttpStatus { status: u16 },

    /// The response body is not valid JSON, or a field has the wrong type.
    #[error("Response parse error: {0}")]
    ResponseParse(#[source] serde_json::Error),

    /// The JSON response lacks a required field.
    #[error("Missing field in response: {0}")]
    MissingField(&'static str),
}

/// Payload-free discriminant of [`TranscriptionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptionErrorKind {
    Transport,
    HttpStatus,
    ResponseParse,
    MissingField,
}

impl TranscriptionError {
    pub const fn kind(&self) -> TranscriptionErrorKind {
        match self {
            Self::Transport(_) => TranscriptionErrorKind::Transport,
            Self::HttpStatus { .. } => TranscriptionErrorKind::HttpStatus,
            Self::ResponseParse(_) => TranscriptionErrorKind::ResponseParse,
            Self::MissingField(_) => TranscriptionErrorKind::MissingField,
        }
    }

    /// HTTP status, when the endpoint answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if the attempt timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }
}
