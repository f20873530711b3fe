//! Primary/backup failover over a re-openable audio source.
//!
//! ```text
//! Init → TryingPrimary ─ok──────────────→ Success
//!              │
//!              └─err─→ TryingBackup ─ok─→ Success
//!                           └─err──────→ Failed (backup error surfaced)
//! ```
//!
//! Attempts are strictly sequential, each endpoint is tried at most once,
//! and there is no backoff between them.

use std::fmt;
use std::sync::Arc;
use wis_common::SttConfig;

use crate::audio::AudioSource;
use crate::error::TranscriptionError;
use crate::forwarder::StreamForwarder;
use crate::request::{TranscriptionParams, TranscriptionRequest, TranscriptionResult};

/// Primary endpoint and optional backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSet {
    primary: String,
    backup: Option<String>,
}

impl EndpointSet {
    /// An empty or blank `backup` means no backup.
    pub fn new(primary: impl Into<String>, backup: impl Into<String>) -> Self {
        let backup = backup.into();
        let backup = backup.trim();
        Self {
            primary: primary.into(),
            backup: (!backup.is_empty()).then(|| backup.to_string()),
        }
    }

    pub fn from_config(config: &SttConfig) -> Self {
        Self::new(config.url.trim(), config.backup_url.as_str())
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn backup(&self) -> Option<&str> {
        self.backup.as_deref()
    }
}

/// Where a transcription is in its failover sequence. Only traced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailoverState {
    Init,
    TryingPrimary,
    TryingBackup,
    Success,
    Failed,
}

impl fmt::Display for FailoverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::TryingPrimary => "trying_primary",
            Self::TryingBackup => "trying_backup",
            Self::Success => "success",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Runs one primary attempt and, if it fails, one backup attempt.
#[derive(Clone)]
pub struct FailoverCoordinator {
    forwarder: Arc<dyn StreamForwarder>,
}

impl FailoverCoordinator {
    pub fn new(forwarder: Arc<dyn StreamForwarder>) -> Self {
        Self { forwarder }
    }

    /// Transcribe `source`, failing over to the backup endpoint once.
    ///
    /// Each attempt gets a freshly opened stream. When both attempts fail the
    /// backup's error is returned and the primary's is only logged.
    pub async fn transcribe(
        &self,
        endpoints: &EndpointSet,
        params: &TranscriptionParams,
        source: &dyn AudioSource,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        let mut state = FailoverState::Init;

        state = transition(state, FailoverState::TryingPrimary);
        let primary_err = match self.attempt(endpoints.primary(), params, source).await {
            Ok(result) => {
                transition(state, FailoverState::Success);
                return Ok(result);
            }
            Err(e) => e,
        };

        tracing::warn!(
            endpoint = endpoints.primary(),
            error = %primary_err,
            "Primary endpoint failed"
        );

        let Some(backup) = endpoints.backup() else {
            transition(state, FailoverState::Failed);
            return Err(primary_err);
        };

        state = transition(state, FailoverState::TryingBackup);
        match self.attempt(backup, params, source).await {
            Ok(result) => {
                transition(state, FailoverState::Success);
                tracing::info!(endpoint = backup, "Backup endpoint recovered transcription");
                Ok(result)
            }
            Err(backup_err) => {
                transition(state, FailoverState::Failed);
                tracing::error!(endpoint = backup, error = %backup_err, "Backup endpoint failed");
                Err(backup_err)
            }
        }
    }

    async fn attempt(
        &self,
        endpoint: &str,
        params: &TranscriptionParams,
        source: &dyn AudioSource,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        let request = TranscriptionRequest::new(params.clone(), source.open());
        self.forwarder.send(endpoint, request).await
    }
}

fn transition(from: FailoverState, to: FailoverState) -> FailoverState {
    tracing::trace!(%from, %to, "Failover state change");
    to
}
