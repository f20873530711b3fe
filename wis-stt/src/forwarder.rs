//! Single-attempt audio forwarding to one WIS endpoint.

use async_trait::async_trait;
use reqwest::{Body, Client, StatusCode};
use std::time::Duration;
use wis_common::SttConfig;

use crate::error::TranscriptionError;
use crate::request::{TranscriptionRequest, TranscriptionResult, AUDIO_HEADERS};

/// Bytes of a rejected response body kept for the debug log.
const ERROR_BODY_LOG_LIMIT: usize = 512;

/// One network attempt against one endpoint. No retries.
#[async_trait]
pub trait StreamForwarder: Send + Sync {
    /// POST the request's audio to `endpoint` and parse the recognized text.
    async fn send(
        &self,
        endpoint: &str,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResult, TranscriptionError>;
}

/// Transport settings for [`HttpForwarder`].
#[derive(Debug, Clone)]
pub struct ForwarderOptions {
    /// Validate endpoint TLS certificates.
    pub cert_validation: bool,
    /// Whole-attempt timeout, upload included.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ForwarderOptions {
    fn default() -> Self {
        Self {
            cert_validation: true,
            request_timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ForwarderOptions {
    pub fn from_config(config: &SttConfig) -> Self {
        Self {
            cert_validation: config.cert_validation,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        }
    }
}

/// Streams audio over HTTP with `reqwest`.
///
/// Idle connections are never pooled, so each attempt's connection is closed
/// as soon as the attempt finishes, whatever the outcome. Dropping the future
/// returned by [`StreamForwarder::send`] aborts the upload and closes the
/// connection.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: Client,
}

impl HttpForwarder {
    pub fn new(options: &ForwarderOptions) -> Result<Self, TranscriptionError> {
        if !options.cert_validation {
            tracing::warn!("TLS certificate validation disabled for WIS endpoints");
        }

        let client = Client::builder()
            .timeout(options.request_timeout)
            .connect_timeout(options.connect_timeout)
            .danger_accept_invalid_certs(!options.cert_validation)
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self { client })
    }

    pub fn from_config(config: &SttConfig) -> Result<Self, TranscriptionError> {
        Self::new(&ForwarderOptions::from_config(config))
    }
}

#[async_trait]
impl StreamForwarder for HttpForwarder {
    async fn send(
        &self,
        endpoint: &str,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        let TranscriptionRequest { params, audio } = request;

        tracing::debug!(
            endpoint,
            model = %params.model,
            language = %params.language,
            beam_size = params.beam_size,
            "Sending audio stream"
        );

        let mut builder = self.client.post(endpoint).query(&params.query_pairs());
        for (name, value) in AUDIO_HEADERS {
            builder = builder.header(name, value);
        }

        let mut response = builder.body(Body::wrap_stream(audio)).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            // Only the first chunk is read; the rest is dropped with the connection.
            let first = response.chunk().await.ok().flatten().unwrap_or_default();
            tracing::debug!(
                endpoint,
                %status,
                body = %error_snippet(&first),
                "WIS endpoint rejected request"
            );
            return Err(TranscriptionError::HttpStatus {
                status: status.as_u16(),
            });
        }

        // Servers are not consistent about content type; parse the bytes.
        let body = response.bytes().await?;
        let result = parse_response(&body)?;

        tracing::debug!(endpoint, chars = result.text.len(), "Transcription received");
        Ok(result)
    }
}

fn error_snippet(body: &[u8]) -> std::borrow::Cow<'_, str> {
    String::from_utf8_lossy(&body[..body.len().min(ERROR_BODY_LOG_LIMIT)])
}

/// Extract `text` from a WIS JSON response body.
pub(crate) fn parse_response(body: &[u8]) -> Result<TranscriptionResult, TranscriptionError> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(TranscriptionError::ResponseParse)?;

    let text = value
        .get("text")
        .cloned()
        .ok_or(TranscriptionError::MissingField("text"))?;

    let text: String = serde_json::from_value(text).map_err(TranscriptionError::ResponseParse)?;
    Ok(TranscriptionResult::success(text))
}
