//! Integration tests for streaming transcription against real HTTP servers.
//!
//! Each test stands up `wiremock` servers as WIS endpoints and drives the
//! HTTP forwarder and failover coordinator end to end.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use wiremock::matchers::{body_bytes, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wis_common::SttConfig;
use wis_stt::{
    AudioStream, AudioTranscriber, BufferedAudio, EndpointSet, FailoverCoordinator,
    ForwarderOptions, HttpForwarder, ResultState, StreamForwarder, TeeAudio, TranscriptionError,
    TranscriptionErrorKind, TranscriptionParams, TranscriptionRequest, WisStt,
};

const API_PATH: &str = "/api/willow";

// ============================================================================
// Helpers
// ============================================================================

fn config_for(primary: &str, backup: &str) -> SttConfig {
    SttConfig {
        entry_id: "itest-entry".into(),
        url: primary.to_string(),
        backup_url: backup.to_string(),
        model: "large-v2".into(),
        detect_language: false,
        language: "en".into(),
        beam_size: 2,
        speaker: "living-room".into(),
        save_audio: false,
        ..Default::default()
    }
}

fn endpoint(server: &MockServer) -> String {
    format!("{}{API_PATH}", server.uri())
}

/// 1 KiB of fake PCM split into uneven chunks.
fn audio() -> BufferedAudio {
    let bytes: Vec<u8> = (0..1024u32).map(|i| (i % 251) as u8).collect();
    BufferedAudio::from_bytes(&bytes, 300)
}

fn audio_bytes() -> Vec<u8> {
    (0..1024u32).map(|i| (i % 251) as u8).collect()
}

fn coordinator() -> FailoverCoordinator {
    let forwarder = HttpForwarder::new(&ForwarderOptions::default()).unwrap();
    FailoverCoordinator::new(Arc::new(forwarder))
}

fn params() -> TranscriptionParams {
    TranscriptionParams::from_config(&config_for("", ""))
}

/// A local URL nothing listens on.
async fn dead_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}{API_PATH}")
}

async fn mount_text(server: &MockServer, text: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": text })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, status: u16, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_string("upstream exploded"))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Read from `socket` until the peer closes it. False if that takes too long.
async fn sees_eof(socket: &mut TcpStream) -> bool {
    let mut buf = [0u8; 4096];
    let drained = async {
        loop {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), drained)
        .await
        .is_ok()
}

/// Raw endpoint that reads one chunked request, answers 500, then reports
/// whether the client closed the connection.
async fn rejecting_endpoint() -> (String, JoinHandle<bool>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}{API_PATH}", listener.local_addr().unwrap());

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        while !request.ends_with(b"0\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return false;
            }
            request.extend_from_slice(&buf[..n]);
        }
        socket
            .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\n\r\n")
            .await
            .unwrap();
        sees_eof(&mut socket).await
    });

    (url, server)
}

/// Raw endpoint that never answers and reports whether the client closed
/// the connection.
async fn silent_endpoint() -> (String, JoinHandle<bool>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}{API_PATH}", listener.local_addr().unwrap());

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        sees_eof(&mut socket).await
    });

    (url, server)
}

/// Microphone that never stops: a small chunk every 10ms.
fn endless_audio() -> AudioStream {
    stream::unfold((), |()| async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Some((Ok(vec![0x55u8; 320]), ()))
    })
    .boxed()
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn primary_success_never_contacts_backup() {
    let primary = MockServer::start().await;
    let backup = MockServer::start().await;
    mount_text(&primary, "hello world", 1).await;
    mount_text(&backup, "unused", 0).await;

    let result = coordinator()
        .transcribe(
            &EndpointSet::new(endpoint(&primary), endpoint(&backup)),
            &params(),
            &audio(),
        )
        .await
        .unwrap();

    assert_eq!(result.text, "hello world");
    assert_eq!(result.state, ResultState::Success);
}

#[tokio::test]
async fn primary_500_without_backup_is_http_status_error() {
    let primary = MockServer::start().await;
    mount_status(&primary, 500, 1).await;

    let err = coordinator()
        .transcribe(&EndpointSet::new(endpoint(&primary), ""), &params(), &audio())
        .await
        .unwrap_err();

    assert!(matches!(err, TranscriptionError::HttpStatus { status: 500 }));
}

#[tokio::test]
async fn primary_500_fails_over_to_backup() {
    let primary = MockServer::start().await;
    let backup = MockServer::start().await;
    mount_status(&primary, 500, 1).await;
    mount_text(&backup, "ok", 1).await;

    let result = coordinator()
        .transcribe(
            &EndpointSet::new(endpoint(&primary), endpoint(&backup)),
            &params(),
            &audio(),
        )
        .await
        .unwrap();

    assert_eq!(result.text, "ok");
    assert!(result.is_success());
}

#[tokio::test]
async fn response_without_text_is_missing_field() {
    let primary = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "foo": "bar" })))
        .expect(1)
        .mount(&primary)
        .await;

    let err = coordinator()
        .transcribe(&EndpointSet::new(endpoint(&primary), ""), &params(), &audio())
        .await
        .unwrap_err();

    assert!(matches!(err, TranscriptionError::MissingField("text")));
}

#[tokio::test]
async fn both_failing_surfaces_backup_error() {
    let primary = MockServer::start().await;
    let backup = MockServer::start().await;
    mount_status(&primary, 500, 1).await;
    mount_status(&backup, 502, 1).await;

    let err = coordinator()
        .transcribe(
            &EndpointSet::new(endpoint(&primary), endpoint(&backup)),
            &params(),
            &audio(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(502));
}

#[tokio::test]
async fn non_200_success_status_is_still_an_error() {
    let primary = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "text": "accepted" })))
        .mount(&primary)
        .await;

    let err = coordinator()
        .transcribe(&EndpointSet::new(endpoint(&primary), ""), &params(), &audio())
        .await
        .unwrap_err();

    assert!(matches!(err, TranscriptionError::HttpStatus { status: 202 }));
}

// ============================================================================
// Wire contract
// ============================================================================

#[tokio::test]
async fn sends_query_params_headers_and_full_body() {
    let primary = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(query_param("model", "large-v2"))
        .and(query_param("detect_language", "False"))
        .and(query_param("return_language", "en"))
        .and(query_param("force_language", "en"))
        .and(query_param("beam_size", "2"))
        .and(query_param("speaker", "living-room"))
        .and(query_param("save_audio", "False"))
        .and(header("x-audio-codec", "pcm"))
        .and(header("x-audio-channel", "1"))
        .and(header("x-audio-bits", "16"))
        .and(header("x-audio-sample-rate", "16000"))
        .and(body_bytes(audio_bytes()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "matched" })))
        .expect(1)
        .mount(&primary)
        .await;

    let result = coordinator()
        .transcribe(&EndpointSet::new(endpoint(&primary), ""), &params(), &audio())
        .await
        .unwrap();

    assert_eq!(result.text, "matched");
}

#[tokio::test]
async fn backup_receives_complete_audio_after_primary_failure() {
    let primary = MockServer::start().await;
    let backup = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_bytes(audio_bytes()))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("POST"))
        .and(body_bytes(audio_bytes()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "replayed" })))
        .expect(1)
        .mount(&backup)
        .await;

    let result = coordinator()
        .transcribe(
            &EndpointSet::new(endpoint(&primary), endpoint(&backup)),
            &params(),
            &audio(),
        )
        .await
        .unwrap();

    assert_eq!(result.text, "replayed");
}

#[tokio::test]
async fn tee_source_streams_primary_and_replays_to_backup() {
    let primary = MockServer::start().await;
    let backup = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_bytes(audio_bytes()))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("POST"))
        .and(body_bytes(audio_bytes()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "teed" })))
        .expect(1)
        .mount(&backup)
        .await;

    let chunks: Vec<_> = audio_bytes()
        .chunks(100)
        .map(|c| Ok::<_, std::io::Error>(c.to_vec()))
        .collect();
    let audio = TeeAudio::new(stream::iter(chunks).boxed());

    let result = coordinator()
        .transcribe(
            &EndpointSet::new(endpoint(&primary), endpoint(&backup)),
            &params(),
            &audio,
        )
        .await
        .unwrap();

    assert_eq!(result.text, "teed");
    assert_eq!(audio.recorded_len().await, audio_bytes().len());
}

#[tokio::test]
async fn large_error_body_is_still_http_status() {
    let primary = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_bytes(vec![b'!'; 4 * 1024 * 1024]))
        .mount(&primary)
        .await;

    let err = coordinator()
        .transcribe(&EndpointSet::new(endpoint(&primary), ""), &params(), &audio())
        .await
        .unwrap_err();

    assert!(matches!(err, TranscriptionError::HttpStatus { status: 503 }));
}

#[tokio::test]
async fn json_is_parsed_regardless_of_content_type() {
    let primary = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"text":"plain"}"#, "text/plain"))
        .mount(&primary)
        .await;

    let result = coordinator()
        .transcribe(&EndpointSet::new(endpoint(&primary), ""), &params(), &audio())
        .await
        .unwrap();

    assert_eq!(result.text, "plain");
}

#[tokio::test]
async fn non_json_body_is_parse_error() {
    let primary = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>oops</html>", "text/html"))
        .mount(&primary)
        .await;

    let err = coordinator()
        .transcribe(&EndpointSet::new(endpoint(&primary), ""), &params(), &audio())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), TranscriptionErrorKind::ResponseParse);
}

#[tokio::test]
async fn same_config_produces_identical_requests() {
    let primary = MockServer::start().await;
    mount_text(&primary, "again", 2).await;

    let config = config_for(&endpoint(&primary), "");
    let stt = WisStt::new(&config).unwrap();
    let metadata = stt.capabilities().default_metadata();

    for _ in 0..2 {
        stt.process_audio_stream(&metadata, &audio()).await.unwrap();
    }

    let requests = primary.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].url, requests[1].url);
    assert_eq!(requests[0].body, requests[1].body);
    for name in ["x-audio-codec", "x-audio-channel", "x-audio-bits", "x-audio-sample-rate"] {
        assert_eq!(requests[0].headers.get(name), requests[1].headers.get(name));
    }
}

// ============================================================================
// Transport failures
// ============================================================================

#[tokio::test]
async fn unreachable_primary_is_transport_error() {
    let err = coordinator()
        .transcribe(&EndpointSet::new(dead_endpoint().await, ""), &params(), &audio())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), TranscriptionErrorKind::Transport);
}

#[tokio::test]
async fn unreachable_primary_fails_over() {
    let backup = MockServer::start().await;
    mount_text(&backup, "from backup", 1).await;

    let result = coordinator()
        .transcribe(
            &EndpointSet::new(dead_endpoint().await, endpoint(&backup)),
            &params(),
            &audio(),
        )
        .await
        .unwrap();

    assert_eq!(result.text, "from backup");
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let primary = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "text": "late" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&primary)
        .await;

    let forwarder = HttpForwarder::new(&ForwarderOptions {
        request_timeout: Duration::from_millis(200),
        ..Default::default()
    })
    .unwrap();

    let request = TranscriptionRequest::new(params(), wis_stt::AudioSource::open(&audio()));
    let err = forwarder.send(&endpoint(&primary), request).await.unwrap_err();

    assert!(err.is_timeout());
}

// ============================================================================
// Connection lifecycle
// ============================================================================

#[tokio::test]
async fn connection_closes_after_http_error() {
    let (url, server) = rejecting_endpoint().await;
    let audio = BufferedAudio::from_bytes(&[0x11u8; 2048], 512);

    // The coordinator stays alive so a pooled connection would stay open.
    let coordinator = coordinator();
    let err = coordinator
        .transcribe(&EndpointSet::new(url, ""), &params(), &audio)
        .await
        .unwrap_err();
    assert!(matches!(err, TranscriptionError::HttpStatus { status: 500 }));

    assert!(server.await.unwrap(), "connection left open after 500");
    drop(coordinator);
}

#[tokio::test]
async fn dropping_send_closes_connection() {
    let (url, server) = silent_endpoint().await;
    let forwarder = HttpForwarder::new(&ForwarderOptions::default()).unwrap();

    let request = TranscriptionRequest::new(params(), endless_audio());
    let outcome =
        tokio::time::timeout(Duration::from_millis(300), forwarder.send(&url, request)).await;
    assert!(outcome.is_err(), "send finished against a silent endpoint");

    assert!(server.await.unwrap(), "connection left open after cancel");
    drop(forwarder);
}

#[tokio::test]
async fn entity_fails_over_end_to_end() {
    let primary = MockServer::start().await;
    let backup = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "language": "en" })))
        .expect(1)
        .mount(&primary)
        .await;
    mount_text(&backup, "turn off the kitchen lights", 1).await;

    let stt = WisStt::new(&config_for(&endpoint(&primary), &endpoint(&backup))).unwrap();
    let metadata = stt.capabilities().default_metadata();

    let result = stt.process_audio_stream(&metadata, &audio()).await.unwrap();
    assert_eq!(result.text, "turn off the kitchen lights");
}
