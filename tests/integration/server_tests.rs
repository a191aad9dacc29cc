/*!
 * Integration tests for the HTTP endpoints
 *
 * Each test binds the router to an ephemeral local port and talks to it
 * with a real HTTP client, so extraction, status mapping and the SSE
 * framing are all exercised end to end.
 */

use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use log::{Log, Metadata, Record};

use serde_json::{json, Value};
use tubesub::app_config::{FetchConfig, ProxyConfig};
use tubesub::caption_fetcher::CaptionFetcher;
use tubesub::progress::StreamEvent;
use tubesub::proxy_pool::ProxyPoolManager;
use tubesub::server::{create_router, AppState};
use tubesub::transcript_cache::TranscriptCache;
use tubesub::translation::TranslationPipeline;

use crate::common::mock_backends::{
    FetchOutcome, MockErrorType, MockTranslator, ScriptedCaptionSource,
};
use crate::common::{create_temp_dir, sample_srt, sample_transcript};

const WATCH_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

/// Assemble application state around the given mocks
fn test_state(
    source: Arc<ScriptedCaptionSource>,
    backend: Arc<MockTranslator>,
    cache: Option<TranscriptCache>,
) -> Arc<AppState> {
    let manager = Arc::new(ProxyPoolManager::new(ProxyConfig::default()));
    let fetcher = CaptionFetcher::new(source, manager, FetchConfig::default());
    let pipeline = TranslationPipeline::with_pacing(backend, Duration::ZERO, Duration::ZERO);
    Arc::new(AppState::new(fetcher, pipeline, cache))
}

/// Serve the router on an ephemeral port, returning the base URL
async fn spawn_app(state: Arc<AppState>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Decode every data frame of an SSE body
fn parse_sse_events(body: &str) -> Vec<StreamEvent> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(|payload| serde_json::from_str(payload).unwrap())
        .collect()
}

/// Test rejection of a request without a URL
#[tokio::test]
async fn test_fetchSubtitles_withMissingUrl_shouldReturn400() {
    let state = test_state(
        Arc::new(ScriptedCaptionSource::new()),
        Arc::new(MockTranslator::new()),
        None,
    );
    let base = spawn_app(state).await;

    let response = reqwest::Client::new()
        .post(format!("{}/fetch-subtitles", base))
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "YouTube URL is required");
}

/// Test rejection of a URL with no recognizable video id
#[tokio::test]
async fn test_fetchSubtitles_withUnrecognizableUrl_shouldReturn400() {
    let state = test_state(
        Arc::new(ScriptedCaptionSource::new()),
        Arc::new(MockTranslator::new()),
        None,
    );
    let base = spawn_app(state).await;

    let response = reqwest::Client::new()
        .post(format!("{}/fetch-subtitles", base))
        .json(&json!({"url": "https://example.com/watch?v=short"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid YouTube URL");
}

/// Test the happy path from URL to SRT
#[tokio::test]
async fn test_fetchSubtitles_withAvailableTranscript_shouldReturnSrt() {
    let source = Arc::new(ScriptedCaptionSource::new());
    source.enqueue(FetchOutcome::Deliver(sample_transcript()));
    let state = test_state(source.clone(), Arc::new(MockTranslator::new()), None);
    let base = spawn_app(state).await;

    let response = reqwest::Client::new()
        .post(format!("{}/fetch-subtitles", base))
        .json(&json!({"url": WATCH_URL}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["srt"], sample_srt());
    assert_eq!(source.calls()[0].video_id, "dQw4w9WgXcQ");
}

/// Test the status mapping for videos with captions turned off
#[tokio::test]
async fn test_fetchSubtitles_withDisabledCaptions_shouldReturn400() {
    let source = Arc::new(ScriptedCaptionSource::new());
    source.enqueue(FetchOutcome::Disabled);
    let state = test_state(source, Arc::new(MockTranslator::new()), None);
    let base = spawn_app(state).await;

    let response = reqwest::Client::new()
        .post(format!("{}/fetch-subtitles", base))
        .json(&json!({"url": WATCH_URL}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Subtitles are disabled for this video.");
}

/// Test the status mapping for videos without a usable track
#[tokio::test]
async fn test_fetchSubtitles_withMissingTrack_shouldReturn404() {
    let source = Arc::new(ScriptedCaptionSource::new());
    source.enqueue(FetchOutcome::NotFound(
        "No transcript found for language 'fr'".to_string(),
    ));
    let state = test_state(source, Arc::new(MockTranslator::new()), None);
    let base = spawn_app(state).await;

    let response = reqwest::Client::new()
        .post(format!("{}/fetch-subtitles", base))
        .json(&json!({"url": WATCH_URL, "languageCode": "fr"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No transcript found for language 'fr'");
}

/// Test the status mapping when every route has been tried
#[tokio::test]
async fn test_fetchSubtitles_withExhaustedAttempts_shouldReturn503() {
    let source = Arc::new(ScriptedCaptionSource::new());
    source.enqueue_repeated(FetchOutcome::TransportFailure("blocked".to_string()), 3);
    let state = test_state(source.clone(), Arc::new(MockTranslator::new()), None);
    let base = spawn_app(state).await;

    let response = reqwest::Client::new()
        .post(format!("{}/fetch-subtitles", base))
        .json(&json!({
            "url": WATCH_URL,
            "useProxy": true,
            "customProxies": ["127.0.0.1:9101", "127.0.0.1:9102"]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 503);
    assert_eq!(source.call_count(), 3);
}

/// Test the status mapping for a plain transport failure
#[tokio::test]
async fn test_fetchSubtitles_withDirectTransportFailure_shouldReturn500() {
    let source = Arc::new(ScriptedCaptionSource::new());
    source.enqueue(FetchOutcome::TransportFailure("timed out".to_string()));
    let state = test_state(source, Arc::new(MockTranslator::new()), None);
    let base = spawn_app(state).await;

    let response = reqwest::Client::new()
        .post(format!("{}/fetch-subtitles", base))
        .json(&json!({"url": WATCH_URL}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Failed to fetch transcript");
}

/// Test that a cached transcript short-circuits the second fetch
#[tokio::test]
async fn test_fetchSubtitles_withWarmCache_shouldSkipSecondFetch() {
    let temp_dir = create_temp_dir().unwrap();
    let cache = TranscriptCache::new(temp_dir.path());

    let source = Arc::new(ScriptedCaptionSource::new());
    source.enqueue(FetchOutcome::Deliver(sample_transcript()));
    let state = test_state(source.clone(), Arc::new(MockTranslator::new()), Some(cache));
    let base = spawn_app(state).await;

    let client = reqwest::Client::new();
    for _ in 0..2 {
        let response = client
            .post(format!("{}/fetch-subtitles", base))
            .json(&json!({"url": WATCH_URL}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["srt"], sample_srt());
    }

    // Second request was answered from disk
    assert_eq!(source.call_count(), 1);
}

/// Test that every missing processing parameter gets its own message
#[tokio::test]
async fn test_processSubtitles_withMissingParameters_shouldExplainEachOne() {
    let state = test_state(
        Arc::new(ScriptedCaptionSource::new()),
        Arc::new(MockTranslator::new()),
        None,
    );
    let base = spawn_app(state).await;
    let client = reqwest::Client::new();

    let cases: Vec<(Vec<(&str, String)>, &str)> = vec![
        (
            vec![
                ("srt", sample_srt()),
                ("lang", "fr".to_string()),
                ("linesPerRequest", "2".to_string()),
                ("model", "gemini-2.0-flash".to_string()),
            ],
            "Gemini API key is required",
        ),
        (
            vec![
                ("apiKey", "k".to_string()),
                ("lang", "fr".to_string()),
                ("linesPerRequest", "2".to_string()),
                ("model", "gemini-2.0-flash".to_string()),
            ],
            "Subtitles content is required",
        ),
        (
            vec![
                ("apiKey", "k".to_string()),
                ("srt", sample_srt()),
                ("linesPerRequest", "2".to_string()),
                ("model", "gemini-2.0-flash".to_string()),
            ],
            "Target language is required for translation",
        ),
        (
            vec![
                ("apiKey", "k".to_string()),
                ("srt", sample_srt()),
                ("lang", "fr".to_string()),
                ("model", "gemini-2.0-flash".to_string()),
            ],
            "Lines per request is required for translation",
        ),
        (
            vec![
                ("apiKey", "k".to_string()),
                ("srt", sample_srt()),
                ("lang", "fr".to_string()),
                ("linesPerRequest", "2".to_string()),
            ],
            "Model selection is required",
        ),
    ];

    for (params, expected) in cases {
        let response = client
            .get(format!("{}/process-subtitles", base))
            .query(&params)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], expected);
    }
}

/// Test the download-only stream
#[tokio::test]
async fn test_processSubtitles_withDownloadOnly_shouldStreamPayloadUnchanged() {
    let backend = Arc::new(MockTranslator::new());
    let state = test_state(
        Arc::new(ScriptedCaptionSource::new()),
        backend.clone(),
        None,
    );
    let base = spawn_app(state).await;

    let srt = sample_srt();
    let response = reqwest::Client::new()
        .get(format!("{}/process-subtitles", base))
        .query(&[
            ("apiKey", "k"),
            ("srt", srt.as_str()),
            ("downloadOnly", "true"),
            ("model", "gemini-2.0-flash"),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let events = parse_sse_events(&response.text().await.unwrap());

    assert_eq!(
        events,
        vec![
            StreamEvent::Progress {
                message: "Preparing download without translation".to_string(),
                progress: 1,
                total: 1,
            },
            StreamEvent::Complete { srt: sample_srt() },
        ]
    );
    assert_eq!(backend.call_count(), 0);
}

/// Test a full translation stream with batched progress
#[tokio::test]
async fn test_processSubtitles_withTranslationJob_shouldStreamProgressThenCompletion() {
    let backend = Arc::new(MockTranslator::new());
    let state = test_state(
        Arc::new(ScriptedCaptionSource::new()),
        backend.clone(),
        None,
    );
    let base = spawn_app(state).await;

    let srt = sample_srt();
    let response = reqwest::Client::new()
        .get(format!("{}/process-subtitles", base))
        .query(&[
            ("apiKey", "k"),
            ("srt", srt.as_str()),
            ("lang", "fr"),
            ("linesPerRequest", "2"),
            ("model", "gemini-2.0-flash"),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert!(response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let events = parse_sse_events(&response.text().await.unwrap());
    assert_eq!(events.len(), 3);
    assert_eq!(
        events[0],
        StreamEvent::Progress {
            message: "Translating lines 1 to 2 of 3".to_string(),
            progress: 2,
            total: 3,
        }
    );
    assert_eq!(
        events[1],
        StreamEvent::Progress {
            message: "Translating lines 3 to 3 of 3".to_string(),
            progress: 3,
            total: 3,
        }
    );
    match &events[2] {
        StreamEvent::Complete { srt } => {
            assert!(srt.contains("[fr] First line"));
            assert!(srt.contains("[fr] Third line"));
            assert!(srt.contains("00:00:01,500 --> 00:00:03,500"));
        }
        other => panic!("Expected completion, got {:?}", other),
    }
    assert_eq!(backend.call_count(), 2);
}

/// Test the streamed error when the backend stays rate limited
#[tokio::test]
async fn test_processSubtitles_withRateLimitedBackend_shouldStreamErrorEvent() {
    let backend = Arc::new(MockTranslator::new());
    backend.fail_with(MockErrorType::RateLimit);
    backend.fail_with(MockErrorType::RateLimit);
    let state = test_state(
        Arc::new(ScriptedCaptionSource::new()),
        backend.clone(),
        None,
    );
    let base = spawn_app(state).await;

    let srt = sample_srt();
    let response = reqwest::Client::new()
        .get(format!("{}/process-subtitles", base))
        .query(&[
            ("apiKey", "k"),
            ("srt", srt.as_str()),
            ("lang", "fr"),
            ("linesPerRequest", "50"),
            ("model", "gemini-2.0-flash"),
        ])
        .send()
        .await
        .unwrap();

    let events = parse_sse_events(&response.text().await.unwrap());
    assert_eq!(
        events.last(),
        Some(&StreamEvent::Error {
            error: "Gemini API rate limit exceeded. Please try again later.".to_string(),
        })
    );
    assert!(!events
        .iter()
        .any(|event| matches!(event, StreamEvent::Complete { .. })));
}

/// Test the streamed error for a payload with no parseable blocks
#[tokio::test]
async fn test_processSubtitles_withUnparsableSrt_shouldStreamParseError() {
    let state = test_state(
        Arc::new(ScriptedCaptionSource::new()),
        Arc::new(MockTranslator::new()),
        None,
    );
    let base = spawn_app(state).await;

    let response = reqwest::Client::new()
        .get(format!("{}/process-subtitles", base))
        .query(&[
            ("apiKey", "k"),
            ("srt", "not subtitles"),
            ("lang", "fr"),
            ("linesPerRequest", "2"),
            ("model", "gemini-2.0-flash"),
        ])
        .send()
        .await
        .unwrap();

    let events = parse_sse_events(&response.text().await.unwrap());
    assert_eq!(
        events,
        vec![StreamEvent::Error {
            error: "Failed to parse subtitles for translation".to_string(),
        }]
    );
}

/// Log messages captured by [`CapturingLogger`]
static CAPTURED_LOGS: OnceLock<Mutex<Vec<String>>> = OnceLock::new();

/// Logger that records every message for assertion
struct CapturingLogger;

impl Log for CapturingLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        CAPTURED_LOGS
            .get_or_init(|| Mutex::new(Vec::new()))
            .lock()
            .unwrap()
            .push(record.args().to_string());
    }

    fn flush(&self) {}
}

/// Test that processing log lines carry a per-request correlation id
#[tokio::test]
async fn test_processSubtitles_withCompletedJob_shouldTagLogLinesWithRequestId() {
    // The process-wide logger can only be installed once; concurrent tests
    // also log through it, so assertions filter on this request's messages
    let _ = log::set_boxed_logger(Box::new(CapturingLogger));
    log::set_max_level(log::LevelFilter::Info);

    let state = test_state(
        Arc::new(ScriptedCaptionSource::new()),
        Arc::new(MockTranslator::new()),
        None,
    );
    let base = spawn_app(state).await;

    let srt = sample_srt();
    let response = reqwest::Client::new()
        .get(format!("{}/process-subtitles", base))
        .query(&[
            ("apiKey", "k"),
            ("srt", srt.as_str()),
            ("downloadOnly", "true"),
            ("model", "gemini-2.0-flash"),
        ])
        .send()
        .await
        .unwrap();

    // Reading the body to its end means the spawned task has finished logging
    assert_eq!(response.status().as_u16(), 200);
    response.text().await.unwrap();

    let logs = CAPTURED_LOGS
        .get_or_init(|| Mutex::new(Vec::new()))
        .lock()
        .unwrap()
        .clone();
    let completed = logs
        .iter()
        .find(|line| line.contains("Subtitle processing completed"))
        .expect("completion log line missing");

    let id = completed
        .strip_prefix('[')
        .and_then(|rest| rest.split_once(']'))
        .map(|(id, _)| id)
        .expect("log line is not tagged with a request id");
    assert!(uuid::Uuid::parse_str(id).is_ok());

    // The handler-side line carries the same tag
    assert!(logs
        .iter()
        .any(|line| line.starts_with(&format!("[{}] Processing subtitles", id))));
}

/// Test that cross origin callers are allowed
#[tokio::test]
async fn test_router_withCrossOriginRequest_shouldAllowAnyOrigin() {
    let state = test_state(
        Arc::new(ScriptedCaptionSource::new()),
        Arc::new(MockTranslator::new()),
        None,
    );
    let base = spawn_app(state).await;

    let response = reqwest::Client::new()
        .post(format!("{}/fetch-subtitles", base))
        .header("Origin", "https://player.example.com")
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    let allow_origin = response
        .headers()
        .get("access-control-allow-origin")
        .expect("CORS header missing");
    assert_eq!(allow_origin, "*");
}
