/*!
 * HTTP surface.
 *
 * Two endpoints drive the application: `POST /fetch-subtitles` turns a video
 * URL into SRT text, and `GET /process-subtitles` runs the translation
 * pipeline while streaming progress over server-sent events. Validation
 * failures are rejected with a JSON error body before any network activity;
 * once the event stream is open, failures surface as a terminal `error`
 * event because the response status is already committed.
 */

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures::{Stream, StreamExt};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::caption_fetcher::{CaptionFetcher, FetchOptions};
use crate::errors::{FetchError, PipelineError};
use crate::progress::ProgressSink;
use crate::subtitle_processor::transcript_to_srt;
use crate::transcript_cache::TranscriptCache;
use crate::translation::{TranslationJob, TranslationPipeline};
use crate::youtube::extract_video_id;

/// Shared state handed to every handler
pub struct AppState {
    /// Resilient caption fetcher behind the fetch endpoint
    pub fetcher: CaptionFetcher,

    /// Batch translation pipeline behind the processing endpoint
    pub pipeline: TranslationPipeline,

    /// Optional transcript cache consulted before fetching
    pub cache: Option<TranscriptCache>,
}

impl AppState {
    /// Create the shared state
    pub fn new(
        fetcher: CaptionFetcher,
        pipeline: TranslationPipeline,
        cache: Option<TranscriptCache>,
    ) -> Self {
        Self {
            fetcher,
            pipeline,
            cache,
        }
    }
}

/// JSON error envelope returned by the fetch endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human readable error description
    pub error: String,
}

/// Error response with its mapped HTTP status
#[derive(Debug)]
pub enum ApiError {
    /// Invalid or missing input, rejected before any work happened
    BadRequest(String),
    /// The video exists but has no usable captions
    NotFound(String),
    /// Proxied attempts and the direct fallback were all exhausted
    ServiceUnavailable(String),
    /// Anything else
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::ServiceUnavailable(message) => (StatusCode::SERVICE_UNAVAILABLE, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::CaptionsDisabled => ApiError::BadRequest(err.to_string()),
            FetchError::NoCaptionsFound(message) => ApiError::NotFound(message),
            FetchError::Exhausted { .. } => ApiError::ServiceUnavailable(err.to_string()),
            FetchError::Transport(_) => {
                ApiError::Internal("Failed to fetch transcript".to_string())
            }
        }
    }
}

/// Body of `POST /fetch-subtitles`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchSubtitlesRequest {
    /// Video URL in any of the recognized forms
    pub url: String,

    /// Preferred caption language
    pub language_code: Option<String>,

    /// Route the fetch through the proxy pool
    pub use_proxy: bool,

    /// Caller supplied proxy endpoints, replacing the shared pool
    pub custom_proxies: Vec<String>,
}

/// Body of a successful `POST /fetch-subtitles` response
#[derive(Debug, Serialize, Deserialize)]
pub struct FetchSubtitlesResponse {
    /// Full SRT document
    pub srt: String,
}

/// Query parameters of `GET /process-subtitles`
///
/// Everything arrives as a string; presence checks and parsing happen in the
/// handler so each missing parameter gets its own message.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessSubtitlesParams {
    /// Translation backend API key
    pub api_key: String,

    /// URL-encoded SRT payload to process
    pub srt: String,

    /// Target language, code or plain name
    pub lang: String,

    /// Literal "true" skips translation
    pub download_only: String,

    /// Requested batch size
    pub lines_per_request: String,

    /// Backend model identifier
    pub model: String,
}

/// Handler for `POST /fetch-subtitles`
pub async fn fetch_subtitles(
    State(state): State<Arc<AppState>>,
    Json(body): Json<FetchSubtitlesRequest>,
) -> Result<Json<FetchSubtitlesResponse>, ApiError> {
    if body.url.is_empty() {
        return Err(ApiError::BadRequest("YouTube URL is required".to_string()));
    }
    let Some(video_id) = extract_video_id(&body.url) else {
        return Err(ApiError::BadRequest("Invalid YouTube URL".to_string()));
    };

    if let Some(cache) = &state.cache {
        if let Some(transcript) = cache.get(&video_id) {
            info!("Using cached transcript for {}", video_id);
            return Ok(Json(FetchSubtitlesResponse {
                srt: transcript_to_srt(&transcript),
            }));
        }
    }

    let options = FetchOptions {
        language_code: body.language_code,
        use_proxy: body.use_proxy,
        custom_proxies: body.custom_proxies,
    };
    let transcript = state.fetcher.fetch(&video_id, &options).await.map_err(|e| {
        error!("Error fetching transcript for {}: {}", video_id, e);
        ApiError::from(e)
    })?;

    if let Some(cache) = &state.cache {
        if let Err(e) = cache.put(&video_id, &transcript) {
            warn!("Failed to cache transcript for {}: {}", video_id, e);
        }
    }

    Ok(Json(FetchSubtitlesResponse {
        srt: transcript_to_srt(&transcript),
    }))
}

/// Handler for `GET /process-subtitles`
pub async fn process_subtitles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProcessSubtitlesParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let download_only = params.download_only == "true";

    if params.api_key.is_empty() {
        return Err(ApiError::BadRequest("Gemini API key is required".to_string()));
    }
    if params.srt.is_empty() {
        return Err(ApiError::BadRequest(
            "Subtitles content is required".to_string(),
        ));
    }
    if !download_only && params.lang.is_empty() {
        return Err(ApiError::BadRequest(
            "Target language is required for translation".to_string(),
        ));
    }
    if !download_only && params.lines_per_request.is_empty() {
        return Err(ApiError::BadRequest(
            "Lines per request is required for translation".to_string(),
        ));
    }
    if params.model.is_empty() {
        return Err(ApiError::BadRequest(
            "Model selection is required".to_string(),
        ));
    }

    let request_id = Uuid::new_v4();
    info!(
        "[{}] Processing subtitles (downloadOnly: {})",
        request_id, download_only
    );

    let job = TranslationJob {
        srt: params.srt,
        target_language: params.lang,
        api_key: params.api_key,
        model: params.model,
        lines_per_request: params.lines_per_request.parse().unwrap_or(1),
        download_only,
    };

    let (sink, rx) = ProgressSink::channel();
    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        match pipeline.run(job, &sink).await {
            Ok(srt) => {
                info!("[{}] Subtitle processing completed", request_id);
                let _ = sink.complete(srt);
            }
            Err(PipelineError::Disconnected) => {
                info!(
                    "[{}] Client disconnected, abandoning translation job",
                    request_id
                );
            }
            Err(e) => {
                error!("[{}] Error in processing: {}", request_id, e);
                let _ = sink.error(e.user_message());
            }
        }
    });

    let stream = UnboundedReceiverStream::new(rx).map(|event| Event::default().json_data(&event));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Create the router with both endpoints and permissive CORS
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/fetch-subtitles", post(fetch_subtitles))
        .route("/process-subtitles", get(process_subtitles))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind the listening socket and serve until shutdown
///
/// A bind failure aborts startup; everything past this point is handled per
/// request.
pub async fn serve(state: Arc<AppState>, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server running at http://localhost:{}", port);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
