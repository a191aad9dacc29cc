/*!
 * Batch translation pipeline.
 *
 * Splits a parsed subtitle sequence into bounded batches, submits each batch
 * to the translation backend in strict order, paces consecutive calls to stay
 * under backend rate limits, and reassembles the translated lines against the
 * original time markers.
 */

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::app_config::TranslationConfig;
use crate::errors::{PipelineError, ProviderError};
use crate::progress::ProgressSink;
use crate::providers::{TranslationBackend, TranslationRequest};
use crate::subtitle_processor::{assemble_translated, parse_subtitle_blocks};

/// Upper bound on batch size, whatever the caller asked for
const MAX_LINES_PER_REQUEST: usize = 50;

/// Rate-limited calls are retried this many times after the cooldown
const RATE_LIMIT_RETRIES: usize = 1;

/// One subtitle processing request
#[derive(Debug, Clone)]
pub struct TranslationJob {
    /// Full SRT payload to process
    pub srt: String,

    /// Target language, as an ISO code or a plain language name
    pub target_language: String,

    /// Caller supplied API key for the translation backend
    pub api_key: String,

    /// Backend model identifier
    pub model: String,

    /// Requested batch size, clamped to `[1, 50]` before use
    pub lines_per_request: usize,

    /// Skip translation and return the payload unchanged
    pub download_only: bool,
}

/// Sequential batch translation pipeline
///
/// Batches are never translated concurrently: ordering of the output and the
/// backend's per-minute quota both require one call in flight at a time.
#[derive(Debug, Clone)]
pub struct TranslationPipeline {
    /// Backend that performs the actual translation calls
    backend: Arc<dyn TranslationBackend>,

    /// Pause between consecutive batches
    batch_delay: Duration,

    /// Wait applied after a rate-limit response before the single retry
    rate_limit_cooldown: Duration,
}

impl TranslationPipeline {
    /// Create a pipeline with pacing taken from configuration
    pub fn new(backend: Arc<dyn TranslationBackend>, config: &TranslationConfig) -> Self {
        Self::with_pacing(backend, config.batch_delay(), config.rate_limit_cooldown())
    }

    /// Create a pipeline with explicit pacing values
    pub fn with_pacing(
        backend: Arc<dyn TranslationBackend>,
        batch_delay: Duration,
        rate_limit_cooldown: Duration,
    ) -> Self {
        Self {
            backend,
            batch_delay,
            rate_limit_cooldown,
        }
    }

    /// Process one job, reporting progress through the sink
    ///
    /// Returns the final SRT payload; the caller is responsible for emitting
    /// the terminal `complete` or `error` event. A sink whose client has
    /// disconnected fails the next progress send, which stops any further
    /// batch from being scheduled.
    pub async fn run(
        &self,
        job: TranslationJob,
        sink: &ProgressSink,
    ) -> Result<String, PipelineError> {
        if job.download_only {
            sink.progress("Preparing download without translation", 1, 1)?;
            return Ok(job.srt);
        }

        let blocks = parse_subtitle_blocks(&job.srt);
        if blocks.is_empty() {
            return Err(PipelineError::ParseFailure);
        }

        let batch_size = job.lines_per_request.clamp(1, MAX_LINES_PER_REQUEST);
        let total = blocks.len();
        info!(
            "Translating {} subtitle blocks to '{}' in batches of {}",
            total, job.target_language, batch_size
        );

        let mut translations: Vec<String> = Vec::with_capacity(total);
        for (chunk_index, batch) in blocks.chunks(batch_size).enumerate() {
            let start = chunk_index * batch_size;
            let end = start + batch.len();

            sink.progress(
                format!("Translating lines {} to {} of {}", start + 1, end, total),
                end,
                total,
            )?;

            let payload = batch
                .iter()
                .map(|block| block.text.trim())
                .collect::<Vec<_>>()
                .join("\n");
            let request = TranslationRequest::new(
                payload,
                &job.target_language,
                &job.api_key,
                &job.model,
            );

            let translated = self.translate_with_cooldown(request).await?;
            let mut lines: Vec<String> = translated.lines().map(str::to_string).collect();
            if lines.len() != batch.len() {
                warn!(
                    "Mismatch in translated lines for batch starting at {} (got {}, expected {}), adjusting",
                    start + 1,
                    lines.len(),
                    batch.len()
                );
            }
            lines.truncate(batch.len());
            translations.extend(lines);

            if end < total {
                debug!(
                    "Waiting {:?} before next translation batch",
                    self.batch_delay
                );
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        // Right-pad so indices still line up when the backend under-delivered;
        // empty slots fall back to the original text during assembly
        if translations.len() < total {
            translations.resize(total, String::new());
        }

        Ok(assemble_translated(&blocks, &translations))
    }

    /// Call the backend, absorbing at most one rate-limit response
    async fn translate_with_cooldown(
        &self,
        request: TranslationRequest,
    ) -> Result<String, PipelineError> {
        let mut attempt = 0;
        loop {
            match self.backend.translate(request.clone()).await {
                Ok(translated) => return Ok(translated),
                Err(ProviderError::RateLimitExceeded(message)) => {
                    if attempt >= RATE_LIMIT_RETRIES {
                        warn!("Rate limit persisted after cooldown retry: {}", message);
                        return Err(PipelineError::RateLimited);
                    }
                    attempt += 1;
                    info!(
                        "Translation backend rate limited, waiting {:?} before retry",
                        self.rate_limit_cooldown
                    );
                    tokio::time::sleep(self.rate_limit_cooldown).await;
                }
                Err(e) => return Err(PipelineError::Backend(e)),
            }
        }
    }
}
