/*!
 * # tubesub - YouTube subtitle fetching and translation
 *
 * A Rust service that fetches YouTube caption tracks, converts them to SRT,
 * and machine-translates them in batches with the Gemini API.
 *
 * ## Features
 *
 * - Fetch caption tracks by scraping the public watch page
 * - Route fetches through a rotating pool of public proxies, with a fresh
 *   user agent per attempt and a direct fallback once the pool is exhausted
 * - Liveness-probe freshly fetched proxies before relying on them
 * - Translate SRT payloads in bounded batches with rate-limit backoff
 * - Stream translation progress over server-sent events
 * - Best-effort transcript caching keyed by video id
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `proxy_pool`: Proxy pool lifecycle, rotation, and liveness probing
 * - `youtube`: Caption scraping backend
 * - `caption_fetcher`: Retry orchestration across the proxy pool
 * - `subtitle_processor`: SRT formatting, structural parsing, and assembly
 * - `transcript_cache`: Best-effort transcript disk cache
 * - `translation`: Batch translation pipeline
 * - `providers`: Translation backend clients:
 *   - `providers::gemini`: Gemini API client
 * - `progress`: Progress stream event vocabulary
 * - `server`: HTTP surface
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod caption_fetcher;
pub mod errors;
pub mod language_utils;
pub mod progress;
pub mod providers;
pub mod proxy_pool;
pub mod server;
pub mod subtitle_processor;
pub mod transcript_cache;
pub mod translation;
pub mod youtube;

// Re-export main types for easier usage
pub use app_config::AppConfig;
pub use caption_fetcher::{CaptionFetcher, FetchOptions};
pub use errors::{AppError, FetchError, PipelineError, ProviderError};
pub use progress::{ProgressSink, StreamEvent};
pub use proxy_pool::{ProxyPool, ProxyPoolManager};
pub use translation::{TranslationJob, TranslationPipeline};
pub use youtube::{CaptionEvent, Transcript};
