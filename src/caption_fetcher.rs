/*!
 * Resilient caption fetching.
 *
 * Routes caption retrieval through a rotating pool of proxies, picking a
 * fresh user agent for every attempt, then falls back to one direct attempt
 * once the pool is exhausted. Each attempt gets its own transport binding
 * with a bounded timeout, so a failed or abandoned attempt never leaks its
 * proxy or header configuration into the next one.
 */

use std::sync::Arc;

use log::{debug, info, warn};
use rand::prelude::IndexedRandom;
use reqwest::Client;
use uuid::Uuid;

use crate::app_config::FetchConfig;
use crate::errors::FetchError;
use crate::proxy_pool::{ProxyPool, ProxyPoolManager, proxy_url};
use crate::youtube::{CaptionSource, Transcript};

/// Per-request fetch options
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Preferred caption language
    pub language_code: Option<String>,

    /// Route attempts through the proxy pool before the direct fallback
    pub use_proxy: bool,

    /// Caller supplied proxies; when non-empty these replace the shared pool
    /// and are used for this request's attempts
    pub custom_proxies: Vec<String>,
}

/// Caption fetcher that retries across the proxy pool
pub struct CaptionFetcher {
    /// Backend that retrieves and parses raw caption data
    source: Arc<dyn CaptionSource>,

    /// Shared pool manager consulted when proxy usage is requested
    proxies: Arc<ProxyPoolManager>,

    /// Fetch subsystem settings
    config: FetchConfig,
}

impl CaptionFetcher {
    /// Create a new fetcher
    pub fn new(
        source: Arc<dyn CaptionSource>,
        proxies: Arc<ProxyPoolManager>,
        config: FetchConfig,
    ) -> Self {
        Self {
            source,
            proxies,
            config,
        }
    }

    /// Fetch a transcript, retrying across the pool before one direct attempt
    ///
    /// Disabled-captions and no-captions outcomes are terminal and surface
    /// immediately; transport failures consume attempts until the pool and
    /// the direct fallback are both exhausted.
    pub async fn fetch(
        &self,
        video_id: &str,
        options: &FetchOptions,
    ) -> Result<Transcript, FetchError> {
        let request_id = Uuid::new_v4();

        if !options.use_proxy {
            debug!(
                "[{}] Fetching transcript for {} without proxy",
                request_id, video_id
            );
            return self.attempt(video_id, options, None).await;
        }

        let mut pool = self.acquire_pool(options).await;
        let planned = pool.len();
        info!(
            "[{}] Fetching transcript for {} through {} pooled proxies",
            request_id, video_id, planned
        );

        let mut attempts = 0;
        while attempts < planned {
            let Some(endpoint) = pool.next() else { break };
            attempts += 1;
            match self.attempt(video_id, options, Some(&endpoint)).await {
                Ok(transcript) => {
                    info!(
                        "[{}] Proxy {} delivered the transcript on attempt {}/{}",
                        request_id, endpoint, attempts, planned
                    );
                    return Ok(transcript);
                }
                Err(e) if e.is_terminal() => return Err(e),
                Err(e) => {
                    warn!(
                        "[{}] Attempt {}/{} via {} failed: {}",
                        request_id, attempts, planned, endpoint, e
                    );
                }
            }
        }

        info!(
            "[{}] Falling back to a direct attempt after {} proxied failures",
            request_id, attempts
        );
        match self.attempt(video_id, options, None).await {
            Ok(transcript) => Ok(transcript),
            Err(e) if e.is_terminal() => Err(e),
            Err(e) => {
                warn!("[{}] Direct fallback failed: {}", request_id, e);
                Err(FetchError::Exhausted {
                    attempts: attempts + 1,
                })
            }
        }
    }

    /// Obtain the pool for one request: the caller's custom list when given,
    /// otherwise the responsive prefix of the shared pool
    async fn acquire_pool(&self, options: &FetchOptions) -> ProxyPool {
        if !options.custom_proxies.is_empty() {
            let count = self.proxies.set_custom(&options.custom_proxies);
            debug!("Using {} caller supplied proxies", count);
            return ProxyPool::sanitized(&options.custom_proxies);
        }

        if self.proxies.is_empty() {
            self.proxies.refresh().await;
        }
        ProxyPool::new(self.proxies.responsive_sample().await)
    }

    /// Issue one caption-retrieval attempt with its own transport binding
    async fn attempt(
        &self,
        video_id: &str,
        options: &FetchOptions,
        endpoint: Option<&str>,
    ) -> Result<Transcript, FetchError> {
        let client = self.build_attempt_client(endpoint)?;
        self.source
            .fetch_transcript(&client, video_id, options.language_code.as_deref())
            .await
    }

    /// Build the client for a single attempt: bounded timeout, a randomly
    /// chosen user agent, and the attempt's proxy when one was assigned
    fn build_attempt_client(&self, endpoint: Option<&str>) -> Result<Client, FetchError> {
        let mut builder = Client::builder().timeout(self.config.attempt_timeout());

        if let Some(user_agent) = self.config.user_agents.choose(&mut rand::rng()) {
            builder = builder.user_agent(user_agent.clone());
        }

        if let Some(endpoint) = endpoint {
            let proxy = reqwest::Proxy::all(proxy_url(endpoint))
                .map_err(|e| FetchError::Transport(format!("Invalid proxy {}: {}", endpoint, e)))?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to build HTTP client: {}", e)))
    }
}
