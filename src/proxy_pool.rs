/*!
 * Proxy pool management.
 *
 * Maintains the shared list of candidate proxy endpoints used to route caption
 * requests around upstream blocking. The pool is replaced wholesale on refresh
 * (from a public listing service) or by a caller-supplied override, and is read
 * through a single rotating accessor. Free proxy lists are volatile, so a
 * bounded prefix of the pool can be probed for liveness before use.
 */

use std::path::Path;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use parking_lot::Mutex;
use reqwest::Client;

use crate::app_config::ProxyConfig;

/// Ordered sequence of proxy endpoints with a rotating cursor
#[derive(Debug, Clone, Default)]
pub struct ProxyPool {
    entries: Vec<String>,
    cursor: usize,
}

impl ProxyPool {
    /// Create a pool from already-cleaned entries
    pub fn new(entries: Vec<String>) -> Self {
        ProxyPool { entries, cursor: 0 }
    }

    /// Create a pool from raw candidate strings, trimming and dropping empties
    pub fn sanitized<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = candidates
            .into_iter()
            .map(|c| c.as_ref().trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        ProxyPool::new(entries)
    }

    /// Number of endpoints in the pool
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool holds no endpoints
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All endpoints in pool order
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Return the endpoint at the cursor and advance, wrapping at the end.
    /// An empty pool yields `None`; callers must check.
    pub fn next(&mut self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let entry = self.entries[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.entries.len();
        Some(entry)
    }

    /// Replace every entry and reset the cursor
    pub fn replace(&mut self, entries: Vec<String>) {
        self.entries = entries;
        self.cursor = 0;
    }
}

/// Give bare `host:port` endpoints an explicit scheme so they can be used
/// as an HTTP proxy URL
pub fn proxy_url(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    }
}

/// Process-wide proxy pool with refresh, persistence and liveness probing
pub struct ProxyPoolManager {
    /// Shared pool, rotated across requests
    pool: Mutex<ProxyPool>,
    /// Client for talking to the listing service
    client: Client,
    /// Proxy subsystem settings
    config: ProxyConfig,
}

impl ProxyPoolManager {
    /// Create a manager with an empty pool
    pub fn new(config: ProxyConfig) -> Self {
        ProxyPoolManager {
            pool: Mutex::new(ProxyPool::default()),
            client: Client::builder()
                .timeout(config.listing_timeout())
                .build()
                .unwrap_or_default(),
            config,
        }
    }

    /// Fetch a fresh list from the listing service and swap it in.
    ///
    /// Returns true when the pool was replaced. Any fetch or parse problem,
    /// or an empty listing, leaves the existing pool untouched and returns
    /// false.
    pub async fn refresh(&self) -> bool {
        let response = match self.client.get(&self.config.listing_url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Error fetching proxies from listing service: {}", e);
                return false;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("Proxy listing service responded with status {}", status);
            return false;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Error reading proxy listing response: {}", e);
                return false;
            }
        };

        let fetched = ProxyPool::sanitized(body.lines());
        if fetched.is_empty() {
            warn!("No proxies fetched from listing service");
            return false;
        }

        info!("Fetched {} proxies from listing service", fetched.len());
        *self.pool.lock() = fetched;
        self.save_persisted().await;
        true
    }

    /// Replace the pool with caller-supplied endpoints, bypassing the listing
    /// service. Always treated as successful; returns the number of entries
    /// kept after cleaning.
    pub fn set_custom(&self, candidates: &[String]) -> usize {
        let pool = ProxyPool::sanitized(candidates);
        let count = pool.len();
        *self.pool.lock() = pool;
        count
    }

    /// Rotating accessor over the shared pool
    pub fn next(&self) -> Option<String> {
        self.pool.lock().next()
    }

    /// Number of endpoints currently pooled
    pub fn len(&self) -> usize {
        self.pool.lock().len()
    }

    /// Whether the shared pool is empty
    pub fn is_empty(&self) -> bool {
        self.pool.lock().is_empty()
    }

    /// Copy of the pooled endpoints in order
    pub fn snapshot(&self) -> Vec<String> {
        self.pool.lock().entries().to_vec()
    }

    /// Probe one endpoint with a lightweight request through the proxy.
    /// True only on a timely 2xx response.
    pub async fn test_liveness(&self, endpoint: &str) -> bool {
        let proxy = match reqwest::Proxy::all(proxy_url(endpoint)) {
            Ok(proxy) => proxy,
            Err(e) => {
                debug!("Proxy {} rejected as a proxy URL: {}", endpoint, e);
                return false;
            }
        };

        let probe_client = match Client::builder()
            .proxy(proxy)
            .timeout(self.config.probe_timeout())
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                debug!("Could not build probe client for {}: {}", endpoint, e);
                return false;
            }
        };

        match probe_client.get(&self.config.probe_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Proxy {} failed liveness probe: {}", endpoint, e);
                false
            }
        }
    }

    /// Probe a bounded prefix of the pool concurrently and return the
    /// endpoints that answered, preserving pool order.
    pub async fn responsive_sample(&self) -> Vec<String> {
        let sample: Vec<String> = self
            .snapshot()
            .into_iter()
            .take(self.config.probe_sample)
            .collect();
        if sample.is_empty() {
            return Vec::new();
        }

        let fan_out = sample.len();
        let probed: Vec<(String, bool)> = stream::iter(sample)
            .map(|endpoint| async move {
                let alive = self.test_liveness(&endpoint).await;
                if !alive {
                    warn!("Proxy {} is not working, skipping", endpoint);
                }
                (endpoint, alive)
            })
            .buffered(fan_out)
            .collect()
            .await;

        probed
            .into_iter()
            .filter(|(_, alive)| *alive)
            .map(|(endpoint, _)| endpoint)
            .collect()
    }

    /// Load a previously persisted pool. Missing or unreadable state means a
    /// clean start, never an error.
    pub async fn load_persisted(&self) {
        let path = self.config.state_file.as_path();
        match tokio::fs::read_to_string(path).await {
            Ok(data) => match serde_json::from_str::<Vec<String>>(&data) {
                Ok(entries) => {
                    let pool = ProxyPool::sanitized(entries);
                    info!("Loaded {} proxies from {}", pool.len(), path.display());
                    *self.pool.lock() = pool;
                }
                Err(e) => {
                    warn!("Ignoring corrupt proxy state file {}: {}", path.display(), e);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    "Proxy state file {} not found, starting with empty pool",
                    path.display()
                );
            }
            Err(e) => {
                warn!("Error reading proxy state file {}: {}", path.display(), e);
            }
        }
    }

    /// Persist the current pool next to the process; best-effort
    async fn save_persisted(&self) {
        let path = self.config.state_file.clone();
        match write_state_file(&path, &self.snapshot()).await {
            Ok(()) => debug!("Proxies saved to {}", path.display()),
            Err(e) => warn!("Error saving proxies to {}: {}", path.display(), e),
        }
    }

    /// Periodically re-fetch the listing so the pool does not go stale.
    /// The initial refresh is expected to have run at startup.
    pub async fn run_refresh_loop(&self) {
        let mut interval = tokio::time::interval(self.config.refresh_interval());
        // the first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            if !self.refresh().await {
                warn!("Scheduled proxy refresh failed, keeping previous pool");
            }
        }
    }
}

async fn write_state_file(path: &Path, entries: &[String]) -> Result<()> {
    let data = serde_json::to_string(entries).context("Failed to serialize proxy list")?;
    tokio::fs::write(path, data)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
