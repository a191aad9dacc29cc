use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Application configuration module
/// This module holds the service configuration including loading defaults,
/// validating values and mapping them onto the subsystems.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Proxy pool settings
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Caption fetch settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Translation pipeline settings
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// HTTP server configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Port the service listens on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

/// Proxy pool configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProxyConfig {
    /// Listing service returning newline-delimited proxy endpoints
    #[serde(default = "default_listing_url")]
    pub listing_url: String,

    /// Timeout for the listing call in seconds
    #[serde(default = "default_listing_timeout_secs")]
    pub listing_timeout_secs: u64,

    /// URL requested through a candidate proxy to confirm it forwards traffic
    #[serde(default = "default_probe_url")]
    pub probe_url: String,

    /// Per-probe timeout in seconds
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// How many entries from the front of the pool get probed per request
    #[serde(default = "default_probe_sample")]
    pub probe_sample: usize,

    /// Seconds between background pool refreshes
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Where the pool is persisted across restarts
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

impl ProxyConfig {
    /// Timeout applied to the listing call
    pub fn listing_timeout(&self) -> Duration {
        Duration::from_secs(self.listing_timeout_secs)
    }

    /// Timeout applied to each liveness probe
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Period of the background refresh task
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listing_url: default_listing_url(),
            listing_timeout_secs: default_listing_timeout_secs(),
            probe_url: default_probe_url(),
            probe_timeout_secs: default_probe_timeout_secs(),
            probe_sample: default_probe_sample(),
            refresh_interval_secs: default_refresh_interval_secs(),
            state_file: default_state_file(),
        }
    }
}

/// Caption fetch configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FetchConfig {
    /// Per-attempt timeout in seconds
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    /// User-agent strings rotated across attempts
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,

    /// Whether fetched transcripts are cached on disk
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Cache directory; unset means the user's local data directory
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl FetchConfig {
    /// Timeout applied to each caption-retrieval attempt
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_secs: default_attempt_timeout_secs(),
            user_agents: default_user_agents(),
            cache_enabled: true,
            cache_dir: None,
        }
    }
}

/// Translation pipeline configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Base URL of the generateContent-style API
    #[serde(default = "default_translation_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds for one backend call
    #[serde(default = "default_translation_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Pause between consecutive batches in milliseconds
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Cooldown after a rate-limit response in milliseconds
    #[serde(default = "default_rate_limit_cooldown_ms")]
    pub rate_limit_cooldown_ms: u64,
}

impl TranslationConfig {
    /// Pause inserted between consecutive batches
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    /// Cooldown observed after a rate-limit response
    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_millis(self.rate_limit_cooldown_ms)
    }

    /// Timeout for one backend call
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_translation_endpoint(),
            request_timeout_secs: default_translation_timeout_secs(),
            batch_delay_ms: default_batch_delay_ms(),
            rate_limit_cooldown_ms: default_rate_limit_cooldown_ms(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Corresponding `log` crate filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_port() -> u16 {
    3000
}

fn default_listing_url() -> String {
    "https://api.proxyscrape.com/v2/?request=displayproxies&protocol=http&timeout=10000&country=all&ssl=all&anonymity=all".to_string()
}

fn default_listing_timeout_secs() -> u64 {
    10
}

fn default_probe_url() -> String {
    "https://www.youtube.com/".to_string()
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_probe_sample() -> usize {
    10
}

fn default_refresh_interval_secs() -> u64 {
    3600 // refresh the free-proxy pool every hour
}

fn default_state_file() -> PathBuf {
    PathBuf::from("proxies.json")
}

fn default_attempt_timeout_secs() -> u64 {
    10
}

fn default_user_agents() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Safari/605.1.15".to_string(),
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0".to_string(),
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.107 Safari/537.36".to_string(),
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.131 Safari/537.36 Edg/92.0.902.67".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

fn default_translation_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".to_string()
}

fn default_translation_timeout_secs() -> u64 {
    120
}

fn default_batch_delay_ms() -> u64 {
    4000
}

fn default_rate_limit_cooldown_ms() -> u64 {
    60000
}

impl AppConfig {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("server.port must be non-zero"));
        }

        Url::parse(&self.proxy.listing_url)
            .map_err(|e| anyhow!("proxy.listing_url is not a valid URL: {}", e))?;
        Url::parse(&self.proxy.probe_url)
            .map_err(|e| anyhow!("proxy.probe_url is not a valid URL: {}", e))?;

        if self.proxy.probe_sample == 0 {
            return Err(anyhow!("proxy.probe_sample must be at least 1"));
        }

        if self.fetch.user_agents.is_empty() {
            return Err(anyhow!("fetch.user_agents must not be empty"));
        }

        Url::parse(&self.translation.endpoint)
            .map_err(|e| anyhow!("translation.endpoint is not a valid URL: {}", e))?;

        Ok(())
    }
}
