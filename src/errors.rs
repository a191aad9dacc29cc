/*!
 * Error types for the tubesub application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

// Allow dead code - error types are for library consumers
#![allow(dead_code)]

use thiserror::Error;

/// Errors that can occur while fetching caption data from the video site
#[derive(Error, Debug)]
pub enum FetchError {
    /// Captions are turned off for the video; retrying cannot help
    #[error("Subtitles are disabled for this video.")]
    CaptionsDisabled,

    /// The video has no caption track (or none for the requested language)
    #[error("{0}")]
    NoCaptionsFound(String),

    /// A transient transport problem: timeout, connection failure, non-2xx, blocked
    #[error("Transport error: {0}")]
    Transport(String),

    /// Every proxied attempt and the direct fallback failed
    #[error("All {attempts} fetch attempts failed, including the direct fallback")]
    Exhausted {
        /// Total attempts made, counting the direct fallback
        attempts: usize,
    },
}

impl FetchError {
    /// Whether retrying through another route could change the outcome
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::CaptionsDisabled | Self::NoCaptionsFound(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Transport(format!("Request timed out: {}", error))
        } else if error.is_connect() {
            Self::Transport(format!("Connection failed: {}", error))
        } else {
            Self::Transport(error.to_string())
        }
    }
}

/// Errors that can occur when working with the translation provider API
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

/// Errors that can occur in the batch translation pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The subtitle payload produced zero parseable blocks
    #[error("Failed to parse subtitles for translation")]
    ParseFailure,

    /// The backend rate limit persisted through the cooldown retry
    #[error("Translation backend rate limit persisted after cooldown retry")]
    RateLimited,

    /// Any other failure from the translation backend
    #[error("Provider error: {0}")]
    Backend(#[from] ProviderError),

    /// The client dropped the progress stream; remaining work was abandoned
    #[error("Client disconnected before processing finished")]
    Disconnected,
}

impl PipelineError {
    /// Message suitable for the streamed `error` event
    pub fn user_message(&self) -> String {
        match self {
            Self::ParseFailure => "Failed to parse subtitles for translation".to_string(),
            Self::RateLimited => {
                "Gemini API rate limit exceeded. Please try again later.".to_string()
            }
            Self::Backend(ProviderError::AuthenticationError(_)) => {
                "Invalid Gemini API key".to_string()
            }
            Self::Backend(e) => e.to_string(),
            Self::Disconnected => "Client disconnected".to_string(),
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from caption fetching
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Error from the translation provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the translation pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
