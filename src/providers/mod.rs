/*!
 * Translation backend implementations.
 *
 * This module contains the client used to translate subtitle batches:
 * - Gemini: Google Generative Language API integration
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// One batched translation call
///
/// The text payload is a newline separated list of subtitle lines; the
/// backend is expected to return the translated lines with the same
/// separation and ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    /// Newline separated lines to translate
    pub text: String,

    /// Target language, as an ISO code or a plain language name
    pub target_language: String,

    /// Caller supplied API key, forwarded per request
    pub api_key: String,

    /// Backend model identifier
    pub model: String,
}

impl TranslationRequest {
    /// Create a new translation request
    pub fn new(
        text: impl Into<String>,
        target_language: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            target_language: target_language.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

/// Common trait for translation backends
///
/// The pipeline drives any implementation through this one operation, which
/// keeps credentials and model selection per request rather than per client.
#[async_trait]
pub trait TranslationBackend: Send + Sync + Debug {
    /// Translate one batch payload
    ///
    /// # Arguments
    /// * `request` - The batch to translate
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The translated payload or an error
    async fn translate(&self, request: TranslationRequest) -> Result<String, ProviderError>;
}

pub mod gemini;
