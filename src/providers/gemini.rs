use std::time::Duration;

use async_trait::async_trait;
use log::error;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::language_utils::resolve_language_name;
use crate::providers::{TranslationBackend, TranslationRequest};

/// Gemini client for the Google Generative Language API
#[derive(Debug)]
pub struct Gemini {
    /// HTTP client for API requests
    client: Client,
    /// Base URL up to and including the models segment
    endpoint: String,
}

/// Gemini generateContent request
#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    /// The conversation contents
    contents: Vec<GeminiContent>,
}

/// A content entry in a Gemini request or response
#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    /// The parts making up this content
    parts: Vec<GeminiPart>,
}

/// A single text part
#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    /// The actual text content
    text: String,
}

/// Gemini generateContent response
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    /// Generated candidates, absent when the request was blocked
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

/// One generated candidate
#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    /// The generated content
    content: GeminiContent,
}

impl Gemini {
    /// Create a new Gemini client
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
        }
    }

    /// Build the instruction prompt wrapped around a batch payload
    fn build_prompt(text: &str, target_language: &str) -> String {
        let language_name = resolve_language_name(target_language);
        format!(
            "Translate the following subtitle text into {} while maintaining:\n\
             - Natural, conversational tone\n\
             - Proper grammar and sentence structure\n\
             - Contextual accuracy\n\
             - Consistent terminology\n\
             - Appropriate length for on-screen display\n\
             \n\
             Avoid:\n\
             - Literal translations\n\
             - Overly formal or bookish language\n\
             - Unnatural phrasing\n\
             - Excessive wordiness\n\
             \n\
             Return ONLY the translated phrase, and nothing else. Do not include any \
             introductory text. Do not include any numbering.\n\
             \n\
             Input Text:\n{}",
            language_name, text
        )
    }

    /// Classify a non-success status into a provider error
    fn classify_error(status: StatusCode, body: &str) -> ProviderError {
        match status {
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded(body.to_string()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ProviderError::AuthenticationError(body.to_string())
            }
            // Gemini reports a bad key as a generic 400 with an explanatory message
            StatusCode::BAD_REQUEST if body.contains("API key") => {
                ProviderError::AuthenticationError(body.to_string())
            }
            _ => ProviderError::ApiError {
                status_code: status.as_u16(),
                message: body.to_string(),
            },
        }
    }
}

#[async_trait]
impl TranslationBackend for Gemini {
    async fn translate(&self, request: TranslationRequest) -> Result<String, ProviderError> {
        let api_url = format!(
            "{}/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            request.model
        );

        let body = GenerateContentRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: Self::build_prompt(&request.text, &request.target_language),
                }],
            }],
        };

        let response = self
            .client
            .post(&api_url)
            .query(&[("key", request.api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("Gemini API request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Gemini API error ({}): {}", status, error_text);
            return Err(Self::classify_error(status, &error_text));
        }

        let parsed = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| {
                ProviderError::ParseError(format!("Failed to parse Gemini API response: {}", e))
            })?;

        let Some(candidate) = parsed.candidates.first() else {
            return Err(ProviderError::ParseError(
                "Gemini API response contained no candidates".to_string(),
            ));
        };

        let text: String = candidate
            .content
            .parts
            .iter()
            .map(|part| part.text.as_str())
            .collect();

        Ok(text.trim().to_string())
    }
}
