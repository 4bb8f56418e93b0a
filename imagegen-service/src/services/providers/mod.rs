//! Image provider abstractions and implementations.
//!
//! The relay talks to providers only through [`ImageProvider`], so the real
//! OpenAI-compatible backend and the in-process mock are interchangeable.

pub mod mock;
pub mod openai_compatible;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use mock::{MockBehavior, MockImageProvider};
pub use openai_compatible::{OpenAiCompatibleConfig, OpenAiCompatibleProvider};

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Content filtered: {0}")]
    ContentFiltered(String),

    #[error("Rate limited")]
    RateLimited { retry_after: Option<u64> },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Provider request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Stable label for metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::Auth(_) => "auth",
            ProviderError::InvalidRequest(_) => "invalid_request",
            ProviderError::ContentFiltered(_) => "content_filtered",
            ProviderError::RateLimited { .. } => "rate_limited",
            ProviderError::ApiError { .. } => "api_error",
            ProviderError::Timeout => "timeout",
            ProviderError::NetworkError(_) => "network",
            ProviderError::MalformedResponse(_) => "malformed_response",
        }
    }
}

/// Body of an OpenAI-style `images/generations` call.
///
/// Only the model and prompt are sent; size, steps and seed stay at the
/// provider's defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageGenerationRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// OpenAI-style images response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImagesResponse {
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub data: Vec<ImageData>,
}

/// One generated image. Providers answer with either a URL or inline base64.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageData {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub b64_json: Option<String>,
    #[serde(default)]
    pub revised_prompt: Option<String>,
}

impl ImageData {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }
}

/// Trait for text-to-image providers.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Run one synchronous text-to-image generation.
    async fn generate_image(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImagesResponse, ProviderError>;

    /// Short provider name used in logs and metric labels.
    fn name(&self) -> &'static str;

    /// Health check.
    async fn health_check(&self) -> Result<(), ProviderError>;
}
