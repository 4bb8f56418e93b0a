//! OpenAI-compatible `images/generations` provider.
//!
//! Works against any endpoint speaking the OpenAI images API; the default
//! configuration points at Nebius AI Studio.

use super::{ImageGenerationRequest, ImageProvider, ImagesResponse, ProviderError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Client;
use service_core::observability::TracedClientExt;
use std::time::Duration;

/// Longest provider error text carried into our own errors.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// OpenAI-compatible provider configuration.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub timeout: Duration,
}

/// OpenAI-compatible image provider.
pub struct OpenAiCompatibleProvider {
    config: OpenAiCompatibleConfig,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: OpenAiCompatibleConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn generations_url(&self) -> String {
        format!(
            "{}/images/generations",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// The key is looked up on every call so a rotated secret is picked up
    /// without a restart.
    fn api_key(&self) -> Result<String, ProviderError> {
        std::env::var(&self.config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!("{} is not set", self.config.api_key_env))
            })
    }

    fn parse_error(status: u16, text: &str, headers: &HeaderMap) -> ProviderError {
        let message = truncate_message(text);
        let lower = message.to_lowercase();
        let content_blocked = lower.contains("safety")
            || lower.contains("content_policy")
            || lower.contains("content policy")
            || lower.contains("nsfw");

        match status {
            401 | 403 => ProviderError::Auth(message),
            429 => ProviderError::RateLimited {
                retry_after: parse_retry_after(headers),
            },
            _ if content_blocked => ProviderError::ContentFiltered(message),
            400 | 422 => ProviderError::InvalidRequest(message),
            _ => ProviderError::ApiError { status, message },
        }
    }
}

fn map_transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::NetworkError(err.to_string())
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

fn truncate_message(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
    truncated.push_str("...");
    truncated
}

#[async_trait]
impl ImageProvider for OpenAiCompatibleProvider {
    async fn generate_image(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImagesResponse, ProviderError> {
        let api_key = self.api_key()?;
        let url = self.generations_url();

        tracing::debug!(
            url = %url,
            model = %request.model,
            prompt_len = request.prompt.as_deref().map(str::len),
            "Sending image generation request"
        );

        let response = self
            .client
            .traced_post(&url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status.as_u16(), &text, &headers));
        }

        response.json::<ImagesResponse>().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::MalformedResponse(e.to_string())
            }
        })
    }

    fn name(&self) -> &'static str {
        "openai_compatible"
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        self.api_key().map(|_| ())
    }
}
