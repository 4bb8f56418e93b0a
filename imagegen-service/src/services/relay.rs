//! The generation relay: one prompt in, one provider call, one image URL out.
//!
//! No caching, queuing, deduplication or retry. The relay holds only
//! immutable configuration, so concurrent calls share nothing mutable.

use crate::error::RelayError;
use crate::services::metrics;
use crate::services::providers::{
    ImageGenerationRequest, ImageProvider, ImagesResponse, ProviderError,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Media type assumed for inline base64 images.
const INLINE_IMAGE_MEDIA_TYPE: &str = "image/png";

/// Image location handed back to the caller: a URL or a `data:` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub image_url: String,
}

pub struct GenerationRelay {
    provider: Arc<dyn ImageProvider>,
    model: String,
    deadline: Duration,
}

impl GenerationRelay {
    pub fn new(
        provider: Arc<dyn ImageProvider>,
        model: impl Into<String>,
        deadline: Duration,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            deadline,
        }
    }

    pub fn provider(&self) -> &Arc<dyn ImageProvider> {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Forward `prompt` unchanged to the provider and return the first image.
    ///
    /// Dropping the returned future aborts the outbound call.
    #[tracing::instrument(
        name = "relay_generation",
        skip(self, prompt),
        fields(
            provider = self.provider.name(),
            model = %self.model,
            prompt_len = prompt.as_deref().map(str::len),
        )
    )]
    pub async fn relay(&self, prompt: Option<String>) -> Result<GenerationResult, RelayError> {
        let request = ImageGenerationRequest {
            model: self.model.clone(),
            prompt,
        };

        let start = Instant::now();
        let outcome =
            tokio::time::timeout(self.deadline, self.provider.generate_image(&request)).await;
        metrics::record_provider_latency(
            self.provider.name(),
            &self.model,
            start.elapsed().as_secs_f64(),
        );

        let result = match outcome {
            Err(_) => {
                metrics::record_provider_error(self.provider.name(), "deadline");
                Err(RelayError::Timeout(self.deadline))
            }
            Ok(Err(err)) => {
                metrics::record_provider_error(self.provider.name(), err.error_type());
                Err(self.classify(err))
            }
            Ok(Ok(response)) => {
                first_image_url(&response).map(|image_url| GenerationResult { image_url })
            }
        };

        match &result {
            Ok(_) => {
                metrics::record_request("success");
                tracing::info!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Image generated"
                );
            }
            Err(err) => {
                metrics::record_request(err.code());
                tracing::warn!(error = %err, code = err.code(), "Image generation failed");
            }
        }

        result
    }

    fn classify(&self, err: ProviderError) -> RelayError {
        match err {
            ProviderError::Timeout => RelayError::Timeout(self.deadline),
            other => other.into(),
        }
    }
}

/// Checked access to the first image of a provider response.
///
/// An empty result set, or a first entry carrying neither a URL nor inline
/// data, is [`RelayError::EmptyResultSet`].
pub fn first_image_url(response: &ImagesResponse) -> Result<String, RelayError> {
    let first = response.data.first().ok_or(RelayError::EmptyResultSet)?;

    if let Some(url) = first.url.as_deref().filter(|u| !u.is_empty()) {
        return Ok(url.to_string());
    }

    if let Some(b64) = first.b64_json.as_deref().filter(|b| !b.is_empty()) {
        return Ok(format!("data:{};base64,{}", INLINE_IMAGE_MEDIA_TYPE, b64));
    }

    Err(RelayError::EmptyResultSet)
}
