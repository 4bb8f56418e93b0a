//! Mock provider implementation for local runs and testing.

use super::{ImageData, ImageGenerationRequest, ImageProvider, ImagesResponse, ProviderError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Most recent prompts kept for inspection; older ones are dropped.
const MAX_RECORDED_PROMPTS: usize = 256;

/// How the mock answers every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    /// Return one image URL per call.
    Succeed,
    /// Return the image inline as base64 instead of a URL.
    InlineData,
    /// Return a response with no images.
    EmptyResultSet,
    /// Refuse the prompt as the provider's content filter would.
    RejectPrompt,
    /// Fail as if the provider were down.
    Unavailable,
    /// Fail with a provider rate limit.
    RateLimited { retry_after: Option<u64> },
    /// Never answer.
    Hang,
}

/// Mock image provider.
pub struct MockImageProvider {
    behavior: MockBehavior,
    latency: Duration,
    calls: AtomicUsize,
    prompts: Mutex<VecDeque<Option<String>>>,
}

impl MockImageProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(VecDeque::new()),
        }
    }

    /// Simulated generation time before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of generation calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts exactly as received, in arrival order. Only the latest
    /// [`MAX_RECORDED_PROMPTS`] are kept.
    pub fn received_prompts(&self) -> Vec<Option<String>> {
        self.prompts
            .lock()
            .map(|prompts| prompts.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for MockImageProvider {
    fn default() -> Self {
        Self::new(MockBehavior::Succeed)
    }
}

#[async_trait]
impl ImageProvider for MockImageProvider {
    async fn generate_image(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImagesResponse, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut prompts) = self.prompts.lock() {
            if prompts.len() >= MAX_RECORDED_PROMPTS {
                prompts.pop_front();
            }
            prompts.push_back(request.prompt.clone());
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match &self.behavior {
            MockBehavior::Succeed => Ok(ImagesResponse {
                created: Some(0),
                data: vec![ImageData::from_url(format!(
                    "https://mock.imagegen.local/images/{}.png",
                    call
                ))],
            }),
            MockBehavior::InlineData => Ok(ImagesResponse {
                created: Some(0),
                data: vec![ImageData {
                    b64_json: Some("aW1hZ2U=".to_string()),
                    ..ImageData::default()
                }],
            }),
            MockBehavior::EmptyResultSet => Ok(ImagesResponse::default()),
            MockBehavior::RejectPrompt => Err(ProviderError::ContentFiltered(
                "Prompt rejected by mock content filter".to_string(),
            )),
            MockBehavior::Unavailable => Err(ProviderError::NetworkError(
                "Mock provider unavailable".to_string(),
            )),
            MockBehavior::RateLimited { retry_after } => Err(ProviderError::RateLimited {
                retry_after: *retry_after,
            }),
            MockBehavior::Hang => std::future::pending().await,
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Unavailable => Err(ProviderError::NotConfigured(
                "Mock provider unavailable".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
