use crate::config::RelaySettings;
use crate::error::ClientError;
use crate::models::GenerationResult;
use async_trait::async_trait;
use reqwest::Client;
use service_core::dtos::{ErrorBody, GenerateImageRequest, GenerateImageResponse};
use service_core::observability::TracedClientExt;

/// One generation round trip against the relay.
#[async_trait]
pub trait RelayClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult, ClientError>;
}

pub struct HttpRelayClient {
    client: Client,
    settings: RelaySettings,
}

impl HttpRelayClient {
    pub fn new(settings: RelaySettings) -> Result<Self, ClientError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ClientError::Transport(format!("HTTP client: {}", e)))?;

        Ok(Self { client, settings })
    }

    pub fn generate_url(&self) -> String {
        self.settings.generate_url()
    }

    fn map_send_error(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout(self.settings.timeout())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    #[tracing::instrument(
        name = "relay_client.generate",
        skip_all,
        fields(prompt_len = prompt.len())
    )]
    async fn generate(&self, prompt: &str) -> Result<GenerationResult, ClientError> {
        let url = self.generate_url();

        let response = self
            .client
            .traced_post(&url)
            .timeout(self.settings.timeout())
            .json(&GenerateImageRequest::new(prompt))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send POST request to {}: {}", url, e);
                self.map_send_error(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let (code, message) = match serde_json::from_str::<ErrorBody>(&text) {
                Ok(body) => (body.code, body.error),
                Err(_) => ("unknown".to_string(), text),
            };
            tracing::warn!(status = status.as_u16(), %code, "Relay rejected generation");
            return Err(ClientError::Relay {
                status: status.as_u16(),
                code,
                message,
            });
        }

        let body = response.json::<GenerateImageResponse>().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Timeout(self.settings.timeout())
            } else {
                ClientError::InvalidResponse(e.to_string())
            }
        })?;

        Ok(GenerationResult {
            image_url: body.imageurl,
        })
    }
}
