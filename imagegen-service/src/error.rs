//! Relay error contract and its HTTP mapping.

use crate::services::providers::ProviderError;
use axum::http::StatusCode;
use service_core::error::AppError;
use std::time::Duration;
use thiserror::Error;

/// Why a relay call produced no image.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Provider could not be reached or could not serve the call.
    #[error("Image provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Provider refused the prompt.
    #[error("Image provider rejected the prompt: {0}")]
    ProviderRejectedPrompt(String),

    /// Provider answered without any usable image.
    #[error("Image provider returned no images")]
    EmptyResultSet,

    #[error("Image provider did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Image provider rate limit reached")]
    RateLimited { retry_after: Option<u64> },
}

impl RelayError {
    /// Machine-readable code carried in the error body.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::ProviderUnavailable(_) => "provider_unavailable",
            RelayError::ProviderRejectedPrompt(_) => "provider_rejected_prompt",
            RelayError::EmptyResultSet => "empty_result_set",
            RelayError::Timeout(_) => "timeout",
            RelayError::RateLimited { .. } => "rate_limited",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::ProviderRejectedPrompt(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RelayError::EmptyResultSet => StatusCode::BAD_GATEWAY,
            RelayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            RelayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl From<ProviderError> for RelayError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidRequest(msg) | ProviderError::ContentFiltered(msg) => {
                RelayError::ProviderRejectedPrompt(msg)
            }
            ProviderError::RateLimited { retry_after } => RelayError::RateLimited { retry_after },
            ProviderError::Timeout => RelayError::ProviderUnavailable("request timed out".into()),
            other @ (ProviderError::NotConfigured(_)
            | ProviderError::Auth(_)
            | ProviderError::ApiError { .. }
            | ProviderError::NetworkError(_)
            | ProviderError::MalformedResponse(_)) => {
                RelayError::ProviderUnavailable(other.to_string())
            }
        }
    }
}

impl From<RelayError> for AppError {
    fn from(err: RelayError) -> Self {
        let retry_after = match &err {
            RelayError::RateLimited { retry_after } => *retry_after,
            _ => None,
        };

        AppError::Upstream {
            status: err.status(),
            code: err.code(),
            message: err.to_string(),
            retry_after,
        }
    }
}
