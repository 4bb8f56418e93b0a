//! HTTP handlers for the imagegen service.

pub mod generate;
pub mod health;
pub mod metrics;

use axum::http::Uri;
use service_core::error::AppError;

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(anyhow::anyhow!("No route for {}", uri.path()))
}
