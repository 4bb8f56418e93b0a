use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use service_core::dtos::{GenerateImageRequest, GenerateImageResponse};
use service_core::error::AppError;

use crate::startup::AppState;

/// `POST /api/generate`: relay one prompt to the image provider.
///
/// The prompt is not validated here; whatever arrives is forwarded. Only a
/// body that is not a JSON object is refused.
#[tracing::instrument(skip(state, payload))]
pub async fn generate_image(
    State(state): State<AppState>,
    payload: Result<Json<GenerateImageRequest>, JsonRejection>,
) -> Result<Json<GenerateImageResponse>, AppError> {
    let Json(request) =
        payload.map_err(|rejection| AppError::BadRequest(anyhow::anyhow!(rejection.body_text())))?;

    tracing::info!(
        prompt = request.prompt.as_deref().unwrap_or_default(),
        "Received generation request"
    );

    let result = state.relay.relay(request.prompt).await?;

    Ok(Json(GenerateImageResponse {
        imageurl: result.image_url,
    }))
}
