use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::startup::AppState;

const SERVICE_NAME: &str = "imagegen-service";

/// Liveness probe. The relay keeps no state, so being up is being alive.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe: ready once the provider reports itself usable.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let provider = state.relay.provider();
    match provider.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "service": SERVICE_NAME,
                "provider": provider.name(),
                "model": state.relay.model(),
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unavailable",
                "service": SERVICE_NAME,
                "provider": provider.name(),
                "error": e.to_string()
            })),
        ),
    }
}
