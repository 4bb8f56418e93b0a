//! Application startup and lifecycle management.

use crate::config::{ImagegenConfig, ProviderKind};
use crate::handlers::{
    generate::generate_image,
    health::{health_check, readiness_check},
    metrics::metrics,
    not_found,
};
use crate::services::metrics::init_metrics;
use crate::services::providers::{
    ImageProvider, MockImageProvider, OpenAiCompatibleConfig, OpenAiCompatibleProvider,
};
use crate::services::GenerationRelay;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use service_core::error::AppError;
use service_core::middleware::{
    http_trace_layer, request_id_middleware, security_headers_middleware,
};
use service_core::observability::REQUEST_ID_HEADER;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ImagegenConfig>,
    pub relay: Arc<GenerationRelay>,
}

/// Provider selected by configuration.
pub fn build_provider(config: &ImagegenConfig) -> Result<Arc<dyn ImageProvider>, AppError> {
    let provider: Arc<dyn ImageProvider> = match config.provider.kind {
        ProviderKind::OpenaiCompatible => {
            let provider = OpenAiCompatibleProvider::new(OpenAiCompatibleConfig {
                base_url: config.provider.base_url.clone(),
                api_key_env: config.provider.api_key_env.clone(),
                timeout: config.provider.timeout(),
            })
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;
            tracing::info!(
                base_url = %config.provider.base_url,
                model = %config.provider.model,
                "Initialized OpenAI-compatible image provider"
            );
            Arc::new(provider)
        }
        ProviderKind::Mock => {
            tracing::warn!("Using mock image provider");
            Arc::new(MockImageProvider::default())
        }
    };

    Ok(provider)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed_origins.iter().filter_map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|e| tracing::error!("Ignoring invalid CORS origin '{}': {}", o, e))
                .ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

/// Build the HTTP router for the given state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/generate", post(generate_image))
        .route("/generate", post(generate_image))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics))
        .fallback(not_found)
        .layer(http_trace_layer())
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.security.allowed_origins))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    http_listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the provider named in the configuration.
    pub async fn build(config: ImagegenConfig) -> Result<Self, AppError> {
        let provider = build_provider(&config)?;
        Self::build_with_provider(config, provider).await
    }

    /// Build the application around an already constructed provider.
    pub async fn build_with_provider(
        config: ImagegenConfig,
        provider: Arc<dyn ImageProvider>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let relay = GenerationRelay::new(
            provider,
            config.provider.model.clone(),
            config.provider.timeout(),
        );

        let state = AppState {
            config: Arc::new(config),
            relay: Arc::new(relay),
        };

        // Port 0 picks a random port, used by tests
        let http_addr = state.config.common.socket_addr()?;
        let http_listener = TcpListener::bind(http_addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", http_addr, e);
            AppError::from(e)
        })?;
        let http_port = http_listener.local_addr()?.port();

        tracing::info!("Imagegen service: HTTP on port {}", http_port);

        Ok(Self {
            http_port,
            http_listener,
            state,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        axum::serve(self.http_listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                std::io::Error::other(format!("HTTP server error: {}", e))
            })?;

        tracing::info!("Service shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
