//! End-to-end test infrastructure.
//!
//! Spawns the imagegen service in-process on a random port, backed by the
//! mock provider, and wires a studio controller to it over real HTTP.

use anyhow::{anyhow, Result};
use imagegen_service::config::ImagegenConfig;
use imagegen_service::services::providers::{MockBehavior, MockImageProvider};
use imagegen_service::startup::Application;
use std::sync::{Arc, Once};
use std::time::Duration;
use studio_client::config::RelaySettings;
use studio_client::services::{CreditStore, HttpRelayClient, LogNavigator};
use studio_client::{ControllerOptions, SubmissionController};

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,workflow_tests=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A running relay plus the provider behind it.
pub struct RelayHandle {
    pub base_url: String,
    pub provider: Arc<MockImageProvider>,
}

impl RelayHandle {
    /// Start the service with a mock provider and wait until it is healthy.
    pub async fn spawn(provider: MockImageProvider) -> Result<Self> {
        Self::spawn_with(provider, |_| {}).await
    }

    pub async fn spawn_with(
        provider: MockImageProvider,
        configure: impl FnOnce(&mut ImagegenConfig),
    ) -> Result<Self> {
        init_tracing();

        let provider = Arc::new(provider);
        let mut config = ImagegenConfig::for_mock_provider();
        configure(&mut config);

        let app = Application::build_with_provider(config, provider.clone())
            .await
            .map_err(|e| anyhow!("Failed to build imagegen-service: {}", e))?;
        let base_url = format!("http://127.0.0.1:{}", app.http_port());

        tokio::spawn(async move {
            if let Err(e) = app.run_until_stopped().await {
                tracing::error!("imagegen-service stopped: {}", e);
            }
        });

        wait_for_health(&base_url, Duration::from_secs(10)).await?;

        Ok(Self { base_url, provider })
    }

    pub async fn spawn_behaving(behavior: MockBehavior) -> Result<Self> {
        Self::spawn(MockImageProvider::new(behavior)).await
    }

    /// A controller talking to this relay, persisting into `store`.
    pub fn studio(
        &self,
        store: Arc<dyn CreditStore>,
    ) -> Result<(SubmissionController, Arc<LogNavigator>)> {
        let relay = Arc::new(HttpRelayClient::new(RelaySettings::for_url(&self.base_url))?);
        let navigator = Arc::new(LogNavigator::new());
        let controller = SubmissionController::new(
            store,
            relay,
            navigator.clone(),
            ControllerOptions::default(),
        )?;
        Ok((controller, navigator))
    }
}

/// Poll `/health` until it answers 200 or `timeout` elapses.
pub async fn wait_for_health(base_url: &str, timeout: Duration) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{}/health", base_url);
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        match client.get(&url).send().await {
            Ok(response) if response.status().is_success() => return Ok(()),
            Ok(response) => {
                tracing::debug!(status = %response.status(), "Relay not healthy yet")
            }
            Err(e) => tracing::debug!(error = %e, "Relay not reachable yet"),
        }

        if tokio::time::Instant::now() >= deadline {
            return Err(anyhow!("Relay at {} not healthy after {:?}", base_url, timeout));
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
