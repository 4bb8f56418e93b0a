//! Shared helpers for imagegen-service integration tests.

#![allow(dead_code)]

use imagegen_service::config::ImagegenConfig;
use imagegen_service::services::providers::{ImageProvider, MockBehavior, MockImageProvider};
use imagegen_service::startup::Application;
use std::sync::Arc;
use std::time::Duration;

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn generate(&self, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}/api/generate", self.address))
            .json(&body)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .expect("Failed to send request")
    }
}

/// Spawn the application on a random port around the given provider.
pub async fn spawn_app_with(
    provider: Arc<dyn ImageProvider>,
    configure: impl FnOnce(&mut ImagegenConfig),
) -> TestApp {
    let mut config = ImagegenConfig::for_mock_provider();
    configure(&mut config);

    let app = Application::build_with_provider(config, provider)
        .await
        .expect("Failed to build application");
    let port = app.http_port();

    tokio::spawn(async move {
        let _ = app.run_until_stopped().await;
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    }
}

pub async fn spawn_app(behavior: MockBehavior) -> (TestApp, Arc<MockImageProvider>) {
    let provider = Arc::new(MockImageProvider::new(behavior));
    let app = spawn_app_with(provider.clone(), |_| {}).await;
    (app, provider)
}
