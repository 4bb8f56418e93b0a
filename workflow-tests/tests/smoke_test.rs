//! Smoke test for the end-to-end harness itself.

use imagegen_service::services::providers::MockBehavior;
use workflow_tests::RelayHandle;

#[tokio::test]
async fn relay_serves_health_and_generate() {
    let relay = RelayHandle::spawn_behaving(MockBehavior::Succeed)
        .await
        .unwrap();

    let response = reqwest::Client::new()
        .post(format!("{}/api/generate", relay.base_url))
        .json(&serde_json::json!({ "prompt": "smoke" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["imageurl"].is_string());
}
