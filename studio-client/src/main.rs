use service_core::observability::init_cli_tracing;
use std::sync::Arc;
use studio_client::config::StudioSettings;
use studio_client::services::{FileCreditStore, HttpRelayClient, ImageDownloader, LogNavigator};
use studio_client::shell::Shell;
use studio_client::{ControllerOptions, SubmissionController};
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = StudioSettings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_cli_tracing(&settings.log_level);

    let store = Arc::new(FileCreditStore::new(&settings.credits.store_path));
    let relay = Arc::new(HttpRelayClient::new(settings.relay.clone())?);
    let navigator = Arc::new(LogNavigator::new());

    let controller = SubmissionController::new(
        store,
        relay,
        navigator,
        ControllerOptions::from(&settings),
    )?;
    let downloader = ImageDownloader::new(settings.download.file_name.clone())?;

    tracing::info!(relay = %settings.relay.generate_url(), "Studio ready");

    Shell::new(&controller, &downloader)
        .with_ctrl_c()
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;

    Ok(())
}
