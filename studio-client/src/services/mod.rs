pub mod credit_store;
pub mod download;
pub mod navigator;
pub mod relay_client;

pub use credit_store::{CreditStore, FileCreditStore, MemoryCreditStore, CREDITS_KEY};
pub use download::ImageDownloader;
pub use navigator::{LogNavigator, Navigator};
pub use relay_client::{HttpRelayClient, RelayClient};
