use serde::Deserialize;
use service_core::config::load_settings;
use service_core::error::AppError;
use std::path::PathBuf;
use std::time::Duration;

/// Settings for the `studio` shell, read from `studio.{toml,yaml,json}` and
/// `APP__*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct StudioSettings {
    #[serde(default)]
    pub relay: RelaySettings,
    #[serde(default)]
    pub credits: CreditSettings,
    #[serde(default)]
    pub download: DownloadSettings,
    /// Where the user is sent once the free generations are used up.
    #[serde(default = "default_subscription_url")]
    pub subscription_url: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelaySettings {
    /// Base URL of the imagegen service.
    #[serde(default = "default_relay_url")]
    pub url: String,
    #[serde(default = "default_generate_path")]
    pub generate_path: String,
    /// Must exceed the relay's own provider deadline.
    #[serde(default = "default_relay_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreditSettings {
    /// JSON file standing in for browser local storage.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// Credits granted to a device seen for the first time.
    #[serde(default = "default_initial_credits")]
    pub initial: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadSettings {
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

fn default_relay_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_generate_path() -> String {
    "/api/generate".to_string()
}

fn default_relay_timeout_secs() -> u64 {
    150
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".studio/local_storage.json")
}

fn default_initial_credits() -> i64 {
    3
}

fn default_file_name() -> String {
    "ai-image.jpg".to_string()
}

fn default_subscription_url() -> String {
    "/subscription".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            url: default_relay_url(),
            generate_path: default_generate_path(),
            timeout_secs: default_relay_timeout_secs(),
        }
    }
}

impl RelaySettings {
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn generate_url(&self) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), self.generate_path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for CreditSettings {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            initial: default_initial_credits(),
        }
    }
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
        }
    }
}

impl Default for StudioSettings {
    fn default() -> Self {
        Self {
            relay: RelaySettings::default(),
            credits: CreditSettings::default(),
            download: DownloadSettings::default(),
            subscription_url: default_subscription_url(),
            log_level: default_log_level(),
        }
    }
}

impl StudioSettings {
    pub fn load() -> Result<Self, AppError> {
        let settings: Self = load_settings("studio", &[])?;

        if settings.relay.timeout_secs == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "relay.timeout_secs must be greater than zero"
            )));
        }
        if settings.credits.initial < 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "credits.initial must not be negative"
            )));
        }

        Ok(settings)
    }
}
