use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::time::Duration;

/// Nebius AI Studio, an OpenAI-compatible images endpoint.
pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://api.studio.nebius.com/v1/";

pub const DEFAULT_MODEL: &str = "black-forest-labs/flux-schnell";

/// Environment variable holding the provider secret. Read on every call.
pub const DEFAULT_API_KEY_ENV: &str = "NEBIUS_API_KEY";

const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Deserialize)]
pub struct ImagegenConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    OpenaiCompatible,
    Mock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier sent with every generation request.
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable that carries the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Deadline for one provider call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Origins allowed to call the relay from a browser. `*` allows any.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP collector; spans are only exported when set.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_PROVIDER_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_PROVIDER_TIMEOUT_SECS
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ImagegenConfig {
    /// Load from `configuration.*` (optional) and `APP__*` variables.
    pub fn load() -> Result<Self, AppError> {
        let config: Self =
            core_config::load_settings("configuration", &["security.allowed_origins"])?;

        if config.provider.timeout_secs == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "provider.timeout_secs must be greater than zero"
            )));
        }

        Ok(config)
    }

    /// Configuration for tests and local runs against the mock provider.
    pub fn for_mock_provider() -> Self {
        Self {
            common: core_config::Config {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            provider: ProviderConfig {
                kind: ProviderKind::Mock,
                ..ProviderConfig::default()
            },
            security: SecurityConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}
