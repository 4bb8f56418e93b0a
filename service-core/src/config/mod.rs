use crate::error::AppError;
use config::{Config as Cfg, Environment, File};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::net::SocketAddr;

/// Environment variable prefix shared by every binary in the workspace.
pub const ENV_PREFIX: &str = "APP";

/// Nested key separator, e.g. `APP__PROVIDER__MODEL`.
pub const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Socket address the HTTP listener binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("invalid listen address: {}", e)))
    }
}

/// Load a settings struct from an optional file plus `APP__*` environment
/// variables. Environment values win over the file.
///
/// `list_keys` names the (lowercased, dot-separated) keys whose environment
/// value is a comma-separated list.
pub fn load_settings<T: DeserializeOwned>(
    file_name: &str,
    list_keys: &[&str],
) -> Result<T, AppError> {
    dotenvy::dotenv().ok();

    let mut environment = Environment::with_prefix(ENV_PREFIX)
        .separator(ENV_SEPARATOR)
        .try_parsing(true);

    if !list_keys.is_empty() {
        environment = environment.list_separator(",");
        for key in list_keys {
            environment = environment.with_list_parse_key(key);
        }
    }

    let config = Cfg::builder()
        .add_source(File::with_name(file_name).required(false))
        .add_source(environment)
        .build()?;

    Ok(config.try_deserialize()?)
}
