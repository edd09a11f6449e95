use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use catalog_store::{StoreConfig, DEFAULT_MAX_LINE_LEN};

use crate::error::{ServerError, ServerResult};

pub const ENV_HOST: &str = "SERVER_HOST";
pub const ENV_PORT: &str = "SERVER_PORT";
pub const ENV_TIMEOUT_READ: &str = "SERVER_TIMEOUT_READ";
pub const ENV_CORS_ORIGINS: &str = "CORS_ALLOWED_ORIGINS";
pub const ENV_DATA_FILE: &str = "CATALOG_DATA_FILE";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Product file. Relative paths resolve against the project root.
    pub data_file: PathBuf,
    /// Per-request deadline in seconds. Zero disables it.
    pub request_timeout_secs: u64,
    pub cors_allowed_origins: Vec<String>,
    pub max_line_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080),
            data_file: PathBuf::from("products.jsonl"),
            request_timeout_secs: 5,
            cors_allowed_origins: vec!["*".to_string()],
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

impl ServerConfig {
    /// Parse a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    /// Apply overrides from the process environment.
    pub fn with_env(self) -> ServerResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Empty values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> ServerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get(ENV_HOST) {
            self.bind_addr.set_ip(parse_var(ENV_HOST, &host)?);
        }
        if let Some(port) = get(ENV_PORT) {
            self.bind_addr.set_port(parse_var(ENV_PORT, &port)?);
        }
        if let Some(secs) = get(ENV_TIMEOUT_READ) {
            self.request_timeout_secs = parse_var(ENV_TIMEOUT_READ, &secs)?;
        }
        if let Some(origins) = get(ENV_CORS_ORIGINS) {
            self.cors_allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(file) = get(ENV_DATA_FILE) {
            self.data_file = PathBuf::from(file);
        }
        Ok(self)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::default().with_max_line_len(self.max_line_len)
    }
}

fn parse_var<T>(key: &str, value: &str) -> ServerResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ServerError::Config(format!("invalid {key} {value:?}: {e}")))
}
