use crate::near::provider_pool::ProviderEndpoint;
use config::{Config, ConfigError, File};
use log::info;
use serde::Deserialize;
use std::env;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const CONFIG_ENV: &str = "NEARSIGHT_CONFIG";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;

const MAINNET_ENDPOINTS: [&str; 3] = [
    "https://rpc.mainnet.near.org",
    "https://rpc.mainnet.fastnear.com",
    "https://near.lava.build",
];

const TESTNET_ENDPOINTS: [&str; 3] = [
    "https://rpc.testnet.near.org",
    "https://rpc.testnet.fastnear.com",
    "https://neart.lava.build",
];

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    /// Name used in user-facing messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }

    pub fn default_endpoints(&self) -> &'static [&'static str] {
        match self {
            Network::Mainnet => &MAINNET_ENDPOINTS,
            Network::Testnet => &TESTNET_ENDPOINTS,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("at least one rpc endpoint is required")]
    NoEndpoints,

    #[error("invalid rpc endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    network: Network,
    endpoints: Option<Vec<String>>,
    timeout_ms: u64,
    http_timeout_ms: u64,
    proxy: Option<String>,
}

/// Immutable runtime configuration handed to the pool, fetcher and controller.
#[derive(Clone, Debug)]
pub struct Settings {
    pub network: Network,
    pub endpoints: Vec<ProviderEndpoint>,
    pub timeout: Duration,
    pub http_timeout: Duration,
    pub proxy: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::for_network(Network::Mainnet)
    }
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, SettingsError> {
        let s = Config::builder()
            .set_default("network", "mainnet")?
            .set_default("timeout_ms", DEFAULT_TIMEOUT_MS)?
            .set_default("http_timeout_ms", DEFAULT_HTTP_TIMEOUT_MS)?
            .add_source(File::with_name(path))
            .build()?;

        let raw: RawSettings = s.try_deserialize()?;
        Settings::from_raw(raw)
    }

    /// Loads `conf/Settings` from the working directory, or the file named by `NEARSIGHT_CONFIG`.
    pub fn load() -> Result<Self, SettingsError> {
        let config_path = match env::var(CONFIG_ENV) {
            Ok(path) => path,
            Err(_) => {
                let mut current_dir = env::current_dir().map_err(|e| ConfigError::Foreign(Box::new(e)))?;
                current_dir.push("conf/Settings");
                current_dir.to_string_lossy().into_owned()
            }
        };
        info!("nearsight configuration path:{}", &config_path);
        Settings::new(&config_path)
    }

    /// Built-in configuration for a network: its three public endpoints and default timeouts.
    pub fn for_network(network: Network) -> Settings {
        let endpoints = network
            .default_endpoints()
            .iter()
            .filter_map(|u| Url::parse(u).ok())
            .map(ProviderEndpoint::new)
            .collect();
        Settings {
            network,
            endpoints,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            http_timeout: Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS),
            proxy: None,
        }
    }

    fn from_raw(raw: RawSettings) -> Result<Self, SettingsError> {
        if raw.timeout_ms == 0 {
            return Err(SettingsError::ZeroTimeout("timeout_ms"));
        }
        if raw.http_timeout_ms == 0 {
            return Err(SettingsError::ZeroTimeout("http_timeout_ms"));
        }

        let urls: Vec<String> = match raw.endpoints {
            Some(urls) => urls,
            None => raw.network.default_endpoints().iter().map(|u| u.to_string()).collect(),
        };
        if urls.is_empty() {
            return Err(SettingsError::NoEndpoints);
        }

        let mut endpoints = Vec::with_capacity(urls.len());
        for url in urls {
            let parsed = Url::parse(&url).map_err(|e| SettingsError::InvalidEndpoint {
                url: url.clone(),
                reason: e.to_string(),
            })?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(SettingsError::InvalidEndpoint {
                    url,
                    reason: format!("unsupported scheme {}", parsed.scheme()),
                });
            }
            endpoints.push(ProviderEndpoint::new(parsed));
        }

        Ok(Settings {
            network: raw.network,
            endpoints,
            timeout: Duration::from_millis(raw.timeout_ms),
            http_timeout: Duration::from_millis(raw.http_timeout_ms),
            proxy: raw.proxy,
        })
    }
}
