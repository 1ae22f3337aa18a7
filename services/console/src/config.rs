//! Configuration types and loading
//!
//! Config path resolution: `--config` CLI flag > `CONFIG_PATH` env var >
//! `dmp-api-console.toml`. The TOML holds only server settings; the API
//! host and credentials arrive per session through the submitted form and
//! are never written to disk.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Callback URL registered with the OAuth provider; must match the
    /// ApiClient registration exactly or every exchange is rejected.
    pub redirect_uri: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_timeout() -> u64 {
    30
}

fn default_max_connections() -> usize {
    100
}

impl Config {
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;

        if !config.server.redirect_uri.starts_with("http://")
            && !config.server.redirect_uri.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "redirect_uri must start with http:// or https://, got: {}",
                config.server.redirect_uri
            )));
        }

        if config.server.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if config.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("dmp-api-console.toml")
    }
}
