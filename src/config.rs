use std::{fs::File, io::BufReader, path::Path};

use serde::Deserialize;
use thiserror::Error;

use crate::telegram::DEFAULT_API;

pub const DEFAULT_ENDPOINT: &str = "https://api.twitter.com/1.1/statuses/show.json";

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Sent verbatim as the `Authorization` header of tweet lookups.
    pub auth_token: String,
    /// Expand tweets flagged as possibly sensitive.
    #[serde(default)]
    pub allow_nudity: bool,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Timeout for tweet lookups and photo downloads, in seconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout: u64,

    /// Only needed when running as a telegram bot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_token: Option<String>,
    /// Bot API server, for self-hosted ones.
    #[serde(default = "default_telegram_api")]
    pub telegram_api: String,
    /// Long-poll timeout for telegram updates, in seconds.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to open config: {0}")]
    Open(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("`{0}` must be set")]
    Missing(&'static str),
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_owned()
}

fn default_telegram_api() -> String {
    DEFAULT_API.to_owned()
}

fn default_http_timeout() -> u64 {
    30
}

fn default_poll_timeout() -> u64 {
    30
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = BufReader::new(File::open(path)?);

        Self::from_reader(file)
    }

    pub fn from_reader(reader: impl std::io::Read) -> Result<Self, ConfigError> {
        let cfg: Config = serde_yaml::from_reader(reader)?;
        if cfg.auth_token.trim().is_empty() {
            return Err(ConfigError::Missing("auth_token"));
        }

        Ok(cfg)
    }
}
