use std::time::Duration;

use thiserror::Error;

use crate::Language;

pub const DEFAULT_BASE_URL: &str = "https://api.vectorengine.ai/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Variables consulted for the API key, first match wins.
const API_KEY_VARS: [&str; 3] = ["VITE_VECTORENGINE_API_KEY", "VECTORENGINE_API_KEY", "API_KEY"];

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("An API key must be set. Please configure VECTORENGINE_API_KEY in your environment")]
    MissingApiKey,
    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings, read from the environment once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub bind: String,
    pub log_level: String,
    pub language: Language,
    pub timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_key = API_KEY_VARS
            .iter()
            .find_map(|&key| var(key))
            .ok_or(ConfigError::MissingApiKey)?;

        let language = match var("CHEMLAB_LANG") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: "CHEMLAB_LANG",
                value,
            })?,
            None => Language::default(),
        };

        let timeout = match var("CHEMLAB_TIMEOUT_SECS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or(ConfigError::Invalid {
                    key: "CHEMLAB_TIMEOUT_SECS",
                    value,
                })?,
            None => Duration::from_secs(60),
        };

        Ok(Self {
            api_key,
            base_url: var("CHEMLAB_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: var("CHEMLAB_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            bind: var("CHEMLAB_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            log_level: var("CHEMLAB_LOG").unwrap_or_else(|| "info".to_string()),
            language,
            timeout,
        })
    }
}
