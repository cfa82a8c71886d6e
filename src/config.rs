// src/config.rs
//! Process-wide configuration, read once at startup.

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.deepseek.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_TIMEOUT_SECS: f64 = 120.0;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("UPSTREAM_API_KEY is not set")]
    MissingApiKey,
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    /// Per-attempt timeout.
    pub timeout: Duration,
    pub max_retries: u32,
    pub app_secret: Option<String>,
    pub bind_addr: String,
}

// Keep secrets out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get("UPSTREAM_API_KEY").ok_or(ConfigError::MissingApiKey)?;

        let timeout = match get("UPSTREAM_TIMEOUT_SECONDS") {
            Some(raw) => parse_timeout(&raw)?,
            None => Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
        };

        let max_retries = match get("UPSTREAM_MAX_RETRIES") {
            Some(raw) => raw.parse::<u32>().map_err(|_| ConfigError::Invalid {
                var: "UPSTREAM_MAX_RETRIES",
                value: raw.clone(),
                reason: "expected a non-negative integer",
            })?,
            None => DEFAULT_MAX_RETRIES,
        };

        Ok(Self {
            api_key,
            api_url: get("UPSTREAM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            model: get("UPSTREAM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout,
            max_retries,
            app_secret: get("APP_SECRET_KEY"),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        })
    }

    /// Total attempts per inbound request: the first call plus every retry.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: &'static str| ConfigError::Invalid {
        var: "UPSTREAM_TIMEOUT_SECONDS",
        value: raw.to_string(),
        reason,
    };
    let secs: f64 = raw.parse().map_err(|_| invalid("expected a number of seconds"))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(invalid("must be greater than zero"));
    }
    Duration::try_from_secs_f64(secs).map_err(|_| invalid("out of range"))
}
