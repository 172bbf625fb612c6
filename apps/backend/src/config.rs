//! Runtime configuration read from the environment

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// Default upper bound for a single transcription call.
pub const DEFAULT_TRANSCRIBE_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("ADMIN_USER_IDS must list user UUIDs, got {value:?}")]
    InvalidUserId { value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// In-memory stores are used when unset.
    pub database_url: Option<String>,
    /// Speech checks answer 503 when unset.
    pub transcriber_url: Option<String>,
    pub transcriber_api_key: Option<String>,
    pub transcribe_timeout: Duration,
    /// Users allowed to create exercises. Anyone may when unset.
    pub admin_user_ids: Option<Vec<Uuid>>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidNumber {
                var: "PORT",
                value,
            })?,
            None => 3000,
        };
        let timeout_secs = match non_empty("TRANSCRIBE_TIMEOUT_SECS") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidNumber {
                var: "TRANSCRIBE_TIMEOUT_SECS",
                value,
            })?,
            None => DEFAULT_TRANSCRIBE_TIMEOUT_SECS,
        };
        let admin_user_ids = non_empty("ADMIN_USER_IDS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(|id| {
                        Uuid::parse_str(id).map_err(|_| ConfigError::InvalidUserId {
                            value: id.to_string(),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        Ok(Self {
            host: non_empty("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_url: non_empty("DATABASE_URL"),
            transcriber_url: non_empty("TRANSCRIBER_URL"),
            transcriber_api_key: non_empty("TRANSCRIBER_API_KEY"),
            transcribe_timeout: Duration::from_secs(timeout_secs),
            admin_user_ids,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
