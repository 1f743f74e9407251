//! Typed configuration from environment variables and TOML.
//!
//! Loads once at startup, fails fast if required vars are missing.
//! The Redis URL may carry a password, so it is held as a
//! secrecy::SecretString to keep it out of logs.

pub mod secrets;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::QueueOptions;
use secrecy::SecretString;

#[derive(Debug)]
pub struct Config {
    pub redis_url: SecretString,
    pub redis_pool_size: Option<u32>,
    pub queue_expire_seconds: Option<i64>,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// See [`load`](Self::load) for picking up a local `.env` first.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            redis_url: SecretString::from(required_var("REDIS_URL")?),
            redis_pool_size: optional_parsed("REDIS_POOL_SIZE")?,
            queue_expire_seconds: optional_parsed("QUEUE_EXPIRE_SECONDS")?,
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Like [`from_env`](Self::from_env), after loading a `.env` file from
    /// the working directory if there is one.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Connection settings for [`RedisSource::Config`](crate::db::redis::RedisSource).
    pub fn redis(&self) -> RedisConfig {
        RedisConfig {
            url: self.redis_url.clone(),
            pool_size: self.redis_pool_size,
        }
    }

    pub fn queue_options(&self) -> QueueOptions {
        QueueOptions {
            expire: self.queue_expire_seconds,
            ..QueueOptions::default()
        }
    }
}

/// Settings used to open a new Redis connection (or pool).
///
/// `pool_size = None` opens one dedicated connection shared by the queue;
/// `Some(n)` builds an r2d2 pool of at most `n` connections.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(deserialize_with = "secret_string")]
    pub url: SecretString,
    #[serde(default)]
    pub pool_size: Option<u32>,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: SecretString::from(url.into()),
            pool_size: None,
        }
    }

    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = Some(size);
        self
    }

    /// Parse from a TOML document such as
    ///
    /// ```toml
    /// url = "redis://127.0.0.1/"
    /// pool_size = 8
    /// ```
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::Config(format!("invalid redis config: {e}")))
    }
}

fn secret_string<'de, D>(deserializer: D) -> std::result::Result<SecretString, D::Error>
where
    D: serde::Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}

fn optional_parsed<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("environment variable {name} is invalid: {raw:?}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn redis_config_parses_from_toml() {
        let config = RedisConfig::from_toml_str(
            r#"
            url = "redis://:hunter2@localhost:6379/2"
            pool_size = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.url.expose_secret(), "redis://:hunter2@localhost:6379/2");
        assert_eq!(config.pool_size, Some(4));
    }

    #[test]
    fn redis_config_pool_size_is_optional() {
        let config = RedisConfig::from_toml_str(r#"url = "redis://localhost/""#).unwrap();
        assert_eq!(config.pool_size, None);
    }

    #[test]
    fn redis_config_without_url_is_rejected() {
        let err = RedisConfig::from_toml_str("pool_size = 4").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn debug_output_hides_url() {
        let config = RedisConfig::new("redis://:hunter2@localhost/");
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
