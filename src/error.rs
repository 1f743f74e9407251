//! Error types for redis-unique-queue.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid queue name: {0:?}")]
    InvalidName(String),

    #[error("invalid redis configuration: {0}")]
    InvalidRedisConfig(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// Only produced when a bounded [`RetryPolicy`](crate::model::RetryPolicy) is in use.
    #[error("transaction on {key} lost the race {attempts} times, giving up")]
    RetriesExhausted { key: String, attempts: u32 },

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
