//! Secret handling utilities.
//!
//! Re-exports the secrecy types used for Redis credentials so callers
//! building a [`RedisConfig`](super::RedisConfig) by hand don't need a
//! direct secrecy dependency.

pub use secrecy::{ExposeSecret, SecretString};
