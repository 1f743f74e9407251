//! Core data model.
//!
//! A queue is a named sorted set of unique string members. Construction-time
//! knobs (expiry, retry behaviour) live in [`QueueOptions`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Queue name
// ---------------------------------------------------------------------------

/// Validated queue name. Doubles as the Redis key of the sorted set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueueName(String);

impl QueueName {
    /// Validate a queue name. Empty names are rejected.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidName(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for QueueName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for QueueName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for QueueName {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<QueueName> for String {
    fn from(name: QueueName) -> Self {
        name.0
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// How long a transactional operation keeps retrying after losing a race.
///
/// The default retries until the operation settles: it either commits or
/// finds nothing to act on. Under sustained contention with a steady supply
/// of eligible members this can spin indefinitely; set `max_attempts` to
/// bound it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Give up with `Error::RetriesExhausted` after this many lost races.
    /// None = never give up.
    pub max_attempts: Option<u32>,

    /// Sleep between a lost race and the next attempt.
    pub backoff: Option<Duration>,
}

impl RetryPolicy {
    /// Retry until settled, no backoff.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Whether another attempt is allowed after `attempts` lost races.
    pub(crate) fn allows_retry(&self, attempts: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts < max)
    }
}

/// Options applied when a queue client is constructed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueOptions {
    /// TTL in seconds, set on the queue key right after construction.
    pub expire: Option<i64>,

    /// Retry behaviour of push/pop transactions.
    pub retry: RetryPolicy,
}

impl QueueOptions {
    pub fn expire(mut self, seconds: i64) -> Self {
        self.expire = Some(seconds);
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_is_rejected() {
        let err = QueueName::new("").unwrap_err();
        assert!(matches!(err, Error::InvalidName(ref n) if n.is_empty()));
    }

    #[test]
    fn name_round_trips_through_string() {
        let name = QueueName::try_from("jobs").unwrap();
        assert_eq!(name.as_str(), "jobs");
        assert_eq!(String::from(name.clone()), "jobs");
        assert_eq!(name.to_string(), "jobs");
    }

    #[test]
    fn default_retry_policy_never_gives_up() {
        let policy = RetryPolicy::default();
        assert!(policy.allows_retry(0));
        assert!(policy.allows_retry(u32::MAX - 1));
    }

    #[test]
    fn bounded_retry_policy_stops_at_limit() {
        let policy = RetryPolicy::unbounded().max_attempts(3);
        assert!(policy.allows_retry(2));
        assert!(!policy.allows_retry(3));
    }
}
