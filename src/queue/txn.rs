//! Optimistic watch → read → conditional write → retry engine.
//!
//! Every mutating queue operation is a read step (what to act on) plus a
//! write step (how to act on it). The read runs after WATCH on the queue
//! key; the write is queued into a [`WriteBatch`] and committed with
//! MULTI/EXEC, which Redis refuses if anyone touched the key in between.
//! A refused commit is not an error: the whole read/write pair runs again
//! against fresh state.
//!
//! With the default [`RetryPolicy`] the loop only stops when a commit
//! succeeds or the read finds nothing. A popper facing a constant stream of
//! competing writers can therefore retry without bound; callers that need
//! a ceiling set `RetryPolicy::max_attempts`.

use opentelemetry::KeyValue;
use tracing::{debug, warn};

use crate::db::{ConnectionProvider, Store, WriteBatch};
use crate::error::{Error, Result};
use crate::model::RetryPolicy;
use crate::telemetry::metrics;

/// Outcome of one watch/read/write round.
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt<T> {
    /// The write committed; carries the read result it was based on.
    Committed(T),
    /// The watched key changed before commit. Nothing was written.
    Conflict,
    /// The read found nothing to act on. Nothing was written.
    Empty,
}

/// Transaction engine bound to one key.
pub struct OptimisticTransaction<'a, P> {
    provider: &'a P,
    key: &'a str,
    policy: RetryPolicy,
}

impl<'a, P: ConnectionProvider> OptimisticTransaction<'a, P> {
    pub fn new(provider: &'a P, key: &'a str) -> Self {
        Self {
            provider,
            key,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run one round on a freshly checked-out connection.
    ///
    /// `read` returns `None` when there is nothing to act on; `write` turns
    /// the read result into the commands to commit.
    pub fn attempt<T, R, W>(&self, read: &mut R, write: &mut W) -> Result<Attempt<T>>
    where
        R: FnMut(&mut P::Connection) -> Result<Option<T>>,
        W: FnMut(&T, &mut WriteBatch),
    {
        self.provider.with_connection(|conn| {
            conn.watch(self.key)?;

            let found = match read(conn) {
                Ok(found) => found,
                Err(e) => {
                    // Don't hand a connection back to a pool still watching.
                    let _ = conn.unwatch();
                    return Err(e);
                }
            };
            let Some(found) = found else {
                conn.unwatch()?;
                return Ok(Attempt::Empty);
            };

            let mut batch = WriteBatch::new();
            write(&found, &mut batch);
            if conn.commit(&batch)? {
                Ok(Attempt::Committed(found))
            } else {
                Ok(Attempt::Conflict)
            }
        })
    }

    /// Repeat [`attempt`](Self::attempt) until it commits (`Some`) or the
    /// read comes back empty (`None`).
    pub fn run_until_settled<T, R, W>(&self, mut read: R, mut write: W) -> Result<Option<T>>
    where
        R: FnMut(&mut P::Connection) -> Result<Option<T>>,
        W: FnMut(&T, &mut WriteBatch),
    {
        let mut conflicts: u32 = 0;
        loop {
            match self.attempt(&mut read, &mut write)? {
                Attempt::Committed(found) => return Ok(Some(found)),
                Attempt::Empty => return Ok(None),
                Attempt::Conflict => {
                    conflicts = conflicts.saturating_add(1);
                    metrics::transaction_conflicts()
                        .add(1, &[KeyValue::new("queue", self.key.to_string())]);
                    debug!(key = self.key, attempt = conflicts, "watched key changed, retrying");

                    if !self.policy.allows_retry(conflicts) {
                        warn!(key = self.key, attempts = conflicts, "giving up on contended key");
                        return Err(Error::RetriesExhausted {
                            key: self.key.to_string(),
                            attempts: conflicts,
                        });
                    }
                    if let Some(backoff) = self.policy.backoff {
                        std::thread::sleep(backoff);
                    }
                }
            }
        }
    }
}
