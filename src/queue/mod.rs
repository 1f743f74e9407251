//! Unique queue client.
//!
//! A queue is a Redis sorted set keyed by the queue name. Members are the
//! queued items, scores their position. Pushing a member that is already
//! queued moves it to the back instead of duplicating it.
//!
//! Push and pop go through [`txn::OptimisticTransaction`] so that concurrent
//! clients in separate processes never pop the same member twice and never
//! compute a push score from stale state. Everything else is a single
//! store command.

pub mod score;
pub mod txn;

use std::sync::Arc;
use std::time::Instant;

use opentelemetry::KeyValue;
use tracing::debug;

use crate::db::redis::{RedisProvider, RedisSource};
use crate::db::{ConnectionProvider, Store, WriteBatch};
use crate::error::Result;
use crate::model::{QueueName, QueueOptions, RetryPolicy};
use crate::telemetry::{metrics, queue as spans};
use txn::OptimisticTransaction;

/// Client for one named queue.
pub struct UniqueQueue<P> {
    name: QueueName,
    provider: Arc<P>,
    retry: RetryPolicy,
}

impl UniqueQueue<RedisProvider> {
    /// Resolve `source` into a Redis provider and build a queue on it.
    pub fn connect(
        name: impl Into<String>,
        source: impl Into<RedisSource>,
        options: QueueOptions,
    ) -> Result<Self> {
        let name = QueueName::new(name)?;
        let provider = RedisProvider::from_source(source.into())?;
        Self::with_name(name, Arc::new(provider), options)
    }
}

impl<P: ConnectionProvider> UniqueQueue<P> {
    /// Build a client for `name`. Applies `options.expire` right away.
    pub fn new(name: impl Into<String>, provider: Arc<P>, options: QueueOptions) -> Result<Self> {
        Self::with_name(QueueName::new(name)?, provider, options)
    }

    /// Like [`new`](Self::new), for an already validated name.
    pub fn with_name(name: QueueName, provider: Arc<P>, options: QueueOptions) -> Result<Self> {
        let queue = Self {
            name,
            provider,
            retry: options.retry,
        };
        debug!(queue = %queue.name, "queue client ready");
        if let Some(seconds) = options.expire {
            queue.expire(seconds)?;
        }
        Ok(queue)
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    fn key(&self) -> &str {
        self.name.as_str()
    }

    fn transaction(&self) -> OptimisticTransaction<'_, P> {
        OptimisticTransaction::new(&*self.provider, self.key()).with_policy(self.retry)
    }

    fn with<T>(&self, f: impl FnOnce(&mut P::Connection) -> Result<T>) -> Result<T> {
        self.provider.with_connection(f)
    }

    fn record(&self, operation: &'static str, started: Instant) {
        metrics::queue_operations().add(
            1,
            &[
                KeyValue::new("queue", self.name.to_string()),
                KeyValue::new("operation", operation),
            ],
        );
        metrics::operation_duration_ms().record(
            started.elapsed().as_secs_f64() * 1000.0,
            &[KeyValue::new("operation", format!("queue.{operation}"))],
        );
    }

    /// Push one item to the back of the queue. Returns the item.
    pub fn push(&self, item: impl Into<String>) -> Result<String> {
        let item = item.into();
        let pushed = self.push_multi([item.clone()])?;
        Ok(pushed.into_iter().next().unwrap_or(item))
    }

    /// Push several items in order, atomically. Returns the pushed items,
    /// or an empty vec without touching Redis if there was nothing to push.
    pub fn push_multi<I>(&self, items: I) -> Result<Vec<String>>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let items: Vec<String> = items.into_iter().map(Into::into).collect();
        if items.is_empty() {
            return Ok(items);
        }

        let span = spans::start_queue_span(self.name(), "push");
        let _entered = span.enter();
        let started = Instant::now();
        let key = self.key();

        let pushed = self.transaction().run_until_settled(
            |conn| {
                let max = max_score(conn, key)?;
                let scored: Vec<(f64, String)> = score::score_for(max, items.len())
                    .into_iter()
                    .zip(items.iter().cloned())
                    .collect();
                Ok(Some(scored))
            },
            |scored: &Vec<(f64, String)>, batch: &mut WriteBatch| {
                batch.add(key, scored.clone());
            },
        )?;

        spans::record_count(&span, items.len());
        self.record("push", started);
        Ok(pushed.map(|scored| scored.into_iter().map(|(_, m)| m).collect()).unwrap_or_default())
    }

    /// Pop the front item, or `None` if nothing is queued.
    pub fn pop(&self) -> Result<Option<String>> {
        let span = spans::start_queue_span(self.name(), "pop");
        let _entered = span.enter();
        let started = Instant::now();
        let key = self.key();

        let popped = self.transaction().run_until_settled(
            |conn| {
                let Some(max) = max_score(conn, key)? else {
                    return Ok(None);
                };
                Ok(conn.range_by_score(key, max, 0, 1)?.into_iter().next())
            },
            |member: &String, batch: &mut WriteBatch| {
                batch.remove(key, member);
            },
        )?;

        spans::record_count(&span, usize::from(popped.is_some()));
        self.record("pop", started);
        Ok(popped)
    }

    /// Pop up to `amount` items from the front, in order.
    pub fn pop_multi(&self, amount: usize) -> Result<Vec<String>> {
        if amount == 0 {
            return Ok(Vec::new());
        }

        let span = spans::start_queue_span(self.name(), "pop_multi");
        let _entered = span.enter();
        let started = Instant::now();
        let key = self.key();
        let stop = rank(amount - 1);

        let popped = self.transaction().run_until_settled(
            |conn| {
                let members = conn.range_by_rank(key, 0, stop)?;
                Ok((!members.is_empty()).then_some(members))
            },
            |_: &Vec<String>, batch: &mut WriteBatch| {
                batch.remove_range_by_rank(key, 0, stop);
            },
        )?;

        let popped = popped.unwrap_or_default();
        spans::record_count(&span, popped.len());
        self.record("pop_multi", started);
        Ok(popped)
    }

    /// Pop everything, in order, and delete the queue key.
    pub fn pop_all(&self) -> Result<Vec<String>> {
        let span = spans::start_queue_span(self.name(), "pop_all");
        let _entered = span.enter();
        let started = Instant::now();
        let key = self.key();

        let popped = self.transaction().run_until_settled(
            |conn| {
                let members = conn.range_by_rank(key, 0, -1)?;
                Ok((!members.is_empty()).then_some(members))
            },
            |_: &Vec<String>, batch: &mut WriteBatch| {
                batch.delete(key);
            },
        )?;

        let popped = popped.unwrap_or_default();
        spans::record_count(&span, popped.len());
        self.record("pop_all", started);
        Ok(popped)
    }

    /// Lowest-scored item, without removing it.
    pub fn front(&self) -> Result<Option<String>> {
        self.with(|conn| Ok(conn.range_by_rank(self.key(), 0, 0)?.into_iter().next()))
    }

    /// Highest-scored item, without removing it.
    pub fn back(&self) -> Result<Option<String>> {
        self.with(|conn| Ok(conn.rev_range_by_rank(self.key(), 0, 0)?.into_iter().next()))
    }

    /// Items at ranks `index ..= index + amount - 1`. Ranks past the end
    /// are simply missing from the result.
    pub fn peek(&self, index: usize, amount: usize) -> Result<Vec<String>> {
        if amount == 0 {
            return Ok(Vec::new());
        }
        let stop = rank(index.saturating_add(amount - 1));
        self.with(|conn| conn.range_by_rank(self.key(), rank(index), stop))
    }

    /// Remove `item` wherever it is. Returns whether it was queued.
    pub fn remove(&self, item: &str) -> Result<bool> {
        let started = Instant::now();
        let removed = self.with(|conn| conn.remove_member(self.key(), item))?;
        self.record("remove", started);
        Ok(removed)
    }

    /// Remove the item at rank `index`. Returns how many were removed.
    pub fn remove_item_by_index(&self, index: usize) -> Result<usize> {
        let started = Instant::now();
        let index = rank(index);
        let removed = self.with(|conn| conn.remove_range_by_rank(self.key(), index, index))?;
        self.record("remove_by_index", started);
        Ok(removed)
    }

    /// Number of queued items; 0 when the key does not exist.
    pub fn size(&self) -> Result<usize> {
        self.with(|conn| conn.cardinality(self.key()))
    }

    /// Every queued item, in order.
    pub fn all(&self) -> Result<Vec<String>> {
        let size = self.size()?;
        self.peek(0, size)
    }

    /// Whether `item` is queued.
    pub fn contains(&self, item: &str) -> Result<bool> {
        self.with(|conn| Ok(conn.score_of(self.key(), item)?.is_some()))
    }

    /// Delete the queue key. Always returns an empty vec.
    pub fn clear(&self) -> Result<Vec<String>> {
        let started = Instant::now();
        self.with(|conn| conn.delete(self.key()))?;
        self.record("clear", started);
        Ok(Vec::new())
    }

    /// Set a TTL on the queue key. Returns whether the key existed.
    pub fn expire(&self, seconds: i64) -> Result<bool> {
        let applied = self.with(|conn| conn.expire(self.key(), seconds))?;
        debug!(queue = %self.name, seconds, applied, "set queue ttl");
        Ok(applied)
    }
}

/// Score of the current back of the queue.
fn max_score<S: Store>(conn: &mut S, key: &str) -> Result<Option<f64>> {
    match conn.rev_range_by_rank(key, 0, 0)?.into_iter().next() {
        Some(back) => conn.score_of(key, &back),
        None => Ok(None),
    }
}

fn rank(index: usize) -> isize {
    isize::try_from(index).unwrap_or(isize::MAX)
}
