//! Redis-backed store: connection sources, the provider, and the
//! [`Store`] implementation for `redis::Connection`.

use std::sync::Mutex;

use redis::{Commands, ConnectionLike};
use secrecy::ExposeSecret;
use tracing::debug;

use super::{ConnectionProvider, Store, WriteBatch, WriteOp};
use crate::config::RedisConfig;
use crate::error::{Error, Result};

/// The shapes a caller may hand over to reach Redis.
pub enum RedisSource {
    /// An already-open connection, owned by the queue from now on.
    Connection(redis::Connection),
    /// Settings for opening a new connection or pool.
    Config(RedisConfig),
    /// A pool shared with the rest of the host application.
    Pool(r2d2::Pool<redis::Client>),
}

impl From<redis::Connection> for RedisSource {
    fn from(conn: redis::Connection) -> Self {
        Self::Connection(conn)
    }
}

impl From<RedisConfig> for RedisSource {
    fn from(config: RedisConfig) -> Self {
        Self::Config(config)
    }
}

impl From<r2d2::Pool<redis::Client>> for RedisSource {
    fn from(pool: r2d2::Pool<redis::Client>) -> Self {
        Self::Pool(pool)
    }
}

/// Normalized connection capability: one serialized connection, or a pool
/// checked out per call.
pub enum RedisProvider {
    Single(Mutex<redis::Connection>),
    Pooled(r2d2::Pool<redis::Client>),
}

impl RedisProvider {
    /// Resolve a [`RedisSource`], opening connections where needed.
    pub fn from_source(source: RedisSource) -> Result<Self> {
        match source {
            RedisSource::Connection(conn) => Ok(Self::Single(Mutex::new(conn))),
            RedisSource::Pool(pool) => Ok(Self::Pooled(pool)),
            RedisSource::Config(config) => Self::open(&config),
        }
    }

    fn open(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.expose_secret())
            .map_err(|e| Error::InvalidRedisConfig(format!("unusable redis url: {e}")))?;
        match config.pool_size {
            Some(0) => Err(Error::InvalidRedisConfig(
                "pool_size must be at least 1".to_string(),
            )),
            Some(size) => {
                debug!(pool_size = size, "opening redis connection pool");
                let pool = r2d2::Pool::builder().max_size(size).build(client)?;
                Ok(Self::Pooled(pool))
            }
            None => {
                debug!("opening dedicated redis connection");
                Ok(Self::Single(Mutex::new(client.get_connection()?)))
            }
        }
    }

    pub fn is_pooled(&self) -> bool {
        matches!(self, Self::Pooled(_))
    }
}

impl ConnectionProvider for RedisProvider {
    type Connection = redis::Connection;

    fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self::Connection) -> Result<T>,
    {
        match self {
            Self::Single(conn) => {
                let mut conn = conn
                    .lock()
                    .map_err(|_| Error::Other("redis connection lock poisoned".to_string()))?;
                f(&mut conn)
            }
            Self::Pooled(pool) => {
                let mut conn = pool.get()?;
                f(&mut conn)
            }
        }
    }
}

impl Store for redis::Connection {
    fn range_by_rank(&mut self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let members: Vec<String> = self.zrange(key, start, stop)?;
        Ok(members)
    }

    fn rev_range_by_rank(&mut self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let members: Vec<String> = self.zrevrange(key, start, stop)?;
        Ok(members)
    }

    fn range_by_score(
        &mut self,
        key: &str,
        max: f64,
        offset: usize,
        count: usize,
    ) -> Result<Vec<String>> {
        let members: Vec<String> =
            self.zrangebyscore_limit(key, "-inf", max, offset as isize, count as isize)?;
        Ok(members)
    }

    fn cardinality(&mut self, key: &str) -> Result<usize> {
        let count: usize = self.zcard(key)?;
        Ok(count)
    }

    fn score_of(&mut self, key: &str, member: &str) -> Result<Option<f64>> {
        let score: Option<f64> = self.zscore(key, member)?;
        Ok(score)
    }

    fn remove_member(&mut self, key: &str, member: &str) -> Result<bool> {
        let removed: usize = self.zrem(key, member)?;
        Ok(removed > 0)
    }

    fn remove_range_by_rank(&mut self, key: &str, start: isize, stop: isize) -> Result<usize> {
        let removed: usize = self.zremrangebyrank(key, start, stop)?;
        Ok(removed)
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        let removed: usize = self.del(key)?;
        Ok(removed > 0)
    }

    fn expire(&mut self, key: &str, seconds: i64) -> Result<bool> {
        let applied: bool = redis::cmd("EXPIRE").arg(key).arg(seconds).query(self)?;
        Ok(applied)
    }

    fn watch(&mut self, key: &str) -> Result<()> {
        redis::cmd("WATCH").arg(key).query::<()>(self)?;
        Ok(())
    }

    fn unwatch(&mut self) -> Result<()> {
        redis::cmd("UNWATCH").query::<()>(self)?;
        Ok(())
    }

    fn commit(&mut self, batch: &WriteBatch) -> Result<bool> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in batch.ops() {
            match op {
                WriteOp::Add { key, members } => {
                    pipe.zadd_multiple(key, members.as_slice()).ignore();
                }
                WriteOp::Remove { key, member } => {
                    pipe.zrem(key, member).ignore();
                }
                WriteOp::RemoveRangeByRank { key, start, stop } => {
                    pipe.zremrangebyrank(key, *start, *stop).ignore();
                }
                WriteOp::Delete { key } => {
                    pipe.del(key).ignore();
                }
            }
        }
        // EXEC replies nil when a watched key changed.
        let reply: Option<redis::Value> = pipe.query(self)?;
        Ok(reply.is_some())
    }
}

/// Ping the server through the provider; handy for health checks.
pub fn ping(provider: &RedisProvider) -> Result<()> {
    provider.with_connection(|conn| {
        if conn.check_connection() {
            Ok(())
        } else {
            Err(Error::Other("redis connection check failed".to_string()))
        }
    })
}
