//! Store seam: sorted-set primitives, watch/commit, and connection checkout.
//!
//! The queue never talks to Redis directly. It borrows a [`Store`] from a
//! [`ConnectionProvider`] for the duration of one logical operation, issues
//! plain reads against it, and hands conditional writes over as a
//! [`WriteBatch`] to be committed under a WATCH.

pub mod memory;
pub mod redis;

use crate::error::Result;

/// Sorted-set commands and the optimistic transaction primitive.
///
/// Ranks follow Redis semantics: zero-based, inclusive `stop`, negative
/// values count from the end.
pub trait Store {
    /// ZRANGE key start stop
    fn range_by_rank(&mut self, key: &str, start: isize, stop: isize) -> Result<Vec<String>>;

    /// ZREVRANGE key start stop
    fn rev_range_by_rank(&mut self, key: &str, start: isize, stop: isize) -> Result<Vec<String>>;

    /// ZRANGEBYSCORE key -inf max LIMIT offset count
    fn range_by_score(
        &mut self,
        key: &str,
        max: f64,
        offset: usize,
        count: usize,
    ) -> Result<Vec<String>>;

    /// ZCARD key. Missing keys count as empty.
    fn cardinality(&mut self, key: &str) -> Result<usize>;

    /// ZSCORE key member
    fn score_of(&mut self, key: &str, member: &str) -> Result<Option<f64>>;

    /// ZREM key member. Returns whether the member was present.
    fn remove_member(&mut self, key: &str, member: &str) -> Result<bool>;

    /// ZREMRANGEBYRANK key start stop. Returns the number removed.
    fn remove_range_by_rank(&mut self, key: &str, start: isize, stop: isize) -> Result<usize>;

    /// DEL key. Returns whether the key existed.
    fn delete(&mut self, key: &str) -> Result<bool>;

    /// EXPIRE key seconds. Returns whether the key existed.
    fn expire(&mut self, key: &str, seconds: i64) -> Result<bool>;

    /// WATCH key
    fn watch(&mut self, key: &str) -> Result<()>;

    /// UNWATCH
    fn unwatch(&mut self) -> Result<()>;

    /// MULTI, the batch, EXEC. Returns false when a watched key changed
    /// since [`watch`](Store::watch) and nothing was applied. Clears the
    /// watch either way.
    fn commit(&mut self, batch: &WriteBatch) -> Result<bool>;
}

/// One command inside a conditional write block.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// ZADD key score member [score member ...]
    Add {
        key: String,
        members: Vec<(f64, String)>,
    },
    /// ZREM key member
    Remove { key: String, member: String },
    /// ZREMRANGEBYRANK key start stop
    RemoveRangeByRank {
        key: String,
        start: isize,
        stop: isize,
    },
    /// DEL key
    Delete { key: String },
}

/// Writes queued by a transaction's write step. Applied all-or-nothing by
/// [`Store::commit`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str, members: Vec<(f64, String)>) -> &mut Self {
        self.ops.push(WriteOp::Add {
            key: key.to_string(),
            members,
        });
        self
    }

    pub fn remove(&mut self, key: &str, member: &str) -> &mut Self {
        self.ops.push(WriteOp::Remove {
            key: key.to_string(),
            member: member.to_string(),
        });
        self
    }

    pub fn remove_range_by_rank(&mut self, key: &str, start: isize, stop: isize) -> &mut Self {
        self.ops.push(WriteOp::RemoveRangeByRank {
            key: key.to_string(),
            start,
            stop,
        });
        self
    }

    pub fn delete(&mut self, key: &str) -> &mut Self {
        self.ops.push(WriteOp::Delete {
            key: key.to_string(),
        });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }
}

/// Lends a store connection for the duration of one call.
///
/// Implementations release the connection on every exit path, including
/// when `f` returns an error.
pub trait ConnectionProvider {
    type Connection: Store;

    fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self::Connection) -> Result<T>;
}
