//! In-process sorted-set store.
//!
//! Emulates Redis WATCH with a version stamp per key: every write bumps the
//! key's version, and a commit is refused if any watched key's version moved
//! since it was watched. Clones share the same data, so several queue clients
//! built from clones of one `MemoryStore` contend exactly like separate
//! processes against one Redis server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::{ConnectionProvider, Store, WriteBatch, WriteOp};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct SortedSet {
    /// Ascending by (score, member).
    entries: Vec<(f64, String)>,
    expires_at: Option<Instant>,
}

impl SortedSet {
    fn insert(&mut self, score: f64, member: String) {
        self.entries.retain(|(_, m)| *m != member);
        let pos = self
            .entries
            .partition_point(|(s, m)| s.total_cmp(&score).then_with(|| m.cmp(&member)).is_lt());
        self.entries.insert(pos, (score, member));
    }

    fn remove(&mut self, member: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(_, m)| m != member);
        self.entries.len() != before
    }

    fn range(&self, start: isize, stop: isize) -> std::ops::Range<usize> {
        let len = self.entries.len() as isize;
        let start = if start < 0 { (len + start).max(0) } else { start };
        let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
        if start > stop || start >= len {
            return 0..0;
        }
        start as usize..stop as usize + 1
    }
}

#[derive(Debug, Default)]
struct Keyspace {
    sets: HashMap<String, SortedSet>,
    versions: HashMap<String, u64>,
}

impl Keyspace {
    fn version(&self, key: &str) -> u64 {
        self.versions.get(key).copied().unwrap_or(0)
    }

    fn touch(&mut self, key: &str) {
        *self.versions.entry(key.to_string()).or_insert(0) += 1;
    }

    /// Live set for `key`, dropping it first if its TTL has passed.
    fn get(&mut self, key: &str) -> Option<&mut SortedSet> {
        let expired = self
            .sets
            .get(key)
            .and_then(|set| set.expires_at)
            .is_some_and(|at| at <= Instant::now());
        if expired {
            self.sets.remove(key);
            self.touch(key);
        }
        self.sets.get_mut(key)
    }

    /// Drop `key` if a write left it empty; Redis never stores empty sets.
    fn prune(&mut self, key: &str) {
        if self.sets.get(key).is_some_and(|set| set.entries.is_empty()) {
            self.sets.remove(key);
        }
    }

    fn apply(&mut self, op: &WriteOp) {
        match op {
            WriteOp::Add { key, members } => {
                if members.is_empty() {
                    return;
                }
                self.get(key);
                let set = self.sets.entry(key.clone()).or_default();
                for (score, member) in members {
                    set.insert(*score, member.clone());
                }
                self.touch(key);
            }
            WriteOp::Remove { key, member } => {
                if self.get(key).is_some_and(|set| set.remove(member)) {
                    self.touch(key);
                    self.prune(key);
                }
            }
            WriteOp::RemoveRangeByRank { key, start, stop } => {
                let removed = match self.get(key) {
                    Some(set) => {
                        let range = set.range(*start, *stop);
                        set.entries.drain(range).count()
                    }
                    None => 0,
                };
                if removed > 0 {
                    self.touch(key);
                    self.prune(key);
                }
            }
            WriteOp::Delete { key } => {
                if self.get(key).is_some() {
                    self.sets.remove(key);
                    self.touch(key);
                }
            }
        }
    }
}

/// Shared in-memory keyspace. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    keyspace: Arc<Mutex<Keyspace>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session against this store, like checking a connection out of a pool.
    pub fn connect(&self) -> MemoryConnection {
        MemoryConnection {
            keyspace: Arc::clone(&self.keyspace),
            watched: Vec::new(),
        }
    }
}

impl ConnectionProvider for MemoryStore {
    type Connection = MemoryConnection;

    fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self::Connection) -> Result<T>,
    {
        let mut conn = self.connect();
        f(&mut conn)
    }
}

/// One session against a [`MemoryStore`]. Holds its own WATCH state.
#[derive(Debug)]
pub struct MemoryConnection {
    keyspace: Arc<Mutex<Keyspace>>,
    watched: Vec<(String, u64)>,
}

impl MemoryConnection {
    fn lock(&self) -> Result<MutexGuard<'_, Keyspace>> {
        self.keyspace
            .lock()
            .map_err(|_| Error::Other("memory store lock poisoned".to_string()))
    }
}

impl Store for MemoryConnection {
    fn range_by_rank(&mut self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let mut keyspace = self.lock()?;
        Ok(keyspace
            .get(key)
            .map(|set| {
                set.entries[set.range(start, stop)]
                    .iter()
                    .map(|(_, m)| m.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn rev_range_by_rank(&mut self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let mut keyspace = self.lock()?;
        Ok(keyspace
            .get(key)
            .map(|set| {
                // Reverse ranks map onto forward ranks mirrored around the end.
                let len = set.entries.len() as isize;
                let forward = set.range(start, stop);
                let (start, end) = (forward.start as isize, forward.end as isize);
                (len - end..len - start)
                    .rev()
                    .map(|i| set.entries[i as usize].1.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn range_by_score(
        &mut self,
        key: &str,
        max: f64,
        offset: usize,
        count: usize,
    ) -> Result<Vec<String>> {
        let mut keyspace = self.lock()?;
        Ok(keyspace
            .get(key)
            .map(|set| {
                set.entries
                    .iter()
                    .take_while(|(s, _)| *s <= max)
                    .skip(offset)
                    .take(count)
                    .map(|(_, m)| m.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn cardinality(&mut self, key: &str) -> Result<usize> {
        Ok(self.lock()?.get(key).map_or(0, |set| set.entries.len()))
    }

    fn score_of(&mut self, key: &str, member: &str) -> Result<Option<f64>> {
        Ok(self.lock()?.get(key).and_then(|set| {
            set.entries
                .iter()
                .find(|(_, m)| m == member)
                .map(|(s, _)| *s)
        }))
    }

    fn remove_member(&mut self, key: &str, member: &str) -> Result<bool> {
        let mut keyspace = self.lock()?;
        let present = keyspace
            .get(key)
            .is_some_and(|set| set.entries.iter().any(|(_, m)| m == member));
        keyspace.apply(&WriteOp::Remove {
            key: key.to_string(),
            member: member.to_string(),
        });
        Ok(present)
    }

    fn remove_range_by_rank(&mut self, key: &str, start: isize, stop: isize) -> Result<usize> {
        let mut keyspace = self.lock()?;
        let count = keyspace.get(key).map_or(0, |set| set.range(start, stop).len());
        keyspace.apply(&WriteOp::RemoveRangeByRank {
            key: key.to_string(),
            start,
            stop,
        });
        Ok(count)
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        let mut keyspace = self.lock()?;
        let existed = keyspace.get(key).is_some();
        keyspace.apply(&WriteOp::Delete {
            key: key.to_string(),
        });
        Ok(existed)
    }

    fn expire(&mut self, key: &str, seconds: i64) -> Result<bool> {
        let deadline = match u64::try_from(seconds) {
            Ok(secs) if secs > 0 => Some(
                Instant::now()
                    .checked_add(Duration::from_secs(secs))
                    .ok_or_else(|| Error::Other("invalid expire time".to_string()))?,
            ),
            _ => None,
        };
        let mut keyspace = self.lock()?;
        let Some(set) = keyspace.get(key) else {
            return Ok(false);
        };
        match deadline {
            Some(at) => set.expires_at = Some(at),
            None => {
                keyspace.sets.remove(key);
            }
        }
        keyspace.touch(key);
        Ok(true)
    }

    fn watch(&mut self, key: &str) -> Result<()> {
        let version = {
            let mut keyspace = self.lock()?;
            // Settle a pending expiry now so it can't bump the version later.
            keyspace.get(key);
            keyspace.version(key)
        };
        self.watched.push((key.to_string(), version));
        Ok(())
    }

    fn unwatch(&mut self) -> Result<()> {
        self.watched.clear();
        Ok(())
    }

    fn commit(&mut self, batch: &WriteBatch) -> Result<bool> {
        let watched = std::mem::take(&mut self.watched);
        let mut keyspace = self.lock()?;
        for (key, version) in &watched {
            keyspace.get(key);
            if keyspace.version(key) != *version {
                return Ok(false);
            }
        }
        for op in batch.ops() {
            keyspace.apply(op);
        }
        Ok(true)
    }
}
