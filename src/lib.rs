//! # redis-unique-queue
//!
//! Deduplicating, score-ordered queue on top of Redis sorted sets.
//!
//! Several processes can push and pop the same queue without a
//! coordinator: pushes and pops run as WATCH/MULTI/EXEC transactions that
//! retry until they commit or find nothing to do, so a member is handed to
//! at most one popper and pushes always land behind what is already queued.
//!
//! ```no_run
//! use redis_unique_queue::config::RedisConfig;
//! use redis_unique_queue::model::QueueOptions;
//! use redis_unique_queue::UniqueQueue;
//!
//! # fn main() -> redis_unique_queue::Result<()> {
//! let queue = UniqueQueue::connect(
//!     "jobs",
//!     RedisConfig::new("redis://127.0.0.1/"),
//!     QueueOptions::default(),
//! )?;
//! queue.push("a")?;
//! queue.push_multi(["b", "c"])?;
//! assert_eq!(queue.pop()?.as_deref(), Some("a"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod queue;
pub mod telemetry;

pub use error::{Error, Result};
pub use queue::UniqueQueue;
