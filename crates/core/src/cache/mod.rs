//! Partitioned response cache.
//!
//! A cache store maps `(partition, request key)` to a stored response
//! snapshot. The SQLite implementation supports:
//!
//! - Request keys derived by SHA-256 over method and canonical URL
//! - Automatic schema migrations
//! - WAL mode so several agents can share one database file
//! - Age-based and count-based retention
//!
//! No in-process locking is layered on top: every get/put/delete is a single
//! statement and concurrent writers to the same key resolve last-write-wins.

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod partition;
pub mod retention;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use partition::{PartitionNames, PartitionRole};
pub use retention::RetentionPolicy;
pub use store::{CacheEntry, CacheStore, EntryMeta};
