//! Cache store abstraction and stored entry types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::hash::compute_request_key;
use crate::Error;

/// A stored response snapshot.
///
/// Entries are never patched in place; writing the same key again replaces
/// the whole row, including the capture timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// When the response was produced. `None` for rows written by agents
    /// that do not stamp entries.
    pub captured_at: Option<DateTime<Utc>>,
    pub size_bytes: u64,
}

impl CacheEntry {
    /// Snapshot a GET response for `url`.
    ///
    /// The capture timestamp comes from the `Date` header when it parses as
    /// an HTTP date, otherwise from the current clock.
    pub fn capture(url: &str, status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        let captured_at = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("date"))
            .and_then(|(_, value)| DateTime::parse_from_rfc2822(value).ok())
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Self {
            key: compute_request_key("GET", url),
            method: "GET".to_string(),
            url: url.to_string(),
            status,
            size_bytes: body.len() as u64,
            headers,
            body,
            captured_at: Some(captured_at),
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Listing row used by retention sweeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMeta {
    pub key: String,
    pub url: String,
    pub captured_at: Option<DateTime<Utc>>,
    pub size_bytes: u64,
}

/// Partitioned key-value store for response snapshots.
///
/// Each call is atomic on its own; nothing is assumed about exclusivity, so
/// implementations must tolerate other processes mutating the same
/// partitions between calls. A key deleted by someone else reads as a miss.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the partition if it does not exist yet.
    async fn open_partition(&self, partition: &str) -> Result<(), Error>;

    /// Names of every partition in the store, sorted.
    async fn list_partitions(&self) -> Result<Vec<String>, Error>;

    /// Drop a partition and all of its entries. Returns whether it existed.
    async fn delete_partition(&self, partition: &str) -> Result<bool, Error>;

    async fn get(&self, partition: &str, key: &str) -> Result<Option<CacheEntry>, Error>;

    /// Insert or fully replace an entry, creating the partition on demand.
    async fn put(&self, partition: &str, entry: &CacheEntry) -> Result<(), Error>;

    /// Remove one entry. Returns whether it existed.
    async fn delete(&self, partition: &str, key: &str) -> Result<bool, Error>;

    async fn list_entries(&self, partition: &str) -> Result<Vec<EntryMeta>, Error>;
}
