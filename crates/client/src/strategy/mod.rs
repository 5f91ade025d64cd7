//! Caching strategies.
//!
//! Each resource class is served by exactly one strategy:
//!
//! | Class | Strategy |
//! |---|---|
//! | DOCUMENT | [`network_first`] |
//! | FONT | [`cache_first`] with timeout |
//! | STATIC_BUNDLE, STYLE, SCRIPT | [`stale_while_revalidate`] |
//! | IMAGE | [`size_gated`] cache-first |
//!
//! Strategies never hold locks across the store. A timeout drops the
//! in-flight network future only; writes already committed stay.
//! Cache read failures count as misses and write failures are skipped, both
//! with a warning.

pub mod cache_first;
pub mod network_first;
pub mod size_gated;
pub mod stale_while_revalidate;

use std::sync::Arc;
use std::time::Duration;

use waypoint_core::cache::hash::compute_request_key;
use waypoint_core::{CacheStore, Error, PartitionNames, PartitionRole, ResourceClass, RetentionPolicy};

use crate::background::BackgroundTasks;
use crate::connection::ConnectionQuality;
use crate::fetch::{Network, ResourceRequest, ResourceResponse};

pub use cache_first::cache_first;
pub use network_first::network_first;
pub use size_gated::size_gated;
pub use stale_while_revalidate::stale_while_revalidate;

/// Caching policy applied to one resource class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    NetworkFirst,
    CacheFirstWithTimeout,
    StaleWhileRevalidate,
    SizeGatedCacheFirst,
}

impl Strategy {
    /// The strategy for `class`, or `None` for pass-through.
    pub fn for_class(class: ResourceClass) -> Option<Self> {
        match class {
            ResourceClass::Document => Some(Strategy::NetworkFirst),
            ResourceClass::Font => Some(Strategy::CacheFirstWithTimeout),
            ResourceClass::StaticBundle | ResourceClass::Style | ResourceClass::Script => {
                Some(Strategy::StaleWhileRevalidate)
            }
            ResourceClass::Image => Some(Strategy::SizeGatedCacheFirst),
            ResourceClass::Unclassified => None,
        }
    }
}

/// Per-strategy network deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyTimeouts {
    pub font: Duration,
    pub static_asset: Duration,
    pub image: Duration,
}

impl Default for StrategyTimeouts {
    fn default() -> Self {
        Self { font: Duration::from_secs(5), static_asset: Duration::from_secs(8), image: Duration::from_secs(10) }
    }
}

/// Everything a strategy needs to serve a request.
pub struct StrategyContext {
    pub(crate) store: Arc<dyn CacheStore>,
    pub(crate) network: Arc<dyn Network>,
    pub(crate) partitions: PartitionNames,
    pub(crate) connection: ConnectionQuality,
    pub(crate) timeouts: StrategyTimeouts,
    pub(crate) retention: RetentionPolicy,
    pub(crate) background: BackgroundTasks,
}

impl StrategyContext {
    pub fn new(
        store: Arc<dyn CacheStore>, network: Arc<dyn Network>, partitions: PartitionNames,
        connection: ConnectionQuality,
    ) -> Self {
        Self {
            store,
            network,
            partitions,
            connection,
            timeouts: StrategyTimeouts::default(),
            retention: RetentionPolicy::default(),
            background: BackgroundTasks::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: StrategyTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn background(&self) -> &BackgroundTasks {
        &self.background
    }

    fn key(request: &ResourceRequest) -> String {
        compute_request_key("GET", request.url.as_str())
    }

    /// Read a cached response. Store failures are reported as a miss.
    pub(crate) async fn lookup(&self, role: PartitionRole, request: &ResourceRequest) -> Option<ResourceResponse> {
        let partition = self.partitions.name(role);
        match self.store.get(partition, &Self::key(request)).await {
            Ok(Some(entry)) => {
                tracing::debug!("cache hit for {} in {}", request.url, partition);
                Some(ResourceResponse::from_entry(entry))
            }
            Ok(None) => {
                tracing::debug!("cache miss for {} in {}", request.url, partition);
                None
            }
            Err(e) => {
                tracing::warn!(url = %request.url, partition, "cache read failed, treating as miss: {}", e);
                None
            }
        }
    }

    /// Store a response, replacing any previous entry. Returns whether the
    /// write was committed.
    pub(crate) async fn store(
        &self, role: PartitionRole, request: &ResourceRequest, response: &ResourceResponse,
    ) -> bool {
        let partition = self.partitions.name(role);
        let entry = response.to_entry(&request.url);
        match self.store.put(partition, &entry).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(url = %request.url, partition, "cache write skipped: {}", e);
                false
            }
        }
    }

    /// One unbounded network attempt.
    pub(crate) async fn fetch(&self, request: &ResourceRequest) -> Result<ResourceResponse, Error> {
        self.network.fetch(request).await
    }

    /// One network attempt bounded by `limit`. Elapsing the deadline drops
    /// the in-flight request and reports `FetchTimeout`.
    pub(crate) async fn fetch_within(
        &self, request: &ResourceRequest, limit: Duration,
    ) -> Result<ResourceResponse, Error> {
        match tokio::time::timeout(limit, self.network.fetch(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::FetchTimeout(format!("{} after {}ms", request.url, limit.as_millis()))),
        }
    }
}

/// Shared handle passed to strategies that spawn background work.
pub type SharedContext = Arc<StrategyContext>;
