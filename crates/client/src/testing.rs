//! Test doubles for the network and the cache store.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::{HashMap, HashSet, VecDeque};
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

use crate::fetch::{Network, ResourceRequest, ResourceResponse, ResponseSource};
use waypoint_core::{CacheDb, CacheEntry, CacheStore, EntryMeta, Error};

pub(crate) const ORIGIN: &str = "https://app.test";

pub(crate) fn app_url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

/// One scripted network outcome.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Respond { status: u16, body: &'static str, headers: Vec<(&'static str, String)> },
    Fail,
    /// Never completes; only a timeout gets the caller out.
    Hang,
    /// Respond after a delay.
    Slow(Duration, u16, &'static str),
}

impl Reply {
    pub(crate) fn ok(body: &'static str) -> Self {
        Reply::Respond { status: 200, body, headers: Vec::new() }
    }

    pub(crate) fn status(status: u16, body: &'static str) -> Self {
        Reply::Respond { status, body, headers: Vec::new() }
    }

    pub(crate) fn with_length(body: &'static str, content_length: u64) -> Self {
        Reply::Respond { status: 200, body, headers: vec![("content-length", content_length.to_string())] }
    }
}

fn build_response(status: u16, body: &'static str, headers: &[(&'static str, String)]) -> ResourceResponse {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.insert(HeaderName::from_static(name), HeaderValue::from_str(value).unwrap());
    }
    ResourceResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers: map,
        body: Bytes::from_static(body.as_bytes()),
        source: ResponseSource::Network,
    }
}

/// Scripted [`Network`]. Each URL has a queue of replies; the last reply
/// repeats once the queue is down to one. Unscripted URLs fail.
#[derive(Default)]
pub(crate) struct StubNetwork {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<String>>,
}

impl StubNetwork {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn script(&self, path: &str, replies: Vec<Reply>) {
        self.routes
            .lock()
            .unwrap()
            .insert(app_url(path).to_string(), replies.into());
    }

    pub(crate) fn calls(&self, path: &str) -> usize {
        let url = app_url(path).to_string();
        self.calls.lock().unwrap().iter().filter(|c| **c == url).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next_reply(&self, url: &str) -> Option<Reply> {
        let mut routes = self.routes.lock().unwrap();
        let queue = routes.get_mut(url)?;
        if queue.len() > 1 { queue.pop_front() } else { queue.front().cloned() }
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &ResourceRequest) -> Result<ResourceResponse, Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());

        match self.next_reply(&url) {
            Some(Reply::Respond { status, body, headers }) => Ok(build_response(status, body, &headers)),
            Some(Reply::Slow(delay, status, body)) => {
                tokio::time::sleep(delay).await;
                Ok(build_response(status, body, &[]))
            }
            Some(Reply::Hang) => {
                std::future::pending::<()>().await;
                Err(Error::HttpError("unreachable".into()))
            }
            Some(Reply::Fail) | None => Err(Error::HttpError(format!("connection refused: {url}"))),
        }
    }
}

/// [`CacheStore`] wrapper that fails every operation on selected partitions,
/// or the writes whose sequence numbers fall in `rejected`.
pub(crate) struct FlakyStore {
    inner: CacheDb,
    broken: HashSet<String>,
    writes: AtomicUsize,
    rejected: Range<usize>,
}

impl FlakyStore {
    pub(crate) fn new(inner: CacheDb) -> Self {
        Self { inner, broken: HashSet::new(), writes: AtomicUsize::new(0), rejected: 0..0 }
    }

    pub(crate) fn with_broken(mut self, partition: &str) -> Self {
        self.broken.insert(partition.to_string());
        self
    }

    /// Let `allowed` writes through, then reject every later one.
    pub(crate) fn failing_writes_after(mut self, allowed: usize) -> Self {
        self.rejected = allowed..usize::MAX;
        self
    }

    /// Reject only the write numbered `index`, counting from zero.
    pub(crate) fn failing_write(mut self, index: usize) -> Self {
        self.rejected = index..index + 1;
        self
    }

    fn check(&self, partition: &str) -> Result<(), Error> {
        if self.broken.contains(partition) {
            return Err(Error::CorruptEntry(format!("partition {partition} unavailable")));
        }
        Ok(())
    }

    fn take_write(&self) -> Result<(), Error> {
        let n = self.writes.fetch_add(1, Ordering::SeqCst);
        if self.rejected.contains(&n) {
            return Err(Error::CorruptEntry(format!("write {n} rejected")));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for FlakyStore {
    async fn open_partition(&self, partition: &str) -> Result<(), Error> {
        self.check(partition)?;
        self.inner.open_partition(partition).await
    }

    async fn list_partitions(&self) -> Result<Vec<String>, Error> {
        self.inner.list_partitions().await
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool, Error> {
        self.check(partition)?;
        self.inner.delete_partition(partition).await
    }

    async fn get(&self, partition: &str, key: &str) -> Result<Option<CacheEntry>, Error> {
        self.check(partition)?;
        self.inner.get(partition, key).await
    }

    async fn put(&self, partition: &str, entry: &CacheEntry) -> Result<(), Error> {
        self.check(partition)?;
        self.take_write()?;
        self.inner.put(partition, entry).await
    }

    async fn delete(&self, partition: &str, key: &str) -> Result<bool, Error> {
        self.check(partition)?;
        self.inner.delete(partition, key).await
    }

    async fn list_entries(&self, partition: &str) -> Result<Vec<EntryMeta>, Error> {
        self.check(partition)?;
        self.inner.list_entries(partition).await
    }
}

/// Deadline used for every bounded attempt in tests.
pub(crate) const TEST_TIMEOUT: Duration = Duration::from_millis(50);

pub(crate) fn partitions() -> waypoint_core::PartitionNames {
    waypoint_core::PartitionNames::new("waypoint", "v1")
}

pub(crate) fn test_timeouts() -> crate::strategy::StrategyTimeouts {
    crate::strategy::StrategyTimeouts { font: TEST_TIMEOUT, static_asset: TEST_TIMEOUT, image: TEST_TIMEOUT }
}

/// Strategy context over a fresh in-memory store.
pub(crate) async fn context(network: Arc<StubNetwork>) -> (Arc<crate::strategy::StrategyContext>, CacheDb) {
    let db = CacheDb::open_in_memory().await.unwrap();
    let ctx = crate::strategy::StrategyContext::new(
        Arc::new(db.clone()),
        network,
        partitions(),
        crate::connection::ConnectionQuality::default(),
    )
    .with_timeouts(test_timeouts());
    (Arc::new(ctx), db)
}

/// Strategy context over `store`, for exercising cache failures.
pub(crate) fn flaky_context(network: Arc<StubNetwork>, store: FlakyStore) -> crate::strategy::StrategyContext {
    crate::strategy::StrategyContext::new(
        Arc::new(store),
        network,
        partitions(),
        crate::connection::ConnectionQuality::default(),
    )
    .with_timeouts(test_timeouts())
}

/// Entry stored directly, bypassing any strategy.
pub(crate) async fn seed(db: &CacheDb, partition: &str, path: &str, body: &'static str) {
    let entry = CacheEntry::capture(app_url(path).as_str(), 200, Vec::new(), body.as_bytes().to_vec());
    db.put(partition, &entry).await.unwrap();
}

/// Body of the entry stored for `path`, if any.
pub(crate) async fn stored_body(db: &CacheDb, partition: &str, path: &str) -> Option<Vec<u8>> {
    let key = waypoint_core::cache::hash::compute_request_key("GET", app_url(path).as_str());
    db.get(partition, &key).await.unwrap().map(|e| e.body)
}

/// Serve one raw HTTP response on a local port and return its base URL.
pub(crate) async fn serve_once(response: Vec<u8>) -> Url {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        socket.write_all(&response).await.unwrap();
        socket.shutdown().await.unwrap();
    });
    Url::parse(&format!("http://{addr}/")).unwrap()
}

/// A `200` image response declaring gzip encoding over `len` opaque bytes.
pub(crate) fn gzip_image_response(len: usize) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: image/svg+xml\r\nContent-Encoding: gzip\r\nContent-Length: {len}\r\nConnection: close\r\n\r\n"
    )
    .into_bytes();
    response.extend(std::iter::repeat_n(0x1f_u8, len));
    response
}
