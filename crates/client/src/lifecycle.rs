//! Agent lifecycle: install, optional hold, activate.
//!
//! ```text
//! installing --install ok--> installed --released--> activating --purge--> active
//!     ^   |
//!     +---+ install failed (host retries)
//! ```
//!
//! Install seeds the current static partition from the precache manifest,
//! all or nothing. Activation deletes every partition that is not one of the
//! two current names. Requests are only classified once the agent is active.

use std::sync::Arc;

use futures_util::future::try_join_all;
use serde::Serialize;
use tokio::sync::watch;
use url::Url;

use waypoint_core::{CacheEntry, CacheStore, Error, PartitionNames, PartitionRole};

use crate::fetch::{Network, ResourceRequest, ResourceResponse, resolve};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Installing,
    /// Seeded; waiting for a release when the host holds rollouts.
    Installed,
    Activating,
    Active,
}

/// Outcome of one activation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    pub deleted: Vec<String>,
    /// Stale partitions whose deletion failed; retried on the next activation.
    pub failed: Vec<String>,
}

pub struct Lifecycle {
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    partitions: PartitionNames,
    origin: Url,
    manifest: Vec<String>,
    hold_after_install: bool,
    state: watch::Sender<LifecycleState>,
    released: watch::Sender<bool>,
}

impl Lifecycle {
    pub fn new(
        store: Arc<dyn CacheStore>, network: Arc<dyn Network>, partitions: PartitionNames, origin: Url,
        manifest: Vec<String>,
    ) -> Self {
        Self {
            store,
            network,
            partitions,
            origin,
            manifest,
            hold_after_install: false,
            state: watch::Sender::new(LifecycleState::Installing),
            released: watch::Sender::new(false),
        }
    }

    /// Wait in `installed` until [`Lifecycle::skip_waiting`] is called.
    pub fn with_hold(mut self, hold: bool) -> Self {
        self.hold_after_install = hold;
        self
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn is_active(&self) -> bool {
        self.state() == LifecycleState::Active
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    fn transition(&self, next: LifecycleState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::info!(from = ?previous, to = ?next, "lifecycle transition");
        }
    }

    /// Release an install hold. Has no effect on a later install unless it
    /// is held again; the release is sticky for this agent.
    pub fn skip_waiting(&self) {
        if !self.released.send_replace(true) {
            tracing::info!("skip waiting requested");
        }
    }

    /// Seed the static partition with every manifest path.
    ///
    /// All manifest entries are fetched before anything is written. Any
    /// network error or non-OK status fails the install with nothing
    /// stored; a failed write undoes the entries already written, restoring
    /// any copy they replaced.
    ///
    /// # Errors
    ///
    /// Returns `Error::InstallFailed`; the host is expected to retry.
    pub async fn install(&self) -> Result<(), Error> {
        self.transition(LifecycleState::Installing);

        let requests = self
            .manifest
            .iter()
            .map(|path| {
                resolve(&self.origin, path)
                    .map(ResourceRequest::get)
                    .map_err(|e| Error::InstallFailed(format!("{path}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let responses = try_join_all(requests.iter().map(|request| self.fetch_manifest_entry(request))).await?;

        let partition = self.partitions.name(PartitionRole::Static);
        self.store
            .open_partition(partition)
            .await
            .map_err(|e| Error::InstallFailed(format!("open {partition}: {e}")))?;

        let mut written = Vec::with_capacity(responses.len());
        for (request, response) in requests.iter().zip(&responses) {
            let entry = response.to_entry(&request.url);
            let replaced = match self.store.get(partition, &entry.key).await {
                Ok(replaced) => replaced,
                Err(e) => {
                    self.rollback(partition, written).await;
                    return Err(Error::InstallFailed(format!("read {}: {e}", request.url)));
                }
            };
            if let Err(e) = self.store.put(partition, &entry).await {
                self.rollback(partition, written).await;
                return Err(Error::InstallFailed(format!("store {}: {e}", request.url)));
            }
            written.push((entry.key, replaced));
        }

        tracing::info!(partition, entries = written.len(), "precache seeded");
        self.transition(LifecycleState::Installed);
        Ok(())
    }

    async fn fetch_manifest_entry(&self, request: &ResourceRequest) -> Result<ResourceResponse, Error> {
        let response = self
            .network
            .fetch(request)
            .await
            .map_err(|e| Error::InstallFailed(format!("{}: {e}", request.url)))?;
        if !response.status.is_success() {
            return Err(Error::InstallFailed(format!("{}: status {}", request.url, response.status.as_u16())));
        }
        Ok(response)
    }

    /// Undo this install's writes, putting back whatever each one replaced.
    async fn rollback(&self, partition: &str, written: Vec<(String, Option<CacheEntry>)>) {
        for (key, replaced) in written.into_iter().rev() {
            let result = match replaced {
                Some(previous) => self.store.put(partition, &previous).await,
                None => self.store.delete(partition, &key).await.map(|_| ()),
            };
            if let Err(e) = result {
                tracing::warn!(partition, key, "precache rollback failed: {}", e);
            }
        }
    }

    /// Block until the install hold, if any, is released.
    pub async fn wait_for_release(&self) {
        if !self.hold_after_install {
            return;
        }
        let mut released = self.released.subscribe();
        tracing::info!("install held until skip waiting");
        // The sender lives in `self`, so this only errors if `self` is gone.
        let _ = released.wait_for(|released| *released).await;
    }

    /// Delete every partition that is not current, then become active.
    ///
    /// A failed deletion is logged and skipped; the remaining stale
    /// partitions are still processed.
    ///
    /// # Errors
    ///
    /// Returns an error only if the partition list cannot be read.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        self.transition(LifecycleState::Activating);

        let existing = match self.store.list_partitions().await {
            Ok(existing) => existing,
            Err(e) => {
                self.transition(LifecycleState::Installed);
                return Err(e);
            }
        };

        let mut report = ActivationReport::default();
        for partition in existing {
            if self.partitions.is_current(&partition) {
                continue;
            }
            match self.store.delete_partition(&partition).await {
                Ok(_) => {
                    tracing::info!(partition, "deleted stale partition");
                    report.deleted.push(partition);
                }
                Err(e) => {
                    tracing::warn!(partition, "failed to delete stale partition: {}", e);
                    report.failed.push(partition);
                }
            }
        }

        self.transition(LifecycleState::Active);
        Ok(report)
    }

    /// Install, wait for any hold, activate.
    pub async fn run(&self) -> Result<ActivationReport, Error> {
        self.install().await?;
        self.wait_for_release().await;
        self.activate().await
    }
}
