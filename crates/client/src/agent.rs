//! The caching agent: every component wired from one [`AppConfig`].

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use url::Url;

use waypoint_core::{AppConfig, CacheStore, Error, PartitionNames, PartitionRole};

use crate::connection::ConnectionQuality;
use crate::control::ControlChannel;
use crate::dispatch::Dispatcher;
use crate::eviction::EvictionScheduler;
use crate::fetch::{Network, ResourceRequest, ResourceResponse, resolve};
use crate::lifecycle::{ActivationReport, Lifecycle, LifecycleState};
use crate::notify::{NotificationStyle, Notifier};
use crate::strategy::{StrategyContext, StrategyTimeouts};

/// Snapshot reported to the host.
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    pub state: LifecycleState,
    pub is_slow_connection: bool,
    pub static_partition: String,
    pub dynamic_partition: String,
    /// Every partition currently in the store, including foreign ones.
    pub partitions: Vec<String>,
}

pub struct Agent {
    origin: Url,
    store: Arc<dyn CacheStore>,
    partitions: PartitionNames,
    connection: ConnectionQuality,
    dispatcher: Dispatcher,
    lifecycle: Arc<Lifecycle>,
    control: ControlChannel,
    eviction: Arc<EvictionScheduler>,
    notifier: Notifier,
}

impl Agent {
    pub fn new(config: &AppConfig, store: Arc<dyn CacheStore>, network: Arc<dyn Network>) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {}", config.origin, e)))?;
        let classifier = config.classifier().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let partitions = config.partition_names();
        let retention = config.retention();
        let connection = ConnectionQuality::default();

        let timeouts = StrategyTimeouts {
            font: config.font_timeout(),
            static_asset: config.static_timeout(),
            image: config.image_timeout(),
        };
        let ctx = StrategyContext::new(Arc::clone(&store), Arc::clone(&network), partitions.clone(), connection.clone())
            .with_timeouts(timeouts)
            .with_retention(retention.clone());

        let lifecycle = Arc::new(
            Lifecycle::new(
                Arc::clone(&store),
                network,
                partitions.clone(),
                origin.clone(),
                config.precache_manifest.clone(),
            )
            .with_hold(config.hold_after_install),
        );

        Ok(Self {
            control: ControlChannel::new(connection.clone(), Arc::clone(&lifecycle)),
            eviction: Arc::new(EvictionScheduler::new(Arc::clone(&store), partitions.clone(), retention)),
            notifier: Notifier::new(NotificationStyle::from_config(config), &origin),
            dispatcher: Dispatcher::new(classifier, ctx),
            origin,
            store,
            partitions,
            connection,
            lifecycle,
        })
    }

    pub fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    pub fn control(&self) -> &ControlChannel {
        &self.control
    }

    pub fn eviction(&self) -> &Arc<EvictionScheduler> {
        &self.eviction
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn connection(&self) -> &ConnectionQuality {
        &self.connection
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Resolve an application-relative or absolute target.
    pub fn resolve(&self, target: &str) -> Result<Url, Error> {
        resolve(&self.origin, target).map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    /// Serve one intercepted request. Until activation completes every
    /// request goes straight to the network.
    pub async fn handle(&self, request: &ResourceRequest) -> Result<ResourceResponse, Error> {
        if !self.lifecycle.is_active() {
            tracing::debug!("agent not active, passing through {}", request.url);
            return self.dispatcher.context().fetch(request).await;
        }
        self.dispatcher.dispatch(request).await
    }

    /// Drive the lifecycle to `active`, retrying a failed install up to
    /// `attempts` times with a linear backoff.
    pub async fn start(&self, attempts: u32, backoff: Duration) -> Result<ActivationReport, Error> {
        let attempts = attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.lifecycle.install().await {
                Ok(()) => break,
                Err(e) if attempt < attempts => {
                    tracing::warn!(attempt, attempts, "install failed, retrying: {}", e);
                    tokio::time::sleep(backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
        self.lifecycle.wait_for_release().await;
        self.lifecycle.activate().await
    }

    pub async fn status(&self) -> Result<AgentStatus, Error> {
        Ok(AgentStatus {
            state: self.lifecycle.state(),
            is_slow_connection: self.connection.is_slow(),
            static_partition: self.partitions.name(PartitionRole::Static).to_string(),
            dynamic_partition: self.partitions.name(PartitionRole::Dynamic).to_string(),
            partitions: self.store.list_partitions().await?,
        })
    }

    /// Wait for detached refreshes to settle.
    pub async fn drain(&self) {
        self.dispatcher.context().background().drain().await;
    }
}
