//! Periodic age-based eviction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use waypoint_core::{CacheStore, EntryMeta, Error, PartitionNames, RetentionPolicy};

/// Result of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub partitions_scanned: usize,
    pub entries_evicted: usize,
    /// Partitions that could not be swept, with the reason.
    pub failures: Vec<SweepFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepFailure {
    pub partition: String,
    pub error: String,
}

pub struct EvictionScheduler {
    store: Arc<dyn CacheStore>,
    partitions: PartitionNames,
    policy: RetentionPolicy,
}

impl EvictionScheduler {
    pub fn new(store: Arc<dyn CacheStore>, partitions: PartitionNames, policy: RetentionPolicy) -> Self {
        Self { store, partitions, policy }
    }

    /// Sweep every partition in this agent's namespace.
    pub async fn sweep(&self) -> Result<SweepReport, Error> {
        self.sweep_at(Utc::now()).await
    }

    /// Sweep as if the clock read `now`.
    ///
    /// # Errors
    ///
    /// Fails only when the partition list cannot be read. Errors inside a
    /// partition are recorded in the report and the sweep moves on.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport, Error> {
        let mut report = SweepReport::default();

        for partition in self.store.list_partitions().await? {
            if !self.partitions.in_namespace(&partition) {
                continue;
            }
            report.partitions_scanned += 1;

            match self.sweep_partition(&partition, now).await {
                Ok(evicted) => report.entries_evicted += evicted,
                Err(e) => {
                    tracing::warn!(partition, "eviction failed: {}", e);
                    report.failures.push(SweepFailure { partition, error: e.to_string() });
                }
            }
        }

        tracing::info!(
            partitions = report.partitions_scanned,
            evicted = report.entries_evicted,
            failures = report.failures.len(),
            "eviction sweep finished"
        );
        Ok(report)
    }

    async fn sweep_partition(&self, partition: &str, now: DateTime<Utc>) -> Result<usize, Error> {
        let entries = self.store.list_entries(partition).await?;
        let (expired, kept): (Vec<EntryMeta>, Vec<EntryMeta>) = entries
            .into_iter()
            .partition(|entry| self.policy.is_expired(entry.captured_at, now));

        let mut evicted = 0;
        for entry in &expired {
            if self.store.delete(partition, &entry.key).await? {
                evicted += 1;
            }
        }

        if let Some(cap) = self.policy.max_entries_per_partition
            && kept.len() > cap
        {
            let excess = kept.len() - cap;
            // `list_entries` orders by capture time, so the oldest come first.
            let oldest = kept.iter().filter(|entry| entry.captured_at.is_some()).take(excess);
            for entry in oldest {
                if self.store.delete(partition, &entry.key).await? {
                    evicted += 1;
                }
            }
        }

        if evicted > 0 {
            tracing::debug!(partition, evicted, "evicted entries");
        }
        Ok(evicted)
    }

    /// Run sweeps on the configured interval until the handle is aborted.
    /// The first sweep happens one interval after start-up.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = self.policy.sweep_interval;
            let mut timer = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                timer.tick().await;
                if let Err(e) = self.sweep().await {
                    tracing::warn!("eviction sweep aborted: {}", e);
                }
            }
        })
    }
}
