//! Host-side notification surfaces.
//!
//! Over stdio the server cannot draw notifications or move windows itself;
//! it records what should be shown and tells the host which view to act on.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use url::Url;
use waypoint_client::{Notification, NotificationSink, View, ViewHost};
use waypoint_core::Error;

/// Notifications kept for inspection.
const RECENT_LIMIT: usize = 32;

/// Sink that logs each notification and keeps the most recent ones.
#[derive(Debug, Default)]
pub struct RecordingSink {
    recent: Mutex<VecDeque<Notification>>,
}

impl RecordingSink {
    pub fn recent(&self) -> Vec<Notification> {
        self.recent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn show(&self, notification: &Notification) -> Result<(), Error> {
        tracing::info!(title = %notification.title, body = %notification.body, "notification");
        let mut recent = self.recent.lock().unwrap_or_else(PoisonError::into_inner);
        if recent.len() == RECENT_LIMIT {
            recent.pop_front();
        }
        recent.push_back(notification.clone());
        Ok(())
    }
}

/// The views the host reported along with a click.
pub struct ReportedViews {
    views: Vec<View>,
}

impl ReportedViews {
    pub fn new(views: Vec<View>) -> Self {
        Self { views }
    }
}

#[async_trait]
impl ViewHost for ReportedViews {
    async fn views(&self) -> Result<Vec<View>, Error> {
        Ok(self.views.clone())
    }

    async fn focus(&self, id: &str) -> Result<(), Error> {
        if !self.views.iter().any(|view| view.id == id) {
            return Err(Error::NotificationFailed(format!("no view with id {id}")));
        }
        tracing::debug!(view = id, "focus requested");
        Ok(())
    }

    async fn open(&self, url: &Url) -> Result<(), Error> {
        tracing::debug!(%url, "open requested");
        Ok(())
    }
}
