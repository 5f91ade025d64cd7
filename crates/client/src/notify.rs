//! Push notification rendering and click routing.
//!
//! Rendering and view management belong to the host; this module only
//! decides what to show and which view a click should land on. Both paths
//! are best-effort: a failure is logged and returned, never retried.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use waypoint_core::{AppConfig, Error};

/// A notification ready to be shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    /// When the push was received.
    pub timestamp: DateTime<Utc>,
    pub require_interaction: bool,
}

/// Fixed presentation applied to every push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationStyle {
    pub title: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    /// Body used when a push carries no payload.
    pub default_body: String,
}

impl NotificationStyle {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            title: config.notification_title.clone(),
            icon: config.notification_icon.clone(),
            badge: config.notification_badge.clone(),
            vibrate: config.vibrate_pattern.clone(),
            default_body: config.default_push_body.clone(),
        }
    }
}

/// An open application view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClickOutcome {
    Focused { id: String },
    Opened { url: String },
}

/// Displays notifications on the host.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn show(&self, notification: &Notification) -> Result<(), Error>;
}

/// Enumerates and manipulates the host's application views.
#[async_trait]
pub trait ViewHost: Send + Sync {
    async fn views(&self) -> Result<Vec<View>, Error>;
    async fn focus(&self, id: &str) -> Result<(), Error>;
    async fn open(&self, url: &Url) -> Result<(), Error>;
}

pub struct Notifier {
    style: NotificationStyle,
    root: Url,
}

impl Notifier {
    /// `origin` is the application origin; clicks route to its root path.
    pub fn new(style: NotificationStyle, origin: &Url) -> Self {
        let mut root = origin.clone();
        root.set_path("/");
        root.set_query(None);
        root.set_fragment(None);
        Self { style, root }
    }

    /// Build the notification for a push payload. The payload is used
    /// verbatim as the body.
    pub fn render(&self, payload: Option<&str>) -> Notification {
        Notification {
            title: self.style.title.clone(),
            body: payload.map_or_else(|| self.style.default_body.clone(), str::to_string),
            icon: self.style.icon.clone(),
            badge: self.style.badge.clone(),
            vibrate: self.style.vibrate.clone(),
            timestamp: Utc::now(),
            require_interaction: false,
        }
    }

    pub async fn on_push(&self, sink: &dyn NotificationSink, payload: Option<&str>) -> Result<Notification, Error> {
        let notification = self.render(payload);
        if let Err(e) = sink.show(&notification).await {
            tracing::warn!("failed to show notification: {}", e);
            return Err(e);
        }
        tracing::debug!("notification shown: {}", notification.body);
        Ok(notification)
    }

    /// Whether `view` is showing the application root.
    fn shows_root(&self, view: &View) -> bool {
        self.root
            .join(&view.url)
            .is_ok_and(|url| url.origin() == self.root.origin() && url.path() == "/")
    }

    /// Focus a view already at the root, otherwise open a new one there.
    pub async fn on_click(&self, host: &dyn ViewHost) -> Result<ClickOutcome, Error> {
        let result = self.route_click(host).await;
        if let Err(e) = &result {
            tracing::warn!("notification click not handled: {}", e);
        }
        result
    }

    async fn route_click(&self, host: &dyn ViewHost) -> Result<ClickOutcome, Error> {
        let views = host.views().await?;
        match views.into_iter().find(|view| self.shows_root(view)) {
            Some(view) => {
                host.focus(&view.id).await?;
                Ok(ClickOutcome::Focused { id: view.id })
            }
            None => {
                host.open(&self.root).await?;
                Ok(ClickOutcome::Opened { url: self.root.to_string() })
            }
        }
    }
}
