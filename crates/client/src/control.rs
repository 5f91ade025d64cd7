//! Out-of-band control messages from the host application.
//!
//! ```json
//! { "type": "CONNECTION_CHANGE", "isSlowConnection": true }
//! { "type": "SKIP_WAITING" }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::connection::ConnectionQuality;
use crate::lifecycle::Lifecycle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    ConnectionChange {
        #[serde(rename = "isSlowConnection")]
        is_slow_connection: bool,
    },
    SkipWaiting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "message", rename_all = "snake_case")]
pub enum ControlOutcome {
    Applied(ControlMessage),
    /// Unknown type or malformed shape.
    Ignored,
}

pub struct ControlChannel {
    connection: ConnectionQuality,
    lifecycle: Arc<Lifecycle>,
}

impl ControlChannel {
    pub fn new(connection: ConnectionQuality, lifecycle: Arc<Lifecycle>) -> Self {
        Self { connection, lifecycle }
    }

    /// Parse and apply a raw message. Anything that is not a known message
    /// is dropped with a debug log.
    pub fn receive(&self, raw: &serde_json::Value) -> ControlOutcome {
        match ControlMessage::deserialize(raw) {
            Ok(message) => {
                self.apply(&message);
                ControlOutcome::Applied(message)
            }
            Err(e) => {
                tracing::debug!("ignoring control message {}: {}", raw, e);
                ControlOutcome::Ignored
            }
        }
    }

    pub fn apply(&self, message: &ControlMessage) {
        match message {
            ControlMessage::ConnectionChange { is_slow_connection } => {
                self.connection.set_slow(*is_slow_connection);
                tracing::debug!(is_slow = is_slow_connection, "connection quality changed");
            }
            ControlMessage::SkipWaiting => self.lifecycle.skip_waiting(),
        }
    }
}
