//! Client-resident caching agent for waypoint.
//!
//! This crate provides the request path (network transport, strategies and
//! dispatcher) and the components running beside it: lifecycle manager,
//! eviction scheduler, control channel and notification routing. [`Agent`]
//! wires them together from an [`waypoint_core::AppConfig`].

pub mod agent;
pub mod background;
pub mod connection;
pub mod control;
pub mod dispatch;
pub mod eviction;
pub mod fetch;
pub mod lifecycle;
pub mod notify;
pub mod strategy;

#[cfg(test)]
mod testing;

pub use agent::{Agent, AgentStatus};
pub use background::BackgroundTasks;
pub use connection::ConnectionQuality;
pub use control::{ControlChannel, ControlMessage, ControlOutcome};
pub use dispatch::Dispatcher;
pub use eviction::{EvictionScheduler, SweepFailure, SweepReport};
pub use fetch::{
    CacheMode, Credentials, FetchConfig, HttpNetwork, Network, ResourceRequest, ResourceResponse, ResponseSource,
};
pub use lifecycle::{ActivationReport, Lifecycle, LifecycleState};
pub use notify::{ClickOutcome, Notification, NotificationSink, NotificationStyle, Notifier, View, ViewHost};
pub use strategy::{Strategy, StrategyContext, StrategyTimeouts};
