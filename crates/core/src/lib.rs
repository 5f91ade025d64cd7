//! Core types and shared functionality for waypoint.
//!
//! This crate provides:
//! - Partitioned cache store with a SQLite backend
//! - Resource classification rules
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheEntry, CacheStore, EntryMeta, PartitionNames, PartitionRole, RetentionPolicy};
pub use classify::{ClassificationRule, Classifier, ResourceClass, default_rules};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
