//! Cache-related MCP tools.
//!
//! This module provides tools for maintaining the agent's partitions.

pub mod sweep;

pub use sweep::sweep_impl;
