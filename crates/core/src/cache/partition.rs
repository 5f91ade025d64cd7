//! Versioned partition naming.
//!
//! Partitions are named `{namespace}-{version}-{role}`. The part before the
//! role is the versioned base name; only the two names derived from the
//! active version are current.

use std::fmt;

/// Which of the two current partitions an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionRole {
    /// Precached and long-lived assets: bundles, styles, scripts, fonts, images.
    Static,
    /// Documents captured while browsing.
    Dynamic,
}

impl PartitionRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionRole::Static => "static",
            PartitionRole::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for PartitionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partition names for one agent version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionNames {
    namespace: String,
    base: String,
    static_name: String,
    dynamic_name: String,
}

impl PartitionNames {
    pub fn new(namespace: &str, version: &str) -> Self {
        let base = format!("{namespace}-{version}");
        Self {
            namespace: namespace.to_string(),
            static_name: format!("{base}-{}", PartitionRole::Static),
            dynamic_name: format!("{base}-{}", PartitionRole::Dynamic),
            base,
        }
    }

    /// The versioned base name, e.g. `waypoint-v3`.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn name(&self, role: PartitionRole) -> &str {
        match role {
            PartitionRole::Static => &self.static_name,
            PartitionRole::Dynamic => &self.dynamic_name,
        }
    }

    /// Whether `partition` is one of the two current partitions.
    pub fn is_current(&self, partition: &str) -> bool {
        partition == self.static_name || partition == self.dynamic_name
    }

    /// Whether `partition` was created by any version of this agent.
    pub fn in_namespace(&self, partition: &str) -> bool {
        partition
            .strip_prefix(self.namespace.as_str())
            .is_some_and(|rest| rest.starts_with('-'))
    }
}
