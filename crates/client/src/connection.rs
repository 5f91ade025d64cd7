//! Shared connection-quality signal.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide "slow connection" flag.
///
/// Cloning shares the flag. Writes come from the control channel and are
/// visible to strategies dispatched afterwards; a request already in flight
/// may observe either value. No ordering stronger than last-write-wins is
/// provided.
#[derive(Debug, Clone, Default)]
pub struct ConnectionQuality(Arc<AtomicBool>);

impl ConnectionQuality {
    pub fn new(is_slow: bool) -> Self {
        Self(Arc::new(AtomicBool::new(is_slow)))
    }

    pub fn is_slow(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set_slow(&self, is_slow: bool) {
        self.0.store(is_slow, Ordering::Relaxed);
    }
}
