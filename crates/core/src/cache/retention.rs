//! Retention limits shared by the strategies and the eviction sweep.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Entries older than this are evicted (3 days).
pub const MAX_ENTRY_AGE: Duration = Duration::from_secs(3 * 24 * 60 * 60);

/// Time between eviction sweeps (6 hours).
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

/// Images declaring this many bytes or more are never stored.
pub const IMAGE_SIZE_CEILING: u64 = 500_000;

/// Global retention policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_entry_age: Duration,
    pub sweep_interval: Duration,
    pub image_size_ceiling: u64,
    /// Oldest-captured entries beyond this count are trimmed on each sweep.
    pub max_entries_per_partition: Option<usize>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_entry_age: MAX_ENTRY_AGE,
            sweep_interval: SWEEP_INTERVAL,
            image_size_ceiling: IMAGE_SIZE_CEILING,
            max_entries_per_partition: None,
        }
    }
}

impl RetentionPolicy {
    /// Whether an entry captured at `captured_at` has outlived `max_entry_age`.
    ///
    /// Entries without a timestamp never expire.
    pub fn is_expired(&self, captured_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let Some(captured_at) = captured_at else {
            return false;
        };
        let Ok(max_age) = chrono::Duration::from_std(self.max_entry_age) else {
            return false;
        };
        now.signed_duration_since(captured_at) > max_age
    }

    /// Whether an image with the declared length may be stored.
    pub fn admits_image(&self, content_length: Option<u64>) -> bool {
        content_length.is_none_or(|len| len < self.image_size_ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = RetentionPolicy::default();
        assert_eq!(policy.max_entry_age, Duration::from_secs(259_200));
        assert_eq!(policy.sweep_interval, Duration::from_secs(21_600));
        assert_eq!(policy.image_size_ceiling, 500_000);
        assert!(policy.max_entries_per_partition.is_none());
    }

    #[test]
    fn test_is_expired() {
        let policy = RetentionPolicy::default();
        let now = Utc::now();
        assert!(policy.is_expired(Some(now - chrono::Duration::days(4)), now));
        assert!(!policy.is_expired(Some(now - chrono::Duration::days(1)), now));
        assert!(!policy.is_expired(None, now));
    }

    #[test]
    fn test_admits_image() {
        let policy = RetentionPolicy::default();
        assert!(policy.admits_image(None));
        assert!(policy.admits_image(Some(100_000)));
        assert!(!policy.admits_image(Some(500_000)));
        assert!(!policy.admits_image(Some(600_000)));
    }
}
