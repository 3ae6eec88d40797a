//! Invalidation records
//!
//! Entries leave the cache in bulk for one of two reasons: TTL expiry found by
//! the sweep, or an explicit pattern invalidation. Both are reported as an
//! [`InvalidationEvent`] so callers can log or audit them.

use crate::cache::types::{CacheKey, Tier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reason for cache invalidation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidationReason {
    /// Entry expired based on TTL
    Expired,

    /// Key contained the given substring
    PatternMatch { pattern: String },
}

impl std::fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidationReason::Expired => write!(f, "TTL expired"),
            InvalidationReason::PatternMatch { pattern } => {
                write!(f, "pattern match: {}", pattern)
            }
        }
    }
}

/// Event for cache invalidation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationEvent {
    /// Reason for invalidation
    pub reason: InvalidationReason,

    /// Tier the keys were removed from, `None` when both were affected
    pub tier: Option<Tier>,

    /// When the invalidation occurred
    pub timestamp: DateTime<Utc>,

    /// Keys that were invalidated
    pub keys: Vec<CacheKey>,
}

impl InvalidationEvent {
    /// Create a new invalidation event
    pub fn new(reason: InvalidationReason, keys: Vec<CacheKey>) -> Self {
        Self {
            reason,
            tier: None,
            timestamp: Utc::now(),
            keys,
        }
    }

    pub fn in_tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    /// Number of keys removed
    pub fn count(&self) -> usize {
        self.keys.len()
    }
}

impl std::fmt::Display for InvalidationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.tier {
            Some(tier) => write!(f, "{} keys from {} ({})", self.count(), tier, self.reason),
            None => write!(f, "{} keys ({})", self.count(), self.reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidation_reason_display() {
        assert_eq!(InvalidationReason::Expired.to_string(), "TTL expired");

        let reason = InvalidationReason::PatternMatch {
            pattern: "search:".to_string(),
        };
        assert!(reason.to_string().contains("search:"));
    }

    #[test]
    fn test_invalidation_event() {
        let event = InvalidationEvent::new(
            InvalidationReason::Expired,
            vec!["key1".to_string(), "key2".to_string()],
        )
        .in_tier(Tier::L2);

        assert_eq!(event.count(), 2);
        assert_eq!(event.tier, Some(Tier::L2));
        assert_eq!(event.to_string(), "2 keys from l2 (TTL expired)");
    }
}
