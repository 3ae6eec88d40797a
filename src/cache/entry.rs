//! Cache entry management with TTL support

use crate::cache::types::CacheKey;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// A cache entry with TTL and metadata
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The cache key
    pub key: CacheKey,

    /// The cached value
    pub value: V,

    /// Entry metadata
    pub metadata: CacheMetadata,
}

impl<V> CacheEntry<V> {
    /// Create a freshly written entry
    ///
    /// A fresh entry starts with an access count of 1.
    pub fn new(key: CacheKey, value: V, ttl: Option<Duration>, size_bytes: usize, sequence: u64) -> Self {
        let now = Instant::now();

        Self {
            key,
            value,
            metadata: CacheMetadata {
                created_at: now,
                last_accessed: now,
                access_count: 1,
                size_bytes,
                ttl,
                sequence,
            },
        }
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Check expiry against a given instant.
    ///
    /// Visible while `now - created_at <= ttl`. A zero TTL is never visible.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.metadata.ttl {
            None => false,
            Some(ttl) if ttl.is_zero() => true,
            Some(ttl) => now.saturating_duration_since(self.metadata.created_at) > ttl,
        }
    }

    /// Get time until expiration
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let ttl = self.metadata.ttl?;
        ttl.checked_sub(self.age())
    }

    /// Mark the entry as accessed (updates access time and count)
    pub fn touch(&mut self, now: Instant) {
        self.metadata.last_accessed = now;
        self.metadata.access_count += 1;
    }

    /// Get the age of the entry
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.metadata.created_at)
    }
}

/// Metadata associated with a cache entry
#[derive(Debug, Clone)]
pub struct CacheMetadata {
    /// When the entry was written
    pub created_at: Instant,

    /// Last successful read
    pub last_accessed: Instant,

    /// 1 on write, +1 per successful read
    pub access_count: u64,

    /// Estimated serialized size of the value
    pub size_bytes: usize,

    /// Time-to-live, `None` = never expires by time
    pub ttl: Option<Duration>,

    /// Monotonic write order within a tier, breaks hot-key ties
    pub sequence: u64,
}

impl CacheMetadata {
    /// Check if metadata indicates a hot entry (frequently accessed)
    pub fn is_hot(&self, threshold: u64) -> bool {
        self.access_count >= threshold
    }
}

/// Best-effort size of a value as serialized JSON. Never fails; 0 if the
/// value cannot be serialized.
pub fn estimate_size<V: Serialize + ?Sized>(value: &V) -> usize {
    serde_json::to_vec(value).map(|bytes| bytes.len()).unwrap_or(0)
}
