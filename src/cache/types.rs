//! Core type definitions for the cache system

use crate::error::CacheError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache key type - opaque caller-supplied string
pub type CacheKey = String;

/// Which tier of a [`TieredCache`](crate::cache::TieredCache) to address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Small, short-lived, hot tier
    L1,
    /// Larger, longer-lived, warm tier
    L2,
}

impl TryFrom<u8> for Tier {
    type Error = CacheError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Tier::L1),
            2 => Ok(Tier::L2),
            other => Err(CacheError::InvalidTier(other)),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::L1 => write!(f, "l1"),
            Tier::L2 => write!(f, "l2"),
        }
    }
}

/// Point-in-time statistics for a single LRU tier
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CacheStats {
    /// Number of entries physically resident (expired-but-unpurged included)
    pub size: usize,

    /// Capacity bound
    pub max_size: usize,

    /// Total number of cache hits
    pub hits: u64,

    /// Total number of cache misses (absent and expired alike)
    pub misses: u64,

    /// Number of entries removed by LRU pressure
    pub evictions: u64,

    /// Number of entries removed because their TTL ran out
    pub expirations: u64,

    /// `hits / (hits + misses) * 100`, 0 when there were no lookups
    pub hit_rate: f64,

    /// Best-effort sum of serialized value sizes
    pub total_size_bytes: usize,
}

impl CacheStats {
    /// Hit rate as a percentage
    pub fn compute_hit_rate(hits: u64, misses: u64) -> f64 {
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }

    /// Miss rate as a percentage
    pub fn miss_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            100.0 - self.hit_rate
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn total_size_mb(&self) -> f64 {
        self.total_size_bytes as f64 / (1024.0 * 1024.0)
    }

    /// Share of capacity in use, as a percentage
    pub fn utilization(&self) -> f64 {
        if self.max_size == 0 {
            0.0
        } else {
            (self.size as f64 / self.max_size as f64) * 100.0
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "size: {}/{} ({:.2}%), hits: {}, misses: {}, hit_rate: {:.2}%, evictions: {}, expirations: {}, bytes: {}",
            self.size,
            self.max_size,
            self.utilization(),
            self.hits,
            self.misses,
            self.hit_rate,
            self.evictions,
            self.expirations,
            self.total_size_bytes
        )
    }
}

/// Statistics for both tiers plus cross-tier movement counters
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TieredStats {
    pub l1: CacheStats,
    pub l2: CacheStats,

    /// L2 hits copied up into L1
    pub l1_promotions: u64,

    /// L1 capacity evictions moved down into L2. Stays zero unless
    /// demotion is enabled in the config.
    pub l2_promotions: u64,
}

impl TieredStats {
    /// Share of lookups answered by either tier.
    ///
    /// An L1 miss followed by an L2 hit is one satisfied lookup, so the
    /// denominator is L1 traffic only.
    pub fn overall_hit_rate(&self) -> f64 {
        CacheStats::compute_hit_rate(self.l1.hits + self.l2.hits, self.l2.misses)
    }
}

impl fmt::Display for TieredStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "L1 {{ {} }}", self.l1)?;
        writeln!(f, "L2 {{ {} }}", self.l2)?;
        write!(
            f,
            "promotions: l1={}, l2={}",
            self.l1_promotions, self.l2_promotions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_try_from() {
        assert_eq!(Tier::try_from(1).unwrap(), Tier::L1);
        assert_eq!(Tier::try_from(2).unwrap(), Tier::L2);
        assert!(matches!(Tier::try_from(0), Err(CacheError::InvalidTier(0))));
        assert!(matches!(Tier::try_from(3), Err(CacheError::InvalidTier(3))));
    }

    #[test]
    fn test_hit_rate() {
        assert_eq!(CacheStats::compute_hit_rate(80, 20), 80.0);
        assert_eq!(CacheStats::compute_hit_rate(0, 0), 0.0);
        assert!((CacheStats::compute_hit_rate(1, 2) - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_miss_rate_zero_requests() {
        let stats = CacheStats::default();
        assert_eq!(stats.miss_rate(), 0.0);
        assert_eq!(stats.utilization(), 0.0);
    }

    #[test]
    fn test_cache_stats_display() {
        let stats = CacheStats {
            size: 75,
            max_size: 100,
            hits: 100,
            misses: 50,
            evictions: 10,
            expirations: 5,
            hit_rate: CacheStats::compute_hit_rate(100, 50),
            total_size_bytes: 1024,
        };

        let display = stats.to_string();
        assert!(display.contains("hits: 100"));
        assert!(display.contains("misses: 50"));
        assert!(display.contains("75/100"));
    }

    #[test]
    fn test_overall_hit_rate() {
        let stats = TieredStats {
            l1: CacheStats {
                hits: 6,
                misses: 4,
                ..Default::default()
            },
            l2: CacheStats {
                hits: 2,
                misses: 2,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(stats.overall_hit_rate(), 80.0);
    }
}
