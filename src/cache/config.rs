//! Configuration for the cache system

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Capacity and expiry policy for one LRU tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
    /// Maximum number of entries. 0 disables the tier.
    pub max_size: usize,

    /// TTL applied by `set` when no explicit TTL is given.
    /// `None` means entries never expire by time.
    pub default_ttl: Option<Duration>,

    /// TTL jitter factor (0.0 - 1.0)
    /// Spreads expiry of entries written together
    pub ttl_jitter: f64,
}

impl TierConfig {
    pub fn new(max_size: usize, default_ttl: Option<Duration>) -> Self {
        Self {
            max_size,
            default_ttl,
            ttl_jitter: 0.0,
        }
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.ttl_jitter = jitter;
        self
    }

    /// Default TTL with jitter applied
    pub fn ttl_with_jitter(&self) -> Option<Duration> {
        let base = self.default_ttl?;
        if self.ttl_jitter == 0.0 || base.is_zero() {
            return Some(base);
        }

        let base_secs = base.as_secs_f64();
        let jitter_range = base_secs * self.ttl_jitter;
        let jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter_range;

        let secs = (base_secs + jitter).max(0.0);
        Some(Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX))
    }

    fn validate(&self, tier: &str) -> Result<()> {
        if !(0.0..=1.0).contains(&self.ttl_jitter) {
            return Err(CacheError::Config(format!(
                "{} ttl_jitter must be between 0.0 and 1.0",
                tier
            )));
        }
        Ok(())
    }
}

/// Configuration for the tiered cache and its optimizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Hot tier
    pub l1: TierConfig,

    /// Warm tier
    pub l2: TierConfig,

    /// Move entries evicted from L1 by capacity pressure down into L2
    pub demote_evicted: bool,

    /// Upper bound on a single warm-up loader
    pub warmup_timeout: Duration,

    /// Interval for the background expiry sweep
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            // 100 hot items for 1 minute
            l1: TierConfig::new(100, Some(Duration::from_secs(60))),
            // 1000 warm items for 10 minutes
            l2: TierConfig::new(1000, Some(Duration::from_secs(600))),
            demote_evicted: false,
            warmup_timeout: Duration::from_secs(30),
            // Sweep every 5 minutes
            cleanup_interval: Duration::from_secs(300),
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.l1.validate("l1")?;
        self.l2.validate("l2")?;

        if self.warmup_timeout.is_zero() {
            return Err(CacheError::Config(
                "warmup_timeout must be greater than 0".to_string(),
            ));
        }

        if self.cleanup_interval.is_zero() {
            return Err(CacheError::Config(
                "cleanup_interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from the process environment (and `.env`, if present)
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("CACHE_L1_SIZE") {
            config.l1.max_size = parse_number("CACHE_L1_SIZE", &v)?;
        }
        if let Some(v) = lookup("CACHE_L1_TTL_SECS") {
            config.l1.default_ttl = parse_ttl("CACHE_L1_TTL_SECS", &v)?;
        }
        if let Some(v) = lookup("CACHE_L2_SIZE") {
            config.l2.max_size = parse_number("CACHE_L2_SIZE", &v)?;
        }
        if let Some(v) = lookup("CACHE_L2_TTL_SECS") {
            config.l2.default_ttl = parse_ttl("CACHE_L2_TTL_SECS", &v)?;
        }
        if let Some(v) = lookup("CACHE_WARMUP_TIMEOUT_SECS") {
            config.warmup_timeout = parse_secs("CACHE_WARMUP_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("CACHE_CLEANUP_INTERVAL_SECS") {
            config.cleanup_interval = parse_secs("CACHE_CLEANUP_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = lookup("CACHE_DEMOTE_EVICTED") {
            config.demote_evicted = parse_flag("CACHE_DEMOTE_EVICTED", &v)?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| CacheError::Config(format!("{} has invalid value '{}'", name, raw)))
}

fn parse_secs(name: &str, raw: &str) -> Result<Duration> {
    let secs: f64 = parse_number(name, raw)?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(CacheError::Config(format!(
            "{} must be a non-negative number of seconds",
            name
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| CacheError::Config(format!("{} is out of range: {}", name, e)))
}

/// Accepts `true`/`false`, `1`/`0`, `yes`/`no` and `on`/`off`
fn parse_flag(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(CacheError::Config(format!(
            "{} has invalid value '{}'",
            name, raw
        ))),
    }
}

/// `none` means never expire
fn parse_ttl(name: &str, raw: &str) -> Result<Option<Duration>> {
    if raw.trim().eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    parse_secs(name, raw).map(Some)
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    l1_size: Option<usize>,
    l1_ttl: Option<Option<Duration>>,
    l2_size: Option<usize>,
    l2_ttl: Option<Option<Duration>>,
    ttl_jitter: Option<f64>,
    demote_evicted: Option<bool>,
    warmup_timeout: Option<Duration>,
    cleanup_interval: Option<Duration>,
}

impl CacheConfigBuilder {
    pub fn l1_size(mut self, size: usize) -> Self {
        self.l1_size = Some(size);
        self
    }

    /// Set the L1 default TTL (`None` = never expire)
    pub fn l1_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.l1_ttl = Some(ttl);
        self
    }

    pub fn l2_size(mut self, size: usize) -> Self {
        self.l2_size = Some(size);
        self
    }

    /// Set the L2 default TTL (`None` = never expire)
    pub fn l2_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.l2_ttl = Some(ttl);
        self
    }

    /// Set TTL jitter for both tiers
    pub fn ttl_jitter(mut self, jitter: f64) -> Self {
        self.ttl_jitter = Some(jitter);
        self
    }

    pub fn demote_evicted(mut self, enable: bool) -> Self {
        self.demote_evicted = Some(enable);
        self
    }

    pub fn warmup_timeout(mut self, timeout: Duration) -> Self {
        self.warmup_timeout = Some(timeout);
        self
    }

    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = Some(interval);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();
        let jitter = self.ttl_jitter.unwrap_or(defaults.l1.ttl_jitter);

        CacheConfig {
            l1: TierConfig::new(
                self.l1_size.unwrap_or(defaults.l1.max_size),
                self.l1_ttl.unwrap_or(defaults.l1.default_ttl),
            )
            .with_jitter(jitter),
            l2: TierConfig::new(
                self.l2_size.unwrap_or(defaults.l2.max_size),
                self.l2_ttl.unwrap_or(defaults.l2.default_ttl),
            )
            .with_jitter(jitter),
            demote_evicted: self.demote_evicted.unwrap_or(defaults.demote_evicted),
            warmup_timeout: self.warmup_timeout.unwrap_or(defaults.warmup_timeout),
            cleanup_interval: self.cleanup_interval.unwrap_or(defaults.cleanup_interval),
        }
    }
}

/// Preset configurations for common use cases
impl CacheConfig {
    /// LLM chat responses: answers stay valid for an hour in L2
    pub fn responses() -> Self {
        Self {
            l1: TierConfig::new(100, Some(Duration::from_secs(300))),
            l2: TierConfig::new(1000, Some(Duration::from_secs(3600))),
            ..Default::default()
        }
    }

    /// Tool invocation results: short-lived, 5 minutes at most
    pub fn tool_results() -> Self {
        Self {
            l1: TierConfig::new(50, Some(Duration::from_secs(60))),
            l2: TierConfig::new(500, Some(Duration::from_secs(300))),
            ..Default::default()
        }
    }
}
