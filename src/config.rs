//! Configuration Module
//!
//! Construction-time settings for a store, loadable from environment variables.

use std::env;
use std::time::Duration;

use crate::cache::{MaxMemoryPolicy, DEFAULT_SWEEP_INTERVAL};
use crate::error::{CacheError, Result};

/// Interval of the background expiration sweep, in milliseconds
pub const ENV_SWEEP_INTERVAL_MS: &str = "MEM_CACHE_SWEEP_INTERVAL_MS";
/// Overflow policy name, e.g. `noeviction`
pub const ENV_MAX_MEMORY_POLICY: &str = "MEM_CACHE_MAX_MEMORY_POLICY";
/// Initial memory ceiling as a size string, e.g. `64MB`
pub const ENV_MAX_MEMORY: &str = "MEM_CACHE_MAX_MEMORY";

/// Store configuration parameters.
///
/// The sweep interval and policy are fixed once the store is built; the
/// memory ceiling can be changed later with `Store::set_max_memory`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Time between background expiration sweeps
    pub sweep_interval: Duration,
    /// What to do with a write that does not fit under the ceiling
    pub max_memory_policy: MaxMemoryPolicy,
    /// Initial ceiling as a size string, None = the 1 MiB default
    pub max_memory: Option<String>,
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a StoreConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `MEM_CACHE_SWEEP_INTERVAL_MS` - Sweep interval in milliseconds (default: 10000)
    /// - `MEM_CACHE_MAX_MEMORY_POLICY` - Overflow policy (default: noeviction)
    /// - `MEM_CACHE_MAX_MEMORY` - Initial ceiling size string (default: 1MB)
    ///
    /// # Errors
    /// Returns `InvalidConfig` or `UnknownOverflowPolicy` when a variable is
    /// set to a value that cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_SWEEP_INTERVAL_MS) {
            let millis: u64 = raw.trim().parse().map_err(|_| {
                CacheError::InvalidConfig(format!("{}={}", ENV_SWEEP_INTERVAL_MS, raw))
            })?;
            config.sweep_interval = Duration::from_millis(millis);
        }

        if let Some(raw) = lookup(ENV_MAX_MEMORY_POLICY) {
            config.max_memory_policy = raw.parse()?;
        }

        if let Some(raw) = lookup(ENV_MAX_MEMORY) {
            config.max_memory = Some(raw.trim().to_string());
        }

        Ok(config)
    }

    /// Sets the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Sets the overflow policy.
    pub fn with_max_memory_policy(mut self, policy: MaxMemoryPolicy) -> Self {
        self.max_memory_policy = policy;
        self
    }

    /// Sets the initial memory ceiling, e.g. `"64MB"`.
    pub fn with_max_memory(mut self, size: impl Into<String>) -> Self {
        self.max_memory = Some(size.into());
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            max_memory_policy: MaxMemoryPolicy::NoEviction,
            max_memory: None,
        }
    }
}
