//! Max Memory Policy Module
//!
//! Decides what happens to a write that would exceed the memory ceiling.

use std::fmt;
use std::str::FromStr;

use crate::error::CacheError;

// Policy names that are reserved for future eviction strategies.
const RESERVED_POLICIES: [&str; 4] = [
    "allkeys-random",
    "volatile-random",
    "allkeys-lru",
    "volatile-lru",
];

// == Max Memory Policy ==
/// Behavior applied when a write would push memory usage over the ceiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum MaxMemoryPolicy {
    /// Reject the write and keep existing entries
    #[default]
    NoEviction,
}

impl MaxMemoryPolicy {
    /// Returns the error reported to a writer whose write does not fit.
    pub fn on_overflow(&self, requested: i64, usage: i64, max_memory: i64) -> CacheError {
        match self {
            MaxMemoryPolicy::NoEviction => CacheError::OutOfMemory {
                requested,
                usage,
                max_memory,
            },
        }
    }
}

impl FromStr for MaxMemoryPolicy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "noeviction" | "no-eviction" => Ok(MaxMemoryPolicy::NoEviction),
            other if RESERVED_POLICIES.contains(&other) => Err(CacheError::UnknownOverflowPolicy(
                format!("{} is not implemented", other),
            )),
            other => Err(CacheError::UnknownOverflowPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for MaxMemoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxMemoryPolicy::NoEviction => f.write_str("no-eviction"),
        }
    }
}
