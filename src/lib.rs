//! Mem Cache - An embeddable in-process key-value cache
//!
//! Provides per-key TTL expiration (lazy on read, plus a periodic background
//! sweep) and a soft memory ceiling enforced when values are written.

pub mod cache;
pub mod config;
pub mod error;
pub mod memory;
mod tasks;

pub use cache::{MaxMemoryPolicy, Store, StoreStats, Ttl};
pub use config::StoreConfig;
pub use error::{CacheError, Result};
