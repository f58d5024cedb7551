//! Cache Module
//!
//! Provides the in-memory store with TTL expiration and a memory ceiling.

mod entry;
mod policy;
mod stats;
mod store;


// Re-export public types
pub use entry::{Entry, Ttl};
pub use policy::MaxMemoryPolicy;
pub use stats::StoreStats;
pub use store::Store;

pub(crate) use store::StoreInner;

// == Public Constants ==
/// Memory ceiling used until `Store::set_max_memory` is called
pub const DEFAULT_MAX_MEMORY: i64 = 1024 * 1024; // 1 MiB

/// Interval between background expiration sweeps
pub const DEFAULT_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(10);
