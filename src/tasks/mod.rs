//! Background Tasks Module
//!
//! Contains background tasks that run periodically for the lifetime of a store.
//!
//! # Tasks
//! - Expiration sweep: removes expired entries at the configured interval

mod sweep;

pub(crate) use sweep::spawn_sweep_task;
