//! Cache Store Module
//!
//! Main cache engine combining a key table, an index of expiring keys, and
//! byte accounting against a memory ceiling.
//!
//! Locking: the table (with the usage counter and ceiling) sits behind one
//! `RwLock`; the expiring index has its own `Mutex`. Any path that needs both
//! takes the table lock first.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::stats::StatsCounters;
use crate::cache::{Entry, MaxMemoryPolicy, StoreStats, Ttl, DEFAULT_MAX_MEMORY};
use crate::config::StoreConfig;
use crate::error::{CacheError, Result};
use crate::memory::{footprint_of, parse_size_string, total_system_memory};
use crate::tasks::spawn_sweep_task;

type EntryMap<V> = HashMap<String, Arc<Entry<V>>>;

// == Table ==
struct Table<V> {
    entries: EntryMap<V>,
    /// Sum of key length plus footprint for every entry in `entries`
    memory_usage: i64,
    max_memory: i64,
}

// == Store Inner ==
/// State shared between store handles and the sweep task.
pub(crate) struct StoreInner<V> {
    table: RwLock<Table<V>>,
    /// Entries of `table` that carry an expiration, sharing the same Arc
    expiring: Mutex<EntryMap<V>>,
    policy: MaxMemoryPolicy,
    stats: StatsCounters,
    shutdown_tx: watch::Sender<bool>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<V> StoreInner<V> {
    /// Removes every expired entry from both maps and returns how many went.
    pub(crate) fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut table = self.table.write();
        let table = &mut *table;
        let mut expiring = self.expiring.lock();

        let mut removed = 0;
        expiring.retain(|key, entry| {
            if !entry.is_expired_at(now) {
                return true;
            }
            if table.entries.remove(key).is_some() {
                table.memory_usage -= accounted_size(key, &**entry);
            }
            removed += 1;
            false
        });

        self.stats.record_expired(removed);
        removed
    }
}

// == Cache Store ==
/// Thread-safe in-memory key-value store with TTL and a memory ceiling.
///
/// Handles are cheap to clone and share one table. Each store spawns a
/// background sweep task on the current tokio runtime; it stops on
/// [`Store::shutdown`] or when the last handle is dropped.
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use mem_cache::Store;
///
/// #[tokio::main]
/// async fn main() -> mem_cache::Result<()> {
///     let store = Store::new()?;
///     store.set_max_memory("64MB")?;
///     store.set("session", "token".to_string(), Duration::from_secs(30))?;
///     assert_eq!(store.get("session").as_deref(), Some("token"));
///     Ok(())
/// }
/// ```
pub struct Store<V> {
    inner: Arc<StoreInner<V>>,
}

impl<V> Clone for Store<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Store<V>
where
    V: Serialize + Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a store with the default configuration.
    ///
    /// # Errors
    /// Returns `RuntimeUnavailable` when called outside a tokio runtime.
    pub fn new() -> Result<Self> {
        Self::with_config(StoreConfig::default())
    }

    /// Creates a store from `config` and starts its sweep task.
    ///
    /// # Errors
    /// - `RuntimeUnavailable` when called outside a tokio runtime
    /// - `InvalidConfig` for a zero sweep interval
    /// - any error of [`Store::set_max_memory`] for the initial ceiling
    pub fn with_config(config: StoreConfig) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| CacheError::RuntimeUnavailable)?;

        if config.sweep_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "sweep interval must be greater than zero".to_string(),
            ));
        }

        let max_memory = match &config.max_memory {
            Some(size) => resolve_max_memory(size)?,
            None => DEFAULT_MAX_MEMORY,
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let inner = Arc::new(StoreInner {
            table: RwLock::new(Table {
                entries: HashMap::new(),
                memory_usage: 0,
                max_memory,
            }),
            expiring: Mutex::new(HashMap::new()),
            policy: config.max_memory_policy,
            stats: StatsCounters::default(),
            shutdown_tx,
            sweeper: Mutex::new(None),
        });

        let handle = spawn_sweep_task(
            &runtime,
            Arc::downgrade(&inner),
            config.sweep_interval,
            shutdown_rx,
        );
        *inner.sweeper.lock() = Some(handle);

        info!(
            max_memory,
            policy = %config.max_memory_policy,
            "Cache store initialized"
        );
        Ok(Self { inner })
    }

    // == Set Max Memory ==
    /// Replaces the memory ceiling with the size given as a string, e.g. `"1.2KB"`.
    ///
    /// Entries already stored are kept even if they now exceed the ceiling.
    ///
    /// # Errors
    /// - `InvalidUnit` / `MalformedNumber` if `size` does not parse
    /// - `ProbeUnavailable` if the system memory cannot be read
    /// - `InvalidMaxMemory` if `size` exceeds total system memory
    pub fn set_max_memory(&self, size: &str) -> Result<()> {
        let max_memory = resolve_max_memory(size)?;
        self.inner.table.write().max_memory = max_memory;
        debug!(max_memory, "Max memory updated");
        Ok(())
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// A zero TTL never expires; a negative `chrono::TimeDelta` stores an
    /// entry that is already expired. Overwriting with a non-expiring value
    /// cancels the previous expiration.
    ///
    /// # Errors
    /// - `UnsupportedValue` if the value's footprint cannot be measured
    /// - `OutOfMemory` if usage after the write would exceed the ceiling; the
    ///   store is left unchanged
    pub fn set(&self, key: impl Into<String>, value: V, ttl: impl Into<Ttl>) -> Result<()> {
        let key = key.into();
        let ttl = ttl.into();
        let footprint = footprint_of(&value)?;
        let value_size = to_bytes(footprint);

        let mut table = self.inner.table.write();
        let incr = match table.entries.get(&key) {
            Some(previous) => value_size - to_bytes(previous.footprint()),
            None => to_bytes(key.len() as u64).saturating_add(value_size),
        };

        if table.memory_usage.saturating_add(incr) > table.max_memory {
            self.inner.stats.record_rejected_write();
            warn!(
                key = %key,
                requested = incr,
                usage = table.memory_usage,
                max_memory = table.max_memory,
                "Write rejected by max memory policy"
            );
            return Err(self
                .inner
                .policy
                .on_overflow(incr, table.memory_usage, table.max_memory));
        }

        let entry = Arc::new(Entry::new(value, ttl.expires_at(Instant::now()), footprint));
        let expires = entry.expires_at().is_some();
        table.entries.insert(key.clone(), Arc::clone(&entry));
        table.memory_usage += incr;

        let mut expiring = self.inner.expiring.lock();
        if expires {
            expiring.insert(key, entry);
        } else {
            expiring.remove(&key);
        }
        Ok(())
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns None if the key is absent or expired. An expired entry is
    /// removed on the spot.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let stale = {
            let table = self.inner.table.read();
            let Some(entry) = table.entries.get(key) else {
                self.inner.stats.record_miss();
                return None;
            };
            if !entry.is_expired_at(now) {
                self.inner.stats.record_hit();
                return Some(entry.value().clone());
            }
            Arc::clone(entry)
        };

        self.remove_expired(key, &stale);
        self.inner.stats.record_miss();
        None
    }

    /// Removes `stale` from both maps unless a writer already replaced it.
    fn remove_expired(&self, key: &str, stale: &Arc<Entry<V>>) {
        let mut table = self.inner.table.write();
        let unchanged = table
            .entries
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, stale));
        if !unchanged {
            return;
        }

        table.entries.remove(key);
        table.memory_usage -= accounted_size(key, &**stale);
        self.inner.expiring.lock().remove(key);
        self.inner.stats.record_expired(1);
        debug!(key = %key, "Lazily removed expired entry");
    }

    // == Delete ==
    /// Removes an entry by key, returning whether it was present.
    pub fn del(&self, key: &str) -> bool {
        let mut table = self.inner.table.write();
        match table.entries.remove(key) {
            Some(entry) => {
                table.memory_usage -= accounted_size(key, &*entry);
                self.inner.expiring.lock().remove(key);
                true
            }
            None => false,
        }
    }

    // == Exists ==
    /// Checks whether `key` is in the table.
    ///
    /// Expiration is not checked: an expired entry that has not been read or
    /// swept yet still counts as present.
    pub fn exists(&self, key: &str) -> bool {
        self.inner.table.read().entries.contains_key(key)
    }

    // == Flush ==
    /// Removes every entry and resets memory usage to zero.
    pub fn flush(&self) -> bool {
        let mut table = self.inner.table.write();
        let mut expiring = self.inner.expiring.lock();
        table.entries = HashMap::new();
        table.memory_usage = 0;
        *expiring = HashMap::new();
        true
    }

    // == Keys ==
    /// Returns the number of entries in the table.
    ///
    /// Approximate: expired entries count until they are read or swept.
    pub fn keys(&self) -> usize {
        self.inner.table.read().entries.len()
    }

    // == Time To Live ==
    /// Returns the remaining TTL of a live key, or None if the key is
    /// absent, expired, or never expires.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let table = self.inner.table.read();
        table
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .and_then(|entry| entry.ttl_remaining_at(now))
    }

    /// Returns the accounted bytes of all keys and values.
    pub fn memory_usage(&self) -> i64 {
        self.inner.table.read().memory_usage
    }

    /// Returns the current memory ceiling in bytes.
    pub fn max_memory(&self) -> i64 {
        self.inner.table.read().max_memory
    }

    // == Stats ==
    /// Returns current store statistics.
    pub fn stats(&self) -> StoreStats {
        let table = self.inner.table.read();
        self.inner
            .stats
            .snapshot(table.entries.len(), table.memory_usage, table.max_memory)
    }

    // == Cleanup Expired ==
    /// Runs one expiration sweep now and returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        self.inner.sweep_expired()
    }

    // == Shutdown ==
    /// Stops the background sweep task and waits for it to finish.
    ///
    /// The store stays usable; expired entries are then only removed lazily
    /// or through [`Store::cleanup_expired`].
    pub async fn shutdown(&self) {
        // Receivers may already be gone if the task has exited.
        let _ = self.inner.shutdown_tx.send(true);
        let handle = self.inner.sweeper.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
            info!("Expiration sweep stopped");
        }
    }

    /// Returns true while the background sweep task is running.
    pub fn is_sweeping(&self) -> bool {
        self.inner
            .sweeper
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    #[cfg(test)]
    pub(crate) fn take_sweeper(&self) -> Option<JoinHandle<()>> {
        self.inner.sweeper.lock().take()
    }

    /// Sum of key and footprint sizes recomputed from the table.
    #[cfg(test)]
    pub(crate) fn recomputed_usage(&self) -> i64 {
        self.inner
            .table
            .read()
            .entries
            .iter()
            .map(|(key, entry)| accounted_size(key, &**entry))
            .sum()
    }

    /// True when the expiring index holds exactly the table's expiring entries.
    #[cfg(test)]
    pub(crate) fn index_consistent(&self) -> bool {
        let table = self.inner.table.read();
        let expiring = self.inner.expiring.lock();

        let indexed_ok = expiring.iter().all(|(key, entry)| {
            table
                .entries
                .get(key)
                .is_some_and(|current| Arc::ptr_eq(current, entry))
        });
        let expiring_count = table
            .entries
            .values()
            .filter(|entry| entry.expires_at().is_some())
            .count();

        indexed_ok && expiring_count == expiring.len()
    }
}

impl<V> fmt::Debug for Store<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.inner.table.read();
        f.debug_struct("Store")
            .field("keys", &table.entries.len())
            .field("memory_usage", &table.memory_usage)
            .field("max_memory", &table.max_memory)
            .field("policy", &self.inner.policy)
            .finish()
    }
}

// == Utility Functions ==
/// Parses `size` and checks it against the host's physical memory.
fn resolve_max_memory(size: &str) -> Result<i64> {
    let requested = parse_size_string(size)?;
    let system_total = total_system_memory()?;
    check_against_system(requested, system_total)
}

fn check_against_system(requested: i64, system_total: u64) -> Result<i64> {
    if i128::from(requested) > i128::from(system_total) {
        return Err(CacheError::InvalidMaxMemory {
            requested,
            system_total,
        });
    }
    Ok(requested)
}

fn to_bytes(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Accounted cost of an entry: key bytes plus value footprint.
fn accounted_size<V>(key: &str, entry: &Entry<V>) -> i64 {
    to_bytes(key.len() as u64).saturating_add(to_bytes(entry.footprint()))
}
