//! Expiration Sweep Task
//!
//! Background task that periodically removes expired entries from a store.

use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::StoreInner;

/// Spawns a background task that sweeps expired entries every `interval`.
///
/// The task holds only a weak reference to the store, so it exits once the
/// last store handle is dropped. It also exits when `shutdown_rx` receives
/// `true` or its sender goes away.
///
/// # Returns
/// A JoinHandle for the spawned task, awaited by `Store::shutdown`.
pub(crate) fn spawn_sweep_task<V>(
    runtime: &Handle,
    store: Weak<StoreInner<V>>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    V: Send + Sync + 'static,
{
    runtime.spawn(async move {
        info!(interval = ?interval, "Starting expiration sweep task");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let Some(inner) = store.upgrade() else {
                        break;
                    };
                    let removed = inner.sweep_expired();
                    drop(inner);

                    if removed > 0 {
                        info!("Expiration sweep: removed {} expired entries", removed);
                    } else {
                        debug!("Expiration sweep: no expired entries found");
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        debug!("Expiration sweep task exiting");
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{Store, StoreConfig};

    fn sweeping_store(interval_ms: u64) -> Store<String> {
        let config = StoreConfig::default().with_sweep_interval(Duration::from_millis(interval_ms));
        Store::with_config(config).unwrap()
    }

    #[tokio::test]
    async fn test_sweep_task_removes_expired_entries() {
        let store = sweeping_store(50);

        store
            .set("expire_soon", "value".to_string(), Duration::from_millis(20))
            .unwrap();

        // Wait for the entry to expire and a sweep to run
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(!store.exists("expire_soon"), "Expired entry should have been swept");
        assert_eq!(store.memory_usage(), 0);
        assert_eq!(store.stats().expired, 1);
    }

    #[tokio::test]
    async fn test_sweep_task_preserves_valid_entries() {
        let store = sweeping_store(50);

        store
            .set("long_lived", "value".to_string(), Duration::from_secs(3600))
            .unwrap();
        store.set("forever", "value".to_string(), Duration::ZERO).unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(store.get("long_lived").as_deref(), Some("value"));
        assert_eq!(store.get("forever").as_deref(), Some("value"));
    }

    #[tokio::test]
    async fn test_sweep_task_stops_on_shutdown() {
        let store = sweeping_store(50);
        store.shutdown().await;

        store
            .set("expire_soon", "value".to_string(), Duration::from_millis(20))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Nothing sweeps any more, so the expired entry is still counted
        assert!(store.exists("expire_soon"));
        assert!(store.get("expire_soon").is_none());
    }

    #[tokio::test]
    async fn test_sweep_task_exits_when_store_dropped() {
        let store = sweeping_store(20);
        let handle = store
            .take_sweeper()
            .expect("sweep task should be running");

        drop(store);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweep task should exit after the store is dropped")
            .unwrap();
    }
}
