//! Background expiration sweeper.
//!
//! One Tokio task per store wakes on a fixed interval and removes expired
//! entries. It lives through `Created -> Running -> Stopped` and never
//! returns to `Running`.

use std::sync::Weak;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::store::StoreInner;

/// Lifecycle state of a store's sweeper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweeperState {
    /// Never started
    Created,
    /// Sweeping on a fixed interval
    Running,
    /// Stopped for good
    Stopped,
}

pub(crate) enum Sweeper {
    Created,
    Running {
        /// Sending `true` (or dropping the sender) ends the task
        shutdown_tx: watch::Sender<bool>,
        interval: Duration,
    },
    Stopped,
}

impl Sweeper {
    pub(crate) fn state(&self) -> SweeperState {
        match self {
            Sweeper::Created => SweeperState::Created,
            Sweeper::Running { .. } => SweeperState::Running,
            Sweeper::Stopped => SweeperState::Stopped,
        }
    }
}

/// Sweep loop. Holds only a weak reference so the store can be dropped
/// while the task is parked.
pub(crate) async fn run<V>(
    store: Weak<StoreInner<V>>,
    first_tick: Instant,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = time::interval_at(first_tick, interval);
    // Ticks follow the clock; passes that run long don't queue a burst
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                // A stop that lands after the tick was picked still wins
                if *shutdown_rx.borrow() {
                    break;
                }
                let Some(inner) = store.upgrade() else {
                    break;
                };
                inner.delete_expired();
            }
        }
    }

    tracing::debug!("Sweeper task exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CacheError, Store, StoreConfig, Ttl, NO_EXPIRATION};
    use std::sync::Arc;

    fn sweeping_store(interval: Duration) -> Store<String> {
        let config = StoreConfig::default().with_sweep_interval(interval);
        Store::with_config(config).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_sweep_removes_expired_entries() {
        let store = sweeping_store(Duration::from_millis(50));
        assert_eq!(store.sweeper_state(), SweeperState::Running);

        store.set("expire1", "value1".to_string(), Ttl::millis(20));
        store.set("expire2", "value2".to_string(), Ttl::millis(20));
        store.set("keep", "value3".to_string(), NO_EXPIRATION);

        assert_eq!(store.len(), 3);

        // One interval plus a little
        tokio::time::sleep(Duration::from_millis(60)).await;

        // Removed without an explicit delete_expired call
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("keep"), Some("value3".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_sweeping() {
        let store = sweeping_store(Duration::from_millis(50));
        store.set("keep", "value".to_string(), NO_EXPIRATION);

        assert!(store.stop_sweeper());
        assert_eq!(store.sweeper_state(), SweeperState::Stopped);

        store.set("short", "value".to_string(), Ttl::millis(20));
        tokio::time::sleep(Duration::from_millis(120)).await;

        // Still physically present, but invisible to reads
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("short"), None);

        // The store itself keeps working
        store.set("after", "value".to_string(), NO_EXPIRATION);
        assert_eq!(store.get("after"), Some("value".to_string()));
        assert_eq!(store.delete_expired(), 1);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let store = sweeping_store(Duration::from_millis(10));

        assert!(store.stop_sweeper());
        assert!(!store.stop_sweeper());
        assert!(!store.stop_sweeper());
        assert_eq!(store.sweeper_state(), SweeperState::Stopped);
    }

    #[tokio::test]
    async fn test_stop_before_start_does_nothing() {
        let store: Store<String> = Store::new();

        assert!(!store.stop_sweeper());
        assert_eq!(store.sweeper_state(), SweeperState::Created);

        store.start_sweeper(Duration::from_millis(10)).unwrap();
        assert_eq!(store.sweeper_state(), SweeperState::Running);
    }

    #[tokio::test]
    async fn test_cannot_restart_after_stop() {
        let store = sweeping_store(Duration::from_millis(10));

        assert_eq!(
            store.start_sweeper(Duration::from_millis(10)),
            Err(CacheError::SweeperAlreadyRunning)
        );

        store.stop_sweeper();
        assert_eq!(
            store.start_sweeper(Duration::from_millis(10)),
            Err(CacheError::SweeperStopped)
        );
        assert_eq!(store.sweeper_state(), SweeperState::Stopped);
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let store: Store<String> = Store::new();

        assert_eq!(store.start_sweeper(Duration::ZERO), Err(CacheError::InvalidInterval));
        assert_eq!(store.start_sweeper(Duration::MAX), Err(CacheError::InvalidInterval));
        assert_eq!(store.sweeper_state(), SweeperState::Created);
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let store: Store<String> = Store::new();

        assert_eq!(
            store.start_sweeper(Duration::from_millis(10)),
            Err(CacheError::NoRuntime)
        );
        assert_eq!(store.sweeper_state(), SweeperState::Created);

        let config = StoreConfig::default().with_sweep_interval(Duration::from_secs(1));
        assert!(matches!(
            Store::<String>::with_config(config),
            Err(CacheError::NoRuntime)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clones_share_one_sweeper() {
        let store1 = sweeping_store(Duration::from_millis(50));
        let store2 = store1.clone();

        assert_eq!(
            store2.start_sweeper(Duration::from_millis(50)),
            Err(CacheError::SweeperAlreadyRunning)
        );

        store2.set("short", "value".to_string(), Ttl::millis(10));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store1.is_empty());

        assert!(store2.stop_sweeper());
        assert_eq!(store1.sweeper_state(), SweeperState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_sweep_timed_from_start() {
        let store = sweeping_store(Duration::from_millis(50));

        // The task is first polled here, 40ms after start
        tokio::time::advance(Duration::from_millis(40)).await;
        store.set("short", "value".to_string(), Ttl::millis(1));

        tokio::time::sleep(Duration::from_millis(15)).await;
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_due_tick_after_stop_does_not_sweep() {
        let store: Store<String> = Store::new();
        store.set_expired("stale", "value".to_string());

        // Stop already observed, tick already due: only the tick arm can fire
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();
        shutdown_rx.borrow_and_update();

        let task = tokio::spawn(run(
            Arc::downgrade(&store.inner),
            Instant::now(),
            Duration::from_millis(10),
            shutdown_rx,
        ));
        task.await.unwrap();

        assert_eq!(store.len(), 1);
        drop(shutdown_tx);
    }

    #[tokio::test]
    async fn test_sweeper_does_not_keep_store_alive() {
        let store = sweeping_store(Duration::from_millis(10));
        let weak = Arc::downgrade(&store.inner);

        drop(store);
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(weak.upgrade().is_none());
    }

    #[tokio::test]
    async fn test_multiple_stores_independent_sweepers() {
        let store1 = sweeping_store(Duration::from_millis(20));
        let store2 = sweeping_store(Duration::from_secs(60));

        store1.set_expired("expire", "value".to_string());
        store2.set_expired("expire", "value".to_string());

        // Wait for store1's sweep to run
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(store1.len(), 0);
        // store2's sweeper hasn't ticked yet
        assert_eq!(store2.len(), 1);
        assert_eq!(store2.get("expire"), None);
    }
}
