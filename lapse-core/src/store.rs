use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::config::StoreConfig;
use crate::entry::Entry;
use crate::error::CacheError;
use crate::sweeper::{self, Sweeper, SweeperState};
use crate::ttl::Ttl;

/// Truncates a key for logging
pub(crate) fn truncate_key_for_log(key: &str) -> String {
    const MAX_LOG_LEN: usize = 16;
    if key.chars().count() <= MAX_LOG_LEN {
        key.to_string()
    } else {
        format!("{}...", key.chars().take(MAX_LOG_LEN).collect::<String>())
    }
}

/// Shared state behind every [`Store`] handle
pub(crate) struct StoreInner<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
    default_ttl: Option<Duration>,
    sweeper: Mutex<Sweeper>,
}

impl<V> StoreInner<V> {
    /// Removes every entry whose deadline has passed. Returns the number removed.
    pub(crate) fn delete_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();

        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - entries.len();
        drop(entries);

        if removed > 0 {
            tracing::debug!("Swept {} expired entries", removed);
        }
        removed
    }
}

/// Thread-safe in-memory key-value store with per-entry TTL
///
/// All entries live in one map behind a single reader/writer lock: `get`
/// and the other lookups share the read side, every mutation takes the
/// write side for the duration of one map operation.
///
/// Expiry is checked on every read, so an expired entry is invisible to
/// callers as soon as its deadline passes. Reads never delete; the memory is
/// reclaimed by [`delete_expired`](Store::delete_expired), which the
/// optional background sweeper calls on a fixed interval.
///
/// `Store` is a cheap handle: clones share the same entries and sweeper.
///
/// # Example
///
/// ```rust,no_run
/// use lapse_core::{Store, StoreConfig, Ttl, NO_EXPIRATION};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), lapse_core::CacheError> {
///     let config = StoreConfig::default()
///         .with_default_ttl(Duration::from_secs(300))
///         .with_sweep_interval(Duration::from_secs(30));
///     let store: Store<String> = Store::with_config(config)?;
///
///     store.set("session", "abc".to_string(), Ttl::Default);
///     store.add("pinned", "xyz".to_string(), NO_EXPIRATION)?;
///
///     assert_eq!(store.get("session"), Some("abc".to_string()));
///     Ok(())
/// }
/// ```
pub struct Store<V> {
    pub(crate) inner: Arc<StoreInner<V>>,
}

impl<V> Clone for Store<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Store<V> {
    /// Creates a store whose default TTL never expires, with no sweeper
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates a store with the given default TTL, with no sweeper
    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self::build(Some(default_ttl))
    }

    fn build(default_ttl: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                entries: RwLock::new(HashMap::new()),
                default_ttl,
                sweeper: Mutex::new(Sweeper::Created),
            }),
        }
    }

    /// Returns the TTL applied for [`Ttl::Default`]. `None` means never expire.
    pub fn default_ttl(&self) -> Option<Duration> {
        self.inner.default_ttl
    }

    fn deadline(&self, ttl: Ttl) -> Option<Instant> {
        ttl.deadline(self.inner.default_ttl, Instant::now())
    }

    fn is_live(entries: &HashMap<String, Entry<V>>, key: &str, now: Instant) -> bool {
        entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    /// Stores a value under `key`, replacing any previous entry
    ///
    /// The deadline is fixed here as "now + TTL" and never refreshed by reads.
    ///
    /// # TTL Semantics
    ///
    /// - [`Ttl::Default`] applies the store's default TTL.
    /// - [`Ttl::Never`] stores an entry that never expires.
    /// - [`Ttl::After`] expires the entry after the given duration. A zero
    ///   duration is treated as [`Ttl::Default`].
    pub fn set(&self, key: impl Into<String>, value: V, ttl: impl Into<Ttl>) {
        let entry = Entry::new(value, self.deadline(ttl.into()));
        self.inner.entries.write().insert(key.into(), entry);
    }

    /// Stores a value only if no live entry exists for `key`
    ///
    /// An expired entry that has not been swept yet counts as absent and is
    /// overwritten. The check and the insert happen under one write lock.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::KeyExists`] if a live entry is present. The
    /// store is left unchanged.
    pub fn add(&self, key: impl Into<String>, value: V, ttl: impl Into<Ttl>) -> Result<(), CacheError> {
        let key = key.into();
        let ttl = ttl.into();
        let mut entries = self.inner.entries.write();

        let now = Instant::now();
        if Self::is_live(&entries, &key, now) {
            tracing::trace!("ADD rejected, {} is live", truncate_key_for_log(&key));
            return Err(CacheError::KeyExists(key));
        }

        let entry = Entry::new(value, ttl.deadline(self.inner.default_ttl, now));
        entries.insert(key, entry);
        Ok(())
    }

    /// Stores a value only if a live entry already exists for `key`
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::KeyNotFound`] if the key is absent or expired.
    pub fn replace(&self, key: impl Into<String>, value: V, ttl: impl Into<Ttl>) -> Result<(), CacheError> {
        let key = key.into();
        let ttl = ttl.into();
        let mut entries = self.inner.entries.write();

        let now = Instant::now();
        if !Self::is_live(&entries, &key, now) {
            return Err(CacheError::KeyNotFound(key));
        }

        let entry = Entry::new(value, ttl.deadline(self.inner.default_ttl, now));
        entries.insert(key, entry);
        Ok(())
    }

    /// Deletes a key from the store
    ///
    /// Returns `true` if the key existed (regardless of expiration), `false` otherwise.
    #[must_use = "returns whether the key existed"]
    pub fn delete(&self, key: &str) -> bool {
        self.inner.entries.write().remove(key).is_some()
    }

    /// Removes every expired entry from the store
    ///
    /// Returns the number of entries removed. Entries that never expire are
    /// kept. The background sweeper calls this on every tick.
    pub fn delete_expired(&self) -> usize {
        self.inner.delete_expired()
    }

    /// Removes all entries, expired or not. Returns how many were removed.
    pub fn flush(&self) -> usize {
        let mut entries = self.inner.entries.write();
        let count = entries.len();
        entries.clear();
        count
    }

    /// Checks whether a live entry exists for `key`
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        let entries = self.inner.entries.read();
        Self::is_live(&entries, key, Instant::now())
    }

    /// Returns all keys with live entries, in no particular order
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        self.inner
            .entries
            .read()
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Returns the number of entries in the store (including expired ones
    /// that have not been swept yet)
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    /// Returns `true` if the store holds no entries at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }

    /// Stops the background sweeper
    ///
    /// Returns `true` if this call stopped a running sweeper. Calling it
    /// again, or before the sweeper was started, does nothing and returns
    /// `false`. A stopped sweeper cannot be restarted; the store itself
    /// stays fully usable.
    pub fn stop_sweeper(&self) -> bool {
        let mut state = self.inner.sweeper.lock();
        let Sweeper::Running { shutdown_tx, interval } = &*state else {
            return false;
        };

        let _ = shutdown_tx.send(true);
        tracing::info!("Sweeper stopped (interval: {:?})", interval);
        *state = Sweeper::Stopped;
        true
    }

    /// Returns the lifecycle state of the background sweeper
    pub fn sweeper_state(&self) -> SweeperState {
        self.inner.sweeper.lock().state()
    }

    /// Stores an entry that is already expired (for testing purposes)
    #[cfg(test)]
    pub(crate) fn set_expired(&self, key: impl Into<String>, value: V) {
        let expires_at = Instant::now() - Duration::from_secs(1);
        self.inner
            .entries
            .write()
            .insert(key.into(), Entry::new(value, Some(expires_at)));
    }
}

impl<V: Clone> Store<V> {
    /// Retrieves a value by key
    ///
    /// Returns `None` if the key doesn't exist or has expired. Expired
    /// entries are left in place for the sweeper.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_with_expiration(key).map(|(value, _)| value)
    }

    /// Retrieves a live value together with its deadline
    ///
    /// The deadline is `None` for entries that never expire.
    pub fn get_with_expiration(&self, key: &str) -> Option<(V, Option<Instant>)> {
        let entries = self.inner.entries.read();
        let entry = entries.get(key)?;

        if entry.is_expired() {
            return None;
        }
        Some((entry.value().clone(), entry.expires_at()))
    }
}

impl<V: Send + Sync + 'static> Store<V> {
    /// Creates a store from a configuration
    ///
    /// Starts the background sweeper right away when
    /// [`StoreConfig::sweep_interval`] is set.
    ///
    /// # Errors
    ///
    /// Fails with the same errors as [`start_sweeper`](Store::start_sweeper)
    /// when a sweep interval is configured.
    pub fn with_config(config: StoreConfig) -> Result<Self, CacheError> {
        let store = Self::build(config.default_ttl);
        if let Some(interval) = config.sweep_interval {
            store.start_sweeper(interval)?;
        }
        Ok(store)
    }

    /// Starts the background sweeper
    ///
    /// Every `interval` the sweeper calls
    /// [`delete_expired`](Store::delete_expired). The first pass runs one
    /// full interval after start. Dropping every handle to the store also
    /// ends the sweeper.
    ///
    /// # Errors
    ///
    /// - [`CacheError::InvalidInterval`] if `interval` is zero or too large
    ///   for the clock
    /// - [`CacheError::NoRuntime`] if called outside a Tokio runtime
    /// - [`CacheError::SweeperAlreadyRunning`] if a sweeper is running
    /// - [`CacheError::SweeperStopped`] if the sweeper was already stopped
    pub fn start_sweeper(&self, interval: Duration) -> Result<(), CacheError> {
        if interval.is_zero() || Instant::now().checked_add(interval).is_none() {
            return Err(CacheError::InvalidInterval);
        }

        let mut state = self.inner.sweeper.lock();
        match *state {
            Sweeper::Created => {}
            Sweeper::Running { .. } => return Err(CacheError::SweeperAlreadyRunning),
            Sweeper::Stopped => return Err(CacheError::SweeperStopped),
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| CacheError::NoRuntime)?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        // Timed from this call, not from the task's first poll
        let first_tick = Instant::now() + interval;
        runtime.spawn(sweeper::run(
            Arc::downgrade(&self.inner),
            first_tick,
            interval,
            shutdown_rx,
        ));

        *state = Sweeper::Running { shutdown_tx, interval };
        tracing::info!("Sweeper started (interval: {:?})", interval);
        Ok(())
    }
}

impl<V> Default for Store<V> {
    fn default() -> Self {
        Self::new()
    }
}
