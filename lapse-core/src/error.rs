//! Error types for the store.

use thiserror::Error;

/// Errors returned by [`Store`](crate::Store) operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// `add` found a live entry for the key
    #[error("Item {0} already exists")]
    KeyExists(String),

    /// `replace` found no live entry for the key
    #[error("Item {0} doesn't exist")]
    KeyNotFound(String),

    /// The sweep interval is zero or beyond the clock's range
    #[error("Sweep interval must be greater than zero and representable by the clock")]
    InvalidInterval,

    /// The sweeper was started outside of a Tokio runtime
    #[error("Sweeper requires a Tokio runtime; start it from within a runtime context")]
    NoRuntime,

    /// `start_sweeper` was called while a sweeper is already running
    #[error("Sweeper is already running")]
    SweeperAlreadyRunning,

    /// `start_sweeper` was called after the sweeper was stopped
    #[error("Sweeper has been stopped and cannot be restarted")]
    SweeperStopped,
}

impl CacheError {
    /// Returns `true` if `add` was rejected because the key is live.
    pub fn is_key_exists(&self) -> bool {
        matches!(self, CacheError::KeyExists(_))
    }

    /// Returns `true` if `replace` was rejected because the key is absent.
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, CacheError::KeyNotFound(_))
    }
}
