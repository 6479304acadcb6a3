//! # Lapse Core
//!
//! An in-process key-value cache with per-entry TTL (time-to-live) support.
//!
//! ## Features
//!
//! - Generic over the stored value type
//! - One reader/writer lock around the whole map: reads run in parallel,
//!   writes are exclusive
//! - Expiry checked on every read (expired entries are never returned)
//! - Optional background sweeper that periodically removes expired entries
//!
//! ## Example
//!
//! ```rust,no_run
//! use lapse_core::{Store, StoreConfig, Ttl, NO_EXPIRATION};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), lapse_core::CacheError> {
//!     // Entries default to a 60 second TTL, swept every 30 seconds
//!     let config = StoreConfig::default()
//!         .with_default_ttl(Duration::from_secs(60))
//!         .with_sweep_interval(Duration::from_secs(30));
//!     let store: Store<String> = Store::with_config(config)?;
//!
//!     // Store a value with the default TTL
//!     store.set("user:123", "John Doe".to_string(), Ttl::Default);
//!
//!     // Insert only if absent, never expires
//!     store.add("config", "v1".to_string(), NO_EXPIRATION)?;
//!
//!     // Retrieve the value
//!     if let Some(value) = store.get("user:123") {
//!         println!("User: {}", value);
//!     }
//!
//!     // Manual sweep (also done by the background task)
//!     let removed_count = store.delete_expired();
//!
//!     store.stop_sweeper();
//!     Ok(())
//! }
//! ```

mod config;
mod entry;
mod error;
mod store;
mod sweeper;
mod ttl;

pub use config::{StoreConfig, DEFAULT_TTL_ENV, SWEEP_INTERVAL_ENV};
pub use error::CacheError;
pub use store::Store;
pub use sweeper::SweeperState;
pub use ttl::{Ttl, DEFAULT_EXPIRATION, NO_EXPIRATION};

/// Clock used for deadlines. Follows Tokio's paused clock in tests.
pub use tokio::time::Instant;
