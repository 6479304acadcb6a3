use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable holding the default TTL in milliseconds
pub const DEFAULT_TTL_ENV: &str = "LAPSE_DEFAULT_TTL_MS";

/// Environment variable holding the sweep interval in milliseconds
pub const SWEEP_INTERVAL_ENV: &str = "LAPSE_SWEEP_INTERVAL_MS";

/// Configuration for a [`Store`](crate::Store)
///
/// # Example
///
/// ```rust
/// use lapse_core::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::default()
///     .with_default_ttl(Duration::from_secs(300))
///     .with_sweep_interval(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// TTL applied when callers pass [`Ttl::Default`](crate::Ttl::Default)
    /// (default: `None`, entries never expire)
    pub default_ttl: Option<Duration>,
    /// Interval between sweep passes. When set, the sweeper starts as soon
    /// as the store is built (default: `None`, no sweeper)
    pub sweep_interval: Option<Duration>,
}

impl StoreConfig {
    /// Creates a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the TTL used for [`Ttl::Default`](crate::Ttl::Default)
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Makes [`Ttl::Default`](crate::Ttl::Default) mean "never expire"
    pub fn without_default_ttl(mut self) -> Self {
        self.default_ttl = None;
        self
    }

    /// Sets the sweep interval
    ///
    /// This determines how often the background task runs to remove expired entries.
    ///
    /// ```rust
    /// use lapse_core::StoreConfig;
    /// use std::time::Duration;
    ///
    /// // Sweep every 30 seconds
    /// let config = StoreConfig::default()
    ///     .with_sweep_interval(Duration::from_secs(30));
    /// ```
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Create a configuration from environment variables.
    ///
    /// Reads:
    /// - `LAPSE_DEFAULT_TTL_MS` - Default TTL in milliseconds (unset: never expire)
    /// - `LAPSE_SWEEP_INTERVAL_MS` - Sweep interval in milliseconds (unset: no sweeper)
    ///
    /// Values that fail to parse are ignored.
    pub fn from_env() -> Self {
        Self {
            default_ttl: millis_from_env(DEFAULT_TTL_ENV),
            sweep_interval: millis_from_env(SWEEP_INTERVAL_ENV),
        }
    }
}

fn millis_from_env(var: &str) -> Option<Duration> {
    parse_millis(var, &std::env::var(var).ok()?)
}

fn parse_millis(var: &str, raw: &str) -> Option<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a millisecond count", var, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.default_ttl, None);
        assert_eq!(config.sweep_interval, None);
    }

    #[test]
    fn test_builder_pattern_chaining() {
        let config = StoreConfig::new()
            .with_default_ttl(Duration::from_secs(120))
            .with_sweep_interval(Duration::from_secs(30));
        assert_eq!(config.default_ttl, Some(Duration::from_secs(120)));
        assert_eq!(config.sweep_interval, Some(Duration::from_secs(30)));

        let config = config.without_default_ttl();
        assert_eq!(config.default_ttl, None);
    }

    #[test]
    fn test_parse_millis() {
        assert_eq!(
            parse_millis(DEFAULT_TTL_ENV, "1500"),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(
            parse_millis(SWEEP_INTERVAL_ENV, " 250 "),
            Some(Duration::from_millis(250))
        );
        assert_eq!(parse_millis(SWEEP_INTERVAL_ENV, "not-a-number"), None);
        assert_eq!(parse_millis(SWEEP_INTERVAL_ENV, "-5"), None);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"sweep_interval":{"secs":5,"nanos":0}}"#).unwrap();
        assert_eq!(config.default_ttl, None);
        assert_eq!(config.sweep_interval, Some(Duration::from_secs(5)));
    }
}
