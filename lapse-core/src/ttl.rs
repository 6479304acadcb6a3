use std::time::Duration;
use tokio::time::Instant;

/// Time-to-live requested for a single `set`/`add`/`replace` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Ttl {
    /// Use the store's configured default TTL
    #[default]
    Default,
    /// The entry never expires
    Never,
    /// The entry expires this long after insertion
    After(Duration),
}

/// Sentinel asking the store to apply its configured default TTL.
pub const DEFAULT_EXPIRATION: Ttl = Ttl::Default;

/// Sentinel for entries that never expire.
pub const NO_EXPIRATION: Ttl = Ttl::Never;

impl From<Duration> for Ttl {
    fn from(duration: Duration) -> Self {
        Ttl::After(duration)
    }
}

impl Ttl {
    /// Shorthand for `Ttl::After(Duration::from_secs(secs))`.
    pub fn secs(secs: u64) -> Self {
        Ttl::After(Duration::from_secs(secs))
    }

    /// Shorthand for `Ttl::After(Duration::from_millis(millis))`.
    pub fn millis(millis: u64) -> Self {
        Ttl::After(Duration::from_millis(millis))
    }

    /// Resolves this TTL to an absolute deadline measured from `now`.
    ///
    /// `None` means the entry never expires. A zero `After` duration is
    /// treated as the default sentinel. Deadlines that would overflow the
    /// clock saturate to "never".
    pub fn deadline(self, default_ttl: Option<Duration>, now: Instant) -> Option<Instant> {
        let ttl = match self {
            Ttl::Never => return None,
            Ttl::After(d) if !d.is_zero() => d,
            Ttl::Default | Ttl::After(_) => default_ttl?,
        };

        if ttl.is_zero() {
            return None;
        }
        now.checked_add(ttl)
    }
}
