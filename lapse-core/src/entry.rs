use tokio::time::Instant;

/// Represents a stored value with its expiration time
#[derive(Debug)]
pub(crate) struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    /// Creates a new entry with the given value and expiration time
    ///
    /// `None` means the entry never expires.
    pub(crate) fn new(value: V, expires_at: Option<Instant>) -> Self {
        Self { value, expires_at }
    }

    /// Returns a reference to the stored value
    pub(crate) fn value(&self) -> &V {
        &self.value
    }

    /// Returns the expiration time, or `None` if the entry never expires
    pub(crate) fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Checks if this entry has expired
    pub(crate) fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Checks if this entry had expired as of `now`
    ///
    /// An entry expires strictly after its deadline has passed.
    pub(crate) fn is_expired_at(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(deadline) if now > deadline)
    }
}
