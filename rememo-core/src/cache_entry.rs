use std::time::{Duration, Instant};

/// Internal wrapper that pairs a cached value with its expiration deadline.
///
/// Each cached value is wrapped in a `CacheEntry` which records the absolute
/// `Instant` at which it goes stale. A `None` deadline is the "never expires"
/// sentinel: staleness is only ever evaluated when a deadline exists, never by
/// comparing elapsed time against a zero duration.
///
/// # Type Parameters
///
/// * `R` - The type of the cached value
///
/// # Fields
///
/// * `value` - The actual cached value
/// * `expires_at` - Deadline after which the entry is treated as a miss,
///   or `None` for entries that never expire
///
/// # Examples
///
/// ```
/// use rememo_core::CacheEntry;
/// use std::time::Duration;
///
/// // Never expires
/// let entry = CacheEntry::new(42, None);
/// assert_eq!(entry.value, 42);
/// assert!(!entry.is_stale());
///
/// // Expires 50ms after creation
/// let entry = CacheEntry::new(42, Some(Duration::from_millis(50)));
/// assert!(!entry.is_stale());
/// ```
#[derive(Clone)]
pub struct CacheEntry<R> {
    pub value: R,
    pub expires_at: Option<Instant>,
}

impl<R> CacheEntry<R> {
    /// Creates a new cache entry, stamping the deadline at creation time.
    ///
    /// # Arguments
    ///
    /// * `value` - The value to cache
    /// * `duration` - How long the entry remains valid; `None` means the
    ///   entry never expires
    pub fn new(value: R, duration: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: duration.map(|d| Instant::now() + d),
        }
    }

    /// Returns true once the entry's deadline has passed.
    ///
    /// Entries without a deadline are never stale. A stale entry is treated
    /// exactly like a miss by the stores: it is removed and recomputed.
    ///
    /// # Examples
    ///
    /// ```
    /// use rememo_core::CacheEntry;
    /// use std::thread;
    /// use std::time::Duration;
    ///
    /// let entry = CacheEntry::new("data", Some(Duration::from_millis(20)));
    /// assert!(!entry.is_stale());
    ///
    /// thread::sleep(Duration::from_millis(30));
    /// assert!(entry.is_stale());
    ///
    /// // No deadline means never stale
    /// let forever = CacheEntry::new("data", None);
    /// thread::sleep(Duration::from_millis(5));
    /// assert!(!forever.is_stale());
    /// ```
    pub fn is_stale(&self) -> bool {
        match self.expires_at {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }
}
