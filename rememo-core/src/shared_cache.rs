use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;

use crate::{CacheEntry, EmptyResult, MemoKey};

#[cfg(feature = "stats")]
use crate::CacheStats;

/// The single store shared by every caller of a wrapped function.
///
/// This is the store behind free functions and methods opting into
/// static-method semantics (`scope = "shared"`): one map for the whole
/// wrapped function, all callers observing the same entries.
///
/// The store never evicts. Entries leave it in exactly three ways: they go
/// stale and are dropped on access, they are overwritten by a recomputation
/// after going stale, or they are explicitly removed with
/// [`SharedCache::remove`] or [`SharedCache::clear`].
///
/// # Type Parameters
///
/// * `R` - The cached return type. Must be `'static` to live in the static
///   map and `Clone` for retrieval; readers always receive a clone and never
///   mutate stored entries.
///
/// # Thread Safety
///
/// The map sits behind a `parking_lot::RwLock`, so concurrent cache hits
/// proceed in parallel and only writes serialize. The lock is never held
/// while the wrapped function runs, which keeps recursive memoized functions
/// (the classic fibonacci) deadlock-free; under OS threads two callers may
/// therefore race to compute the same key, and the later write wins. The
/// single-flight guarantee for pending results lives in `rememo-async`.
///
/// # Examples
///
/// ```
/// use once_cell::sync::Lazy;
/// use parking_lot::RwLock;
/// use std::collections::HashMap;
/// use rememo_core::{CacheEntry, MemoKey, SharedCache};
///
/// static MAP: Lazy<RwLock<HashMap<MemoKey, CacheEntry<i32>>>> =
///     Lazy::new(|| RwLock::new(HashMap::new()));
/// # #[cfg(feature = "stats")]
/// static STATS: Lazy<rememo_core::CacheStats> = Lazy::new(rememo_core::CacheStats::new);
///
/// let cache = SharedCache::new(
///     &MAP,
///     None,  // never expires
///     false, // do not cache empty results
///     # #[cfg(feature = "stats")]
///     &STATS,
/// );
///
/// let key = MemoKey::text("answer");
/// cache.insert(&key, 42);
/// assert_eq!(cache.get(&key), Some(42));
/// ```
pub struct SharedCache<R: 'static> {
    pub map: &'static Lazy<RwLock<HashMap<MemoKey, CacheEntry<R>>>>,
    /// How long entries remain valid; `None` is the never-expires sentinel.
    pub duration: Option<Duration>,
    /// Whether empty results are written to the store.
    pub cache_empty: bool,
    #[cfg(feature = "stats")]
    pub stats: &'static Lazy<CacheStats>,
}

impl<R: Clone + EmptyResult + 'static> SharedCache<R> {
    /// Creates a store handle over the function's static map.
    ///
    /// # Arguments
    ///
    /// * `map` - Static reference to the RwLock-protected entry map
    /// * `duration` - Entry lifetime; `None` means entries never expire
    /// * `cache_empty` - Whether empty results are stored
    /// * `stats` - Static hit/miss counters (stats feature only)
    pub fn new(
        map: &'static Lazy<RwLock<HashMap<MemoKey, CacheEntry<R>>>>,
        duration: Option<Duration>,
        cache_empty: bool,
        #[cfg(feature = "stats")] stats: &'static Lazy<CacheStats>,
    ) -> Self {
        Self {
            map,
            duration,
            cache_empty,
            #[cfg(feature = "stats")]
            stats,
        }
    }

    /// Looks up a cached value.
    ///
    /// A stale entry is removed and reported as a miss, so the caller
    /// recomputes and the replacement entry gets a fresh deadline.
    ///
    /// # Returns
    ///
    /// * `Some(value)` - entry exists and has not passed its deadline
    /// * `None` - no entry, or the entry went stale
    pub fn get(&self, key: &MemoKey) -> Option<R> {
        let mut stale = false;

        let result = {
            let m = self.map.read();
            match m.get(key) {
                Some(entry) if entry.is_stale() => {
                    stale = true;
                    None
                }
                Some(entry) => Some(entry.value.clone()),
                None => None,
            }
        };

        if stale {
            self.remove_stale(key);
            #[cfg(feature = "stats")]
            self.stats.record_miss();
            return None;
        }

        #[cfg(feature = "stats")]
        {
            if result.is_some() {
                self.stats.record_hit();
            } else {
                self.stats.record_miss();
            }
        }

        result
    }

    /// Writes a freshly computed value, honoring the empty-result policy.
    ///
    /// An empty result (per [`EmptyResult`]) is skipped unless the store was
    /// configured with `cache_empty = true`; the caller returns the computed
    /// value directly instead of re-reading the store, so a skipped insert
    /// simply means the next call recomputes.
    pub fn insert(&self, key: &MemoKey, value: R) {
        if !self.cache_empty && value.is_empty_result() {
            return;
        }
        let entry = CacheEntry::new(value, self.duration);
        self.map.write().insert(key.clone(), entry);
    }

    /// Drops the entry only if it is still stale once the write lock is
    /// held. Between the read that saw a stale entry and this write, another
    /// thread may have stored a fresh replacement, which must survive.
    fn remove_stale(&self, key: &MemoKey) {
        let mut m = self.map.write();
        if let Some(entry) = m.get(key) {
            if entry.is_stale() {
                m.remove(key);
            }
        }
    }

    /// Removes a single entry, if present.
    pub fn remove(&self, key: &MemoKey) {
        self.map.write().remove(key);
    }

    /// Drops every entry in the store.
    pub fn clear(&self) {
        self.map.write().clear();
    }

    /// Number of live entries, stale ones included until they are touched.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    /// True when the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

/// `Result`-aware insertion: failures are never cached.
///
/// Errors are typically transient, and the failure-handling contract says a
/// failed computation must leave no entry behind so the next call retries.
/// `Ok` values still go through the empty-result policy, so `Ok(None)` from
/// a `Result<Option<T>, E>` function is skipped unless empty results are
/// cached.
impl<T, E> SharedCache<Result<T, E>>
where
    T: Clone + EmptyResult + 'static,
    E: Clone + 'static,
{
    /// Inserts the result only when it is `Ok`.
    pub fn insert_result(&self, key: &MemoKey, value: &Result<T, E>) {
        if let Ok(v) = value {
            self.insert(key, Ok(v.clone()));
        }
    }
}
