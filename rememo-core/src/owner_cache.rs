use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;

use crate::{CacheEntry, EmptyResult, MemoKey, OwnerToken};

#[cfg(feature = "stats")]
use crate::CacheStats;

/// Per-owner partitioned store: instance-method semantics.
///
/// Where [`crate::SharedCache`] gives a wrapped function one key space,
/// `OwnerCache` gives it one key space *per distinct owner identity*. Two
/// owners calling with identical arguments - identical derived keys - never
/// observe each other's cached values.
///
/// Partitions are created lazily the first time an owner calls through the
/// wrapper. The [`OwnerToken`] keying a partition is a plain integer, so the
/// store never keeps an owner alive; what it cannot do is notice the owner
/// dying, so a partition outlives its owner until [`OwnerCache::remove_owner`]
/// reclaims it or the process ends.
///
/// # Type Parameters
///
/// * `R` - The cached return type, `'static` + `Clone` as in `SharedCache`.
///
/// # Examples
///
/// ```
/// use once_cell::sync::Lazy;
/// use parking_lot::RwLock;
/// use std::collections::HashMap;
/// use rememo_core::{CacheEntry, MemoKey, OwnerCache, OwnerToken};
///
/// static MAP: Lazy<RwLock<HashMap<OwnerToken, HashMap<MemoKey, CacheEntry<i32>>>>> =
///     Lazy::new(|| RwLock::new(HashMap::new()));
/// # #[cfg(feature = "stats")]
/// static STATS: Lazy<rememo_core::CacheStats> = Lazy::new(rememo_core::CacheStats::new);
///
/// let cache = OwnerCache::new(
///     &MAP,
///     None,
///     false,
///     # #[cfg(feature = "stats")]
///     &STATS,
/// );
///
/// let first = OwnerToken::new(1);
/// let second = OwnerToken::new(2);
/// let key = MemoKey::text("5");
///
/// cache.insert(first, &key, 10);
/// assert_eq!(cache.get(first, &key), Some(10));
/// // Same key, different owner: independent bucket.
/// assert_eq!(cache.get(second, &key), None);
/// ```
pub struct OwnerCache<R: 'static> {
    pub map: &'static Lazy<RwLock<HashMap<OwnerToken, HashMap<MemoKey, CacheEntry<R>>>>>,
    /// How long entries remain valid; `None` is the never-expires sentinel.
    pub duration: Option<Duration>,
    /// Whether empty results are written to the store.
    pub cache_empty: bool,
    #[cfg(feature = "stats")]
    pub stats: &'static Lazy<CacheStats>,
}

impl<R: Clone + EmptyResult + 'static> OwnerCache<R> {
    /// Creates a store handle over the function's static partition map.
    pub fn new(
        map: &'static Lazy<RwLock<HashMap<OwnerToken, HashMap<MemoKey, CacheEntry<R>>>>>,
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

    /// Looks up a cached value inside one owner's partition.
    ///
    /// Stale entries are removed from the partition and reported as misses,
    /// exactly like the shared store.
    pub fn get(&self, owner: OwnerToken, key: &MemoKey) -> Option<R> {
        let mut stale = false;

        let result = {
            let m = self.map.read();
            match m.get(&owner).and_then(|partition| partition.get(key)) {
                Some(entry) if entry.is_stale() => {
                    stale = true;
                    None
                }
                Some(entry) => Some(entry.value.clone()),
                None => None,
            }
        };

        if stale {
            self.remove_stale(owner, key);
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

    /// Writes a freshly computed value into the owner's partition, honoring
    /// the empty-result policy. The partition is created on first write.
    pub fn insert(&self, owner: OwnerToken, key: &MemoKey, value: R) {
        if !self.cache_empty && value.is_empty_result() {
            return;
        }
        let entry = CacheEntry::new(value, self.duration);
        self.map
            .write()
            .entry(owner)
            .or_default()
            .insert(key.clone(), entry);
    }

    /// Drops the entry only if it is still stale under the write lock; a
    /// fresh replacement written by another thread in the meantime survives.
    fn remove_stale(&self, owner: OwnerToken, key: &MemoKey) {
        if let Some(partition) = self.map.write().get_mut(&owner) {
            if let Some(entry) = partition.get(key) {
                if entry.is_stale() {
                    partition.remove(key);
                }
            }
        }
    }

    /// Removes a single entry from one owner's partition.
    pub fn remove(&self, owner: OwnerToken, key: &MemoKey) {
        if let Some(partition) = self.map.write().get_mut(&owner) {
            partition.remove(key);
        }
    }

    /// Reclaims an owner's whole partition.
    ///
    /// Call this when an owner is dropped; the store cannot observe that on
    /// its own. Returns true if the owner had a partition.
    pub fn remove_owner(&self, owner: OwnerToken) -> bool {
        self.map.write().remove(&owner).is_some()
    }

    /// Drops every partition.
    pub fn clear(&self) {
        self.map.write().clear();
    }

    /// Number of owner partitions currently held.
    pub fn owner_count(&self) -> usize {
        self.map.read().len()
    }
}

/// `Result`-aware insertion, mirroring `SharedCache::insert_result`:
/// failures never leave an entry behind.
impl<T, E> OwnerCache<Result<T, E>>
where
    T: Clone + EmptyResult + 'static,
    E: Clone + 'static,
{
    /// Inserts the result only when it is `Ok`.
    pub fn insert_result(&self, owner: OwnerToken, key: &MemoKey, value: &Result<T, E>) {
        if let Ok(v) = value {
            self.insert(owner, key, Ok(v.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    static MAP_A: Lazy<RwLock<HashMap<OwnerToken, HashMap<MemoKey, CacheEntry<i32>>>>> =
        Lazy::new(|| RwLock::new(HashMap::new()));
    #[cfg(feature = "stats")]
    static STATS_A: Lazy<CacheStats> = Lazy::new(CacheStats::new);

    #[test]
    fn test_owners_do_not_leak_into_each_other() {
        let cache = OwnerCache::new(
            &MAP_A,
            None,
            false,
            #[cfg(feature = "stats")]
            &STATS_A,
        );
        let a = OwnerToken::new(1);
        let b = OwnerToken::new(2);
        let key = MemoKey::text("5");

        cache.insert(a, &key, 50);
        cache.insert(b, &key, 99);
        assert_eq!(cache.get(a, &key), Some(50));
        assert_eq!(cache.get(b, &key), Some(99));

        cache.remove(a, &key);
        assert_eq!(cache.get(a, &key), None);
        assert_eq!(cache.get(b, &key), Some(99));
    }

    static MAP_B: Lazy<RwLock<HashMap<OwnerToken, HashMap<MemoKey, CacheEntry<i32>>>>> =
        Lazy::new(|| RwLock::new(HashMap::new()));
    #[cfg(feature = "stats")]
    static STATS_B: Lazy<CacheStats> = Lazy::new(CacheStats::new);

    #[test]
    fn test_remove_owner_reclaims_partition() {
        let cache = OwnerCache::new(
            &MAP_B,
            None,
            false,
            #[cfg(feature = "stats")]
            &STATS_B,
        );
        let a = OwnerToken::new(10);
        cache.insert(a, &MemoKey::text("x"), 1);
        assert_eq!(cache.owner_count(), 1);

        assert!(cache.remove_owner(a));
        assert_eq!(cache.owner_count(), 0);
        assert!(!cache.remove_owner(a));
    }

    static MAP_C: Lazy<RwLock<HashMap<OwnerToken, HashMap<MemoKey, CacheEntry<i32>>>>> =
        Lazy::new(|| RwLock::new(HashMap::new()));
    #[cfg(feature = "stats")]
    static STATS_C: Lazy<CacheStats> = Lazy::new(CacheStats::new);

    #[test]
    fn test_expiration_is_per_entry() {
        let cache = OwnerCache::new(
            &MAP_C,
            Some(Duration::from_millis(25)),
            false,
            #[cfg(feature = "stats")]
            &STATS_C,
        );
        let a = OwnerToken::new(3);
        let key = MemoKey::text("k");
        cache.insert(a, &key, 7);
        assert_eq!(cache.get(a, &key), Some(7));
        thread::sleep(Duration::from_millis(45));
        assert_eq!(cache.get(a, &key), None);
    }

    static MAP_D: Lazy<RwLock<HashMap<OwnerToken, HashMap<MemoKey, CacheEntry<i32>>>>> =
        Lazy::new(|| RwLock::new(HashMap::new()));
    #[cfg(feature = "stats")]
    static STATS_D: Lazy<CacheStats> = Lazy::new(CacheStats::new);

    #[test]
    fn test_stale_removal_spares_fresh_replacement() {
        let cache = OwnerCache::new(
            &MAP_D,
            Some(Duration::from_millis(20)),
            false,
            #[cfg(feature = "stats")]
            &STATS_D,
        );
        let a = OwnerToken::new(4);
        let key = MemoKey::text("k");
        cache.insert(a, &key, 1);
        thread::sleep(Duration::from_millis(40));

        // A replacement written after the stale read must not be removed
        cache.insert(a, &key, 2);
        cache.remove_stale(a, &key);
        assert_eq!(cache.get(a, &key), Some(2));
    }
}
