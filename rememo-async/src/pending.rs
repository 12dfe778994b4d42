use std::hash::Hash;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use once_cell::sync::Lazy;

use rememo_core::{CacheEntry, EmptyResult};

#[cfg(feature = "stats")]
use rememo_core::CacheStats;

/// A cloneable handle to a memoized in-flight computation.
///
/// Every caller awaiting the same key holds a clone of the same handle;
/// the underlying future is polled once and its output is cloned out to
/// each waiter.
pub type SharedMemoFuture<R> = Shared<BoxFuture<'static, R>>;

/// Pending-future store backing `#[memoize_async]`.
///
/// The map holds one entry per key, and the entry's value is the shared
/// future, not the settled result. Storing the future at call time is what
/// gives single-flight semantics: a second caller arriving before the
/// first settles finds the entry and joins it.
///
/// Settled values that should not stay cached (errors, or empty results
/// under the default policy) are removed by [`rollback`](Self::rollback),
/// guarded by pointer identity so a newer pending future under the same
/// key is never evicted by a stale settle.
pub struct PendingCache<K: 'static, R: 'static> {
    /// Static reference to the function's DashMap of pending futures.
    map: &'static Lazy<DashMap<K, CacheEntry<SharedMemoFuture<R>>>>,
    /// How long entries remain valid, stamped at spawn time; `None` is the
    /// never-expires sentinel.
    duration: Option<Duration>,
    /// Whether empty settled values stay in the store.
    cache_empty: bool,
    #[cfg(feature = "stats")]
    stats: &'static Lazy<CacheStats>,
}

impl<K, R> PendingCache<K, R>
where
    K: Eq + Hash + 'static,
    R: Clone + EmptyResult + 'static,
{
    /// Creates a store handle over the function's static map.
    pub fn new(
        map: &'static Lazy<DashMap<K, CacheEntry<SharedMemoFuture<R>>>>,
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

    /// Joins the pending future for `key`, or spawns a new one.
    ///
    /// A fresh entry counts as a hit and its handle is returned without
    /// calling `spawn`. A missing or stale entry counts as a miss: `spawn`
    /// produces the future, which is made shareable and stored before it is
    /// ever polled.
    ///
    /// `spawn` runs while the entry's shard is locked, so it must only
    /// construct the future, never execute or block.
    pub fn join_or_spawn<F>(&self, key: K, spawn: F) -> SharedMemoFuture<R>
    where
        F: FnOnce() -> BoxFuture<'static, R>,
    {
        match self.map.entry(key) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_stale() {
                    let shared = spawn().shared();
                    occupied.insert(CacheEntry::new(shared.clone(), self.duration));
                    #[cfg(feature = "stats")]
                    self.stats.record_miss();
                    shared
                } else {
                    #[cfg(feature = "stats")]
                    self.stats.record_hit();
                    occupied.get().value.clone()
                }
            }
            Entry::Vacant(vacant) => {
                let shared = spawn().shared();
                vacant.insert(CacheEntry::new(shared.clone(), self.duration));
                #[cfg(feature = "stats")]
                self.stats.record_miss();
                shared
            }
        }
    }

    /// Applies the empty-result policy to a settled value.
    ///
    /// Every waiter calls this after awaiting; the `Shared` pointer guard
    /// makes the removal idempotent across waiters.
    pub fn settle(&self, key: &K, pending: &SharedMemoFuture<R>, value: &R) {
        if value.is_empty_result() && !self.cache_empty {
            self.rollback(key, pending);
        }
    }

    /// Removes the entry for `key`, but only if it still holds `pending`.
    ///
    /// A caller settling an old future after the entry was replaced (for
    /// example by a stale-entry respawn) leaves the replacement alone.
    pub fn rollback(&self, key: &K, pending: &SharedMemoFuture<R>) {
        let removed = self
            .map
            .remove_if(key, |_, entry| entry.value.ptr_eq(pending));
        if removed.is_some() {
            #[cfg(feature = "stats")]
            self.stats.record_rollback();
        }
    }

    /// Removes the entry for `key` unconditionally.
    pub fn remove(&self, key: &K) -> bool {
        self.map.remove(key).is_some()
    }

    /// Clears every entry in the store.
    pub fn clear(&self) {
        self.map.clear();
    }

    /// Number of entries, pending and settled alike.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K, T, E> PendingCache<K, Result<T, E>>
where
    K: Eq + Hash + 'static,
    T: Clone + EmptyResult + 'static,
    E: Clone + 'static,
{
    /// Applies the settle policy for `Result` values: `Err` always rolls
    /// back, `Ok` goes through the empty-result policy.
    pub fn settle_result(
        &self,
        key: &K,
        pending: &SharedMemoFuture<Result<T, E>>,
        value: &Result<T, E>,
    ) {
        match value {
            Ok(ok) => {
                if ok.is_empty_result() && !self.cache_empty {
                    self.rollback(key, pending);
                }
            }
            Err(_) => self.rollback(key, pending),
        }
    }
}
