use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

use crate::{CacheEntry, CacheableKey, EmptyResult, MemoKey};

/// How a [`Memoized`] wrapper derives the cache key from a call's arguments.
pub enum KeyStrategy<A> {
    /// The argument bundle itself is the key. [`Memoized::new`] installs
    /// this with [`CacheableKey::to_cache_key`] as the derivation, which is
    /// why only `new` demands that bound.
    Arguments(fn(&A) -> String),
    /// Every call collapses into one fixed bucket.
    Fixed(MemoKey),
    /// A caller-supplied derivation; returning `None` means the key is
    /// absent and the wrapper's private fallback token is used instead.
    Derived(Box<dyn Fn(&A) -> Option<String> + Send + Sync>),
}

/// Macro-free memoization wrapper: `wrap(fn, config) -> cached fn`.
///
/// Wraps any `Fn(&A) -> R` in a value that caches results keyed by the
/// arguments. Each wrapper owns its store outright, so dropping the wrapper
/// drops every entry with it - this is the embeddable, per-owner form of the
/// engine: put a `Memoized` field on the owning struct and its cache lives
/// and dies with that owner. The `#[memoize]` attribute is the static,
/// declaration-site form of the same engine.
///
/// Configuration is applied builder-style before first use:
///
/// ```
/// use rememo_core::Memoized;
/// use std::time::Duration;
///
/// let square = Memoized::new(|x: &u32| x * x).with_duration(Duration::from_secs(60));
///
/// assert_eq!(square.call(12), 144);
/// assert_eq!(square.call(12), 144); // served from the store
/// ```
///
/// Multi-argument functions take a tuple bundle and usually want a derived
/// key:
///
/// ```
/// use rememo_core::Memoized;
///
/// let concat = Memoized::new(|(a, b): &(u32, u32)| format!("{}{}", a, b))
///     .with_key_fn(|(a, b)| Some(format!("{}-{}", a, b)));
///
/// assert_eq!(concat.call((2, 3)), "23");
/// assert_eq!(concat.call((3, 2)), "32"); // different key, recomputed
/// ```
///
/// # Errors and panics
///
/// The wrapper neither catches nor transforms anything: a panicking key
/// function or wrapped function propagates immediately and leaves no entry
/// behind.
pub struct Memoized<A, R, F>
where
    F: Fn(&A) -> R,
{
    func: F,
    store: Mutex<HashMap<MemoKey, CacheEntry<R>>>,
    duration: Option<Duration>,
    strategy: KeyStrategy<A>,
    cache_empty: bool,
    fallback: MemoKey,
}

impl<A, R, F> Memoized<A, R, F>
where
    A: CacheableKey,
    R: Clone + EmptyResult,
    F: Fn(&A) -> R,
{
    /// Wraps a function with the default configuration: never expires,
    /// argument-derived keys, empty results not cached.
    ///
    /// The wrapper's private fallback token is allocated here, once, so it
    /// is stable across calls and distinct from every other wrapper's.
    pub fn new(func: F) -> Self {
        Self {
            func,
            store: Mutex::new(HashMap::new()),
            duration: None,
            strategy: KeyStrategy::Arguments(|args| args.to_cache_key()),
            cache_empty: false,
            fallback: MemoKey::fallback(),
        }
    }
}

impl<A, R, F> Memoized<A, R, F>
where
    R: Clone + EmptyResult,
    F: Fn(&A) -> R,
{
    /// Wraps a function together with a key derivation, for argument types
    /// that have no key form of their own. `None` from the derivation
    /// routes the call to the wrapper's fallback bucket, as in
    /// [`Memoized::with_key_fn`].
    pub fn keyed(func: F, key_fn: impl Fn(&A) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            func,
            store: Mutex::new(HashMap::new()),
            duration: None,
            strategy: KeyStrategy::Derived(Box::new(key_fn)),
            cache_empty: false,
            fallback: MemoKey::fallback(),
        }
    }

    /// Sets how long entries stay valid. A zero duration keeps the
    /// never-expires sentinel.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = if duration.is_zero() {
            None
        } else {
            Some(duration)
        };
        self
    }

    /// Collapses every call into one fixed bucket.
    pub fn with_fixed_key(mut self, key: impl Into<MemoKey>) -> Self {
        self.strategy = KeyStrategy::Fixed(key.into());
        self
    }

    /// Installs a custom key derivation. `None` from the derivation means
    /// "no key" and routes the call to the wrapper's fallback bucket; an
    /// empty or zero-like string is still a real key.
    pub fn with_key_fn(
        mut self,
        key_fn: impl Fn(&A) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.strategy = KeyStrategy::Derived(Box::new(key_fn));
        self
    }

    /// Caches empty results instead of recomputing them on every call.
    pub fn with_cache_empty(mut self, cache_empty: bool) -> Self {
        self.cache_empty = cache_empty;
        self
    }

    /// Invokes the wrapped function through the cache.
    ///
    /// The key is derived exactly once, before the lookup. On a hit the
    /// stored value is cloned out; on a miss or stale entry the wrapped
    /// function runs with the store unlocked, its result is written back
    /// (subject to the empty-result policy), and the just-computed value is
    /// returned directly rather than re-read from the store.
    pub fn call(&self, args: A) -> R {
        let key = self.derive_key(&args);

        {
            let mut store = self.store.lock();
            match store.get(&key) {
                Some(entry) if entry.is_stale() => {
                    store.remove(&key);
                }
                Some(entry) => return entry.value.clone(),
                None => {}
            }
        }

        let result = (self.func)(&args);

        if self.cache_empty || !result.is_empty_result() {
            self.store
                .lock()
                .insert(key, CacheEntry::new(result.clone(), self.duration));
        }

        result
    }

    /// Drops every entry, forcing recomputation on the next call.
    pub fn clear(&self) {
        self.store.lock().clear();
    }

    /// Number of entries currently held, stale ones included.
    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    fn derive_key(&self, args: &A) -> MemoKey {
        match &self.strategy {
            KeyStrategy::Arguments(to_key) => MemoKey::text(to_key(args)),
            KeyStrategy::Fixed(key) => key.clone(),
            KeyStrategy::Derived(key_fn) => match key_fn(args) {
                Some(text) => MemoKey::text(text),
                None => self.fallback.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_second_call_served_from_store() {
        let calls = AtomicU32::new(0);
        let memo = Memoized::new(|x: &u32| {
            calls.fetch_add(1, Ordering::SeqCst);
            x * 2
        });

        assert_eq!(memo.call(5), 10);
        assert_eq!(memo.call(5), 10);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(memo.call(6), 12);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_duration_expiry_recomputes() {
        let calls = AtomicU32::new(0);
        let memo = Memoized::new(|x: &u32| {
            calls.fetch_add(1, Ordering::SeqCst);
            x * 3
        })
        .with_duration(Duration::from_millis(30));

        assert_eq!(memo.call(5), 15);
        assert_eq!(memo.call(5), 15);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(memo.call(5), 15);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_zero_duration_means_never_expires() {
        let calls = AtomicU32::new(0);
        let memo = Memoized::new(|x: &u32| {
            calls.fetch_add(1, Ordering::SeqCst);
            *x
        })
        .with_duration(Duration::ZERO);

        memo.call(1);
        std::thread::sleep(Duration::from_millis(20));
        memo.call(1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fixed_key_converges_to_one_bucket() {
        let calls = AtomicU32::new(0);
        let memo = Memoized::new(|x: &u32| {
            calls.fetch_add(1, Ordering::SeqCst);
            x * 4
        })
        .with_fixed_key("pinned");

        assert_eq!(memo.call(5), 20);
        // Different argument, same bucket: first result wins.
        assert_eq!(memo.call(10), 20);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn test_derived_key_separates_argument_orders() {
        let calls = AtomicU32::new(0);
        let memo = Memoized::new(|(a, b): &(u32, u32)| {
            calls.fetch_add(1, Ordering::SeqCst);
            a + b
        })
        .with_key_fn(|(a, b)| Some(format!("{}-{}", a, b)));

        assert_eq!(memo.call((2, 3)), 5);
        assert_eq!(memo.call((2, 3)), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(memo.call((3, 2)), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(memo.len(), 2);
    }

    #[test]
    fn test_absent_key_uses_stable_fallback_bucket() {
        let calls = AtomicU32::new(0);
        let memo = Memoized::new(|x: &u32| {
            calls.fetch_add(1, Ordering::SeqCst);
            x + 1
        })
        .with_key_fn(|_| None);

        assert_eq!(memo.call(1), 2);
        // Key is always absent, so every call lands in the one fallback
        // bucket instead of recomputing.
        assert_eq!(memo.call(99), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_like_key_is_not_absent() {
        let calls = AtomicU32::new(0);
        let memo = Memoized::new(|x: &u32| {
            calls.fetch_add(1, Ordering::SeqCst);
            *x
        })
        .with_key_fn(|x| Some(format!("{}", x % 2)));

        memo.call(0); // key "0"
        memo.call(2); // key "0" again - cached
        memo.call(1); // key "1"
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_empty_results_recompute_by_default() {
        let calls = AtomicU32::new(0);
        let memo = Memoized::new(|x: &u32| {
            calls.fetch_add(1, Ordering::SeqCst);
            if *x == 0 {
                None
            } else {
                Some(*x)
            }
        });

        assert_eq!(memo.call(0), None);
        assert_eq!(memo.call(0), None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert_eq!(memo.call(5), Some(5));
        assert_eq!(memo.call(5), Some(5));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_cache_empty_keeps_empty_results() {
        let calls = AtomicU32::new(0);
        let memo = Memoized::new(|x: &u32| {
            calls.fetch_add(1, Ordering::SeqCst);
            if *x == 0 {
                None
            } else {
                Some(*x)
            }
        })
        .with_cache_empty(true);

        assert_eq!(memo.call(0), None);
        assert_eq!(memo.call(0), None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_separate_wrappers_have_separate_stores() {
        let double = Memoized::new(|x: &u32| x * 2).with_key_fn(|_| None);
        let triple = Memoized::new(|x: &u32| x * 3).with_key_fn(|_| None);

        // Both live in their fallback buckets; tokens never collide.
        assert_eq!(double.call(4), 8);
        assert_eq!(triple.call(4), 12);
    }

    #[test]
    fn test_keyed_wrapper_accepts_non_key_arguments() {
        // No CacheableKey (or even Debug) impl; the explicit derivation is
        // the only key source.
        struct Query {
            table: String,
            limit: u32,
        }

        let calls = AtomicU32::new(0);
        let memo = Memoized::keyed(
            |q: &Query| {
                calls.fetch_add(1, Ordering::SeqCst);
                format!("SELECT * FROM {} LIMIT {}", q.table, q.limit)
            },
            |q| Some(format!("{}:{}", q.table, q.limit)),
        );

        let q = Query { table: "users".into(), limit: 10 };
        assert_eq!(memo.call(q), "SELECT * FROM users LIMIT 10");
        let q = Query { table: "users".into(), limit: 10 };
        memo.call(q);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fixed_key_without_cacheable_arguments() {
        struct Opaque;

        let calls = AtomicU32::new(0);
        let memo = Memoized::keyed(
            |_: &Opaque| {
                calls.fetch_add(1, Ordering::SeqCst);
                41
            },
            |_| None,
        )
        .with_fixed_key("only");

        assert_eq!(memo.call(Opaque), 41);
        assert_eq!(memo.call(Opaque), 41);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_forces_recompute() {
        let calls = AtomicU32::new(0);
        let memo = Memoized::new(|x: &u32| {
            calls.fetch_add(1, Ordering::SeqCst);
            *x
        });

        memo.call(1);
        memo.clear();
        assert!(memo.is_empty());
        memo.call(1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
