//! Global registry mapping wrapped-function names to their statistics.
//!
//! The `#[memoize]` and `#[memoize_async]` attributes register each wrapped
//! function's [`CacheStats`] here on first call, under the function name or
//! the `name` attribute when one was given. Applications query it to watch
//! hit rates without holding references to individual caches.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::CacheStats;

static STATS_REGISTRY: Lazy<RwLock<HashMap<String, &'static Lazy<CacheStats>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Registers a cache's statistics under a given name.
///
/// Called automatically by the attribute macros when the `stats` feature is
/// enabled; registering the same name again replaces the previous pointer.
///
/// # Examples
///
/// ```
/// use once_cell::sync::Lazy;
/// use rememo_core::{stats_registry, CacheStats};
///
/// static MY_STATS: Lazy<CacheStats> = Lazy::new(CacheStats::new);
/// stats_registry::register("my_function", &MY_STATS);
/// assert!(stats_registry::get("my_function").is_some());
/// ```
pub fn register(name: &str, stats: &'static Lazy<CacheStats>) {
    let mut registry = STATS_REGISTRY.write();
    registry.insert(name.to_string(), stats);
}

/// Looks up the statistics registered under `name`.
///
/// Returns `None` when the function has never been called (registration
/// happens on first call) or was never wrapped.
pub fn get(name: &str) -> Option<&'static CacheStats> {
    let registry = STATS_REGISTRY.read();
    registry.get(name).map(|stats| &***stats)
}

/// Names of every registered cache, in no particular order.
pub fn list() -> Vec<String> {
    let registry = STATS_REGISTRY.read();
    registry.keys().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    static STATS_ONE: Lazy<CacheStats> = Lazy::new(CacheStats::new);
    static STATS_TWO: Lazy<CacheStats> = Lazy::new(CacheStats::new);

    #[test]
    #[serial]
    fn test_register_and_get() {
        register("registry_test_one", &STATS_ONE);
        let stats = get("registry_test_one").expect("registered stats");
        stats.record_hit();
        assert!(stats.hits() >= 1);
        assert!(get("registry_test_never_registered").is_none());
    }

    #[test]
    #[serial]
    fn test_list_contains_registered_names() {
        register("registry_test_two", &STATS_TWO);
        let names = list();
        assert!(names.iter().any(|n| n == "registry_test_two"));
    }
}
