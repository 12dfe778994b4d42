//! # Rememo Async
//!
//! Argument-keyed memoization for async functions, with pending-future
//! caching.
//!
//! This crate provides the `#[memoize_async]` attribute macro. Unlike the
//! sync wrapper, the store does not hold settled values: it holds a
//! shareable handle to the future itself, stored the moment the first call
//! arrives. Concurrent calls with the same key await that same handle, so
//! the wrapped body runs once per key no matter how many callers show up
//! while it is in flight (single-flight).
//!
//! ## Features
//!
//! - 🚀 **Lock-free store**: Uses [DashMap](https://docs.rs/dashmap) for
//!   concurrent access without blocking
//! - 🔂 **Single-flight**: Concurrent same-key calls share one execution
//! - ↩️ **Rollback**: Errors and empty results are evicted after settling,
//!   so later calls recompute
//! - ⏱️ **Expiration**: `duration` in milliseconds, stamped at call time
//! - 🔑 **Key control**: default first-argument key, fixed `key`, or a
//!   custom `key_with` function with a per-function fallback bucket
//! - 👤 **Owner scope**: partition the store per owner value via
//!   `owner = <param>`
//! - 📈 **Statistics**: hit/miss/rollback counters via `stats_registry`
//!   (enabled by the default `stats` feature)
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! rememo-async = "0.3"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! ## Examples
//!
//! ### Single-flight fetching
//!
//! ```rust,ignore
//! use rememo_async::memoize_async;
//!
//! #[memoize_async(duration = 30_000)]
//! async fn fetch_user(id: u64) -> Option<User> {
//!     // Ten concurrent calls for the same id issue one request;
//!     // a None result is handed to all of them and then rolled back.
//!     api::load_user(id).await
//! }
//! ```
//!
//! ### Errors are never cached
//!
//! ```rust,ignore
//! use rememo_async::memoize_async;
//!
//! #[memoize_async]
//! async fn resolve(host: String) -> Result<std::net::IpAddr, ResolveError> {
//!     // Every waiter on a failing lookup sees the same Err, and the
//!     // entry is gone by the time the next call arrives.
//!     dns_lookup(&host).await
//! }
//! ```
//!
//! ## Semantics
//!
//! - The spawning call records a miss; calls that join a pending or settled
//!   entry record hits.
//! - `duration` is measured from the moment the future is stored, not from
//!   when it settles.
//! - Rollback is precise: it removes the entry only if it still holds the
//!   future that just settled, never a replacement that arrived later.

mod pending;

// Re-export the macro
pub use rememo_async_macros::memoize_async;

pub use pending::{PendingCache, SharedMemoFuture};

// Re-export stats functionality from rememo-core
#[cfg(feature = "stats")]
pub use rememo_core::{stats_registry, CacheStats};

// Re-export common dependencies that generated code and users rely on
pub use dashmap;
pub use futures;
pub use once_cell;
pub use parking_lot;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::memoize_async;
    pub use crate::PendingCache;
    #[cfg(feature = "stats")]
    pub use crate::{stats_registry, CacheStats};
}
