//! # Rememo
//!
//! A lightweight, thread-safe memoization library for Rust that wraps
//! functions and methods through a procedural macro.
//!
//! ## Features
//!
//! - **Easy to use**: Simply add the `#[memoize]` attribute to any function or method
//! - **Argument-keyed**: The first argument derives the cache key by default
//! - **Expiration**: Optional `duration` in milliseconds; `0` means never expire
//! - **Key control**: Fixed `key`, custom `key_with` functions, and a private
//!   per-function fallback bucket for absent keys
//! - **Empty-result policy**: Empty results (such as `Option::None`) are
//!   returned but not cached unless `cache_empty = true`
//! - **Owner or shared scope**: Methods partition per owner value by default;
//!   free functions share one store
//! - **Result-aware**: Caches only successful `Result::Ok` values
//! - **Type-safe**: Full compile-time type checking
//!
//! ## Quick Start
//!
//! Add the `#[memoize]` attribute to any function you want to memoize:
//!
//! ```rust
//! use rememo::memoize;
//!
//! #[memoize]
//! fn fibonacci(n: u32) -> u64 {
//!     if n <= 1 {
//!         return n as u64;
//!     }
//!     fibonacci(n - 1) + fibonacci(n - 2)
//! }
//!
//! // First call computes the result
//! let result1 = fibonacci(10);
//! // Second call returns the stored result instantly
//! let result2 = fibonacci(10);
//! assert_eq!(result1, result2);
//! ```
//!
//! ## Custom Cache Keys
//!
//! For complex argument types, you can implement custom cache key generation:
//!
//! ```rust
//! use rememo::memoize;
//! use rememo::{CacheableKey, DefaultCacheableKey};
//!
//! #[derive(Debug, Clone)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! // Option 1: Use the default Debug-based key
//! impl DefaultCacheableKey for User {}
//!
//! // Note: You can also implement CacheableKey directly instead of
//! // DefaultCacheableKey for better control, but not both at the same time
//! ```
//!
//! Or with a custom implementation:
//!
//! ```rust
//! use rememo::memoize;
//! use rememo::CacheableKey;
//!
//! #[derive(Debug, Clone)]
//! struct UserId {
//!     id: u64,
//!     name: String,
//! }
//!
//! // Custom key implementation (more efficient than Debug-based)
//! impl CacheableKey for UserId {
//!     fn to_cache_key(&self) -> String {
//!         format!("user:{}", self.id)
//!     }
//! }
//! ```
//!
//! ## Memoizing Methods
//!
//! On a method the store is partitioned per receiver: two values of the
//! same type never see each other's entries. The receiver type declares
//! its identity through [`OwnerIdentity`]:
//!
//! ```rust
//! use rememo::memoize;
//! use rememo::{OwnerIdentity, OwnerToken};
//!
//! struct Calculator {
//!     token: OwnerToken,
//! }
//!
//! impl OwnerIdentity for Calculator {
//!     fn owner_token(&self) -> OwnerToken {
//!         self.token
//!     }
//! }
//!
//! impl Calculator {
//!     #[memoize]
//!     fn add(&self, a: i32, b: i32) -> i32 {
//!         a + b
//!     }
//! }
//!
//! let calc = Calculator { token: OwnerToken::unique() };
//! assert_eq!(calc.add(2, 3), 5);
//! assert_eq!(calc.add(2, 3), 5);
//! ```
//!
//! Opting into `scope = "shared"` instead gives static-method semantics,
//! one store for every receiver.
//!
//! ## Empty Results
//!
//! An empty result is handed back to the caller but, by default, not
//! stored, so the next call gets a fresh chance:
//!
//! ```rust
//! use rememo::memoize;
//!
//! #[memoize]
//! fn find_nickname(id: u32) -> Option<String> {
//!     if id == 7 {
//!         Some("lucky".to_string())
//!     } else {
//!         None
//!     }
//! }
//!
//! // None is returned but not cached
//! assert_eq!(find_nickname(1), None);
//! // Some values are cached
//! assert_eq!(find_nickname(7), Some("lucky".to_string()));
//! ```
//!
//! ## Error Handling
//!
//! Functions returning `Result<T, E>` only cache successful results:
//!
//! ```rust
//! use rememo::memoize;
//!
//! #[memoize]
//! fn divide(a: i32, b: i32) -> Result<i32, String> {
//!     if b == 0 {
//!         Err("Division by zero".to_string())
//!     } else {
//!         Ok(a / b)
//!     }
//! }
//!
//! // Ok results are cached
//! let _ = divide(10, 2);
//! // Err results are NOT cached
//! let _ = divide(10, 0);
//! ```
//!
//! ## Async Functions
//!
//! Async memoization with pending-future caching and single-flight
//! semantics lives in the companion `rememo-async` crate.

pub use rememo_core::*;
pub use rememo_macros::memoize;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::memoize;
    pub use crate::{CacheableKey, DefaultCacheableKey, EmptyResult, OwnerIdentity, OwnerToken};
    #[cfg(feature = "stats")]
    pub use crate::{stats_registry, CacheStats};
}
