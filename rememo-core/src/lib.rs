//! # Rememo Core
//!
//! Core traits and store types for the Rememo memoization library.
//!
//! This crate provides the building blocks the `#[memoize]` and
//! `#[memoize_async]` attributes expand into, plus a macro-free higher-order
//! wrapper ([`Memoized`]) for wrapping closures by hand.
//!
//! ## Features
//!
//! - **Cache Key Derivation**: [`CacheableKey`] for argument-derived keys,
//!   [`MemoKey`] with collision-free fallback tokens
//! - **Expiration**: Millisecond durations with a "never expires" sentinel
//! - **Empty-Result Policy**: [`EmptyResult`] decides which results are worth
//!   keeping; empty results are recomputed unless explicitly cached
//! - **Owner Scoping**: [`SharedCache`] for free functions and static-method
//!   semantics, [`OwnerCache`] for per-instance partitions
//! - **Statistics**: Optional hit/miss/rollback tracking (with the `stats`
//!   feature)
//!
//! ## Module Organization
//!
//! - `cache_entry` - Entry wrapper carrying the expiration deadline
//! - `keys` - Cache key type, derivation traits, and fallback tokens
//! - `empty` - The empty-result policy traits
//! - `owner` - Owner identity tokens for per-owner partitioning
//! - `shared_cache` - One map shared by every caller of a wrapped function
//! - `owner_cache` - One map per distinct owner identity
//! - `memoized` - The macro-free `wrap(fn, config)` style wrapper

mod cache_entry;
mod empty;
mod keys;
mod memoized;
mod owner;
mod owner_cache;
mod shared_cache;

#[cfg(feature = "stats")]
mod stats;

#[cfg(feature = "stats")]
pub mod stats_registry;

pub use cache_entry::CacheEntry;
pub use empty::EmptyResult;
pub use keys::{CacheableKey, DefaultCacheableKey, MemoKey};
pub use memoized::{KeyStrategy, Memoized};
pub use owner::{OwnerIdentity, OwnerToken};
pub use owner_cache::OwnerCache;
pub use shared_cache::SharedCache;

#[cfg(feature = "stats")]
pub use stats::CacheStats;
