use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, FnArg, ItemFn, ReturnType};

use rememo_macro_utils::{generate_key_expr, parse_sync_attributes, KeySpec, SyncMemoAttributes};

/// Generate the shared-store branch (free functions, static-method
/// semantics).
#[allow(clippy::too_many_arguments)]
fn generate_shared_branch(
    cache_ident: &syn::Ident,
    fallback_static: &TokenStream2,
    stats_ident: &syn::Ident,
    ret_type: &TokenStream2,
    duration_expr: &TokenStream2,
    cache_empty_expr: &TokenStream2,
    key_expr: &TokenStream2,
    block: &syn::Block,
    fn_name_str: &str,
    is_result: bool,
) -> TokenStream2 {
    let insert_call = if is_result {
        quote! { __cache.insert_result(&__key, &__result); }
    } else {
        quote! { __cache.insert(&__key, __result.clone()); }
    };

    quote! {
        static #cache_ident: once_cell::sync::Lazy<
            parking_lot::RwLock<
                std::collections::HashMap<
                    ::rememo_core::MemoKey,
                    ::rememo_core::CacheEntry<#ret_type>,
                >,
            >,
        > = once_cell::sync::Lazy::new(|| parking_lot::RwLock::new(std::collections::HashMap::new()));
        #fallback_static

        #[cfg(feature = "stats")]
        static #stats_ident: once_cell::sync::Lazy<::rememo_core::CacheStats> =
            once_cell::sync::Lazy::new(::rememo_core::CacheStats::new);

        #[cfg(feature = "stats")]
        {
            use std::sync::Once;
            static REGISTER_ONCE: Once = Once::new();
            REGISTER_ONCE.call_once(|| {
                ::rememo_core::stats_registry::register(#fn_name_str, &#stats_ident);
            });
        }

        #[cfg(feature = "stats")]
        let __cache = ::rememo_core::SharedCache::<#ret_type>::new(
            &#cache_ident,
            #duration_expr,
            #cache_empty_expr,
            &#stats_ident,
        );
        #[cfg(not(feature = "stats"))]
        let __cache = ::rememo_core::SharedCache::<#ret_type>::new(
            &#cache_ident,
            #duration_expr,
            #cache_empty_expr,
        );

        let __key = #key_expr;
        if let Some(__cached) = __cache.get(&__key) {
            return __cached;
        }

        let __result = (|| #block)();
        #insert_call
        __result
    }
}

/// Generate the per-owner branch (instance-method semantics).
#[allow(clippy::too_many_arguments)]
fn generate_owner_branch(
    cache_ident: &syn::Ident,
    fallback_static: &TokenStream2,
    stats_ident: &syn::Ident,
    ret_type: &TokenStream2,
    duration_expr: &TokenStream2,
    cache_empty_expr: &TokenStream2,
    key_expr: &TokenStream2,
    block: &syn::Block,
    fn_name_str: &str,
    is_result: bool,
) -> TokenStream2 {
    let insert_call = if is_result {
        quote! { __cache.insert_result(__owner, &__key, &__result); }
    } else {
        quote! { __cache.insert(__owner, &__key, __result.clone()); }
    };

    quote! {
        static #cache_ident: once_cell::sync::Lazy<
            parking_lot::RwLock<
                std::collections::HashMap<
                    ::rememo_core::OwnerToken,
                    std::collections::HashMap<
                        ::rememo_core::MemoKey,
                        ::rememo_core::CacheEntry<#ret_type>,
                    >,
                >,
            >,
        > = once_cell::sync::Lazy::new(|| parking_lot::RwLock::new(std::collections::HashMap::new()));
        #fallback_static

        #[cfg(feature = "stats")]
        static #stats_ident: once_cell::sync::Lazy<::rememo_core::CacheStats> =
            once_cell::sync::Lazy::new(::rememo_core::CacheStats::new);

        #[cfg(feature = "stats")]
        {
            use std::sync::Once;
            static REGISTER_ONCE: Once = Once::new();
            REGISTER_ONCE.call_once(|| {
                ::rememo_core::stats_registry::register(#fn_name_str, &#stats_ident);
            });
        }

        #[cfg(feature = "stats")]
        let __cache = ::rememo_core::OwnerCache::<#ret_type>::new(
            &#cache_ident,
            #duration_expr,
            #cache_empty_expr,
            &#stats_ident,
        );
        #[cfg(not(feature = "stats"))]
        let __cache = ::rememo_core::OwnerCache::<#ret_type>::new(
            &#cache_ident,
            #duration_expr,
            #cache_empty_expr,
        );

        let __owner = {
            use ::rememo_core::OwnerIdentity;
            self.owner_token()
        };
        let __key = #key_expr;
        if let Some(__cached) = __cache.get(__owner, &__key) {
            return __cached;
        }

        let __result = (|| #block)();
        #insert_call
        __result
    }
}

/// A procedural macro that adds argument-keyed memoization to functions and
/// methods.
///
/// The wrapped function keeps its exact calling convention; its results are
/// stored in a static map keyed by a value derived from the arguments, and
/// subsequent calls with the same key return the stored result without
/// running the body again.
///
/// # Requirements
///
/// - **Key argument**: the first positional argument (or the values a
///   `key_with` function inspects) must implement `CacheableKey` (or the
///   `DefaultCacheableKey` marker + `Debug`)
/// - **Return type**: must implement `Clone` and `EmptyResult` (an empty
///   impl of `EmptyResult` means "never empty")
/// - **Methods with owner scope**: the receiver type must implement
///   `OwnerIdentity`
/// - **Function purity**: the body should be pure for memoization to be
///   observationally correct
///
/// # Macro Parameters
///
/// - `duration` (optional): entry lifetime in milliseconds. `0` (the
///   default) means entries never expire. A stale entry is treated exactly
///   like a miss: the body runs again and the entry is replaced.
/// - `key` (optional): a fixed string key; every call collapses into one
///   bucket regardless of arguments.
/// - `key_with` (optional): path to a function taking the arguments by
///   reference and returning `Option<String>`. Returning `None` means the
///   key is absent and the call lands in the function's private fallback
///   bucket (one opaque token per wrapped function, never shared). A
///   zero-like key such as `"0"` or `""` is a real key.
/// - `cache_empty` (optional, default `false`): whether empty results (per
///   `EmptyResult`, e.g. `Option::None`) are stored. When `false`, an empty
///   result is returned but not cached, so the next call recomputes.
/// - `scope` (optional): `"owner"` (default for methods) gives each
///   receiver its own partition via `OwnerIdentity`; `"shared"` (default
///   for free functions) is one store for every caller - on a method this
///   yields static-method semantics. `scope = "owner"` on a free function
///   is a compile error.
/// - `name` (optional): custom identifier in the statistics registry.
///   Default: the function name. Only relevant with the `stats` feature.
///
/// # Cache Behavior
///
/// - The key is computed exactly once per call, before the lookup. A
///   panicking `key_with` function propagates and caches nothing.
/// - A panic in the body propagates and leaves no entry behind.
/// - `Result`-returning functions never cache `Err`; `Ok` still goes
///   through the empty-result policy (so `Ok(None)` is recomputed unless
///   `cache_empty = true`).
/// - The store is unbounded: entries only leave it by going stale. The
///   store's lock is not held while the body runs, so recursive memoized
///   functions work; under OS threads two callers may race to compute the
///   same key and the later write wins.
///
/// # Examples
///
/// ## Basic function caching
///
/// ```ignore
/// use rememo::memoize;
///
/// #[memoize]
/// fn fibonacci(n: u32) -> u64 {
///     if n <= 1 {
///         return n as u64;
///     }
///     fibonacci(n - 1) + fibonacci(n - 2)
/// }
///
/// // First call computes, second returns the stored value
/// let a = fibonacci(10);
/// let b = fibonacci(10);
/// ```
///
/// ## Expiring entries
///
/// ```ignore
/// use rememo::memoize;
///
/// #[memoize(duration = 60_000)]
/// fn quote_of_the_minute(symbol: String) -> f64 {
///     fetch_quote(&symbol)
/// }
/// ```
///
/// ## Custom and fixed keys
///
/// ```ignore
/// use rememo::memoize;
///
/// fn pair_key(a: &u32, b: &u32) -> Option<String> {
///     Some(format!("{}-{}", a, b))
/// }
///
/// #[memoize(key_with = pair_key)]
/// fn combine(a: u32, b: u32) -> u64 {
///     (a as u64) << 32 | b as u64
/// }
///
/// // One bucket for every call:
/// #[memoize(key = "config")]
/// fn load_config(path: String) -> Config {
///     read_config(&path)
/// }
/// ```
///
/// ## Empty results
///
/// ```ignore
/// use rememo::memoize;
///
/// #[memoize] // cache_empty defaults to false
/// fn find_user(id: u32) -> Option<User> {
///     // None results are returned but not cached; a later call retries.
///     lookup(id)
/// }
/// ```
///
/// ## Instance methods
///
/// ```ignore
/// use rememo::memoize;
/// use rememo_core::{OwnerIdentity, OwnerToken};
///
/// struct Repository {
///     namespace: String,
///     token: OwnerToken,
/// }
///
/// impl OwnerIdentity for Repository {
///     fn owner_token(&self) -> OwnerToken {
///         self.token
///     }
/// }
///
/// impl Repository {
///     // Each Repository value gets its own partition.
///     #[memoize]
///     fn resolve(&self, name: String) -> Option<String> {
///         self.slow_lookup(&name)
///     }
///
///     // Shared across all instances (static-method semantics).
///     #[memoize(scope = "shared")]
///     fn schema_version(&self, edition: u32) -> u32 {
///         edition * 10
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn memoize(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attr_stream: TokenStream2 = attr.into();
    let attrs: SyncMemoAttributes = match parse_sync_attributes(attr_stream) {
        Ok(attrs) => attrs,
        Err(err) => return TokenStream::from(err),
    };

    let input = parse_macro_input!(item as ItemFn);
    let vis = &input.vis;
    let sig = &input.sig;
    let ident = &sig.ident;
    let block = &input.block;

    let ret_type = match &sig.output {
        ReturnType::Type(_, ty) => quote! { #ty },
        ReturnType::Default => quote! { () },
    };

    let mut arg_pats = Vec::new();
    let mut has_self = false;
    for arg in sig.inputs.iter() {
        match arg {
            FnArg::Receiver(_) => has_self = true,
            FnArg::Typed(pat_type) => {
                let pat = &pat_type.pat;
                arg_pats.push(quote! { #pat });
            }
        }
    }

    // Scope is fixed at wrap time: methods partition per owner unless they
    // opt into shared (static-method) semantics.
    let owner_scope = match attrs.scope.as_deref() {
        Some("owner") => {
            if !has_self {
                return TokenStream::from(quote! {
                    compile_error!("`scope = \"owner\"` requires a method with a self receiver");
                });
            }
            true
        }
        Some(_) => false,
        None => has_self,
    };

    let cache_ident = format_ident!("__MEMO_CACHE_{}", ident.to_string().to_uppercase());
    let fallback_ident = format_ident!("__MEMO_FALLBACK_{}", ident.to_string().to_uppercase());
    let stats_ident = format_ident!("__MEMO_STATS_{}", ident.to_string().to_uppercase());

    let key_expr = generate_key_expr(&attrs.key, &arg_pats, &fallback_ident);

    // The per-function fallback token only exists when a key can be absent:
    // a zero-argument default key, or a key_with function returning None.
    let needs_fallback = matches!(attrs.key, KeySpec::KeyFn(_))
        || (matches!(attrs.key, KeySpec::FirstArg) && arg_pats.is_empty());
    let fallback_static = if needs_fallback {
        quote! {
            static #fallback_ident: once_cell::sync::Lazy<::rememo_core::MemoKey> =
                once_cell::sync::Lazy::new(::rememo_core::MemoKey::fallback);
        }
    } else {
        quote! {}
    };

    let is_result = {
        let s = quote!(#ret_type).to_string().replace(' ', "");
        s.starts_with("Result<") || s.starts_with("std::result::Result<")
    };

    let fn_name_str = attrs.custom_name.unwrap_or_else(|| ident.to_string());

    let body = if owner_scope {
        generate_owner_branch(
            &cache_ident,
            &fallback_static,
            &stats_ident,
            &ret_type,
            &attrs.duration,
            &attrs.cache_empty,
            &key_expr,
            block,
            &fn_name_str,
            is_result,
        )
    } else {
        generate_shared_branch(
            &cache_ident,
            &fallback_static,
            &stats_ident,
            &ret_type,
            &attrs.duration,
            &attrs.cache_empty,
            &key_expr,
            block,
            &fn_name_str,
            is_result,
        )
    };

    let expanded = quote! {
        #vis #sig {
            #body
        }
    };

    TokenStream::from(expanded)
}
