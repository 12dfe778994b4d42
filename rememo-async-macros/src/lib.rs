use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, FnArg, ItemFn, Pat, ReturnType};

use rememo_macro_utils::{generate_key_expr, parse_async_attributes, KeySpec};

/// A procedural macro that adds argument-keyed memoization to async
/// functions, caching the in-flight future rather than just its result.
///
/// The first call for a key stores a shareable handle to the pending future
/// in a global DashMap; concurrent calls with the same key await that same
/// handle instead of starting the work again (single-flight). Once the
/// future settles, the entry either stays (a cacheable value) or is rolled
/// back (an error, or an empty result under the default policy) so the next
/// call recomputes.
///
/// # Requirements
///
/// - **Function must be async**: declared with `async fn`
/// - **No self receiver**: the pending future is stored in a `'static` map
///   and cannot borrow `self`. For per-owner partitioning take the owner as
///   a regular parameter and name it with `owner = <param>`.
/// - **Arguments and return type**: must be `Send + 'static`; the return
///   type must implement `Clone` and `EmptyResult`
/// - **Key argument**: the first non-owner argument must implement
///   `CacheableKey` (or the `DefaultCacheableKey` marker + `Debug`)
///
/// # Macro Parameters
///
/// - `duration` (optional): entry lifetime in milliseconds, stamped when
///   the future is stored (call time, not settle time). `0` (the default)
///   means entries never expire.
/// - `key` (optional): fixed string key shared by every call.
/// - `key_with` (optional): path to a function over the non-owner
///   arguments returning `Option<String>`; `None` routes the call into the
///   function's private fallback bucket.
/// - `cache_empty` (optional, default `false`): whether empty settled
///   values (per `EmptyResult`) stay cached. When `false` an empty result
///   is handed to every waiter and then rolled back.
/// - `scope = "owner"` with `owner = <param>` (optional): partitions the
///   store per owner value. The named parameter must implement
///   `OwnerIdentity` and is excluded from key derivation.
/// - `name` (optional): custom identifier in the statistics registry.
///
/// # Cache Behavior
///
/// - Callers that join a pending future count as hits; the spawning call
///   counts as a miss.
/// - `Result`-returning functions always roll back `Err`; every concurrent
///   waiter still receives the same `Err` value.
/// - Rollback only removes the entry it settled; a newer pending future
///   under the same key is left alone.
///
/// # Examples
///
/// ## Single-flight fetch
///
/// ```ignore
/// use rememo_async::memoize_async;
///
/// #[memoize_async(duration = 30_000)]
/// async fn fetch_profile(user_id: u64) -> Option<Profile> {
///     // Concurrent calls for the same user share one request.
///     api::load_profile(user_id).await
/// }
/// ```
///
/// ## Errors are never cached
///
/// ```ignore
/// use rememo_async::memoize_async;
///
/// #[memoize_async]
/// async fn resolve(host: String) -> Result<IpAddr, ResolveError> {
///     dns_lookup(&host).await
/// }
/// ```
///
/// ## Per-owner partitioning
///
/// ```ignore
/// use std::sync::Arc;
/// use rememo_async::memoize_async;
/// use rememo_core::{OwnerIdentity, OwnerToken};
///
/// struct Client { endpoint: String, token: OwnerToken }
/// impl OwnerIdentity for Client {
///     fn owner_token(&self) -> OwnerToken { self.token }
/// }
///
/// // Clones of the same Arc share one partition.
/// #[memoize_async(scope = "owner", owner = client)]
/// async fn list_buckets(client: Arc<Client>, region: String) -> Vec<String> {
///     client.request(&region).await
/// }
/// ```
#[proc_macro_attribute]
pub fn memoize_async(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attr_stream: TokenStream2 = attr.into();
    let attrs = match parse_async_attributes(attr_stream) {
        Ok(attrs) => attrs,
        Err(err) => return TokenStream::from(err),
    };

    let input = parse_macro_input!(item as ItemFn);
    let vis = &input.vis;
    let sig = &input.sig;
    let ident = &sig.ident;
    let block = &input.block;

    if sig.asyncness.is_none() {
        return TokenStream::from(quote! {
            compile_error!("#[memoize_async] only applies to async functions");
        });
    }

    let ret_type = match &sig.output {
        ReturnType::Type(_, ty) => quote! { #ty },
        ReturnType::Default => quote! { () },
    };

    let mut arg_idents: Vec<syn::Ident> = Vec::new();
    for arg in sig.inputs.iter() {
        match arg {
            FnArg::Receiver(_) => {
                return TokenStream::from(quote! {
                    compile_error!(
                        "#[memoize_async] does not support self receivers: the pending future is \
                         stored in a 'static map and cannot borrow self; take the owner as a \
                         parameter and use `scope = \"owner\", owner = <param>`"
                    );
                });
            }
            FnArg::Typed(pat_type) => match pat_type.pat.as_ref() {
                Pat::Ident(pat_ident) => arg_idents.push(pat_ident.ident.clone()),
                other => {
                    let msg = format!(
                        "#[memoize_async] requires plain identifier parameters, found `{}`",
                        quote!(#other)
                    );
                    return TokenStream::from(quote! { compile_error!(#msg); });
                }
            },
        }
    }

    // Owner scope is opt-in and names one parameter; that parameter carries
    // the partition identity and never feeds the key.
    let owner_scope = attrs.scope.as_deref() == Some("owner") || attrs.owner_param.is_some();
    let owner_ident = if owner_scope {
        match &attrs.owner_param {
            Some(param) => {
                if !arg_idents.iter().any(|a| a == param) {
                    let msg = format!("`owner = {}` does not name a function parameter", param);
                    return TokenStream::from(quote! { compile_error!(#msg); });
                }
                Some(param.clone())
            }
            None => {
                return TokenStream::from(quote! {
                    compile_error!("`scope = \"owner\"` requires `owner = <param>` naming the parameter that carries the owner identity");
                });
            }
        }
    } else {
        None
    };

    let key_args: Vec<TokenStream2> = arg_idents
        .iter()
        .filter(|a| Some(*a) != owner_ident.as_ref())
        .map(|a| quote! { #a })
        .collect();

    let cache_ident = format_ident!("__MEMO_CACHE_{}", ident.to_string().to_uppercase());
    let fallback_ident = format_ident!("__MEMO_FALLBACK_{}", ident.to_string().to_uppercase());
    let stats_ident = format_ident!("__MEMO_STATS_{}", ident.to_string().to_uppercase());

    let key_expr = generate_key_expr(&attrs.key, &key_args, &fallback_ident);
    let needs_fallback = matches!(attrs.key, KeySpec::KeyFn(_))
        || (matches!(attrs.key, KeySpec::FirstArg) && key_args.is_empty());
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

    let fn_name_str = attrs
        .custom_name
        .clone()
        .unwrap_or_else(|| ident.to_string());
    let duration_expr = &attrs.duration;
    let cache_empty_expr = &attrs.cache_empty;

    let (key_ty, key_binding) = if let Some(owner) = &owner_ident {
        (
            quote! { (::rememo_core::OwnerToken, ::rememo_core::MemoKey) },
            quote! {
                let __owner = {
                    use ::rememo_core::OwnerIdentity;
                    #owner.owner_token()
                };
                let __key = (__owner, #key_expr);
            },
        )
    } else {
        (
            quote! { ::rememo_core::MemoKey },
            quote! { let __key = #key_expr; },
        )
    };

    let settle_call = if is_result {
        quote! { __cache.settle_result(&__key, &__shared, &__result); }
    } else {
        quote! { __cache.settle(&__key, &__shared, &__result); }
    };

    let expanded = quote! {
        #vis #sig {
            static #cache_ident: once_cell::sync::Lazy<
                dashmap::DashMap<
                    #key_ty,
                    ::rememo_core::CacheEntry<::rememo_async::SharedMemoFuture<#ret_type>>,
                >,
            > = once_cell::sync::Lazy::new(dashmap::DashMap::new);
            #fallback_static

            #[cfg(feature = "stats")]
            static #stats_ident: once_cell::sync::Lazy<::rememo_core::CacheStats> =
                once_cell::sync::Lazy::new(::rememo_core::CacheStats::new);

            #[cfg(feature = "stats")]
            {
                static STATS_REGISTERED: once_cell::sync::OnceCell<()> =
                    once_cell::sync::OnceCell::new();
                STATS_REGISTERED.get_or_init(|| {
                    ::rememo_core::stats_registry::register(#fn_name_str, &#stats_ident);
                });
            }

            #[cfg(feature = "stats")]
            let __cache = ::rememo_async::PendingCache::<#key_ty, #ret_type>::new(
                &#cache_ident,
                #duration_expr,
                #cache_empty_expr,
                &#stats_ident,
            );
            #[cfg(not(feature = "stats"))]
            let __cache = ::rememo_async::PendingCache::<#key_ty, #ret_type>::new(
                &#cache_ident,
                #duration_expr,
                #cache_empty_expr,
            );

            #key_binding

            let __shared = __cache.join_or_spawn(__key.clone(), move || {
                use ::rememo_async::futures::FutureExt;
                (async move #block).boxed()
            });
            let __result = __shared.clone().await;
            #settle_call
            __result
        }
    };

    TokenStream::from(expanded)
}
