//! Shared utilities for rememo procedural macros
//!
//! This crate provides the attribute parsing and key-expression generation
//! used by both `rememo-macros` and `rememo-async-macros`.

use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{punctuated::Punctuated, Expr, Ident, MetaNameValue, Token};

/// How the wrapped function derives its cache key.
pub enum KeySpec {
    /// Default rule: the first positional argument alone. With no
    /// arguments the key is absent and the fallback token is used.
    FirstArg,
    /// A fixed literal key; every call collapses into one bucket.
    Fixed(String),
    /// Path to a caller-supplied function over the argument list returning
    /// `Option<String>`; `None` routes to the fallback token.
    KeyFn(syn::Path),
}

/// Parsed attributes for the sync `#[memoize]` macro.
pub struct SyncMemoAttributes {
    pub duration: TokenStream2,
    pub key: KeySpec,
    pub cache_empty: TokenStream2,
    pub scope: Option<String>,
    pub custom_name: Option<String>,
}

impl Default for SyncMemoAttributes {
    fn default() -> Self {
        Self {
            duration: quote! { Option::<::core::time::Duration>::None },
            key: KeySpec::FirstArg,
            cache_empty: quote! { false },
            scope: None,
            custom_name: None,
        }
    }
}

/// Parsed attributes for the async `#[memoize_async]` macro.
pub struct AsyncMemoAttributes {
    pub duration: TokenStream2,
    pub key: KeySpec,
    pub cache_empty: TokenStream2,
    pub scope: Option<String>,
    /// Name of the parameter carrying the owner identity (owner scope only).
    pub owner_param: Option<Ident>,
    pub custom_name: Option<String>,
}

impl Default for AsyncMemoAttributes {
    fn default() -> Self {
        Self {
            duration: quote! { Option::<::core::time::Duration>::None },
            key: KeySpec::FirstArg,
            cache_empty: quote! { false },
            scope: None,
            owner_param: None,
            custom_name: None,
        }
    }
}

/// Parse the `duration` attribute: a millisecond count, `0` meaning never
/// expires (mapped onto the `None` sentinel rather than a zero span).
pub fn parse_duration_attribute(nv: &MetaNameValue) -> Result<TokenStream2, TokenStream2> {
    match &nv.value {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            syn::Lit::Int(lit_int) => match lit_int.base10_parse::<u64>() {
                Ok(0) => Ok(quote! { Option::<::core::time::Duration>::None }),
                Ok(ms) => Ok(quote! { Some(::core::time::Duration::from_millis(#ms)) }),
                Err(_) => Err(
                    quote! { compile_error!("Invalid literal for `duration`: expected milliseconds as a non-negative integer") },
                ),
            },
            _ => Err(
                quote! { compile_error!("Invalid literal for `duration`: expected integer (milliseconds)") },
            ),
        },
        _ => Err(
            quote! { compile_error!("Invalid syntax for `duration`: expected `duration = <integer>`") },
        ),
    }
}

/// Parse the `key` attribute (fixed literal key).
pub fn parse_key_attribute(nv: &MetaNameValue) -> Result<String, TokenStream2> {
    match &nv.value {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            syn::Lit::Str(s) => Ok(s.value()),
            _ => Err(quote! { compile_error!("Invalid literal for `key`: expected string") }),
        },
        _ => Err(quote! { compile_error!("Invalid syntax for `key`: expected `key = \"...\"`") }),
    }
}

/// Parse the `key_with` attribute (path to a key-derivation function).
pub fn parse_key_with_attribute(nv: &MetaNameValue) -> Result<syn::Path, TokenStream2> {
    match &nv.value {
        Expr::Path(expr_path) => Ok(expr_path.path.clone()),
        _ => Err(
            quote! { compile_error!("Invalid syntax for `key_with`: expected `key_with = path::to::function`") },
        ),
    }
}

/// Parse the `cache_empty` attribute.
pub fn parse_cache_empty_attribute(nv: &MetaNameValue) -> Result<TokenStream2, TokenStream2> {
    match &nv.value {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            syn::Lit::Bool(b) => {
                let val = b.value();
                Ok(quote! { #val })
            }
            _ => Err(
                quote! { compile_error!("Invalid literal for `cache_empty`: expected `true` or `false`") },
            ),
        },
        _ => Err(
            quote! { compile_error!("Invalid syntax for `cache_empty`: expected `cache_empty = true|false`") },
        ),
    }
}

/// Parse the `scope` attribute and return the validated string value.
pub fn parse_scope_attribute(nv: &MetaNameValue) -> Result<String, TokenStream2> {
    match &nv.value {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            syn::Lit::Str(s) => {
                let val = s.value();
                if val == "shared" || val == "owner" {
                    Ok(val)
                } else {
                    Err(
                        quote! { compile_error!("Invalid scope: expected \"shared\" or \"owner\"") },
                    )
                }
            }
            _ => Err(quote! { compile_error!("Invalid literal for `scope`: expected string") }),
        },
        _ => Err(
            quote! { compile_error!("Invalid syntax for `scope`: expected `scope = \"shared\"|\"owner\"`") },
        ),
    }
}

/// Parse the `name` attribute (custom stats-registry identifier).
pub fn parse_name_attribute(nv: &MetaNameValue) -> Result<String, TokenStream2> {
    match &nv.value {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            syn::Lit::Str(s) => Ok(s.value()),
            _ => Err(quote! { compile_error!("Invalid literal for `name`: expected string") }),
        },
        _ => Err(quote! { compile_error!("Invalid syntax for `name`: expected `name = \"...\"`") }),
    }
}

/// Parse the `owner` attribute (name of the owner-carrying parameter).
pub fn parse_owner_attribute(nv: &MetaNameValue) -> Result<Ident, TokenStream2> {
    match &nv.value {
        Expr::Path(expr_path) => match expr_path.path.get_ident() {
            Some(ident) => Ok(ident.clone()),
            None => Err(
                quote! { compile_error!("Invalid syntax for `owner`: expected a parameter name") },
            ),
        },
        _ => Err(
            quote! { compile_error!("Invalid syntax for `owner`: expected `owner = parameter_name`") },
        ),
    }
}

/// Generate the cache key expression for a call.
///
/// The expression evaluates to a `rememo_core::MemoKey`, exactly once per
/// call, before any cache lookup. `fallback_ident` names the wrapped
/// function's static fallback token, used whenever the strategy yields no
/// key: a zero-argument function under the default rule, or a `key_with`
/// function returning `None`. An empty or zero-like derived string is a
/// real key, never a fallback trigger.
pub fn generate_key_expr(
    key: &KeySpec,
    arg_pats: &[TokenStream2],
    fallback_ident: &Ident,
) -> TokenStream2 {
    match key {
        KeySpec::FirstArg => {
            if let Some(first) = arg_pats.first() {
                quote! {{
                    use ::rememo_core::CacheableKey;
                    ::rememo_core::MemoKey::text((#first).to_cache_key())
                }}
            } else {
                quote! { #fallback_ident.clone() }
            }
        }
        KeySpec::Fixed(text) => {
            quote! { ::rememo_core::MemoKey::text(#text) }
        }
        KeySpec::KeyFn(path) => {
            quote! {
                match #path(#(&#arg_pats),*) {
                    Some(__key_text) => ::rememo_core::MemoKey::text(__key_text),
                    None => #fallback_ident.clone(),
                }
            }
        }
    }
}

/// Parse sync memoize attributes from a token stream.
pub fn parse_sync_attributes(attr: TokenStream2) -> Result<SyncMemoAttributes, TokenStream2> {
    use syn::parse::Parser;

    let parser = Punctuated::<MetaNameValue, Token![,]>::parse_terminated;
    let parsed_args = parser.parse2(attr).map_err(|e| {
        let msg = format!("Failed to parse attributes: {}", e);
        quote! { compile_error!(#msg) }
    })?;

    let mut attrs = SyncMemoAttributes::default();

    for nv in parsed_args {
        if nv.path.is_ident("duration") {
            attrs.duration = parse_duration_attribute(&nv)?;
        } else if nv.path.is_ident("key") {
            attrs.key = KeySpec::Fixed(parse_key_attribute(&nv)?);
        } else if nv.path.is_ident("key_with") {
            attrs.key = KeySpec::KeyFn(parse_key_with_attribute(&nv)?);
        } else if nv.path.is_ident("cache_empty") {
            attrs.cache_empty = parse_cache_empty_attribute(&nv)?;
        } else if nv.path.is_ident("scope") {
            attrs.scope = Some(parse_scope_attribute(&nv)?);
        } else if nv.path.is_ident("name") {
            attrs.custom_name = Some(parse_name_attribute(&nv)?);
        } else {
            let ident = nv
                .path
                .get_ident()
                .map(|i| i.to_string())
                .unwrap_or_default();
            let msg = format!("Unknown memoize attribute `{}`", ident);
            return Err(quote! { compile_error!(#msg) });
        }
    }

    Ok(attrs)
}

/// Parse async memoize attributes from a token stream.
pub fn parse_async_attributes(attr: TokenStream2) -> Result<AsyncMemoAttributes, TokenStream2> {
    use syn::parse::Parser;

    let parser = Punctuated::<MetaNameValue, Token![,]>::parse_terminated;
    let parsed_args = parser.parse2(attr).map_err(|e| {
        let msg = format!("Failed to parse attributes: {}", e);
        quote! { compile_error!(#msg) }
    })?;

    let mut attrs = AsyncMemoAttributes::default();

    for nv in parsed_args {
        if nv.path.is_ident("duration") {
            attrs.duration = parse_duration_attribute(&nv)?;
        } else if nv.path.is_ident("key") {
            attrs.key = KeySpec::Fixed(parse_key_attribute(&nv)?);
        } else if nv.path.is_ident("key_with") {
            attrs.key = KeySpec::KeyFn(parse_key_with_attribute(&nv)?);
        } else if nv.path.is_ident("cache_empty") {
            attrs.cache_empty = parse_cache_empty_attribute(&nv)?;
        } else if nv.path.is_ident("scope") {
            attrs.scope = Some(parse_scope_attribute(&nv)?);
        } else if nv.path.is_ident("owner") {
            attrs.owner_param = Some(parse_owner_attribute(&nv)?);
        } else if nv.path.is_ident("name") {
            attrs.custom_name = Some(parse_name_attribute(&nv)?);
        } else {
            let ident = nv
                .path
                .get_ident()
                .map(|i| i.to_string())
                .unwrap_or_default();
            let msg = format!("Unknown memoize_async attribute `{}`", ident);
            return Err(quote! { compile_error!(#msg) });
        }
    }

    Ok(attrs)
}
