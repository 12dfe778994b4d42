use std::sync::atomic::{AtomicU64, Ordering};

/// Counter backing [`MemoKey::fallback`]. Monotonic, process-wide, so two
/// wrapped functions can never receive the same fallback token.
static NEXT_FALLBACK_TOKEN: AtomicU64 = AtomicU64::new(0);

/// A cache key selecting which entry a call reads or writes within a store.
///
/// Keys come in two shapes:
///
/// * `Text` - derived from the call's arguments (or supplied as a fixed
///   literal in the wrap configuration)
/// * `Token` - an opaque unique token; one is allocated per wrapped function
///   at wrap time and substituted whenever the key strategy yields no key, so
///   calls with no distinguishable key still collapse into one bucket that
///   can never collide with another wrapped function's bucket
///
/// A key that derives to a "falsy" but present text such as `"0"` or `""` is
/// a perfectly valid `Text` key; only a truly absent key falls back to the
/// token.
///
/// # Examples
///
/// ```
/// use rememo_core::MemoKey;
///
/// let a = MemoKey::text("user:42");
/// let b = MemoKey::text(String::from("user:42"));
/// assert_eq!(a, b);
///
/// // Fallback tokens are unique per allocation
/// let t1 = MemoKey::fallback();
/// let t2 = MemoKey::fallback();
/// assert_ne!(t1, t2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MemoKey {
    Text(String),
    Token(u64),
}

impl MemoKey {
    /// Builds a text key from anything string-like.
    pub fn text(s: impl Into<String>) -> Self {
        MemoKey::Text(s.into())
    }

    /// Allocates a fresh opaque token.
    ///
    /// Called once per wrapped function at wrap time; the token is then
    /// stable for that function's entire lifetime and used whenever key
    /// derivation yields nothing.
    pub fn fallback() -> Self {
        MemoKey::Token(NEXT_FALLBACK_TOKEN.fetch_add(1, Ordering::Relaxed))
    }
}

impl From<&str> for MemoKey {
    fn from(s: &str) -> Self {
        MemoKey::Text(s.to_string())
    }
}

impl From<String> for MemoKey {
    fn from(s: String) -> Self {
        MemoKey::Text(s)
    }
}

/// Trait for types that can be converted into a cache key fragment.
///
/// The default key strategy derives the key from the call's first positional
/// argument by calling [`CacheableKey::to_cache_key`] on it.
///
/// Implementations are provided for the common primitive and string types.
/// For custom argument types, either implement this trait directly:
///
/// ```
/// use rememo_core::CacheableKey;
///
/// #[derive(Debug, Clone)]
/// struct UserId {
///     id: u64,
///     name: String,
/// }
///
/// impl CacheableKey for UserId {
///     fn to_cache_key(&self) -> String {
///         format!("user:{}", self.id)
///     }
/// }
/// ```
///
/// or opt into the `Debug`-based default with the marker trait:
///
/// ```
/// use rememo_core::DefaultCacheableKey;
///
/// #[derive(Debug, Clone)]
/// struct Query {
///     term: String,
/// }
///
/// impl DefaultCacheableKey for Query {}
/// ```
pub trait CacheableKey {
    /// Produces the key text for this value. Must be pure: equal values must
    /// produce equal key text.
    fn to_cache_key(&self) -> String;
}

/// Marker trait that derives [`CacheableKey`] from a type's `Debug`
/// representation.
///
/// Implement this (empty) trait instead of `CacheableKey` when the `Debug`
/// output is already a faithful identity for the value. Do not implement
/// both; the blanket impl below would conflict.
pub trait DefaultCacheableKey {}

impl<T: DefaultCacheableKey + std::fmt::Debug> CacheableKey for T {
    fn to_cache_key(&self) -> String {
        format!("{:?}", self)
    }
}

macro_rules! impl_cacheable_key_display {
    ($($t:ty),* $(,)?) => {
        $(
            impl CacheableKey for $t {
                #[inline]
                fn to_cache_key(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

impl_cacheable_key_display!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, bool, char, String
);

impl CacheableKey for str {
    #[inline]
    fn to_cache_key(&self) -> String {
        self.to_string()
    }
}

macro_rules! impl_cacheable_key_tuple {
    ($($name:ident),+) => {
        impl<$($name: CacheableKey),+> CacheableKey for ($($name,)+) {
            fn to_cache_key(&self) -> String {
                #[allow(non_snake_case)]
                let ($($name,)+) = self;
                [$($name.to_cache_key()),+].join(":")
            }
        }
    };
}

impl_cacheable_key_tuple!(A);
impl_cacheable_key_tuple!(A, B);
impl_cacheable_key_tuple!(A, B, C);
impl_cacheable_key_tuple!(A, B, C, D);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_text_keys_compare_by_content() {
        assert_eq!(MemoKey::text("k"), MemoKey::from("k"));
        assert_eq!(MemoKey::text("k"), MemoKey::from(String::from("k")));
        assert_ne!(MemoKey::text("k"), MemoKey::text("other"));
    }

    #[test]
    fn test_fallback_tokens_never_collide() {
        let tokens: HashSet<MemoKey> = (0..1000).map(|_| MemoKey::fallback()).collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[test]
    fn test_fallback_never_equals_text() {
        // An empty or zero-like text key is still a valid key, distinct from
        // every token.
        assert_ne!(MemoKey::fallback(), MemoKey::text(""));
        assert_ne!(MemoKey::fallback(), MemoKey::text("0"));
    }

    #[test]
    fn test_primitive_keys() {
        assert_eq!(5u32.to_cache_key(), "5");
        assert_eq!((-3i64).to_cache_key(), "-3");
        assert_eq!(true.to_cache_key(), "true");
        assert_eq!("abc".to_cache_key(), "abc");
        assert_eq!(String::from("abc").to_cache_key(), "abc");
    }

    #[test]
    fn test_tuple_keys_join_elements() {
        assert_eq!((1u32, 2u32).to_cache_key(), "1:2");
        assert_eq!((String::from("a"), true, 3i8).to_cache_key(), "a:true:3");
    }

    #[derive(Debug)]
    struct Marker(u32);
    impl DefaultCacheableKey for Marker {}

    #[test]
    fn test_debug_based_default_key() {
        assert_eq!(Marker(7).to_cache_key(), "Marker(7)");
    }
}
