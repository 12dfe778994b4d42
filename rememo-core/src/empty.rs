/// Decides whether a computed result counts as "empty".
///
/// An empty result is the Rust rendition of an absent value: by default the
/// stores do not keep empty results, so the wrapped function runs again on
/// the next call with the same key. The `cache_empty` configuration flips
/// that and caches empty results like any other.
///
/// Emptiness and failure are distinct: an `Err` is never empty (and is never
/// cached either - see the store `insert_result` methods and the async
/// rollback rule).
///
/// Provided implementations:
///
/// * `Option<T>` - `None` is empty
/// * `Result<T, E>` where `T: EmptyResult` - `Ok(v)` is empty iff `v` is;
///   `Err` is not empty
/// * primitives, `String`, `Vec<T>`, `()` - never empty
///
/// For custom return types the provided method body (never empty) usually
/// suffices:
///
/// ```
/// use rememo_core::EmptyResult;
///
/// #[derive(Clone)]
/// struct Report {
///     rows: Vec<String>,
/// }
///
/// impl EmptyResult for Report {}
/// ```
///
/// Override it when the type has its own notion of absence:
///
/// ```
/// use rememo_core::EmptyResult;
///
/// #[derive(Clone)]
/// struct Lookup {
///     hit: Option<u64>,
/// }
///
/// impl EmptyResult for Lookup {
///     fn is_empty_result(&self) -> bool {
///         self.hit.is_none()
///     }
/// }
/// ```
pub trait EmptyResult {
    /// Returns true when this value should be treated as absent.
    fn is_empty_result(&self) -> bool {
        false
    }
}

impl<T> EmptyResult for Option<T> {
    #[inline]
    fn is_empty_result(&self) -> bool {
        self.is_none()
    }
}

impl<T: EmptyResult, E> EmptyResult for Result<T, E> {
    #[inline]
    fn is_empty_result(&self) -> bool {
        match self {
            Ok(v) => v.is_empty_result(),
            // Failure is not emptiness; Err values have their own handling.
            Err(_) => false,
        }
    }
}

macro_rules! impl_never_empty {
    ($($t:ty),* $(,)?) => {
        $(
            impl EmptyResult for $t {}
        )*
    };
}

impl_never_empty!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, bool, char, String,
    ()
);

impl<T> EmptyResult for Vec<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_empty() {
        let v: Option<i32> = None;
        assert!(v.is_empty_result());
        assert!(!Some(5).is_empty_result());
    }

    #[test]
    fn test_some_none_nesting() {
        // Only the outer Option decides; Some(None) would be caught one
        // level down when the inner value is inspected.
        let v: Option<Option<i32>> = Some(None);
        assert!(!v.is_empty_result());
    }

    #[test]
    fn test_result_err_is_not_empty() {
        let v: Result<Option<i32>, String> = Err("boom".to_string());
        assert!(!v.is_empty_result());
    }

    #[test]
    fn test_result_ok_none_is_empty() {
        let v: Result<Option<i32>, String> = Ok(None);
        assert!(v.is_empty_result());

        let v: Result<Option<i32>, String> = Ok(Some(3));
        assert!(!v.is_empty_result());
    }

    #[test]
    fn test_plain_values_never_empty() {
        assert!(!0i32.is_empty_result());
        assert!(!String::new().is_empty_result());
        assert!(!Vec::<u8>::new().is_empty_result());
        assert!(!().is_empty_result());
    }
}
