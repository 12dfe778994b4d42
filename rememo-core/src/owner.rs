use std::sync::atomic::{AtomicU64, Ordering};

/// Counter backing [`OwnerToken::unique`]. Monotonic and process-wide, so
/// no two owners minted from it can ever share a partition.
static NEXT_OWNER_TOKEN: AtomicU64 = AtomicU64::new(0);

/// Identity of the object a per-owner store partition belongs to.
///
/// A token is a plain integer: holding one never keeps the owner alive, and
/// dropping the owner leaves its partition behind until it is explicitly
/// reclaimed with [`crate::OwnerCache::remove_owner`].
///
/// # Examples
///
/// ```
/// use rememo_core::{OwnerIdentity, OwnerToken};
///
/// struct Session {
///     user: u64,
/// }
///
/// impl OwnerIdentity for Session {
///     fn owner_token(&self) -> OwnerToken {
///         OwnerToken::new(self.user)
///     }
/// }
///
/// let a = Session { user: 1 };
/// let b = Session { user: 2 };
/// assert_ne!(a.owner_token(), b.owner_token());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OwnerToken(u64);

impl OwnerToken {
    /// Wraps an application-provided identity value.
    pub fn new(id: u64) -> Self {
        OwnerToken(id)
    }

    /// Mints a token no other call to `unique` will ever return again.
    ///
    /// Store it in a field at construction time when the type has no
    /// natural identity value of its own:
    ///
    /// ```
    /// use rememo_core::{OwnerIdentity, OwnerToken};
    ///
    /// struct Repository {
    ///     token: OwnerToken,
    /// }
    ///
    /// impl Repository {
    ///     fn new() -> Self {
    ///         Repository { token: OwnerToken::unique() }
    ///     }
    /// }
    ///
    /// impl OwnerIdentity for Repository {
    ///     fn owner_token(&self) -> OwnerToken {
    ///         self.token
    ///     }
    /// }
    /// ```
    pub fn unique() -> Self {
        OwnerToken(NEXT_OWNER_TOKEN.fetch_add(1, Ordering::Relaxed))
    }
}

/// Supplies the owner identity used to pick a store partition.
///
/// The token must name the owner, not its storage: an identity derived from
/// the receiver's address would let an owner created at a reused allocation
/// read a dead owner's entries. Implementations therefore return either an
/// identity value the type already carries, or an [`OwnerToken::unique`]
/// token minted at construction and kept in a field.
pub trait OwnerIdentity {
    /// Returns the token naming this owner's partition.
    fn owner_token(&self) -> OwnerToken;
}
