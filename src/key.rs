//! Service keys
//!
//! A key is an opaque token allocated once and compared by identity. Labels
//! and type parameters are carried for diagnostics and static typing only,
//! they never take part in equality.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

/// Raw identity of a key.
///
/// Allocated from a process-wide counter, so two keys never share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(u64);

impl KeyId {
    #[inline]
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value.
    #[inline]
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A typed key for a service producing instances of `T`.
///
/// # Examples
///
/// ```rust
/// use dependency_registry::Key;
///
/// struct Database;
///
/// let a = Key::<Database>::new("db");
/// let b = Key::<Database>::new("db");
///
/// // Same label, different tokens
/// assert_ne!(a, b);
/// assert_eq!(a, a.clone());
/// ```
pub struct Key<T> {
    id: KeyId,
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> Key<T> {
    /// Allocate a fresh key. `name` is a label for logs and errors.
    #[inline]
    pub fn new(name: &'static str) -> Self {
        Self {
            id: KeyId::next(),
            name,
            _marker: PhantomData,
        }
    }

    /// Allocate a fresh key labelled with the type name of `T`.
    #[inline]
    pub fn anonymous() -> Self {
        Self::new(std::any::type_name::<T>())
    }

    #[inline]
    pub fn id(&self) -> KeyId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Drop the static type, keeping identity and labels.
    #[inline]
    pub fn erased(&self) -> AnyKey {
        AnyKey {
            id: self.id,
            name: self.name,
            type_name: std::any::type_name::<T>(),
        }
    }
}

impl<T> Clone for Key<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name,
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for Key<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Key<T> {}

impl<T> Hash for Key<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl<T> fmt::Display for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.id)
    }
}

/// A key with its static type erased.
///
/// Used for descriptor bookkeeping and error reporting.
#[derive(Debug, Clone, Copy)]
pub struct AnyKey {
    id: KeyId,
    name: &'static str,
    type_name: &'static str,
}

impl AnyKey {
    #[inline]
    pub fn id(&self) -> KeyId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name of the instances produced for this key.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for AnyKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for AnyKey {}

impl Hash for AnyKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for AnyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.id)
    }
}

impl<T: 'static> From<&Key<T>> for AnyKey {
    #[inline]
    fn from(key: &Key<T>) -> Self {
        key.erased()
    }
}
