//! Ordered dependency lists
//!
//! A dependency list is a value holding the keys a factory needs, in the
//! positional order the factory expects them. The resolver works on the
//! erased key list; the typed list turns the resolved instances back into
//! the factory's argument.
//!
//! Implemented for:
//!
//! - `()` - no dependencies, the factory receives `()`
//! - `Key<T>` - one dependency, the factory receives `Arc<T>`
//! - `(Key<A>, Key<B>, ...)` - up to 8 dependencies, the factory receives
//!   `(Arc<A>, Arc<B>, ...)`
//! - `Vec<Key<T>>` - any number of same-typed dependencies, the factory
//!   receives `Vec<Arc<T>>`

use crate::factory::Instance;
use crate::{AnyKey, DiError, Key, Result};
use std::sync::Arc;

/// A typed, ordered list of dependency keys.
pub trait Dependencies: Send + Sync + 'static {
    /// What the factory receives once every key has been resolved.
    type Resolved;

    /// The keys, in declaration order.
    fn keys(&self) -> Vec<AnyKey>;

    /// Turn instances resolved for [`keys`](Self::keys), in the same order,
    /// into the factory argument.
    fn assemble(&self, instances: &[Instance]) -> Result<Self::Resolved>;
}

/// Downcast the instance at `index` to the type of `key`.
#[inline]
fn downcast_at<T: Send + Sync + 'static>(
    key: &Key<T>,
    instances: &[Instance],
    index: usize,
) -> Result<Arc<T>> {
    let instance = instances
        .get(index)
        .cloned()
        .ok_or_else(|| DiError::type_mismatch::<T>(key.erased()))?;

    instance
        .downcast::<T>()
        .map_err(|_| DiError::type_mismatch::<T>(key.erased()))
}

impl Dependencies for () {
    type Resolved = ();

    #[inline]
    fn keys(&self) -> Vec<AnyKey> {
        Vec::new()
    }

    #[inline]
    fn assemble(&self, _instances: &[Instance]) -> Result<()> {
        Ok(())
    }
}

impl<T: Send + Sync + 'static> Dependencies for Key<T> {
    type Resolved = Arc<T>;

    #[inline]
    fn keys(&self) -> Vec<AnyKey> {
        vec![self.erased()]
    }

    #[inline]
    fn assemble(&self, instances: &[Instance]) -> Result<Arc<T>> {
        downcast_at(self, instances, 0)
    }
}

impl<T: Send + Sync + 'static> Dependencies for Vec<Key<T>> {
    type Resolved = Vec<Arc<T>>;

    fn keys(&self) -> Vec<AnyKey> {
        self.iter().map(Key::erased).collect()
    }

    fn assemble(&self, instances: &[Instance]) -> Result<Vec<Arc<T>>> {
        self.iter()
            .enumerate()
            .map(|(index, key)| downcast_at(key, instances, index))
            .collect()
    }
}

macro_rules! impl_dependencies_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Send + Sync + 'static),+> Dependencies for ($(Key<$name>,)+) {
            type Resolved = ($(Arc<$name>,)+);

            fn keys(&self) -> Vec<AnyKey> {
                vec![$(self.$idx.erased()),+]
            }

            fn assemble(&self, instances: &[Instance]) -> Result<Self::Resolved> {
                Ok(($(downcast_at(&self.$idx, instances, $idx)?,)+))
            }
        }
    };
}

impl_dependencies_tuple!(A: 0);
impl_dependencies_tuple!(A: 0, B: 1);
impl_dependencies_tuple!(A: 0, B: 1, C: 2);
impl_dependencies_tuple!(A: 0, B: 1, C: 2, D: 3);
impl_dependencies_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_dependencies_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_dependencies_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_dependencies_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);

#[cfg(test)]
mod tests {
    use super::*;

    fn erase<T: Send + Sync + 'static>(value: T) -> Instance {
        Arc::new(value) as Instance
    }

    #[test]
    fn test_unit_has_no_keys() {
        assert!(().keys().is_empty());
        assert!(().assemble(&[]).is_ok());
    }

    #[test]
    fn test_tuple_keeps_declaration_order() {
        let first = Key::<u32>::new("first");
        let second = Key::<String>::new("second");
        let deps = (first.clone(), second.clone());

        let ids: Vec<_> = deps.keys().iter().map(AnyKey::id).collect();
        assert_eq!(ids, vec![first.id(), second.id()]);

        let (a, b) = deps
            .assemble(&[erase(7u32), erase(String::from("seven"))])
            .unwrap();
        assert_eq!(*a, 7);
        assert_eq!(*b, "seven");
    }

    #[test]
    fn test_swapped_instances_are_rejected() {
        let deps = (Key::<u32>::new("n"), Key::<String>::new("s"));

        let err = deps
            .assemble(&[erase(String::from("s")), erase(1u32)])
            .unwrap_err();
        assert!(matches!(err, DiError::TypeMismatch { .. }));
    }

    #[test]
    fn test_vec_of_keys() {
        let keys = vec![Key::<u8>::new("a"), Key::<u8>::new("b"), Key::<u8>::new("c")];

        assert_eq!(keys.keys().len(), 3);
        let values = keys
            .assemble(&[erase(1u8), erase(2u8), erase(3u8)])
            .unwrap();
        assert_eq!(values.iter().map(|v| **v).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_short_instance_list_is_an_error() {
        let key = Key::<u8>::new("lonely");
        assert!(key.assemble(&[]).is_err());
    }
}
