//! Service descriptors
//!
//! A descriptor is what a registration stores for one key: its lifecycle,
//! the erased list of dependency keys and a type-erased factory. Factories
//! take the resolved dependency instances positionally and produce an
//! `Arc<dyn Any>` so the resolver never needs to know concrete types.

use crate::deps::Dependencies;
use crate::error::BoxError;
use crate::{AnyKey, DiError, Key, Lifecycle, Result};
use std::any::Any;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

/// A constructed, type-erased service instance.
///
/// Instances only come out of registered factories; the descriptors that
/// hold those factories stay inside the crate.
///
/// ```compile_fail
/// use dependency_registry::Descriptor;
/// ```
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Type-erased factory function
type ErasedFactory = Arc<dyn Fn(&[Instance]) -> Result<Instance> + Send + Sync>;

/// Everything registered for one key.
pub(crate) struct Descriptor {
    key: AnyKey,
    lifecycle: Lifecycle,
    deps: Vec<AnyKey>,
    factory: ErasedFactory,
}

impl Descriptor {
    /// Build a descriptor from an infallible factory.
    pub fn new<T, D, F>(key: &Key<T>, deps: D, lifecycle: Lifecycle, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        D: Dependencies,
        F: Fn(D::Resolved) -> T + Send + Sync + 'static,
    {
        let erased_deps = deps.keys();
        Self {
            key: key.erased(),
            lifecycle,
            deps: erased_deps,
            factory: Arc::new(move |instances: &[Instance]| {
                let args = deps.assemble(instances)?;
                Ok(Arc::new(factory(args)) as Instance)
            }),
        }
    }

    /// Build a descriptor from a factory that may fail.
    ///
    /// Failures are reported as [`DiError::CreationFailed`] for this key.
    pub fn fallible<T, D, F, E>(key: &Key<T>, deps: D, lifecycle: Lifecycle, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        D: Dependencies,
        F: Fn(D::Resolved) -> std::result::Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let erased_key = key.erased();
        let erased_deps = deps.keys();
        Self {
            key: erased_key,
            lifecycle,
            deps: erased_deps,
            factory: Arc::new(move |instances: &[Instance]| {
                let args = deps.assemble(instances)?;
                factory(args)
                    .map(|value| Arc::new(value) as Instance)
                    .map_err(|e| DiError::creation_failed(erased_key, e))
            }),
        }
    }

    #[inline]
    pub fn key(&self) -> AnyKey {
        self.key
    }

    #[inline]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Direct dependencies, in the order the factory receives them.
    #[inline]
    pub fn deps(&self) -> &[AnyKey] {
        &self.deps
    }

    /// Run the factory over already-resolved dependency instances.
    #[inline]
    pub(crate) fn construct(&self, instances: &[Instance]) -> Result<Instance> {
        #[cfg(feature = "logging")]
        trace!(
            target: "dependency_registry",
            service = self.key.name(),
            key = self.key.id().get(),
            lifecycle = self.lifecycle.as_str(),
            deps = self.deps.len(),
            "Invoking factory"
        );

        (self.factory)(instances)
    }
}

impl std::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("key", &self.key)
            .field("lifecycle", &self.lifecycle)
            .field("deps", &self.deps)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Greeting(String);

    #[test]
    fn test_descriptor_records_deps_in_order() {
        let name = Key::<String>::new("name");
        let count = Key::<u32>::new("count");
        let key = Key::<Greeting>::new("greeting");

        let descriptor = Descriptor::new(
            &key,
            (name.clone(), count.clone()),
            Lifecycle::Ephemeral,
            |(name, count)| Greeting(format!("{name}x{count}")),
        );

        assert_eq!(descriptor.key(), key.erased());
        assert_eq!(descriptor.lifecycle(), Lifecycle::Ephemeral);
        assert_eq!(descriptor.deps(), &[name.erased(), count.erased()]);
    }

    #[test]
    fn test_construct_passes_positional_args() {
        let name = Key::<String>::new("name");
        let count = Key::<u32>::new("count");
        let key = Key::<Greeting>::new("greeting");

        let descriptor = Descriptor::new(&key, (name, count), Lifecycle::default(), |(name, count)| {
            Greeting(format!("{name}x{count}"))
        });

        let instances: Vec<Instance> = vec![Arc::new(String::from("hi")), Arc::new(3u32)];
        let built = descriptor
            .construct(&instances)
            .unwrap()
            .downcast::<Greeting>()
            .unwrap();
        assert_eq!(built.0, "hix3");
    }

    #[test]
    fn test_fallible_factory_reports_key() {
        let key = Key::<Greeting>::new("broken");
        let descriptor = Descriptor::fallible(&key, (), Lifecycle::default(), |()| {
            Err::<Greeting, _>("no greeting today")
        });

        let err = descriptor.construct(&[]).unwrap_err();
        match err {
            DiError::CreationFailed { key: failed, source } => {
                assert_eq!(failed, key.erased());
                assert_eq!(source.to_string(), "no greeting today");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
