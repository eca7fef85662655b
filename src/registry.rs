//! The dependency registry
//!
//! A [`Registry`] is an immutable set of descriptors plus a local instance
//! cache. Registration never mutates a registry; it returns a new one whose
//! table is the old table plus one entry. Resolution walks the declared
//! dependencies depth-first and applies each key's [`Lifecycle`].

use crate::deps::Dependencies;
use crate::error::BoxError;
use crate::factory::{Descriptor, Instance};
use crate::resolve::PathGuard;
use crate::storage::{global_cache, DescriptorTable, InstanceCache};
use crate::{AnyKey, Component, DiError, Key, Lifecycle, Result, ScopeId};
use once_cell::sync::Lazy;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// The canonical empty registry.
static ROOT: Lazy<Registry> = Lazy::new(|| {
    #[cfg(feature = "logging")]
    debug!(target: "dependency_registry", "Creating root registry");

    Registry::from_table(Arc::new(DescriptorTable::new()))
});

struct RegistryInner {
    /// Descriptors, shared with forks
    descriptors: Arc<DescriptorTable>,
    /// Local singleton instances owned by this registry value
    local: InstanceCache,
    scope: ScopeId,
}

/// Immutable dependency registry.
///
/// Cloning a `Registry` yields another handle to the *same* registry value,
/// sharing its local cache. Use [`fork`](Registry::fork) for an independent
/// local scope.
///
/// # Examples
///
/// ```rust
/// use dependency_registry::{Key, Lifecycle, Registry};
///
/// struct Config { url: String }
/// struct Database { url: String }
///
/// let config = Key::<Config>::new("config");
/// let database = Key::<Database>::new("database");
///
/// let registry = Registry::root()
///     .register_factory(&config, (), Lifecycle::GlobalSingleton, |()| Config {
///         url: "postgres://localhost".into(),
///     })?
///     .register_factory(&database, config.clone(), Lifecycle::LocalSingleton, |config| Database {
///         url: config.url.clone(),
///     })?;
///
/// let db = registry.get(&database)?;
/// assert_eq!(db.url, "postgres://localhost");
/// # Ok::<(), dependency_registry::DiError>(())
/// ```
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    /// The process-wide empty registry.
    ///
    /// Every call returns a handle to the same value.
    ///
    /// ```rust
    /// use dependency_registry::Registry;
    ///
    /// assert!(Registry::root().ptr_eq(&Registry::root()));
    /// assert!(Registry::root().is_empty());
    /// ```
    #[inline]
    pub fn root() -> Self {
        ROOT.clone()
    }

    fn from_table(descriptors: Arc<DescriptorTable>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                descriptors,
                local: InstanceCache::new(),
                scope: ScopeId::next(),
            }),
        }
    }

    // =========================================================================
    // Registration Methods
    // =========================================================================

    /// Register a factory for `key`.
    ///
    /// Every key in `deps` must already be registered. On success a new
    /// registry is returned and `self` is left as it was. Registering a key
    /// that is already present replaces its descriptor in the new registry.
    ///
    /// # Errors
    ///
    /// [`DiError::MissingDependency`] naming the first unregistered dependency.
    pub fn register_factory<T, D, F>(
        &self,
        key: &Key<T>,
        deps: D,
        lifecycle: Lifecycle,
        factory: F,
    ) -> Result<Registry>
    where
        T: Send + Sync + 'static,
        D: Dependencies,
        F: Fn(D::Resolved) -> T + Send + Sync + 'static,
    {
        self.insert(Descriptor::new(key, deps, lifecycle, factory))
    }

    /// Register a factory that may fail.
    ///
    /// Factory errors surface from [`get`](Self::get) as
    /// [`DiError::CreationFailed`]; nothing is cached for a failed attempt.
    pub fn try_register_factory<T, D, F, E>(
        &self,
        key: &Key<T>,
        deps: D,
        lifecycle: Lifecycle,
        factory: F,
    ) -> Result<Registry>
    where
        T: Send + Sync + 'static,
        D: Dependencies,
        F: Fn(D::Resolved) -> std::result::Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.insert(Descriptor::fallible(key, deps, lifecycle, factory))
    }

    /// Start a fluent registration for `key`.
    ///
    /// ```rust
    /// use dependency_registry::{Key, Registry};
    ///
    /// let base = Key::<u32>::new("base");
    /// let doubled = Key::<u32>::new("doubled");
    ///
    /// let registry = Registry::root()
    ///     .register(&base)
    ///     .factory(|()| 21)?
    ///     .register(&doubled)
    ///     .depends_on(base.clone())
    ///     .ephemeral()
    ///     .factory(|base| *base * 2)?;
    ///
    /// assert_eq!(*registry.get(&doubled)?, 42);
    /// # Ok::<(), dependency_registry::DiError>(())
    /// ```
    #[inline]
    pub fn register<T: Send + Sync + 'static>(&self, key: &Key<T>) -> Registration<'_, T> {
        Registration {
            registry: self,
            key: key.clone(),
            deps: (),
            lifecycle: Lifecycle::default(),
        }
    }

    /// Register a [`Component`] under its own key, dependencies and lifecycle.
    #[inline]
    pub fn register_class<C: Component>(&self) -> Result<Registry> {
        self.register_factory(&C::key(), C::dependencies(), C::LIFECYCLE, C::construct)
    }

    fn insert(&self, descriptor: Descriptor) -> Result<Registry> {
        let table = &self.inner.descriptors;
        let key = descriptor.key();

        if let Some(missing) = descriptor.deps().iter().find(|dep| !table.contains(dep.id())) {
            #[cfg(feature = "logging")]
            debug!(
                target: "dependency_registry",
                service = key.name(),
                key = key.id().get(),
                dependency = missing.name(),
                "Registration rejected: dependency is not registered"
            );

            return Err(DiError::missing_dependency(key, *missing));
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "dependency_registry",
            service = key.name(),
            key = key.id().get(),
            lifecycle = descriptor.lifecycle().as_str(),
            deps = descriptor.deps().len(),
            replaced = table.contains(key.id()),
            service_count = table.len() + 1,
            "Registering service"
        );

        Ok(Self::from_table(Arc::new(table.with(descriptor))))
    }

    /// Create an independent local scope.
    ///
    /// The fork shares every descriptor and starts with the local singletons
    /// constructed so far. Afterwards the two registries cache local
    /// singletons independently.
    pub fn fork(&self) -> Registry {
        let forked = Self {
            inner: Arc::new(RegistryInner {
                descriptors: Arc::clone(&self.inner.descriptors),
                local: self.inner.local.snapshot(),
                scope: ScopeId::next(),
            }),
        };

        #[cfg(feature = "logging")]
        debug!(
            target: "dependency_registry",
            parent_scope = self.inner.scope.id(),
            scope = forked.inner.scope.id(),
            copied_instances = forked.inner.local.len(),
            "Forked registry"
        );

        forked
    }

    // =========================================================================
    // Resolution Methods
    // =========================================================================

    /// Resolve the instance for `key`, constructing it and any missing
    /// dependencies on demand.
    ///
    /// # Errors
    ///
    /// - [`DiError::UnknownKey`] if `key` (or a dependency) is not registered
    /// - [`DiError::CreationFailed`] if a factory fails
    /// - [`DiError::CircularDependency`] if construction re-enters a key
    pub fn get<T: Send + Sync + 'static>(&self, key: &Key<T>) -> Result<Arc<T>> {
        self.resolve(key.erased())?
            .downcast::<T>()
            .map_err(|_| DiError::type_mismatch::<T>(key.erased()))
    }

    /// Try to resolve, returning None on any error.
    #[inline]
    pub fn try_get<T: Send + Sync + 'static>(&self, key: &Key<T>) -> Option<Arc<T>> {
        self.get(key).ok()
    }

    /// Resolve `deps` and pass them to `factory` without registering anything.
    ///
    /// The result is never cached.
    ///
    /// ```rust
    /// use dependency_registry::{Key, Lifecycle, Registry};
    ///
    /// let greeting = Key::<String>::new("greeting");
    /// let registry = Registry::root()
    ///     .register_factory(&greeting, (), Lifecycle::GlobalSingleton, |()| "hello".to_string())?;
    ///
    /// let shout = registry.make(greeting.clone(), |g| g.to_uppercase())?;
    /// assert_eq!(shout, "HELLO");
    /// # Ok::<(), dependency_registry::DiError>(())
    /// ```
    pub fn make<D, R, F>(&self, deps: D, factory: F) -> Result<R>
    where
        D: Dependencies,
        F: FnOnce(D::Resolved) -> R,
    {
        Ok(factory(self.resolve_all(&deps)?))
    }

    /// Like [`make`](Self::make), for factories that may fail.
    pub fn try_make<D, R, F, E>(&self, deps: D, factory: F) -> Result<R>
    where
        D: Dependencies,
        F: FnOnce(D::Resolved) -> std::result::Result<R, E>,
        E: Into<BoxError>,
    {
        factory(self.resolve_all(&deps)?).map_err(DiError::make_failed)
    }

    fn resolve_all<D: Dependencies>(&self, deps: &D) -> Result<D::Resolved> {
        let instances = self.resolve_each(&deps.keys())?;
        deps.assemble(&instances)
    }

    /// Resolve keys in order, stopping at the first failure.
    fn resolve_each(&self, keys: &[AnyKey]) -> Result<Vec<Instance>> {
        keys.iter().map(|key| self.resolve(*key)).collect()
    }

    fn resolve(&self, key: AnyKey) -> Result<Instance> {
        let descriptor = self
            .inner
            .descriptors
            .get(key.id())
            .ok_or_else(|| DiError::unknown_key(key))?;

        match descriptor.lifecycle() {
            Lifecycle::GlobalSingleton => self.resolve_cached(global_cache(), descriptor),
            Lifecycle::LocalSingleton => self.resolve_cached(&self.inner.local, descriptor),
            Lifecycle::Ephemeral => {
                let _guard = PathGuard::enter(key)?;
                self.construct(descriptor)
            }
        }
    }

    fn resolve_cached(&self, cache: &InstanceCache, descriptor: &Descriptor) -> Result<Instance> {
        let key = descriptor.key();

        if let Some(instance) = cache.get(key.id()) {
            #[cfg(feature = "logging")]
            trace!(
                target: "dependency_registry",
                service = key.name(),
                key = key.id().get(),
                lifecycle = descriptor.lifecycle().as_str(),
                scope = self.inner.scope.id(),
                "Resolved from cache"
            );
            return Ok(instance);
        }

        // Dependencies resolve before the slot is taken, so no slot is ever
        // held while waiting on another one. Only the factory runs inside it.
        let _guard = PathGuard::enter(key)?;
        let instances = self.resolve_each(descriptor.deps())?;

        let slot = cache.slot(key.id());
        let instance = match slot.get_or_try_init(|| descriptor.construct(&instances)) {
            Ok(instance) => Arc::clone(instance),
            Err(err) => {
                cache.discard_empty(key.id(), &slot);
                return Err(err);
            }
        };

        #[cfg(feature = "logging")]
        debug!(
            target: "dependency_registry",
            service = key.name(),
            key = key.id().get(),
            lifecycle = descriptor.lifecycle().as_str(),
            scope = self.inner.scope.id(),
            "Cached singleton instance"
        );

        Ok(instance)
    }

    /// Resolve the descriptor's dependencies, then run its factory.
    fn construct(&self, descriptor: &Descriptor) -> Result<Instance> {
        let instances = self.resolve_each(descriptor.deps())?;
        descriptor.construct(&instances)
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// Check if `key` is registered in this registry.
    #[inline]
    pub fn contains<T: 'static>(&self, key: &Key<T>) -> bool {
        self.inner.descriptors.contains(key.id())
    }

    /// Number of registered keys, including inherited ones.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.descriptors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.descriptors.is_empty()
    }

    /// Registered keys, in first-registration order.
    pub fn keys(&self) -> Vec<AnyKey> {
        self.inner.descriptors.keys().to_vec()
    }

    /// The lifecycle `key` is registered with, if registered.
    #[inline]
    pub fn lifecycle_of<T: 'static>(&self, key: &Key<T>) -> Option<Lifecycle> {
        self.inner
            .descriptors
            .get(key.id())
            .map(|descriptor| descriptor.lifecycle())
    }

    /// Direct dependencies of `key`, in declaration order.
    pub fn dependencies_of<T: 'static>(&self, key: &Key<T>) -> Option<Vec<AnyKey>> {
        self.inner
            .descriptors
            .get(key.id())
            .map(|descriptor| descriptor.deps().to_vec())
    }

    /// Whether `get(key)` would currently be served from a cache.
    ///
    /// Always false for ephemeral and unregistered keys.
    pub fn is_cached<T: 'static>(&self, key: &Key<T>) -> bool {
        match self.lifecycle_of(key) {
            Some(Lifecycle::GlobalSingleton) => global_cache().contains(key.id()),
            Some(Lifecycle::LocalSingleton) => self.inner.local.contains(key.id()),
            Some(Lifecycle::Ephemeral) | None => false,
        }
    }

    /// Identifier of this registry's local scope.
    #[inline]
    pub fn scope_id(&self) -> ScopeId {
        self.inner.scope
    }

    /// Whether both handles refer to the same registry value.
    #[inline]
    pub fn ptr_eq(&self, other: &Registry) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Registry {
    /// The root registry.
    fn default() -> Self {
        Self::root()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("scope", &self.inner.scope)
            .field("service_count", &self.len())
            .field("local_instances", &self.inner.local.len())
            .finish()
    }
}

// =============================================================================
// Fluent Registration
// =============================================================================

/// Fluent registration builder, created by [`Registry::register`].
///
/// Defaults to no dependencies and [`Lifecycle::GlobalSingleton`].
#[must_use = "a registration does nothing until `factory` or `try_factory` is called"]
pub struct Registration<'r, T, D = ()> {
    registry: &'r Registry,
    key: Key<T>,
    deps: D,
    lifecycle: Lifecycle,
}

impl<'r, T, D> Registration<'r, T, D>
where
    T: Send + Sync + 'static,
    D: Dependencies,
{
    /// Declare the dependencies, in the order the factory receives them.
    #[inline]
    pub fn depends_on<D2: Dependencies>(self, deps: D2) -> Registration<'r, T, D2> {
        Registration {
            registry: self.registry,
            key: self.key,
            deps,
            lifecycle: self.lifecycle,
        }
    }

    #[inline]
    pub fn lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// Share one instance across the whole process
    #[inline]
    pub fn global(self) -> Self {
        self.lifecycle(Lifecycle::GlobalSingleton)
    }

    /// Share one instance per registry value
    #[inline]
    pub fn local(self) -> Self {
        self.lifecycle(Lifecycle::LocalSingleton)
    }

    /// Construct a new instance on every resolve
    #[inline]
    pub fn ephemeral(self) -> Self {
        self.lifecycle(Lifecycle::Ephemeral)
    }

    /// Finish with an infallible factory.
    pub fn factory<F>(self, factory: F) -> Result<Registry>
    where
        F: Fn(D::Resolved) -> T + Send + Sync + 'static,
    {
        self.registry
            .register_factory(&self.key, self.deps, self.lifecycle, factory)
    }

    /// Finish with a factory that may fail.
    pub fn try_factory<F, E>(self, factory: F) -> Result<Registry>
    where
        F: Fn(D::Resolved) -> std::result::Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.registry
            .try_register_factory(&self.key, self.deps, self.lifecycle, factory)
    }
}
