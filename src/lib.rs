//! # dependency-registry - Key-addressed dependency injection
//!
//! A persistent dependency registry: services are registered under unique
//! keys with an explicit, ordered list of dependency keys and a factory.
//! Registering returns a *new* registry and leaves the old one untouched.
//! Resolving a key constructs its dependencies first and caches the result
//! according to the key's [`Lifecycle`].
//!
//! ## Features
//!
//! - 🔑 **Identity keys** - keys are unique tokens, never names or types
//! - 🧊 **Persistent registries** - registration returns a new registry
//! - 🧭 **Ordered dependencies** - a dependency must be registered before its dependents
//! - 🌍 **Three lifecycles** - process-wide, per-registry, or fresh every time
//! - 🍴 **Forkable scopes** - copy a registry's local singletons into an independent scope
//! - 🔒 **At-most-once construction** - concurrent resolvers of a singleton share one instance
//! - 🔁 **Cycle detection** - re-entrant resolution fails with the offending path
//! - 📊 **Observable** - optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use dependency_registry::{Key, Lifecycle, Registry};
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: std::sync::Arc<Database>,
//! }
//!
//! let database = Key::<Database>::new("database");
//! let users = Key::<UserService>::new("users");
//!
//! let registry = Registry::root()
//!     .register_factory(&database, (), Lifecycle::GlobalSingleton, |()| Database {
//!         url: "postgres://localhost".into(),
//!     })?
//!     .register_factory(&users, database.clone(), Lifecycle::Ephemeral, |db| UserService { db })?;
//!
//! let service = registry.get(&users)?;
//! assert_eq!(service.db.url, "postgres://localhost");
//! # Ok::<(), dependency_registry::DiError>(())
//! ```
//!
//! ## Lifecycles
//!
//! - [`Lifecycle::GlobalSingleton`] - one instance per process, shared by every registry
//! - [`Lifecycle::LocalSingleton`] - one instance per registry value
//! - [`Lifecycle::Ephemeral`] - a new instance on every resolve
//!
//! ## Scopes
//!
//! ```rust
//! use dependency_registry::{Key, Lifecycle, Registry};
//! use std::sync::Arc;
//!
//! struct RequestContext;
//!
//! let ctx = Key::<RequestContext>::new("ctx");
//! let app = Registry::root()
//!     .register_factory(&ctx, (), Lifecycle::LocalSingleton, |()| RequestContext)?;
//!
//! let request_a = app.fork();
//! let request_b = app.fork();
//!
//! assert!(Arc::ptr_eq(&request_a.get(&ctx)?, &request_a.get(&ctx)?));
//! assert!(!Arc::ptr_eq(&request_a.get(&ctx)?, &request_b.get(&ctx)?));
//! # Ok::<(), dependency_registry::DiError>(())
//! ```

mod deps;
mod error;
mod factory;
mod key;
#[cfg(feature = "logging")]
pub mod logging;
mod provider;
mod registry;
mod resolve;
mod scope;
mod storage;

pub use deps::*;
pub use error::*;
pub use factory::Instance;
pub use key::*;
pub use provider::*;
pub use registry::*;
pub use resolve::{resolution_path, MAX_RESOLUTION_DEPTH};
pub use scope::*;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

// Re-export for convenience
pub use std::sync::Arc;

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::Lazy;
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        declare_key, AnyKey, Component, Dependencies, DiError, Key, Lifecycle, Registry, Result,
    };
    pub use std::sync::Arc;
}
