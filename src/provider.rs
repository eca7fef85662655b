//! Lifecycles and self-describing components
//!
//! [`Lifecycle`] decides how instances are shared. [`Component`] lets a type
//! declare its own key, dependencies and lifecycle so it can be registered
//! with [`Registry::register_class`](crate::Registry::register_class).

use crate::deps::Dependencies;
use crate::Key;

/// Service lifecycle specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifecycle {
    /// One instance for the whole process, shared by every registry
    #[default]
    GlobalSingleton,

    /// One instance per registry value
    LocalSingleton,

    /// New instance on every resolve, never cached
    Ephemeral,
}

impl Lifecycle {
    /// Stable lowercase name, used in log fields.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::GlobalSingleton => "global_singleton",
            Lifecycle::LocalSingleton => "local_singleton",
            Lifecycle::Ephemeral => "ephemeral",
        }
    }
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A type that knows how to register itself.
///
/// The key is usually a static declared with [`declare_key!`](crate::declare_key).
///
/// # Example
///
/// ```rust
/// use dependency_registry::{declare_key, Component, Key, Lifecycle, Registry};
/// use std::sync::Arc;
///
/// struct Config {
///     url: String,
/// }
///
/// struct Database {
///     config: Arc<Config>,
/// }
///
/// declare_key!(static CONFIG: Config = "config");
/// declare_key!(static DATABASE: Database = "database");
///
/// impl Component for Config {
///     type Deps = ();
///
///     fn key() -> Key<Self> {
///         CONFIG.clone()
///     }
///
///     fn dependencies() -> Self::Deps {}
///
///     fn construct(_: ()) -> Self {
///         Config { url: "postgres://localhost".into() }
///     }
/// }
///
/// impl Component for Database {
///     type Deps = Key<Config>;
///     const LIFECYCLE: Lifecycle = Lifecycle::LocalSingleton;
///
///     fn key() -> Key<Self> {
///         DATABASE.clone()
///     }
///
///     fn dependencies() -> Self::Deps {
///         CONFIG.clone()
///     }
///
///     fn construct(config: Arc<Config>) -> Self {
///         Database { config }
///     }
/// }
///
/// let registry = Registry::root()
///     .register_class::<Config>()?
///     .register_class::<Database>()?;
///
/// let db = registry.get(&DATABASE)?;
/// assert_eq!(db.config.url, "postgres://localhost");
/// # Ok::<(), dependency_registry::DiError>(())
/// ```
pub trait Component: Send + Sync + Sized + 'static {
    /// The dependencies required to construct this component.
    type Deps: Dependencies;

    /// How instances are shared.
    const LIFECYCLE: Lifecycle = Lifecycle::GlobalSingleton;

    /// The key this component is registered under.
    fn key() -> Key<Self>;

    /// Dependency keys, in the order `construct` receives them.
    fn dependencies() -> Self::Deps;

    /// Create a new instance given the resolved dependencies.
    fn construct(deps: <Self::Deps as Dependencies>::Resolved) -> Self;
}

/// Declare a process-wide key, allocated on first access.
///
/// ```rust
/// use dependency_registry::declare_key;
///
/// struct Mailer;
///
/// declare_key!(pub static MAILER: Mailer = "mailer");
///
/// assert_eq!(MAILER.name(), "mailer");
/// assert_eq!(MAILER.id(), MAILER.clone().id());
/// ```
#[macro_export]
macro_rules! declare_key {
    ($(#[$meta:meta])* $vis:vis static $name:ident : $type:ty = $label:expr) => {
        $(#[$meta])*
        $vis static $name: $crate::__private::Lazy<$crate::Key<$type>> =
            $crate::__private::Lazy::new(|| $crate::Key::new($label));
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_global() {
        assert_eq!(Lifecycle::default(), Lifecycle::GlobalSingleton);
    }

    #[test]
    fn test_display() {
        assert_eq!(Lifecycle::LocalSingleton.to_string(), "local_singleton");
    }

    #[test]
    fn test_declared_key_is_stable() {
        struct Widget;
        declare_key!(static WIDGET: Widget = "widget");

        let first = WIDGET.clone();
        let second = WIDGET.clone();
        assert_eq!(first, second);
        assert_eq!(first.name(), "widget");
    }
}
