//! Error types for registration and resolution

use crate::key::AnyKey;
use thiserror::Error;

/// Boxed error returned by fallible factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during registry operations
#[derive(Error, Debug)]
pub enum DiError {
    /// A declared dependency is not registered in the registry being extended
    #[error("Cannot register {key}: dependency {dependency} is not registered")]
    MissingDependency { key: AnyKey, dependency: AnyKey },

    /// Key was never registered in this registry chain
    #[error("Unknown key: {key} ({})", .key.type_name())]
    UnknownKey { key: AnyKey },

    /// Factory failed to create the service
    #[error("Failed to create service {key}: {source}")]
    CreationFailed {
        key: AnyKey,
        #[source]
        source: BoxError,
    },

    /// An ad-hoc `make` factory failed
    #[error("Ad-hoc construction failed: {source}")]
    MakeFailed {
        #[source]
        source: BoxError,
    },

    /// Resolution re-entered a key that is still being constructed
    #[error("Circular dependency detected: {}", format_path(.path))]
    CircularDependency { path: Vec<AnyKey> },

    /// Resolution nested deeper than the configured limit
    #[error("Resolution depth limit exceeded ({depth})")]
    DepthExceeded { depth: usize },

    /// A cached or constructed instance did not have the key's type
    #[error("Instance registered for {key} is not a {expected}")]
    TypeMismatch {
        key: AnyKey,
        expected: &'static str,
    },
}

impl DiError {
    #[inline]
    pub fn missing_dependency(key: AnyKey, dependency: AnyKey) -> Self {
        Self::MissingDependency { key, dependency }
    }

    #[inline]
    pub fn unknown_key(key: AnyKey) -> Self {
        Self::UnknownKey { key }
    }

    /// Wrap a factory failure
    #[inline]
    pub fn creation_failed(key: AnyKey, source: impl Into<BoxError>) -> Self {
        Self::CreationFailed {
            key,
            source: source.into(),
        }
    }

    /// Wrap a `try_make` factory failure
    #[inline]
    pub fn make_failed(source: impl Into<BoxError>) -> Self {
        Self::MakeFailed {
            source: source.into(),
        }
    }

    #[inline]
    pub fn circular(path: Vec<AnyKey>) -> Self {
        Self::CircularDependency { path }
    }

    #[inline]
    pub fn type_mismatch<T: 'static>(key: AnyKey) -> Self {
        Self::TypeMismatch {
            key,
            expected: std::any::type_name::<T>(),
        }
    }

    /// The key this error is about, if any.
    pub fn key(&self) -> Option<AnyKey> {
        match self {
            Self::MissingDependency { key, .. }
            | Self::UnknownKey { key }
            | Self::CreationFailed { key, .. }
            | Self::TypeMismatch { key, .. } => Some(*key),
            Self::CircularDependency { path } => path.last().copied(),
            Self::MakeFailed { .. } | Self::DepthExceeded { .. } => None,
        }
    }
}

fn format_path(path: &[AnyKey]) -> String {
    path.iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Key;
    use std::error::Error as _;

    #[test]
    fn test_missing_dependency_message() {
        let key = Key::<u32>::new("consumer");
        let dep = Key::<u32>::new("config");
        let err = DiError::missing_dependency(key.erased(), dep.erased());

        let msg = err.to_string();
        assert!(msg.contains("consumer"));
        assert!(msg.contains("config"));
        assert_eq!(err.key(), Some(key.erased()));
    }

    #[test]
    fn test_creation_failed_keeps_source() {
        let key = Key::<u32>::new("flaky");
        let err = DiError::creation_failed(key.erased(), "connection refused");

        assert!(err.to_string().contains("connection refused"));
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_circular_path_formatting() {
        let a = Key::<u32>::new("a");
        let b = Key::<u32>::new("b");
        let err = DiError::circular(vec![a.erased(), b.erased(), a.erased()]);

        let msg = err.to_string();
        assert!(msg.contains(&format!("{} -> {} -> {}", a, b, a)));
        assert_eq!(err.key(), Some(a.erased()));
    }
}
