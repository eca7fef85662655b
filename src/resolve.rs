//! Resolution path tracking
//!
//! Every key being constructed on the current thread is pushed onto a
//! thread-local path for the duration of its construction. Re-entering a key
//! already on the path is a dependency cycle; it is reported as an error
//! instead of recursing until the stack overflows or blocking on the key's
//! own cache slot.

use crate::{AnyKey, DiError, Result};
use std::cell::RefCell;

/// Maximum nesting of constructions on one thread.
///
/// Resolution recurses once per level, so the limit has to stay well inside
/// a default 2 MiB thread stack in unoptimized builds. Dependency chains
/// deeper than this are rejected with [`DiError::DepthExceeded`] even when
/// they are acyclic.
pub const MAX_RESOLUTION_DEPTH: usize = 256;

thread_local! {
    static RESOLUTION_PATH: RefCell<Vec<AnyKey>> = const { RefCell::new(Vec::new()) };
}

/// Marks one key as under construction until dropped.
pub(crate) struct PathGuard {
    key: AnyKey,
}

impl PathGuard {
    /// Push `key` onto the path, failing if it is already there.
    pub(crate) fn enter(key: AnyKey) -> Result<Self> {
        RESOLUTION_PATH.with(|path| {
            let mut path = path.borrow_mut();

            if let Some(start) = path.iter().position(|k| *k == key) {
                let mut cycle = path[start..].to_vec();
                cycle.push(key);
                return Err(DiError::circular(cycle));
            }

            if path.len() >= MAX_RESOLUTION_DEPTH {
                return Err(DiError::DepthExceeded { depth: path.len() });
            }

            path.push(key);
            Ok(Self { key })
        })
    }
}

impl Drop for PathGuard {
    fn drop(&mut self) {
        RESOLUTION_PATH.with(|path| {
            let popped = path.borrow_mut().pop();
            debug_assert_eq!(popped, Some(self.key));
        });
    }
}

/// Keys currently under construction on this thread, outermost first.
pub fn resolution_path() -> Vec<AnyKey> {
    RESOLUTION_PATH.with(|path| path.borrow().clone())
}
