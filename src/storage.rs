//! Storage for descriptors and constructed instances
//!
//! Descriptors live in an immutable [`DescriptorTable`]; registration clones
//! the table and adds one entry. Instances live in [`InstanceCache`]s backed
//! by `DashMap` with one once-only slot per key, so concurrent resolvers of
//! the same key construct it at most once.

use crate::factory::{Descriptor, Instance};
use crate::key::{AnyKey, KeyId};
use ahash::RandomState;
use dashmap::DashMap;
use once_cell::sync::{Lazy, OnceCell};
use std::collections::HashMap;
use std::sync::Arc;

// =============================================================================
// Descriptor Table
// =============================================================================

/// Immutable mapping from key to descriptor.
#[derive(Clone, Default)]
pub(crate) struct DescriptorTable {
    entries: HashMap<KeyId, Arc<Descriptor>, RandomState>,
    /// Keys in first-registration order
    order: Vec<AnyKey>,
}

impl DescriptorTable {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of this table with `descriptor` added, replacing any previous
    /// descriptor for the same key.
    pub fn with(&self, descriptor: Descriptor) -> Self {
        let mut next = self.clone();
        let key = descriptor.key();
        if next.entries.insert(key.id(), Arc::new(descriptor)).is_none() {
            next.order.push(key);
        }
        next
    }

    #[inline]
    pub fn get(&self, id: KeyId) -> Option<&Arc<Descriptor>> {
        self.entries.get(&id)
    }

    #[inline]
    pub fn contains(&self, id: KeyId) -> bool {
        self.entries.contains_key(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn keys(&self) -> &[AnyKey] {
        &self.order
    }
}

// =============================================================================
// Instance Cache
// =============================================================================

/// Once-only slot holding the cached instance for one key
type Slot = Arc<OnceCell<Instance>>;

/// Thread-safe cache of constructed instances.
pub(crate) struct InstanceCache {
    slots: DashMap<KeyId, Slot, RandomState>,
}

impl InstanceCache {
    /// Create an empty cache.
    ///
    /// 8 shards: caches hold few entries and one is created per registry.
    #[inline]
    pub fn new() -> Self {
        Self {
            slots: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
        }
    }

    /// Cached instance for `id`, if construction already completed.
    #[inline]
    pub fn get(&self, id: KeyId) -> Option<Instance> {
        self.slots.get(&id).and_then(|slot| slot.value().get().cloned())
    }

    /// The slot for `id`, created empty on first request.
    ///
    /// The slot is returned by value so no shard lock is held while a
    /// factory fills it.
    #[inline]
    pub fn slot(&self, id: KeyId) -> Slot {
        Arc::clone(
            self.slots
                .entry(id)
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .value(),
        )
    }

    /// Drop `slot` from the cache after a failed construction.
    ///
    /// Kept when it was filled meanwhile, or when another resolver still
    /// holds it and may fill it; that resolver's instance must stay
    /// reachable through the map.
    pub fn discard_empty(&self, id: KeyId, slot: &Slot) {
        self.slots.remove_if(&id, |_, current| {
            Arc::ptr_eq(current, slot) && current.get().is_none() && Arc::strong_count(current) == 2
        });
    }

    #[inline]
    pub fn contains(&self, id: KeyId) -> bool {
        self.get(id).is_some()
    }

    /// Whether a slot exists for `id`, filled or not.
    #[cfg(test)]
    pub(crate) fn has_slot(&self, id: KeyId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Number of constructed instances.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| entry.value().get().is_some())
            .count()
    }

    /// An independent cache holding the instances constructed so far.
    ///
    /// Instances are shared by reference. Empty slots are not copied, so a
    /// construction still pending here never fills the copy.
    pub fn snapshot(&self) -> Self {
        let copy = Self::new();
        for entry in self.slots.iter() {
            if let Some(instance) = entry.value().get() {
                copy.slots
                    .insert(*entry.key(), Arc::new(OnceCell::with_value(Arc::clone(instance))));
            }
        }
        copy
    }
}

impl Default for InstanceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InstanceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceCache")
            .field("count", &self.len())
            .finish()
    }
}

// =============================================================================
// Global Cache
// =============================================================================

/// The process-wide cache for global singletons.
///
/// Created on first access, never reset.
static GLOBAL_CACHE: Lazy<InstanceCache> = Lazy::new(InstanceCache::new);

/// Access point for the global singleton cache.
#[inline]
pub(crate) fn global_cache() -> &'static InstanceCache {
    &GLOBAL_CACHE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Key, Lifecycle};

    fn descriptor(key: &Key<u32>, value: u32) -> Descriptor {
        Descriptor::new(key, (), Lifecycle::default(), move |()| value)
    }

    #[test]
    fn test_table_with_is_persistent() {
        let key = Key::<u32>::new("answer");
        let empty = DescriptorTable::new();
        let one = empty.with(descriptor(&key, 42));

        assert!(empty.is_empty());
        assert!(!empty.contains(key.id()));
        assert_eq!(one.len(), 1);
        assert!(one.contains(key.id()));
    }

    #[test]
    fn test_table_override_keeps_order() {
        let a = Key::<u32>::new("a");
        let b = Key::<u32>::new("b");
        let table = DescriptorTable::new()
            .with(descriptor(&a, 1))
            .with(descriptor(&b, 2))
            .with(descriptor(&a, 3));

        assert_eq!(table.len(), 2);
        assert_eq!(table.keys(), &[a.erased(), b.erased()]);
    }

    #[test]
    fn test_cache_slot_fills_once() {
        let cache = InstanceCache::new();
        let key = Key::<u32>::new("slot");

        assert!(cache.get(key.id()).is_none());

        let slot = cache.slot(key.id());
        let first = Arc::clone(slot.get_or_init(|| Arc::new(1u32) as Instance));
        let second = Arc::clone(cache.slot(key.id()).get_or_init(|| Arc::new(2u32) as Instance));

        assert!(Arc::ptr_eq(&first, &second));
        assert!(cache.contains(key.id()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_discard_empty_removes_unused_slot() {
        let cache = InstanceCache::new();
        let key = Key::<u32>::new("failed");

        let slot = cache.slot(key.id());
        assert!(slot.get_or_try_init(|| Err::<Instance, _>("boom")).is_err());
        cache.discard_empty(key.id(), &slot);

        assert!(!cache.has_slot(key.id()));
    }

    #[test]
    fn test_discard_empty_keeps_shared_or_filled_slot() {
        let cache = InstanceCache::new();
        let waited = Key::<u32>::new("waited");
        let filled = Key::<u32>::new("filled");

        // A second resolver still holds the slot and may fill it
        let slot = cache.slot(waited.id());
        let other = cache.slot(waited.id());
        cache.discard_empty(waited.id(), &slot);
        assert!(cache.has_slot(waited.id()));
        drop(other);

        let slot = cache.slot(filled.id());
        slot.get_or_init(|| Arc::new(7u32) as Instance);
        cache.discard_empty(filled.id(), &slot);
        assert!(cache.contains(filled.id()));
    }

    #[test]
    fn test_snapshot_skips_empty_slots() {
        let cache = InstanceCache::new();
        let built = Key::<u32>::new("built");
        let pending = Key::<u32>::new("pending");

        let instance = Arc::clone(cache.slot(built.id()).get_or_init(|| Arc::new(1u32) as Instance));
        let _ = cache.slot(pending.id());

        let copy = cache.snapshot();
        assert!(Arc::ptr_eq(&copy.get(built.id()).unwrap(), &instance));
        assert!(!copy.contains(pending.id()));

        // Filling the source cache afterwards leaves the copy alone
        cache.slot(pending.id()).get_or_init(|| Arc::new(2u32) as Instance);
        assert!(!copy.contains(pending.id()));
    }
}
