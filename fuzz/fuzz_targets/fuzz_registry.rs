#![no_main]

//! Fuzz target for registry operations
//!
//! Drives random sequences of registrations, forks and resolutions and
//! checks the lifecycle and immutability guarantees after every step.

use arbitrary::Arbitrary;
use dependency_registry::{DiError, Key, Lifecycle, Registry};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Arbitrary)]
enum FuzzLifecycle {
    Global,
    Local,
    Ephemeral,
}

impl From<FuzzLifecycle> for Lifecycle {
    fn from(l: FuzzLifecycle) -> Self {
        match l {
            FuzzLifecycle::Global => Lifecycle::GlobalSingleton,
            FuzzLifecycle::Local => Lifecycle::LocalSingleton,
            FuzzLifecycle::Ephemeral => Lifecycle::Ephemeral,
        }
    }
}

#[derive(Debug, Arbitrary)]
enum RegistryOp {
    /// Register key `key` on registry `registry` depending on `deps`
    Register {
        registry: u8,
        key: u8,
        deps: Vec<u8>,
        lifecycle: FuzzLifecycle,
    },
    Fork(u8),
    Get { registry: u8, key: u8 },
    GetTwice { registry: u8, key: u8 },
    Make { registry: u8, deps: Vec<u8> },
}

const KEY_COUNT: usize = 16;

fuzz_target!(|ops: Vec<RegistryOp>| {
    let keys: Vec<Key<u64>> = (0..KEY_COUNT).map(|_| Key::new("fuzz")).collect();
    let key = |i: u8| &keys[i as usize % KEY_COUNT];

    let mut registries = vec![Registry::root()];
    let pick = |registries: &Vec<Registry>, i: u8| registries[i as usize % registries.len()].clone();

    for op in ops.into_iter().take(256) {
        match op {
            RegistryOp::Register { registry, key: k, deps, lifecycle } => {
                let base = pick(&registries, registry);
                let before = base.keys();
                let dep_keys: Vec<Key<u64>> = deps.iter().take(8).map(|d| key(*d).clone()).collect();
                let all_present = dep_keys.iter().all(|d| base.contains(d));

                match base.register_factory(key(k), dep_keys, lifecycle.into(), |values| {
                    values.iter().fold(1u64, |acc, v| acc.wrapping_add(**v))
                }) {
                    Ok(next) => {
                        assert!(all_present);
                        assert!(next.contains(key(k)));
                        registries.push(next);
                    }
                    Err(DiError::MissingDependency { .. }) => assert!(!all_present),
                    Err(other) => panic!("unexpected registration error: {other}"),
                }

                // The receiver never changes
                assert_eq!(base.keys(), before);
            }
            RegistryOp::Fork(registry) => {
                let forked = pick(&registries, registry).fork();
                registries.push(forked);
            }
            RegistryOp::Get { registry, key: k } => {
                let registry = pick(&registries, registry);
                match registry.get(key(k)) {
                    Ok(_) => assert!(registry.contains(key(k))),
                    Err(DiError::UnknownKey { .. }) => assert!(!registry.contains(key(k))),
                    // Overrides can close cycles
                    Err(DiError::CircularDependency { .. }) => {}
                    Err(other) => panic!("unexpected resolution error: {other}"),
                }
            }
            RegistryOp::GetTwice { registry, key: k } => {
                let registry = pick(&registries, registry);
                if let (Ok(a), Ok(b)) = (registry.get(key(k)), registry.get(key(k))) {
                    match registry.lifecycle_of(key(k)) {
                        Some(Lifecycle::Ephemeral) => assert!(!Arc::ptr_eq(&a, &b)),
                        Some(_) => assert!(Arc::ptr_eq(&a, &b)),
                        None => unreachable!(),
                    }
                }
            }
            RegistryOp::Make { registry, deps } => {
                let registry = pick(&registries, registry);
                let dep_keys: Vec<Key<u64>> = deps.iter().take(8).map(|d| key(*d).clone()).collect();
                let _ = registry.make(dep_keys, |values| values.len());
            }
        }

        if registries.len() > 64 {
            registries.drain(1..33);
        }
    }
});
