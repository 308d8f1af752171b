//! Component type identity: a 64-bit FNV-1a hash of the type's canonical
//! name.
//!
//! Two distinct component types must not collide; a collision is a
//! precondition failure. `ze-ecs::component::Component` instead hands
//! out a process-global `AtomicUsize` counter per derive-macro registration
//! — this repo uses a content hash instead, since script callers need to
//! derive the same id from a bare component name string without a derive
//! macro or a registration call.

use fnv::FnvHasher;
use std::hash::Hasher;

pub type ComponentTypeId = u64;

/// Hashes a component's canonical type name with FNV-1a. Used both for
/// Rust-side `T: 'static` components (via `std::any::type_name`) and for
/// the script boundary, where component identities are strings hashed on
/// first use.
pub fn hash_name(name: &str) -> ComponentTypeId {
    let mut hasher = FnvHasher::default();
    hasher.write(name.as_bytes());
    hasher.finish()
}

pub fn component_type_id<T: 'static>() -> ComponentTypeId {
    hash_name(std::any::type_name::<T>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_types_do_not_collide() {
        struct A;
        struct B;
        assert_ne!(component_type_id::<A>(), component_type_id::<B>());
    }

    #[test]
    fn same_type_id_is_stable() {
        struct Position {
            #[allow(dead_code)]
            x: f32,
        }
        assert_eq!(component_type_id::<Position>(), component_type_id::<Position>());
    }

    #[test]
    fn script_side_name_hash_matches_rust_side() {
        // A script caller hashing a bare type name string must land on the
        // same id a Rust-side `component_type_id::<T>()` call would only if
        // the names agree; this just documents that `hash_name` is the
        // shared primitive both sides call.
        assert_eq!(hash_name("demo::Position"), hash_name("demo::Position"));
    }
}
