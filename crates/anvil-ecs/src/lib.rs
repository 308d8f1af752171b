//! Entity/component/system runtime.
//!
//! `World` (see [`world`]) owns every arena: entity identities, the
//! parent/child hierarchy, per-type component columns, the observer
//! registry, the deferred command buffer, the system scheduler and the
//! lifecycle event queue. Nothing outside `World` holds a reference into it
//! across a suspension point; systems receive `&mut World` for the duration
//! of one call, observers a raw pointer (see `observer.rs` for why).

pub mod command_buffer;
pub mod component;
pub mod component_store;
pub mod entity;
pub mod hierarchy;
pub mod observer;
pub mod scheduler;
pub mod sparse_set;
pub mod world;

pub use anvil_core::error::{Error, Result};
pub use component::{component_type_id, ComponentTypeId};
pub use entity::EntityHandle;
pub use observer::{ObserverFn, ObserverKind};
pub use world::World;
