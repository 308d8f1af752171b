//! Fixed-capacity callback registry fired synchronously on component
//! add/set/remove.
//!
//! Observers hold opaque callback pointers and a context pointer; they never
//! own state — a bare `unsafe fn` plus a raw context pointer rather than a
//! boxed closure, since a closure capturing `&mut World` would conflict with
//! the `&mut World` the firing call site already holds (component mutation
//! notifies observers from inside `World::add`/`set`/`remove`, which is
//! itself a `&mut self` method).

use crate::component::ComponentTypeId;
use crate::entity::EntityHandle;
use crate::world::World;
use anvil_core::error::{Error, Result};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ObserverKind {
    Add,
    Set,
    Remove,
}

/// # Safety
/// Implementations must not assume `world` is exclusively borrowed; the
/// callback runs while the World that raised the notification is mid-call.
/// `ctx` is whatever the registrant passed to `register` and is never
/// dereferenced by the observer list itself.
pub type ObserverFn = unsafe fn(
    world: *const World,
    entity: EntityHandle,
    type_id: ComponentTypeId,
    ctx: *mut (),
);

struct Slot {
    type_id: ComponentTypeId,
    kind: ObserverKind,
    callback: ObserverFn,
    ctx: *mut (),
}

pub struct ObserverList<const MAX_OBSERVERS: usize> {
    slots: Vec<Slot>,
}

impl<const MAX_OBSERVERS: usize> ObserverList<MAX_OBSERVERS> {
    pub fn new() -> Self {
        Self {
            slots: Vec::with_capacity(MAX_OBSERVERS),
        }
    }

    pub fn register(
        &mut self,
        type_id: ComponentTypeId,
        kind: ObserverKind,
        callback: ObserverFn,
        ctx: *mut (),
    ) -> Result<()> {
        if self.slots.len() >= MAX_OBSERVERS {
            return Err(Error::OutOfSpace);
        }
        self.slots.push(Slot {
            type_id,
            kind,
            callback,
            ctx,
        });
        Ok(())
    }

    /// Invokes every registered callback for `(type_id, kind)`, in
    /// registration order, on the caller's thread.
    pub fn notify(
        &self,
        type_id: ComponentTypeId,
        kind: ObserverKind,
        world: *const World,
        entity: EntityHandle,
    ) {
        for slot in &self.slots {
            if slot.type_id == type_id && slot.kind == kind {
                // Safety: callers of `register` uphold `ObserverFn`'s contract.
                unsafe {
                    (slot.callback)(world, entity, type_id, slot.ctx);
                }
            }
        }
    }
}

impl<const MAX_OBSERVERS: usize> Default for ObserverList<MAX_OBSERVERS> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn notify_invokes_matching_callbacks_in_registration_order() {
        thread_local! {
            static ORDER: Cell<Vec<u32>> = Cell::new(Vec::new());
        }

        unsafe fn record_first(_w: *const World, _e: EntityHandle, _t: ComponentTypeId, _c: *mut ()) {
            ORDER.with(|o| {
                let mut v = o.take();
                v.push(1);
                o.set(v);
            });
        }
        unsafe fn record_second(_w: *const World, _e: EntityHandle, _t: ComponentTypeId, _c: *mut ()) {
            ORDER.with(|o| {
                let mut v = o.take();
                v.push(2);
                o.set(v);
            });
        }

        let mut list: ObserverList<4> = ObserverList::new();
        list.register(42, ObserverKind::Add, record_first, std::ptr::null_mut())
            .unwrap();
        list.register(42, ObserverKind::Add, record_second, std::ptr::null_mut())
            .unwrap();
        list.register(99, ObserverKind::Add, record_second, std::ptr::null_mut())
            .unwrap();

        let entity = EntityHandle::from_packed(0);
        list.notify(42, ObserverKind::Add, std::ptr::null(), entity);

        assert_eq!(ORDER.with(|o| o.take()), vec![1, 2]);
    }

    #[test]
    fn register_rejects_once_full() {
        unsafe fn noop(_w: *const World, _e: EntityHandle, _t: ComponentTypeId, _c: *mut ()) {}

        let mut list: ObserverList<1> = ObserverList::new();
        list.register(1, ObserverKind::Set, noop, std::ptr::null_mut())
            .unwrap();
        assert_eq!(
            list.register(2, ObserverKind::Set, noop, std::ptr::null_mut())
                .unwrap_err(),
            Error::OutOfSpace
        );
    }
}
