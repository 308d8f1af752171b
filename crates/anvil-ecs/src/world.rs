//! Façade combining the entity pool, hierarchy, component store, observer
//! list, command buffer and system scheduler into one owner.
//!
//! Cyclic object graphs are re-cast as a single owner holding arenas;
//! everything else addresses entities by generation-tagged indices. `World`
//! is the one place that owns state; systems, observers and commands never
//! hold a reference into it across a suspension point — they are handed
//! `&mut World` (systems) or a raw pointer (observers, see `observer.rs`)
//! only for the duration of one synchronous call.

use crate::command_buffer::{CommandBuffer, CommandKind};
use crate::component::{component_type_id, ComponentTypeId};
use crate::component_store::ComponentStore;
use crate::entity::{EntityHandle, EntityPool};
use crate::hierarchy::Hierarchy;
use crate::observer::{ObserverFn, ObserverKind, ObserverList};
use crate::scheduler::SystemScheduler;
use anvil_core::error::{Error, Result};
use anvil_events::{Event, EventKind, EventQueue, IntTuplePayload};

/// Maximum live entities. A packed `EntityHandle` has 24 bits of index room;
/// this default stays well under that ceiling while keeping the
/// per-component-type `SparseSet` arenas (and the inline `HandlePool` arrays
/// behind `EntityPool`) a modest, stack-friendly size.
pub const MAX_ENTITIES: usize = 1 << 13;
/// Component type slots in the open-addressed `ComponentStore`;
/// must be a power of two.
pub const MAX_COMPONENT_TYPES: usize = 128;
pub const MAX_OBSERVERS: usize = 512;
pub const MAX_SYSTEMS: usize = 64;
pub const MAX_COMMANDS: usize = 4096;
pub const COMMAND_STAGE_BYTES: usize = 256 * 1024;
/// Capacity of the ECS lifecycle event queue; must be a power
/// of two.
pub const EVENT_QUEUE_CAPACITY: usize = 1024;

pub struct World {
    entities: EntityPool<MAX_ENTITIES>,
    hierarchy: Hierarchy<MAX_ENTITIES>,
    components: ComponentStore<MAX_ENTITIES, MAX_COMPONENT_TYPES>,
    observers: ObserverList<MAX_OBSERVERS>,
    commands: CommandBuffer<MAX_COMMANDS, COMMAND_STAGE_BYTES>,
    scheduler: SystemScheduler<MAX_SYSTEMS>,
    events: EventQueue<EVENT_QUEUE_CAPACITY>,
}

impl World {
    pub fn new() -> Self {
        Self {
            entities: EntityPool::new(),
            hierarchy: Hierarchy::new(),
            components: ComponentStore::new(),
            observers: ObserverList::new(),
            commands: CommandBuffer::new(),
            scheduler: SystemScheduler::new(),
            events: EventQueue::new(),
        }
    }

    // -- entity lifecycle ------------------------------------------------

    pub fn create(&mut self) -> Result<EntityHandle> {
        self.entities.create()
    }

    /// Destroys `entity`. This does **not** cascade into the component
    /// store — see `DESIGN.md`'s resolution of the corresponding open
    /// question.
    pub fn destroy(&mut self, entity: EntityHandle) -> Result<()> {
        self.entities.destroy(entity)
    }

    pub fn is_valid(&self, entity: EntityHandle) -> bool {
        self.entities.is_valid(entity)
    }

    pub fn set_parent(&mut self, child: EntityHandle, parent: Option<EntityHandle>) {
        self.hierarchy.attach(child, parent);
    }

    pub fn iter_children(&self, parent: EntityHandle, visitor: impl FnMut(u32)) {
        self.hierarchy.iter_children(parent, visitor);
    }

    // -- direct component path -------------------------------------------

    pub fn add<T>(&mut self, entity: EntityHandle, value: T) -> Result<()>
    where
        T: Copy + Send + Sync + 'static,
    {
        if !self.is_valid(entity) {
            return Err(Error::InvalidHandle);
        }
        let id = component_type_id::<T>();
        self.components.add(id, entity.index(), value)?;
        self.observers
            .notify(id, ObserverKind::Add, self as *const World, entity);
        self.push_component_event(EventKind::ComponentAdd, entity, id);
        Ok(())
    }

    pub fn set<T>(&mut self, entity: EntityHandle, value: T) -> Result<()>
    where
        T: Copy + Send + Sync + 'static,
    {
        if !self.is_valid(entity) {
            return Err(Error::InvalidHandle);
        }
        let id = component_type_id::<T>();
        self.components.set(id, entity.index(), value)?;
        self.observers
            .notify(id, ObserverKind::Set, self as *const World, entity);
        self.push_component_event(EventKind::ComponentSet, entity, id);
        Ok(())
    }

    pub fn get<T>(&self, entity: EntityHandle) -> Result<&T>
    where
        T: Copy + Send + Sync + 'static,
    {
        if !self.is_valid(entity) {
            return Err(Error::InvalidHandle);
        }
        self.components.get(component_type_id::<T>(), entity.index())
    }

    pub fn has<T>(&self, entity: EntityHandle) -> bool
    where
        T: Copy + Send + Sync + 'static,
    {
        self.is_valid(entity) && self.components.has::<T>(component_type_id::<T>(), entity.index())
    }

    /// Silent no-op if the entity has no component of that type.
    pub fn remove<T>(&mut self, entity: EntityHandle) -> Result<()>
    where
        T: Copy + Send + Sync + 'static,
    {
        if !self.is_valid(entity) {
            return Err(Error::InvalidHandle);
        }
        let id = component_type_id::<T>();
        self.components.remove::<T>(id, entity.index());
        self.observers
            .notify(id, ObserverKind::Remove, self as *const World, entity);
        self.push_component_event(EventKind::ComponentRemove, entity, id);
        Ok(())
    }

    pub fn register_observer(
        &mut self,
        type_id: ComponentTypeId,
        kind: ObserverKind,
        callback: ObserverFn,
        ctx: *mut (),
    ) -> Result<()> {
        self.observers.register(type_id, kind, callback, ctx)
    }

    // -- deferred command path --------------------------------------------

    /// Stages a deferred `add`. The type's storage is created eagerly
    /// (still deferring the write itself) so the byte-wise flush path has
    /// somewhere to write into (see `component_store.rs`'s note on
    /// `add_bytes`/`set_bytes` requiring pre-existing storage).
    pub fn queue_add<T>(&mut self, entity: EntityHandle, value: T) -> Result<()>
    where
        T: Copy + Send + Sync + 'static,
    {
        let id = component_type_id::<T>();
        self.components.ensure_storage::<T>(id)?;
        let bytes = unsafe { anvil_events::event::bytes_of(&value) };
        self.commands.push(CommandKind::Add, id, entity, Some(bytes))
    }

    pub fn queue_set<T>(&mut self, entity: EntityHandle, value: T) -> Result<()>
    where
        T: Copy + Send + Sync + 'static,
    {
        let id = component_type_id::<T>();
        let bytes = unsafe { anvil_events::event::bytes_of(&value) };
        self.commands.push(CommandKind::Set, id, entity, Some(bytes))
    }

    pub fn queue_remove<T>(&mut self, entity: EntityHandle) -> Result<()>
    where
        T: 'static,
    {
        self.commands
            .push(CommandKind::Remove, component_type_id::<T>(), entity, None)
    }

    pub fn queue_destroy(&mut self, entity: EntityHandle) -> Result<()> {
        self.commands.push(CommandKind::Destroy, 0, entity, None)
    }

    // -- systems & frame driver --------------------------------------------

    pub fn register_system(
        &mut self,
        system: impl FnMut(&mut World, f32) + 'static,
        order: u8,
    ) -> Result<()> {
        self.scheduler.register(system, order)
    }

    /// Runs every registered system once, then flushes the command buffer.
    pub fn run_frame(&mut self, dt: f32) {
        // `SystemScheduler::run` needs `&mut World` to hand to each system,
        // which would alias `self.scheduler` if called as a method on it
        // directly; moving it out for the call's duration sidesteps that
        // (see `scheduler.rs`).
        let mut scheduler = std::mem::take(&mut self.scheduler);
        scheduler.run(self, dt);
        self.scheduler = scheduler;

        self.flush_commands();
    }

    /// Applies every staged command in push order via the type-erased byte
    /// path, notifying observers and pushing lifecycle events exactly as
    /// the direct path does. An invalid handle at flush time is a silent
    /// no-op — the command was authored against a world
    /// snapshot that may no longer hold.
    fn flush_commands(&mut self) {
        let entries: Vec<(CommandKind, ComponentTypeId, EntityHandle, Vec<u8>)> = self
            .commands
            .iter()
            .map(|(cmd, payload)| (cmd.kind, cmd.type_id, cmd.entity, payload.to_vec()))
            .collect();

        for (kind, type_id, entity, payload) in entries {
            if !self.is_valid(entity) {
                continue;
            }

            match kind {
                CommandKind::Add => {
                    if self.components.add_bytes(type_id, entity.index(), &payload).is_ok() {
                        self.observers
                            .notify(type_id, ObserverKind::Add, self as *const World, entity);
                        self.push_component_event(EventKind::ComponentAdd, entity, type_id);
                    }
                }
                CommandKind::Set => {
                    if self.components.set_bytes(type_id, entity.index(), &payload).is_ok() {
                        self.observers
                            .notify(type_id, ObserverKind::Set, self as *const World, entity);
                        self.push_component_event(EventKind::ComponentSet, entity, type_id);
                    }
                }
                CommandKind::Remove => {
                    self.components.remove_bytes(type_id, entity.index());
                    self.observers
                        .notify(type_id, ObserverKind::Remove, self as *const World, entity);
                    self.push_component_event(EventKind::ComponentRemove, entity, type_id);
                }
                CommandKind::Destroy => {
                    // Entity destruction does not cascade into the component
                    // store.
                    let _ = self.entities.destroy(entity);
                }
            }
        }

        self.commands.clear();
    }

    fn push_component_event(&mut self, kind: EventKind, entity: EntityHandle, type_id: ComponentTypeId) {
        let payload = IntTuplePayload(
            entity.index(),
            entity.generation() as u32,
            type_id as u32,
            (type_id >> 32) as u32,
        );
        let event = unsafe { Event::new(kind, anvil_events::event::bytes_of(&payload)) };
        self.events.push(event);
    }

    pub fn poll_event(&mut self, out: &mut [Event]) -> usize {
        self.events.drain_to(out)
    }

    pub fn push_external_event(&mut self, event: Event) {
        self.events.push(event);
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[test]
    fn scenario_a_entity_component_roundtrip() {
        let mut world = World::new();
        let e = world.create().unwrap();

        world.add(e, Position { x: 1.0, y: 2.0 }).unwrap();
        assert_eq!(*world.get::<Position>(e).unwrap(), Position { x: 1.0, y: 2.0 });

        world.set(e, Position { x: 3.0, y: 4.0 }).unwrap();
        assert_eq!(*world.get::<Position>(e).unwrap(), Position { x: 3.0, y: 4.0 });

        world.remove::<Position>(e).unwrap();
        assert!(!world.has::<Position>(e));
        assert_eq!(world.get::<Position>(e).unwrap_err(), Error::ComponentMissing);
    }

    #[test]
    fn invalid_handle_is_an_error_on_mutation() {
        let mut world = World::new();
        let e = world.create().unwrap();
        world.destroy(e).unwrap();
        assert_eq!(
            world.add(e, Position { x: 0.0, y: 0.0 }).unwrap_err(),
            Error::InvalidHandle
        );
    }

    #[test]
    fn scenario_c_systems_run_in_order_exactly_once() {
        let mut world = World::new();
        let calls = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));

        let calls_b = calls.clone();
        world
            .register_system(move |_w, _dt| calls_b.borrow_mut().push('B'), 2)
            .unwrap();
        let calls_a = calls.clone();
        world
            .register_system(move |_w, _dt| calls_a.borrow_mut().push('A'), 1)
            .unwrap();

        world.run_frame(0.016);
        assert_eq!(*calls.borrow(), vec!['A', 'B']);
    }

    #[test]
    fn deferred_commands_apply_in_push_order_at_flush() {
        let mut world = World::new();
        let e = world.create().unwrap();

        world.queue_add(e, Position { x: 1.0, y: 1.0 }).unwrap();
        world.queue_set(e, Position { x: 2.0, y: 2.0 }).unwrap();
        world.run_frame(0.0);

        assert_eq!(*world.get::<Position>(e).unwrap(), Position { x: 2.0, y: 2.0 });
    }

    #[test]
    fn deferred_destroy_does_not_cascade_into_components() {
        let mut world = World::new();
        let e = world.create().unwrap();
        world.add(e, Position { x: 1.0, y: 1.0 }).unwrap();

        world.queue_destroy(e).unwrap();
        world.run_frame(0.0);

        assert!(!world.is_valid(e));
        // The component store slot is stale but untouched; `has` already
        // reports false because the handle itself no longer validates.
        assert!(!world.has::<Position>(e));
    }

    #[test]
    fn flush_silently_skips_commands_against_a_stale_handle() {
        let mut world = World::new();
        let e = world.create().unwrap();
        world.queue_add(e, Position { x: 1.0, y: 1.0 }).unwrap();
        world.destroy(e).unwrap();

        // Must not panic or error out; the command is simply dropped.
        world.run_frame(0.0);
        assert!(!world.is_valid(e));
    }

    #[test]
    fn component_mutation_notifies_observers() {
        use crate::observer::ObserverKind;
        use std::cell::Cell;

        thread_local! {
            static ADD_COUNT: Cell<u32> = Cell::new(0);
        }

        unsafe fn on_add(_w: *const World, _e: EntityHandle, _t: ComponentTypeId, _c: *mut ()) {
            ADD_COUNT.with(|c| c.set(c.get() + 1));
        }

        let mut world = World::new();
        world
            .register_observer(component_type_id::<Position>(), ObserverKind::Add, on_add, std::ptr::null_mut())
            .unwrap();

        ADD_COUNT.with(|c| c.set(0));
        let e = world.create().unwrap();
        world.add(e, Position { x: 0.0, y: 0.0 }).unwrap();
        assert_eq!(ADD_COUNT.with(|c| c.get()), 1);
    }
}
