//! Slot table mapping event kind to callback.
//!
//! Distinct from `anvil_ecs::observer::ObserverList`: observers fire
//! synchronously during ECS mutation, while listeners are drained against
//! the `EventQueue` once per frame by the script layer. An
//! `active` flag lets a listener unregister itself cheaply without
//! compacting the table mid-dispatch.

use crate::event::{Event, EventKind};

pub type ListenerFn = fn(event: &Event, ctx: *mut ());

struct Slot {
    kind: EventKind,
    callback: ListenerFn,
    ctx: *mut (),
    active: bool,
}

pub struct EventListeners<const MAX_LISTENERS: usize> {
    slots: Vec<Slot>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ListenerHandle(usize);

impl<const MAX_LISTENERS: usize> EventListeners<MAX_LISTENERS> {
    pub fn new() -> Self {
        Self {
            slots: Vec::with_capacity(MAX_LISTENERS),
        }
    }

    pub fn register(
        &mut self,
        kind: EventKind,
        callback: ListenerFn,
        ctx: *mut (),
    ) -> Option<ListenerHandle> {
        if self.slots.len() >= MAX_LISTENERS {
            return None;
        }
        self.slots.push(Slot {
            kind,
            callback,
            ctx,
            active: true,
        });
        Some(ListenerHandle(self.slots.len() - 1))
    }

    pub fn unregister(&mut self, handle: ListenerHandle) {
        if let Some(slot) = self.slots.get_mut(handle.0) {
            slot.active = false;
        }
    }

    /// Linear scan invoking every active listener registered for `kind`, in
    /// registration order.
    pub fn dispatch(&self, event: &Event) {
        let Some(kind) = event.kind() else { return };
        for slot in &self.slots {
            if slot.active && slot.kind == kind {
                (slot.callback)(event, slot.ctx);
            }
        }
    }
}

impl<const MAX_LISTENERS: usize> Default for EventListeners<MAX_LISTENERS> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    thread_local! {
        static HITS: Cell<u32> = Cell::new(0);
    }

    fn bump(_event: &Event, _ctx: *mut ()) {
        HITS.with(|h| h.set(h.get() + 1));
    }

    #[test]
    fn dispatch_filters_by_kind() {
        let mut listeners: EventListeners<4> = EventListeners::new();
        listeners.register(EventKind::KeyDown, bump, std::ptr::null_mut());
        listeners.register(EventKind::KeyUp, bump, std::ptr::null_mut());

        let event = Event::new(EventKind::KeyDown, &[]);
        HITS.with(|h| h.set(0));
        listeners.dispatch(&event);
        assert_eq!(HITS.with(|h| h.get()), 1);
    }

    #[test]
    fn unregister_stops_future_dispatch() {
        let mut listeners: EventListeners<4> = EventListeners::new();
        let handle = listeners
            .register(EventKind::KeyDown, bump, std::ptr::null_mut())
            .unwrap();
        listeners.unregister(handle);

        HITS.with(|h| h.set(0));
        listeners.dispatch(&Event::new(EventKind::KeyDown, &[]));
        assert_eq!(HITS.with(|h| h.get()), 0);
    }
}
