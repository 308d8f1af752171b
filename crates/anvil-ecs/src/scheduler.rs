//! Ordered, single-threaded per-frame system execution.
//!
//! Systems are boxed `FnMut(&mut World, f32)` closures rather than the
//! spec's bare function-pointer-plus-context shape: unlike `ObserverList`
//! (fired re-entrantly from inside a `&mut World` method),
//! `World::run_frame` can safely hand a system the `&mut World` it needs by
//! temporarily moving the scheduler out of `self` for the duration of the
//! run (see `world.rs`), so there is no aliasing hazard to route around
//! with raw pointers here.

use crate::world::World;
use anvil_core::error::{Error, Result};

pub struct SystemEntry {
    order: u8,
    system: Box<dyn FnMut(&mut World, f32)>,
}

#[derive(Default)]
pub struct SystemScheduler<const MAX_SYSTEMS: usize> {
    systems: Vec<SystemEntry>,
}

impl<const MAX_SYSTEMS: usize> SystemScheduler<MAX_SYSTEMS> {
    pub fn new() -> Self {
        Self { systems: Vec::with_capacity(MAX_SYSTEMS) }
    }

    /// Insertion-sorted by `order` ascending (lower runs first); among
    /// equal orders, registration order is preserved.
    pub fn register(
        &mut self,
        system: impl FnMut(&mut World, f32) + 'static,
        order: u8,
    ) -> Result<()> {
        if self.systems.len() >= MAX_SYSTEMS {
            return Err(Error::OutOfSpace);
        }
        let pos = self.systems.partition_point(|e| e.order <= order);
        self.systems.insert(
            pos,
            SystemEntry {
                order,
                system: Box::new(system),
            },
        );
        Ok(())
    }

    /// Invokes each registered system once, in stored sequence. No
    /// parallelism at this layer; a system that wants
    /// concurrency dispatches jobs through the job system itself.
    pub fn run(&mut self, world: &mut World, dt: f32) {
        for entry in &mut self.systems {
            (entry.system)(world, dt);
        }
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::World;

    #[test]
    fn systems_run_in_order_independent_of_registration() {
        let mut scheduler: SystemScheduler<4> = SystemScheduler::new();
        let order = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));

        let order_b = order.clone();
        scheduler
            .register(move |_w: &mut World, _dt| order_b.borrow_mut().push('B'), 2)
            .unwrap();
        let order_a = order.clone();
        scheduler
            .register(move |_w: &mut World, _dt| order_a.borrow_mut().push('A'), 1)
            .unwrap();

        let mut world = World::new();
        scheduler.run(&mut world, 0.016);

        assert_eq!(*order.borrow(), vec!['A', 'B']);
    }
}
