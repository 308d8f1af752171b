//! Type-erased registry mapping `ComponentTypeId -> SparseSet<T>`.
//!
//! An open-addressed table of `MapSlot`s carries function pointers
//! (has/addBytes/setBytes/remove) to erase `T` at the call site. The
//! idiomatic Rust rendition of "a vtable per type" is a trait object:
//! [`ComponentColumn`] plays the vtable's role, and `downcast-rs` (already
//! used by `ze-platform::Window`/`Cursor` for the same purpose) recovers the
//! concrete `SparseSet<T>` for the typed fast path.

use crate::component::ComponentTypeId;
use crate::sparse_set::SparseSet;
use anvil_core::error::{Error, Result};
use downcast_rs::{impl_downcast, Downcast};
use std::mem::MaybeUninit;

/// Per-type storage, erased behind a trait object. Implemented generically
/// for `SparseSet<T, CAP>` below; the byte-wise methods back the deferred
/// command-buffer flush path, which only ever holds raw bytes.
pub trait ComponentColumn: Downcast + Send + Sync {
    fn has(&self, idx: u32) -> bool;
    fn add_bytes(&mut self, idx: u32, bytes: &[u8]) -> Result<()>;
    fn set_bytes(&mut self, idx: u32, bytes: &[u8]) -> Result<()>;
    fn remove(&mut self, idx: u32);
}
impl_downcast!(ComponentColumn);

impl<T, const CAP: usize> ComponentColumn for SparseSet<T, CAP>
where
    T: Copy + Send + Sync + 'static,
{
    fn has(&self, idx: u32) -> bool {
        SparseSet::has(self, idx)
    }

    fn add_bytes(&mut self, idx: u32, bytes: &[u8]) -> Result<()> {
        self.add(idx, bytes_to_value::<T>(bytes))
    }

    fn set_bytes(&mut self, idx: u32, bytes: &[u8]) -> Result<()> {
        self.set(idx, bytes_to_value::<T>(bytes))
    }

    fn remove(&mut self, idx: u32) {
        SparseSet::remove(self, idx)
    }
}

fn bytes_to_value<T: Copy>(bytes: &[u8]) -> T {
    assert_eq!(
        bytes.len(),
        std::mem::size_of::<T>(),
        "component byte payload does not match the type's size"
    );
    unsafe {
        let mut value = MaybeUninit::<T>::uninit();
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), value.as_mut_ptr() as *mut u8, bytes.len());
        value.assume_init()
    }
}

struct Slot {
    id: ComponentTypeId,
    column: Box<dyn ComponentColumn>,
}

/// `CAP` is the per-type `SparseSet` capacity (i.e. the entity pool's
/// capacity); `MAX_COMP` is the number of type slots in the open-addressed
/// table and must be a power of two.
pub struct ComponentStore<const CAP: usize, const MAX_COMP: usize> {
    slots: Vec<Option<Slot>>,
}

impl<const CAP: usize, const MAX_COMP: usize> ComponentStore<CAP, MAX_COMP> {
    pub fn new() -> Self {
        assert!(
            MAX_COMP.is_power_of_two(),
            "ComponentStore::MAX_COMP must be a power of two"
        );
        let mut slots = Vec::with_capacity(MAX_COMP);
        slots.resize_with(MAX_COMP, || None);
        Self { slots }
    }

    /// Ensures a column for `T` exists, creating one via linear probing
    /// from `id & (MAX_COMP - 1)` if absent. Idempotent.
    pub fn ensure_storage<T>(&mut self, id: ComponentTypeId) -> Result<()>
    where
        T: Copy + Send + Sync + 'static,
    {
        if self.find_existing(id).is_some() {
            return Ok(());
        }

        let start = (id as usize) & (MAX_COMP - 1);
        for probe in 0..MAX_COMP {
            let i = (start + probe) & (MAX_COMP - 1);
            if self.slots[i].is_none() {
                self.slots[i] = Some(Slot {
                    id,
                    column: Box::new(SparseSet::<T, CAP>::new()),
                });
                return Ok(());
            }
        }
        Err(Error::OutOfSpace)
    }

    pub fn add<T>(&mut self, id: ComponentTypeId, idx: u32, value: T) -> Result<()>
    where
        T: Copy + Send + Sync + 'static,
    {
        self.ensure_storage::<T>(id)?;
        let column = self.column_mut_typed::<T>(id).expect("just ensured");
        column.add(idx, value)
    }

    pub fn set<T>(&mut self, id: ComponentTypeId, idx: u32, value: T) -> Result<()>
    where
        T: Copy + Send + Sync + 'static,
    {
        let column = self
            .column_mut_typed::<T>(id)
            .ok_or(Error::ComponentMissing)?;
        column.set(idx, value)
    }

    pub fn get<T>(&self, id: ComponentTypeId, idx: u32) -> Result<&T>
    where
        T: Copy + Send + Sync + 'static,
    {
        let column = self
            .column_typed::<T>(id)
            .ok_or(Error::ComponentMissing)?;
        column.get(idx)
    }

    pub fn has<T>(&self, id: ComponentTypeId, idx: u32) -> bool
    where
        T: Copy + Send + Sync + 'static,
    {
        self.column_typed::<T>(id).map_or(false, |c| c.has(idx))
    }

    /// Silent no-op if the type has no storage or the entity has no
    /// component of that type.
    pub fn remove<T>(&mut self, id: ComponentTypeId, idx: u32)
    where
        T: Copy + Send + Sync + 'static,
    {
        if let Some(column) = self.column_mut_typed::<T>(id) {
            column.remove(idx);
        }
    }

    /// Byte-wise path used by `CommandBuffer` flush: the column for `id`
    /// must already exist (installed by an earlier typed call), since a raw
    /// byte slice alone carries no way to construct the concrete
    /// `SparseSet<T, CAP>` the first time.
    pub fn has_bytes(&self, id: ComponentTypeId, idx: u32) -> bool {
        self.find_existing(id)
            .map_or(false, |i| self.slots[i].as_ref().unwrap().column.has(idx))
    }

    pub fn add_bytes(&mut self, id: ComponentTypeId, idx: u32, bytes: &[u8]) -> Result<()> {
        let i = self.find_existing(id).ok_or(Error::ComponentMissing)?;
        self.slots[i].as_mut().unwrap().column.add_bytes(idx, bytes)
    }

    pub fn set_bytes(&mut self, id: ComponentTypeId, idx: u32, bytes: &[u8]) -> Result<()> {
        let i = self.find_existing(id).ok_or(Error::ComponentMissing)?;
        self.slots[i].as_mut().unwrap().column.set_bytes(idx, bytes)
    }

    pub fn remove_bytes(&mut self, id: ComponentTypeId, idx: u32) {
        if let Some(i) = self.find_existing(id) {
            self.slots[i].as_mut().unwrap().column.remove(idx);
        }
    }

    fn find_existing(&self, id: ComponentTypeId) -> Option<usize> {
        let start = (id as usize) & (MAX_COMP - 1);
        for probe in 0..MAX_COMP {
            let i = (start + probe) & (MAX_COMP - 1);
            match &self.slots[i] {
                Some(slot) if slot.id == id => return Some(i),
                None => return None,
                _ => continue,
            }
        }
        None
    }

    fn column_typed<T>(&self, id: ComponentTypeId) -> Option<&SparseSet<T, CAP>>
    where
        T: Copy + Send + Sync + 'static,
    {
        let i = self.find_existing(id)?;
        self.slots[i]
            .as_ref()
            .unwrap()
            .column
            .downcast_ref::<SparseSet<T, CAP>>()
    }

    fn column_mut_typed<T>(&mut self, id: ComponentTypeId) -> Option<&mut SparseSet<T, CAP>>
    where
        T: Copy + Send + Sync + 'static,
    {
        let i = self.find_existing(id)?;
        self.slots[i]
            .as_mut()
            .unwrap()
            .column
            .downcast_mut::<SparseSet<T, CAP>>()
    }
}

impl<const CAP: usize, const MAX_COMP: usize> Default for ComponentStore<CAP, MAX_COMP> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::component_type_id;

    #[derive(Copy, Clone, Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[test]
    fn add_get_set_remove_scenario_a() {
        let mut store: ComponentStore<16, 8> = ComponentStore::new();
        let id = component_type_id::<Position>();

        store.add(id, 0, Position { x: 1.0, y: 2.0 }).unwrap();
        assert_eq!(*store.get::<Position>(id, 0).unwrap(), Position { x: 1.0, y: 2.0 });

        store.set(id, 0, Position { x: 3.0, y: 4.0 }).unwrap();
        assert_eq!(*store.get::<Position>(id, 0).unwrap(), Position { x: 3.0, y: 4.0 });

        store.remove::<Position>(id, 0);
        assert!(!store.has::<Position>(id, 0));
        assert_eq!(store.get::<Position>(id, 0).unwrap_err(), Error::ComponentMissing);
    }

    #[test]
    fn set_on_missing_is_an_error() {
        let mut store: ComponentStore<16, 8> = ComponentStore::new();
        let id = component_type_id::<Position>();
        assert_eq!(
            store.set(id, 0, Position { x: 0.0, y: 0.0 }).unwrap_err(),
            Error::ComponentMissing
        );
    }

    #[test]
    fn byte_path_round_trips_through_typed_storage() {
        let mut store: ComponentStore<16, 8> = ComponentStore::new();
        let id = component_type_id::<Position>();
        store.ensure_storage::<Position>(id).unwrap();

        let value = Position { x: 5.0, y: 6.0 };
        let bytes =
            unsafe { std::slice::from_raw_parts(&value as *const Position as *const u8, 8) };
        store.add_bytes(id, 1, bytes).unwrap();
        assert!(store.has_bytes(id, 1));
        assert_eq!(*store.get::<Position>(id, 1).unwrap(), value);
    }

    #[test]
    fn out_of_space_when_type_table_is_full() {
        let mut store: ComponentStore<4, 2> = ComponentStore::new();
        store.ensure_storage::<u32>(0).unwrap();
        store.ensure_storage::<u32>(1).unwrap();
        assert_eq!(store.ensure_storage::<u32>(2).unwrap_err(), Error::OutOfSpace);
    }
}
