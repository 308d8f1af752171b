use std::cell::UnsafeCell;

/// `UnsafeCell` but `Sync` (if `T` is `Sync`).
///
/// Used by the job system to give worker threads shared, racy access to a
/// job's inline payload bytes; callers are responsible for not aliasing.
#[repr(transparent)]
pub struct SyncUnsafeCell<T: ?Sized> {
    value: UnsafeCell<T>,
}

unsafe impl<T: ?Sized + Sync> Sync for SyncUnsafeCell<T> {}

impl<T> SyncUnsafeCell<T> {
    #[inline]
    pub const fn new(value: T) -> Self {
        Self {
            value: UnsafeCell::new(value),
        }
    }

    #[inline]
    pub const fn get(&self) -> *mut T {
        self.value.get()
    }
}
