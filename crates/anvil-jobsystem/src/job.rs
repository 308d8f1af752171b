use std::sync::atomic::{AtomicU32, Ordering};

/// Inline payload capacity of a [`Job`]; closures spawned through
/// [`crate::JobSystem::create_job`] must fit their captures in this many
/// bytes — larger payloads are a caller error.
pub const MAX_USERDATA_BYTES: usize = 64;

/// Sentinel generation meaning "no parent job".
const NO_PARENT: u32 = u32::MAX;

/// A handle to a job slot, valid iff `generation` matches the slot's current
/// generation. This is a plain `Copy` value rather than a refcounted
/// `Drop`-freed handle: a job's slot is freed deterministically once its
/// `unfinished` counter reaches zero, not by reference counting.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct JobHandle {
    pub index: u32,
    pub generation: u32,
}

impl JobHandle {
    pub(crate) const INVALID: JobHandle = JobHandle {
        index: u32::MAX,
        generation: NO_PARENT,
    };

    pub(crate) fn is_invalid(&self) -> bool {
        self.generation == NO_PARENT && self.index == u32::MAX
    }
}

/// The function a job executes: given a pointer to the owning job system and
/// the handle of the job itself, it reads its captured payload out of
/// `Job::data` and runs it.
pub type TaskFn = unsafe fn(job_system: *const (), job: JobHandle);

/// A fixed, cache-line-friendly job record.
///
/// `#[repr(C)]` plus an explicit padding tail pins the layout to exactly 128
/// bytes, checked by `tests::job_is_128_bytes`.
#[repr(C)]
pub struct Job {
    pub(crate) task_fn: Option<TaskFn>,
    pub(crate) parent: JobHandle,
    pub(crate) unfinished: AtomicU32,
    pub(crate) generation: u32,
    pub(crate) index: u32,
    pub(crate) data: [u8; MAX_USERDATA_BYTES],
    _pad: [u8; 128 - (8 + 8 + 4 + 4 + 4 + MAX_USERDATA_BYTES)],
}

impl Job {
    pub(crate) fn empty(index: u32) -> Self {
        Self {
            task_fn: None,
            parent: JobHandle::INVALID,
            unfinished: AtomicU32::new(0),
            generation: 0,
            index,
            data: [0; MAX_USERDATA_BYTES],
            _pad: [0; 128 - (8 + 8 + 4 + 4 + 4 + MAX_USERDATA_BYTES)],
        }
    }

    pub fn handle(&self) -> JobHandle {
        JobHandle {
            index: self.index,
            generation: self.generation,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.unfinished.load(Ordering::Acquire) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_is_128_bytes() {
        assert_eq!(std::mem::size_of::<Job>(), 128);
    }
}
