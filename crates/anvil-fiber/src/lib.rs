//! Stackful cooperative execution contexts.
//!
//! A [`Fiber`] is an opaque OS resource: a POSIX `ucontext_t` on Unix, a
//! Win32 fiber on Windows. Each job the job system runs executes on a
//! freshly created fiber; a worker thread converts itself into a fiber once
//! at startup (its "scheduler fibre") and switches between that and
//! transient job fibres as jobs suspend on `JobSystem::wait` and resume.
//!
//! This crate deliberately stays a thin wrapper over the platform's native
//! fibre/ucontext primitives rather than hand-rolling assembly trampolines
//! (contrast `examples/JonasKruckenberg-k23/libs/fiber`, a no_std
//! stack-switching implementation for a kernel that cannot rely on an OS) —
//! the engine core always runs hosted, so the OS primitive is available and
//! is the simpler, better-trodden path.

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        use unix as imp;
    } else if #[cfg(windows)] {
        mod windows;
        use windows as imp;
    } else {
        compile_error!("anvil-fiber requires a Unix ucontext implementation or a Win32 fiber implementation");
    }
}

/// A stackful, cooperatively-scheduled execution context.
///
/// Not `Send`: a fibre's stack is only meaningful on the thread that created
/// or converted it. Workers create and destroy job fibres locally; they are
/// never handed to another thread.
pub struct Fiber {
    inner: imp::FiberImpl,
    _not_send: std::marker::PhantomData<*const ()>,
}

/// Minimum stack a job fibre is created with (spec default: 32 KiB).
pub const DEFAULT_STACK_BYTES: usize = 32 * 1024;

impl Fiber {
    /// Converts the calling OS thread into a fibre, once per thread. The
    /// returned `Fiber` is the thread's "scheduler fibre": the context that
    /// runs the worker's main loop and that job fibres switch back into.
    pub fn convert_thread() -> Fiber {
        Fiber {
            inner: imp::FiberImpl::convert_thread(),
            _not_send: std::marker::PhantomData,
        }
    }

    /// Creates a fresh fibre with its own stack that will begin executing
    /// `entry(arg)` the first time it is switched into.
    ///
    /// # Safety
    /// `entry` must not return a stack frame that outlives `arg`'s validity,
    /// and must not unwind past the fibre boundary (the job system catches
    /// panics at the job-execution call site, not here).
    pub unsafe fn new(entry: extern "C" fn(usize), arg: usize, stack_bytes: usize) -> Fiber {
        Fiber {
            inner: imp::FiberImpl::new(entry, arg, stack_bytes),
            _not_send: std::marker::PhantomData,
        }
    }

    /// Suspends the calling fibre (`self`) and resumes `target`. Returns
    /// once some other party switches back into `self`.
    pub fn switch_to(&self, target: &Fiber) {
        imp::switch(&self.inner, &target.inner);
    }

    /// Destroys a fibre and frees its stack.
    ///
    /// # Panics
    /// Panics (debug builds) if `self` is the fibre currently executing.
    pub fn destroy(self) {
        imp::FiberImpl::destroy(self.inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    thread_local! {
        static STEPS: Rc<Cell<u32>> = Rc::new(Cell::new(0));
        static RETURN_TO: Cell<*const Fiber> = const { Cell::new(std::ptr::null()) };
    }

    extern "C" fn job_entry(arg: usize) {
        STEPS.with(|s| s.set(s.get() + 1));
        let scheduler: &Fiber = unsafe { &*(arg as *const Fiber) };
        let current = RETURN_TO.with(|c| c.get());
        let current: &Fiber = unsafe { &*current };
        current.switch_to(scheduler);
    }

    #[test]
    fn convert_and_switch_round_trip() {
        let scheduler = Fiber::convert_thread();
        STEPS.with(|s| s.set(0));

        let job = unsafe {
            Fiber::new(
                job_entry,
                &scheduler as *const Fiber as usize,
                DEFAULT_STACK_BYTES,
            )
        };

        RETURN_TO.with(|c| c.set(&job as *const Fiber));
        scheduler.switch_to(&job);

        assert_eq!(STEPS.with(|s| s.get()), 1);
        job.destroy();
    }
}
