use libc::{getcontext, makecontext, swapcontext, ucontext_t};
use std::mem::MaybeUninit;

/// Owns the stack memory for fibres created via `FiberImpl::new`; `None` for
/// a fibre produced by `convert_thread` (it runs on the OS thread's own
/// stack).
struct Stack {
    ptr: *mut libc::c_void,
}

impl Drop for Stack {
    fn drop(&mut self) {
        unsafe {
            libc::free(self.ptr);
        }
    }
}

pub struct FiberImpl {
    ctx: Box<ucontext_t>,
    _stack: Option<Stack>,
}

/// `makecontext`'s entry point is `void(*)()` taking a platform-defined
/// number of `int` arguments; we pack a `usize` into two 32-bit halves to
/// pass it through portably.
extern "C" fn trampoline(arg_hi: u32, arg_lo: u32) {
    let packed = ((arg_hi as usize) << 32) | (arg_lo as usize);
    // Reclaim the boxed (entry, arg) pair stashed at `packed` by `new`.
    let (entry, real_arg) = *unsafe { Box::from_raw(packed as *mut (extern "C" fn(usize), usize)) };
    entry(real_arg);
    // `entry` never returns for a well-behaved job trampoline (it switches
    // back to the scheduler fibre itself); reaching here means it did,
    // which is a programming error in the caller, not in this crate.
    unreachable!("fiber entry point returned instead of switching away");
}

impl FiberImpl {
    pub fn convert_thread() -> Self {
        let mut ctx = Box::new(unsafe { MaybeUninit::<ucontext_t>::zeroed().assume_init() });
        unsafe {
            getcontext(ctx.as_mut());
        }
        Self { ctx, _stack: None }
    }

    pub fn new(entry: extern "C" fn(usize), arg: usize, stack_bytes: usize) -> Self {
        let stack_ptr = unsafe { libc::malloc(stack_bytes) };
        assert!(!stack_ptr.is_null(), "failed to allocate fibre stack");

        let mut ctx = Box::new(unsafe { MaybeUninit::<ucontext_t>::zeroed().assume_init() });
        unsafe {
            getcontext(ctx.as_mut());
        }
        ctx.uc_stack.ss_sp = stack_ptr;
        ctx.uc_stack.ss_size = stack_bytes;
        ctx.uc_link = std::ptr::null_mut();

        // Leak a boxed (entry, arg) pair; the trampoline reconstructs and
        // frees it on first (only) invocation via `Box::from_raw`.
        let pair = Box::into_raw(Box::new((entry, arg)));
        let packed = pair as usize;
        let hi = (packed >> 32) as u32;
        let lo = (packed & 0xFFFF_FFFF) as u32;

        unsafe {
            makecontext(
                ctx.as_mut(),
                std::mem::transmute::<extern "C" fn(u32, u32), extern "C" fn()>(trampoline),
                2,
                hi,
                lo,
            );
        }

        Self {
            ctx,
            _stack: Some(Stack { ptr: stack_ptr }),
        }
    }

    pub fn destroy(self) {
        // Dropping `self` frees the boxed context and, via `Stack::drop`,
        // the stack memory.
    }
}

pub fn switch(from: &FiberImpl, to: &FiberImpl) {
    unsafe {
        let from_ptr = from.ctx.as_ref() as *const ucontext_t as *mut ucontext_t;
        let to_ptr = to.ctx.as_ref() as *const ucontext_t;
        swapcontext(from_ptr, to_ptr);
    }
}
