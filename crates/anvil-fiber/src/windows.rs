use windows_sys::Win32::System::Threading::{
    ConvertThreadToFiber, CreateFiber, DeleteFiber, SwitchToFiber,
};

pub struct FiberImpl {
    handle: *mut std::ffi::c_void,
    /// `true` if this fibre owns `handle` and must `DeleteFiber` it; the
    /// fibre produced by `convert_thread` does not own the underlying
    /// thread and must not be deleted.
    owns_handle: bool,
}

struct TrampolineArgs {
    entry: extern "C" fn(usize),
    arg: usize,
}

unsafe extern "system" fn trampoline(params: *mut std::ffi::c_void) {
    let args = Box::from_raw(params as *mut TrampolineArgs);
    (args.entry)(args.arg);
    unreachable!("fiber entry point returned instead of switching away");
}

impl FiberImpl {
    pub fn convert_thread() -> Self {
        let handle = unsafe { ConvertThreadToFiber(std::ptr::null_mut()) };
        assert!(!handle.is_null(), "ConvertThreadToFiber failed");
        Self {
            handle,
            owns_handle: false,
        }
    }

    pub fn new(entry: extern "C" fn(usize), arg: usize, stack_bytes: usize) -> Self {
        let params = Box::into_raw(Box::new(TrampolineArgs { entry, arg }));
        let handle = unsafe {
            CreateFiber(
                stack_bytes,
                Some(trampoline),
                params as *mut std::ffi::c_void,
            )
        };
        assert!(!handle.is_null(), "CreateFiber failed");
        Self {
            handle,
            owns_handle: true,
        }
    }

    pub fn destroy(self) {
        if self.owns_handle {
            unsafe {
                DeleteFiber(self.handle);
            }
        }
    }
}

pub fn switch(_from: &FiberImpl, to: &FiberImpl) {
    unsafe {
        SwitchToFiber(to.handle);
    }
}
