//! Per-thread scheduling: each OS thread owns one [`Worker`], its pair of
//! Chase-Lev deques (normal and high priority), and a queue of fibers parked
//! mid-`wait()` that are ready to resume.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use anvil_fiber::Fiber;
use parking_lot::Mutex;

use crate::deque::ChaseLevDeque;
use crate::job::JobHandle;

pub(crate) const NORMAL_QUEUE_CAP: usize = 4096;
pub(crate) const HIGH_QUEUE_CAP: usize = 1024;
pub(crate) const JOB_STACK_BYTES: usize = 32 * 1024;
pub(crate) const STEAL_ATTEMPTS: usize = 8;

/// A job fiber parked mid-`wait()`. Handing one to a different worker than
/// the one that parked it is safe: a parked fiber is never running, so the
/// move carries no concurrent-access hazard. [`anvil_fiber::Fiber`] is
/// conservatively `!Send` because a *running* fiber's context is tied to the
/// OS thread executing it; at rest that concern does not apply.
pub(crate) struct ParkedFiber(pub(crate) Fiber);
unsafe impl Send for ParkedFiber {}

pub(crate) struct Worker {
    pub(crate) id: usize,
    pub(crate) normal: ChaseLevDeque<JobHandle, NORMAL_QUEUE_CAP>,
    pub(crate) high: ChaseLevDeque<JobHandle, HIGH_QUEUE_CAP>,
    ready: Mutex<VecDeque<ParkedFiber>>,
}

impl Worker {
    pub(crate) fn new(id: usize) -> Self {
        Self {
            id,
            normal: ChaseLevDeque::new(),
            high: ChaseLevDeque::new(),
            ready: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn park_fiber(&self, fiber: Fiber) {
        self.ready.lock().push_back(ParkedFiber(fiber));
    }

    pub(crate) fn take_ready_fiber(&self) -> Option<Fiber> {
        self.ready.lock().pop_front().map(|p| p.0)
    }

    pub(crate) fn has_work(&self) -> bool {
        !self.normal.is_empty() || !self.high.is_empty() || !self.ready.lock().is_empty()
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
pub(crate) enum FiberOutcome {
    Finished,
    Suspended,
}

thread_local! {
    /// The fiber representing this OS thread's native stack, created once by
    /// `Fiber::convert_thread` when the worker thread starts. Jobs switch
    /// back to this fiber whenever they finish or suspend.
    static SCHEDULER_FIBER: RefCell<Option<Fiber>> = RefCell::new(None);
    /// The fiber currently executing a job on this thread, set just before
    /// the scheduler switches into it so `wait()` can find itself.
    static CURRENT_FIBER: RefCell<Option<Fiber>> = RefCell::new(None);
    static CURRENT_WORKER_ID: Cell<usize> = Cell::new(usize::MAX);
    static LAST_OUTCOME: Cell<Option<FiberOutcome>> = Cell::new(None);
    static SUSPENDED_ON: Cell<Option<JobHandle>> = Cell::new(None);
}

/// Call once at the top of a worker thread's main loop, before touching any
/// other thread-local in this module.
pub(crate) fn install_scheduler_fiber() {
    SCHEDULER_FIBER.with(|f| *f.borrow_mut() = Some(Fiber::convert_thread()));
}

pub(crate) fn set_current_worker_id(id: usize) {
    CURRENT_WORKER_ID.with(|c| c.set(id));
}

pub(crate) fn current_worker_id() -> Option<usize> {
    CURRENT_WORKER_ID.with(|c| {
        let id = c.get();
        if id == usize::MAX {
            None
        } else {
            Some(id)
        }
    })
}

/// Switches from the scheduler fiber into `fiber`, which is about to start
/// or resume running a job. Returns the fiber itself (the caller needs it
/// back, whether to destroy it or park it), the outcome the job recorded
/// before switching back (finished the task, or suspended itself via
/// `wait()`), and if suspended, the handle it is waiting on.
pub(crate) fn run_on_fiber(fiber: Fiber) -> (Fiber, FiberOutcome, Option<JobHandle>) {
    CURRENT_FIBER.with(|c| *c.borrow_mut() = Some(fiber));
    LAST_OUTCOME.with(|o| o.set(None));
    SUSPENDED_ON.with(|s| s.set(None));

    SCHEDULER_FIBER.with(|sched_cell| {
        let sched_ref = sched_cell.borrow();
        let scheduler = sched_ref
            .as_ref()
            .expect("worker thread main loop never installed its scheduler fiber");
        CURRENT_FIBER.with(|cur| {
            let job_fiber_ptr = cur.borrow().as_ref().expect("no current fiber") as *const Fiber;
            // Safety: `job_fiber_ptr` stays valid for the duration of the
            // switch; the fiber it points to is only ever touched from this
            // thread until it suspends and is handed to another worker.
            unsafe { scheduler.switch_to(&*job_fiber_ptr) };
        });
    });

    let outcome = LAST_OUTCOME
        .with(|o| o.get())
        .expect("fiber returned control without recording an outcome");
    let fiber = CURRENT_FIBER
        .with(|c| c.borrow_mut().take())
        .expect("current fiber slot was emptied unexpectedly");
    (fiber, outcome, SUSPENDED_ON.with(|s| s.get()))
}

/// Called from inside a job fiber once its task function has fully
/// returned. Hands the (now-inert) fiber back to the scheduler for
/// destruction and never returns to the caller.
pub(crate) fn finish_current_fiber() -> ! {
    LAST_OUTCOME.with(|o| o.set(Some(FiberOutcome::Finished)));
    switch_back_to_scheduler();
    unreachable!("scheduler resumed a finished fiber");
}

/// Called from inside a job fiber that needs to block on another job.
/// Records `waiting_on` and switches back to the scheduler; when some
/// worker's scheduler loop later resumes this fiber, execution continues
/// right after this call.
pub(crate) fn suspend_current_fiber(waiting_on: JobHandle) {
    LAST_OUTCOME.with(|o| o.set(Some(FiberOutcome::Suspended)));
    SUSPENDED_ON.with(|s| s.set(Some(waiting_on)));
    switch_back_to_scheduler();
}

fn switch_back_to_scheduler() {
    SCHEDULER_FIBER.with(|sched_cell| {
        let sched_ref = sched_cell.borrow();
        let scheduler = sched_ref
            .as_ref()
            .expect("no scheduler fiber recorded for this thread");
        CURRENT_FIBER.with(|cur| {
            let job_fiber_ptr = cur.borrow().as_ref().expect("no current fiber") as *const Fiber;
            unsafe { (*job_fiber_ptr).switch_to(scheduler) };
        });
    });
}

/// Picks up to `STEAL_ATTEMPTS` random workers other than `skip` and tries
/// `high` then `normal` on each; returns the first stolen job, if any.
pub(crate) fn try_steal(
    workers: &[std::sync::Arc<Worker>],
    skip: usize,
    rng: &mut u64,
) -> Option<JobHandle> {
    if workers.len() <= 1 {
        return None;
    }
    for _ in 0..STEAL_ATTEMPTS {
        let victim = next_index(rng, workers.len(), skip);
        if let Some(h) = workers[victim].high.steal() {
            return Some(h);
        }
        if let Some(h) = workers[victim].normal.steal() {
            return Some(h);
        }
    }
    None
}

/// xorshift64*, seeded per-worker; good enough for victim selection, not for
/// anything cryptographic.
fn next_index(state: &mut u64, len: usize, skip: usize) -> usize {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    *state = x;
    let mut idx = (x as usize) % len;
    if idx == skip {
        idx = (idx + 1) % len;
    }
    idx
}
