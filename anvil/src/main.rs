//! Driver loop wiring the ECS world, job system and input translator
//! together: pump platform events into the world's
//! `EventQueue`, run one frame of systems (some of which dispatch jobs and
//! wait on them), flush the command buffer, then drain events for the
//! script layer. Producing an actual platform event stream is a window
//! backend's job and stays out of this binary — `main` feeds a
//! small synthetic input sequence instead.
//!
//! Systems run on this thread, which is never a worker, so every
//! `run`/`wait` a system issues here takes the non-worker branch: jobs
//! execute inline and `wait` just spins until they're done. Genuine
//! cross-worker stealing and fibre suspension only happen once a job is
//! already executing on a worker and itself spawns and waits on children —
//! see `anvil_jobsystem`'s own test suite for that case.

use anvil_core::{av_info, thread};
use anvil_core::logger::{self, StdoutSink};
use anvil_ecs::World;
use anvil_events::{Event, EventKind};
use anvil_input::{Context, Platform, RawEvent};
use anvil_jobsystem::JobHandle;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

const FRAME_COUNT: u32 = 5;
const FRAME_DT: f32 = 1.0 / 60.0;

fn main() {
    thread::set_thread_name(std::thread::current().id(), "Main Thread".to_string());
    logger::register_sink(StdoutSink::new());

    let job_system = anvil_jobsystem::initialize_global(0);
    let mut world = World::new();
    let mut input = Context::new();

    let frame_jobs_done = Arc::new(AtomicU32::new(0));
    register_fanout_system(&mut world, job_system.clone(), frame_jobs_done.clone());

    av_info!("anvil starting, {} worker threads", job_system.worker_count());

    let mut event_buf = [Event::new(EventKind::Quit, &[]); 32];
    let mut quit = false;

    for frame in 0..FRAME_COUNT {
        if quit {
            break;
        }

        for raw in synthetic_input(frame) {
            let event = input.handle_event(raw);
            world.push_external_event(event);
        }
        if frame + 1 == FRAME_COUNT {
            world.push_external_event(Event::new(EventKind::Quit, &[]));
        }

        world.run_frame(FRAME_DT);

        let n = world.poll_event(&mut event_buf);
        for event in &event_buf[..n] {
            if event.kind() == Some(EventKind::Quit) {
                quit = true;
            }
        }
        av_info!(
            "frame {} drained {} events, fan-out jobs completed so far: {}",
            frame,
            n,
            frame_jobs_done.load(Ordering::Acquire)
        );
    }

    job_system.deinit();
    av_info!("anvil exiting");
}

/// A stand-in for real platform input: presses A on the first frame and
/// releases it on the second.
fn synthetic_input(frame: u32) -> Vec<RawEvent> {
    match frame {
        0 => vec![RawEvent::Key { platform: Platform::Win32, code: 0x41, mods_mask: 0, down: true }],
        1 => vec![RawEvent::Key { platform: Platform::Win32, code: 0x41, mods_mask: 0, down: false }],
        _ => Vec::new(),
    }
}

unsafe fn increment_counter(job_system: *const (), job: JobHandle) {
    let system = &*(job_system as *const anvil_jobsystem::JobSystem);
    let data = system.job_data(job);
    let counter_ptr = usize::from_ne_bytes(data[..8].try_into().unwrap());
    let counter = &*(counter_ptr as *const AtomicU32);
    counter.fetch_add(1, Ordering::AcqRel);
}

/// Registers a system that fans a handful of jobs out to the job system and
/// waits on them before returning, demonstrating a system driving the job
/// system the way the driver's frame loop describes above. Called from the
/// driver thread, `run`/`wait` here take the inline/spin path; no worker
/// thread gets involved.
fn register_fanout_system(world: &mut World, job_system: Arc<anvil_jobsystem::JobSystem>, done: Arc<AtomicU32>) {
    world
        .register_system(
            move |_world, _dt| {
                let counter_ptr = Arc::as_ptr(&done) as *const () as usize;
                let parent = job_system
                    .create_job(|_, _| {}, &[], None)
                    .expect("create parent job");

                for _ in 0..4 {
                    let data = counter_ptr.to_ne_bytes();
                    let child = job_system
                        .create_job(increment_counter, &data, Some(parent))
                        .expect("create child job");
                    job_system.run(child);
                }
                job_system.run(parent);
                job_system.wait(parent);
            },
            0,
        )
        .expect("register fan-out system");
}
