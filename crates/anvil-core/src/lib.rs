pub mod error;
pub mod handle_pool;
pub mod logger;
pub mod sync;
pub mod thread;

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL_ALLOCATOR: MiMalloc = MiMalloc;
