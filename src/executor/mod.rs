//! Task execution infrastructure.
//!
//! Worker pools (arenas), their worker threads, the internal task type and
//! per-unit panic handling.

pub mod panic_handler;
pub mod pool;
pub mod task;
pub(crate) mod worker;

pub use panic_handler::{PanicHandler, PanicInfo, PanicStrategy};
pub use pool::{PoolId, PoolStats, WorkerPool};
pub use task::UnitId;

pub(crate) use task::Task;
