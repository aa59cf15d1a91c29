//! VEDA Arena - work-stealing arenas that keep work off a reserved thread
//!
//! Submits units of work to bounded worker pools while guaranteeing that
//! none of them executes on a designated reserved thread, usually the
//! process's main thread. The hazard it guards against is subtle: a blocking
//! `join` may recruit the joining thread to run queued work, so *where* the
//! join sits relative to a pool's admission scope decides whether the
//! reserved thread stays idle.
//!
//! # Quick Start
//!
//! ```no_run
//! use veda_arena::prelude::*;
//!
//! let pool = WorkerPool::new(3, true).unwrap();
//! let group = TaskGroup::new();
//!
//! // submit inside the admission scope...
//! pool.enter_scope(|| {
//!     for _ in 0..100 {
//!         group.submit(|_unit| Ok(()));
//!     }
//! });
//!
//! // ...but join outside it, so this thread is never recruited
//! group.join().unwrap();
//! ```
//!
//! # Features
//!
//! - **Worker pools (arenas)**: fixed capacity, optional caller admission
//! - **Task groups**: non-blocking submit, blocking join with work stealing
//! - **Isolation scopes**: withdraw the calling thread from recruitment
//! - **Reserved-thread guard**: explicit per-thread role tags
//! - **Coordinator**: table-driven comparison of submission/join strategies

// Lint configuration
#![warn(missing_debug_implementations)]

pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod guard;
pub mod prelude;
pub mod scope;
pub mod telemetry;
pub mod util;

// Re-export key types at crate root
pub use config::{Config, ConfigBuilder, PoolConfig};
pub use coordinator::{ComparisonReport, Coordinator, Strategy, StrategyReport};
pub use error::{Error, Result};
pub use executor::{UnitId, WorkerPool};
pub use guard::{ReservedThread, ReservedThreadGuard};
pub use scope::{isolate, TaskGroup};
