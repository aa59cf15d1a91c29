//! Observability: lifecycle events and log initialization.
//!
//! The coordinator reports through an [`EventSink`]. [`TracingSink`] turns
//! events into `tracing` records; [`MemorySink`] captures them for tests.
//! [`init_tracing`] installs a `tracing-subscriber` formatter filtered by
//! `RUST_LOG` (default `info`).

pub mod events;

pub use events::{Event, EventSink, MemorySink, TracingSink};

/// Install the global `fmt` subscriber. Later calls are ignored.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .try_init();
}
