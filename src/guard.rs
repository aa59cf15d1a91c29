//! The reserved-thread oracle.

use crate::context::{self, ContextProvider, ThreadContext};
use crate::error::{Error, Result};
use crate::executor::UnitId;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// The thread that must never execute work units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedThread {
    id: ThreadId,
}

impl ReservedThread {
    /// Reserve the calling thread and tag its context as [`Reserved`].
    ///
    /// [`Reserved`]: crate::context::ThreadRole::Reserved
    pub fn capture() -> Self {
        context::mark_reserved();
        Self {
            id: thread::current().id(),
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }
}

/// Checked as the first action of every unit.
///
/// The guard only reports; logging a violation is left to the caller's
/// [`EventSink`](crate::telemetry::EventSink).
#[derive(Debug, Clone)]
pub struct ReservedThreadGuard {
    reserved: ReservedThread,
    contexts: Arc<dyn ContextProvider>,
}

impl ReservedThreadGuard {
    pub fn new(reserved: ReservedThread) -> Self {
        Self::with_provider(reserved, Arc::new(ThreadContext))
    }

    pub fn with_provider(reserved: ReservedThread, contexts: Arc<dyn ContextProvider>) -> Self {
        Self { reserved, contexts }
    }

    pub fn reserved(&self) -> ReservedThread {
        self.reserved
    }

    pub fn on_reserved_thread(&self) -> bool {
        let ctx = self.contexts.current();
        ctx.is_reserved() || ctx.thread == self.reserved.id
    }

    pub fn check(&self, label: &str, unit: UnitId) -> Result<()> {
        if self.on_reserved_thread() {
            return Err(Error::violation(label, unit));
        }
        Ok(())
    }
}
