use crate::context;
use crate::error::{Error, Result};
use crate::executor::{PanicHandler, PanicStrategy, Task, UnitId};
use crossbeam_deque::{Injector, Steal};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

struct GroupState {
    next_id: AtomicU64,
    submitted: AtomicUsize,
    pending: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    last_error: Mutex<Option<Error>>,
    // units submitted outside any pool; they run on whichever thread joins
    deferred: Injector<Task>,
    done_lock: Mutex<()>,
    done: Condvar,
    panic_handler: PanicHandler,
    poll_interval: Duration,
}

impl GroupState {
    fn run_unit<F>(&self, id: UnitId, f: F)
    where
        F: FnOnce(UnitId) -> Result<()>,
    {
        let outcome = match self.panic_handler.execute(|| f(id)) {
            Ok(result) => result,
            Err(info) => Err(Error::WorkerPanic(info.message)),
        };

        if let Err(err) = outcome {
            self.failed.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(unit = %id, error = %err, "unit failed");
            *self.last_error.lock() = Some(err);
        }

        // completed before pending so a joiner that sees zero pending sees every completion
        self.completed.fetch_add(1, Ordering::Release);
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            let _guard = self.done_lock.lock();
            self.done.notify_all();
        }
    }

    fn take_deferred(&self) -> Option<Task> {
        loop {
            match self.deferred.steal() {
                Steal::Success(task) => return Some(task),
                Steal::Empty => return None,
                Steal::Retry => continue,
            }
        }
    }
}

/// A batch of work units joined together.
///
/// Cloning yields another handle to the same batch, so running units can
/// submit more work into it.
#[derive(Clone)]
pub struct TaskGroup {
    state: Arc<GroupState>,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self::with_options(PanicStrategy::default(), DEFAULT_POLL_INTERVAL)
    }

    /// `poll_interval` bounds how long a joiner sleeps before looking for work again.
    pub fn with_options(panic_strategy: PanicStrategy, poll_interval: Duration) -> Self {
        Self {
            state: Arc::new(GroupState {
                next_id: AtomicU64::new(1),
                submitted: AtomicUsize::new(0),
                pending: AtomicUsize::new(0),
                completed: AtomicUsize::new(0),
                failed: AtomicUsize::new(0),
                last_error: Mutex::new(None),
                deferred: Injector::new(),
                done_lock: Mutex::new(()),
                done: Condvar::new(),
                panic_handler: PanicHandler::new(panic_strategy),
                poll_interval,
            }),
        }
    }

    /// Register a unit for asynchronous execution and return its id.
    ///
    /// Inside a [`WorkerPool::enter_scope`](crate::WorkerPool::enter_scope)
    /// the unit is queued on that pool; on a pool worker outside any scope it
    /// goes to the worker's own pool; otherwise it waits for the thread that
    /// calls [`join`](Self::join).
    pub fn submit<F>(&self, f: F) -> UnitId
    where
        F: FnOnce(UnitId) -> Result<()> + Send + 'static,
    {
        let state = &self.state;
        let id = UnitId::new(state.next_id.fetch_add(1, Ordering::Relaxed));
        state.submitted.fetch_add(1, Ordering::Relaxed);
        state.pending.fetch_add(1, Ordering::AcqRel);

        let unit_state = self.state.clone();
        let task = Task::new(id, move || unit_state.run_unit(id, f));

        match context::dispatch_target() {
            Some(pool) => pool.push(task),
            None => state.deferred.push(task),
        }

        id
    }

    /// Block until every submitted unit has completed.
    ///
    /// While waiting, the calling thread runs units that were left for the
    /// joiner and, when it sits inside an admission scope that admits it (and
    /// is not isolated), steals queued units from that pool. Returns the last
    /// unit error, wrapped with the failure count, if any unit failed.
    pub fn join(&self) -> Result<()> {
        let state = &self.state;

        while state.pending.load(Ordering::Acquire) > 0 {
            if let Some(task) = state.take_deferred() {
                task.execute();
                continue;
            }

            if let Some(pool) = context::recruiting_pool() {
                if let Some(task) = pool.steal_for_caller() {
                    task.execute();
                    pool.record_caller_execution();
                    continue;
                }
            }

            let mut guard = state.done_lock.lock();
            if state.pending.load(Ordering::Acquire) == 0 {
                break;
            }
            state.done.wait_for(&mut guard, state.poll_interval);
        }

        let failed = state.failed.load(Ordering::Acquire);
        if failed == 0 {
            return Ok(());
        }

        let last = state
            .last_error
            .lock()
            .clone()
            .unwrap_or_else(|| Error::task_failed("unit failed"));
        Err(Error::UnitsFailed {
            failed,
            last: Box::new(last),
        })
    }

    pub fn submitted(&self) -> usize {
        self.state.submitted.load(Ordering::Relaxed)
    }

    pub fn pending(&self) -> usize {
        self.state.pending.load(Ordering::Acquire)
    }

    pub fn completed(&self) -> usize {
        self.state.completed.load(Ordering::Acquire)
    }

    pub fn failed(&self) -> usize {
        self.state.failed.load(Ordering::Acquire)
    }

    pub fn panic_count(&self) -> usize {
        self.state.panic_handler.panic_count()
    }
}

impl Default for TaskGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TaskGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskGroup")
            .field("submitted", &self.submitted())
            .field("pending", &self.pending())
            .field("completed", &self.completed())
            .field("failed", &self.failed())
            .finish()
    }
}
