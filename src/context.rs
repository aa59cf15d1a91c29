//! Per-thread execution context.
//!
//! Every thread carries an explicit [`ThreadRole`] tag, an isolation depth and
//! a stack of active pool admission scopes. Pools, task groups and the
//! reserved-thread guard consult this state instead of comparing raw thread
//! handles, and the guard reads it through [`ContextProvider`] so tests can
//! substitute a fake.

use crate::executor::pool::{PoolId, PoolShared};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// What a thread is allowed to do with submitted work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadRole {
    /// The owner thread; must never run work units.
    Reserved,
    /// A thread spawned by a worker pool.
    Worker { pool: PoolId, index: usize },
    /// A thread created explicitly to own task management.
    Dedicated,
    /// Any other thread.
    Unregistered,
}

/// Snapshot of the calling thread's context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    pub thread: ThreadId,
    pub role: ThreadRole,
    pub isolation_depth: usize,
    pub admission_depth: usize,
}

impl ExecutionContext {
    pub fn is_reserved(&self) -> bool {
        self.role == ThreadRole::Reserved
    }

    pub fn is_worker(&self) -> bool {
        matches!(self.role, ThreadRole::Worker { .. })
    }

    pub fn is_isolated(&self) -> bool {
        self.isolation_depth > 0
    }
}

/// Source of the "current" execution context.
pub trait ContextProvider: fmt::Debug + Send + Sync {
    fn current(&self) -> ExecutionContext;
}

/// Reads the real thread-local context.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadContext;

impl ContextProvider for ThreadContext {
    fn current(&self) -> ExecutionContext {
        current()
    }
}

struct Admission {
    pool: Arc<PoolShared>,
    admits_caller: bool,
}

struct ThreadState {
    role: Cell<ThreadRole>,
    isolation: Cell<usize>,
    admissions: RefCell<Vec<Admission>>,
    home: RefCell<Option<Arc<PoolShared>>>,
}

thread_local! {
    static STATE: ThreadState = ThreadState {
        role: Cell::new(ThreadRole::Unregistered),
        isolation: Cell::new(0),
        admissions: RefCell::new(Vec::new()),
        home: RefCell::new(None),
    };
}

pub fn current() -> ExecutionContext {
    STATE.with(|state| ExecutionContext {
        thread: thread::current().id(),
        role: state.role.get(),
        isolation_depth: state.isolation.get(),
        admission_depth: state.admissions.borrow().len(),
    })
}

pub fn current_role() -> ThreadRole {
    STATE.with(|state| state.role.get())
}

/// Tag the calling thread as a dedicated task-management thread.
///
/// Has no effect on a reserved thread; a reservation is never downgraded.
pub fn mark_dedicated() {
    STATE.with(|state| {
        if state.role.get() != ThreadRole::Reserved {
            state.role.set(ThreadRole::Dedicated);
        }
    });
}

pub(crate) fn mark_reserved() {
    STATE.with(|state| state.role.set(ThreadRole::Reserved));
}

pub(crate) fn register_worker(pool: Arc<PoolShared>, index: usize) {
    STATE.with(|state| {
        state.role.set(ThreadRole::Worker {
            pool: pool.id(),
            index,
        });
        *state.home.borrow_mut() = Some(pool);
    });
}

pub(crate) fn unregister_worker() {
    STATE.with(|state| {
        state.role.set(ThreadRole::Unregistered);
        state.home.borrow_mut().take();
    });
}

pub fn is_isolated() -> bool {
    STATE.with(|state| state.isolation.get() > 0)
}

/// Pool that receives work submitted from the calling thread right now.
///
/// The innermost admission scope wins; outside any scope a worker thread
/// submits to its own pool. `None` means the unit stays with the joining thread.
pub(crate) fn dispatch_target() -> Option<Arc<PoolShared>> {
    STATE.with(|state| {
        if let Some(admission) = state.admissions.borrow().last() {
            return Some(admission.pool.clone());
        }
        state.home.borrow().clone()
    })
}

/// Pool whose queued work the calling thread may execute while it waits.
///
/// A pool's own workers are always recruited by it, even when the scope
/// excludes outside callers.
pub(crate) fn recruiting_pool() -> Option<Arc<PoolShared>> {
    STATE.with(|state| {
        if state.isolation.get() > 0 {
            return None;
        }
        let home = state.home.borrow();
        if let Some(admission) = state.admissions.borrow().last() {
            let own_pool = home
                .as_ref()
                .map_or(false, |home| home.id() == admission.pool.id());
            return (admission.admits_caller || own_pool).then(|| admission.pool.clone());
        }
        home.clone()
    })
}

/// Active admission scope; popped on drop, including during unwinding.
pub(crate) struct AdmissionGuard {
    // Thread-local state: the guard must be dropped on the thread that made it.
    _not_send: PhantomData<*const ()>,
}

pub(crate) fn admit(pool: Arc<PoolShared>, admits_caller: bool) -> AdmissionGuard {
    STATE.with(|state| {
        state.admissions.borrow_mut().push(Admission {
            pool,
            admits_caller,
        })
    });
    AdmissionGuard {
        _not_send: PhantomData,
    }
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        STATE.with(|state| {
            state.admissions.borrow_mut().pop();
        });
    }
}

impl fmt::Debug for AdmissionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionGuard").finish()
    }
}

pub(crate) struct IsolationGuard {
    _not_send: PhantomData<*const ()>,
}

pub(crate) fn enter_isolation() -> IsolationGuard {
    STATE.with(|state| state.isolation.set(state.isolation.get() + 1));
    IsolationGuard {
        _not_send: PhantomData,
    }
}

impl Drop for IsolationGuard {
    fn drop(&mut self) {
        STATE.with(|state| state.isolation.set(state.isolation.get().saturating_sub(1)));
    }
}

impl fmt::Debug for IsolationGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IsolationGuard")
            .field("depth", &STATE.with(|state| state.isolation.get()))
            .finish()
    }
}
