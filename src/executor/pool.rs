use super::task::Task;
use super::worker::Worker;
use crate::config::PoolConfig;
use crate::context;
use crate::error::{Error, Result};
use crossbeam_deque::{Injector, Steal, Stealer};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

static POOL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolId(u64);

impl PoolId {
    fn next() -> Self {
        PoolId(POOL_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Counters for a pool, read with [`WorkerPool::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub executed_by_workers: u64,
    pub executed_by_callers: u64,
    pub stolen: u64,
    pub queued: usize,
}

/// State shared between a pool handle, its workers and recruited callers.
pub(crate) struct PoolShared {
    id: PoolId,
    injector: Injector<Task>,
    stealers: Vec<Stealer<Task>>,
    unparkers: RwLock<Vec<thread::Thread>>,
    next_wake: AtomicUsize,
    shutdown: AtomicBool,
    queued: AtomicUsize,
    executed_by_workers: AtomicU64,
    executed_by_callers: AtomicU64,
    stolen: AtomicU64,
}

impl PoolShared {
    fn new(id: PoolId, stealers: Vec<Stealer<Task>>) -> Self {
        Self {
            id,
            injector: Injector::new(),
            stealers,
            unparkers: RwLock::new(Vec::new()),
            next_wake: AtomicUsize::new(0),
            shutdown: AtomicBool::new(false),
            queued: AtomicUsize::new(0),
            executed_by_workers: AtomicU64::new(0),
            executed_by_callers: AtomicU64::new(0),
            stolen: AtomicU64::new(0),
        }
    }

    pub(crate) fn id(&self) -> PoolId {
        self.id
    }

    pub(crate) fn injector(&self) -> &Injector<Task> {
        &self.injector
    }

    pub(crate) fn stealers(&self) -> &[Stealer<Task>] {
        &self.stealers
    }

    pub(crate) fn push(&self, task: Task) {
        self.queued.fetch_add(1, Ordering::Relaxed);
        self.injector.push(task);
        self.wake_one();
    }

    fn wake_one(&self) {
        let unparkers = self.unparkers.read();
        if unparkers.is_empty() {
            return;
        }
        let idx = self.next_wake.fetch_add(1, Ordering::Relaxed) % unparkers.len();
        unparkers[idx].unpark();
    }

    fn wake_all(&self) {
        for thread in self.unparkers.read().iter() {
            thread.unpark();
        }
    }

    /// Take one queued unit on behalf of a thread that is not one of our workers.
    pub(crate) fn steal_for_caller(&self) -> Option<Task> {
        let task = loop {
            match self.injector.steal() {
                Steal::Success(task) => break Some(task),
                Steal::Empty => break None,
                Steal::Retry => continue,
            }
        };

        let task = task.or_else(|| {
            self.stealers.iter().find_map(|stealer| loop {
                match stealer.steal() {
                    Steal::Success(task) => {
                        self.record_stolen();
                        break Some(task);
                    }
                    Steal::Empty => break None,
                    Steal::Retry => continue,
                }
            })
        })?;

        self.record_started();
        Some(task)
    }

    pub(crate) fn record_started(&self) {
        self.queued.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn record_worker_execution(&self) {
        self.executed_by_workers.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_caller_execution(&self) {
        self.executed_by_callers.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stolen(&self) {
        self.stolen.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            executed_by_workers: self.executed_by_workers.load(Ordering::Relaxed),
            executed_by_callers: self.executed_by_callers.load(Ordering::Relaxed),
            stolen: self.stolen.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
        }
    }
}

/// A fixed-capacity arena of worker threads.
///
/// Work reaches the pool through [`WorkerPool::enter_scope`]: any
/// [`TaskGroup`](crate::TaskGroup) submission made inside the scope is queued
/// here. When `admits_calling_thread` is true the thread that entered the
/// scope counts against `capacity` and may be recruited to run queued units
/// if it joins a group while still inside the scope.
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    capacity: usize,
    admits_calling_thread: bool,
    threads: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(capacity: usize, admits_calling_thread: bool) -> Result<Self> {
        Self::with_config(&PoolConfig::new(capacity, admits_calling_thread))
    }

    pub fn with_config(config: &PoolConfig) -> Result<Self> {
        config.validate()?;

        // one slot belongs to the caller when it is admitted, but the pool
        // always owns a thread so work queued in the scope can finish after it
        let reserved_slot = usize::from(config.admits_calling_thread);
        let num_workers = (config.capacity - reserved_slot).max(1);

        let workers: Vec<Worker> = (0..num_workers).map(Worker::new).collect();
        let stealers = workers.iter().map(|w| w.local_queue.stealer()).collect();

        let id = PoolId::next();
        let mut pool = Self {
            shared: Arc::new(PoolShared::new(id, stealers)),
            capacity: config.capacity,
            admits_calling_thread: config.admits_calling_thread,
            threads: Vec::with_capacity(num_workers),
        };

        for worker in workers {
            let shared = pool.shared.clone();
            let name = format!("{}-{}-{}", config.thread_name_prefix, id, worker.index);

            let mut builder = thread::Builder::new().name(name);
            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }

            // on failure, Drop stops the workers spawned so far
            let thread = builder
                .spawn(move || worker.run(shared))
                .map_err(|e| Error::executor(format!("spawn failed: {}", e)))?;
            pool.threads.push(thread);
        }

        *pool.shared.unparkers.write() = pool.threads.iter().map(|t| t.thread().clone()).collect();

        tracing::debug!(
            pool = %id,
            capacity = config.capacity,
            workers = num_workers,
            admits_calling_thread = config.admits_calling_thread,
            "worker pool started"
        );

        Ok(pool)
    }

    /// Run `body` with this pool's admission policy active on the calling thread.
    pub fn enter_scope<F, R>(&self, body: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _admission = context::admit(self.shared.clone(), self.admits_calling_thread);
        body()
    }

    pub fn id(&self) -> PoolId {
        self.shared.id()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn admits_calling_thread(&self) -> bool {
        self.admits_calling_thread
    }

    pub fn worker_count(&self) -> usize {
        self.threads.len()
    }

    pub fn stats(&self) -> PoolStats {
        self.shared.stats()
    }

    fn shutdown(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.wake_all();

        let me = thread::current().id();
        for thread in self.threads.drain(..) {
            // a unit that owns the pool may drop it on one of our own workers
            if thread.thread().id() == me {
                continue;
            }
            let _ = thread.join();
        }

        tracing::debug!(pool = %self.shared.id(), "worker pool stopped");
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("id", &self.shared.id())
            .field("capacity", &self.capacity)
            .field("admits_calling_thread", &self.admits_calling_thread)
            .field("workers", &self.threads.len())
            .finish()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ThreadRole;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_zero_capacity_is_config_error() {
        let err = WorkerPool::new(0, true).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_worker_count_respects_admission() {
        let pool = WorkerPool::new(3, true).unwrap();
        assert_eq!(pool.worker_count(), 2);

        let pool = WorkerPool::new(3, false).unwrap();
        assert_eq!(pool.worker_count(), 3);

        // the caller's slot never leaves the pool without a thread
        let pool = WorkerPool::new(1, true).unwrap();
        assert_eq!(pool.worker_count(), 1);
    }

    #[test]
    fn test_enter_scope_is_idempotent() {
        let pool = WorkerPool::new(2, false).unwrap();
        for i in 0..3 {
            let out = pool.enter_scope(|| {
                assert_eq!(context::current().admission_depth, 1);
                i * 2
            });
            assert_eq!(out, i * 2);
            assert_eq!(pool.capacity(), 2);
            assert!(!pool.admits_calling_thread());
            assert_eq!(pool.worker_count(), 2);
        }
        assert_eq!(context::current().admission_depth, 0);
    }

    #[test]
    fn test_scope_popped_after_panic() {
        let pool = WorkerPool::new(1, false).unwrap();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pool.enter_scope(|| panic!("inside scope"));
        }));
        assert!(result.is_err());
        assert_eq!(context::current().admission_depth, 0);
    }

    #[test]
    fn test_pushed_task_runs_on_worker() {
        let pool = WorkerPool::new(2, false).unwrap();
        let (tx, rx) = mpsc::channel();

        pool.shared.push(Task::new(crate::executor::UnitId::new(1), move || {
            tx.send(context::current_role()).unwrap();
        }));

        let role = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(role, ThreadRole::Worker { pool: id, .. } if id == pool.id()));
    }

    #[test]
    fn test_drop_drains_queue() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let pool = WorkerPool::new(2, false).unwrap();
            for i in 0..50 {
                let counter = counter.clone();
                pool.shared.push(Task::new(crate::executor::UnitId::new(i + 1), move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }));
            }
        }
        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn test_stats_count_worker_executions() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = WorkerPool::new(2, false).unwrap();
        for i in 0..10 {
            let counter = counter.clone();
            pool.shared.push(Task::new(crate::executor::UnitId::new(i + 1), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }
        while counter.load(Ordering::SeqCst) < 10 {
            thread::yield_now();
        }
        // executed_by_workers is bumped right after the unit returns
        while pool.stats().executed_by_workers < 10 {
            thread::yield_now();
        }
        let stats = pool.stats();
        assert_eq!(stats.executed_by_callers, 0);
        assert_eq!(stats.queued, 0);
    }
}
