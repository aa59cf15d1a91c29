// worker thread loop
use super::pool::PoolShared;
use super::task::Task;
use crate::context;
use crate::util::Backoff;
use crossbeam_deque::{Steal, Stealer, Worker as WorkerQueue};
use std::sync::Arc;
use std::time::Duration;

const PARK_TIMEOUT: Duration = Duration::from_millis(1);

pub(crate) struct Worker {
    pub index: usize,
    pub local_queue: WorkerQueue<Task>,
}

impl Worker {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            local_queue: WorkerQueue::new_fifo(),
        }
    }

    // main loop; drains everything reachable before honoring shutdown
    pub fn run(self, shared: Arc<PoolShared>) {
        context::register_worker(shared.clone(), self.index);
        let mut backoff = Backoff::new(PARK_TIMEOUT);

        loop {
            if let Some(task) = self.find_task(&shared) {
                backoff.reset();
                shared.record_started();
                tracing::trace!(
                    pool = %shared.id(),
                    worker = self.index,
                    unit = %task.id,
                    queued_us = task.spawn_time.elapsed().as_micros() as u64,
                    "executing unit"
                );
                task.execute();
                shared.record_worker_execution();
                continue;
            }

            if shared.is_shutdown() {
                break;
            }

            backoff.snooze();
        }

        context::unregister_worker();
        tracing::trace!(pool = %shared.id(), worker = self.index, "worker exiting");
    }

    fn find_task(&self, shared: &PoolShared) -> Option<Task> {
        // local -> global -> steal
        if let Some(task) = self.local_queue.pop() {
            return Some(task);
        }

        loop {
            match shared.injector().steal_batch_and_pop(&self.local_queue) {
                Steal::Success(task) => return Some(task),
                Steal::Empty => break,
                Steal::Retry => continue,
            }
        }

        self.try_steal_from_workers(shared)
    }

    fn try_steal_from_workers(&self, shared: &PoolShared) -> Option<Task> {
        use rand::seq::SliceRandom;
        use rand::thread_rng;

        let stealers: &[Stealer<Task>] = shared.stealers();
        if stealers.len() < 2 {
            return None;
        }

        let mut indices: Vec<usize> = (0..stealers.len()).collect();
        indices.shuffle(&mut thread_rng());

        for &idx in &indices {
            if idx == self.index {
                continue;
            }

            loop {
                match stealers[idx].steal_batch_and_pop(&self.local_queue) {
                    Steal::Success(task) => {
                        shared.record_stolen();
                        return Some(task);
                    }
                    Steal::Empty => break,
                    Steal::Retry => continue,
                }
            }
        }

        None
    }
}
