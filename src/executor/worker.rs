// worker thread loop
use super::job::Job;
use crate::util::Backoff;
use crossbeam_deque::{Injector, Steal, Worker as WorkerQueue};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

pub type WorkerId = usize;

// per-worker counters
pub struct WorkerState {
    pub jobs_executed: AtomicU64,
    pub jobs_panicked: AtomicU64,
}

impl WorkerState {
    fn new() -> Self {
        Self {
            jobs_executed: AtomicU64::new(0),
            jobs_panicked: AtomicU64::new(0),
        }
    }
}

pub(crate) struct Worker {
    pub id: WorkerId,
    pub local_queue: WorkerQueue<Job>,
    pub state: Arc<WorkerState>,
}

impl Worker {
    pub fn new(id: WorkerId) -> Self {
        Self {
            id,
            local_queue: WorkerQueue::new_fifo(),
            state: Arc::new(WorkerState::new()),
        }
    }

    // main loop
    pub fn run(&self, injector: Arc<Injector<Job>>, shutdown: Arc<AtomicBool>) {
        let mut backoff = Backoff::new();

        loop {
            if shutdown.load(Ordering::Acquire) {
                break;
            }

            if let Some(job) = self.find_job(&injector) {
                backoff.reset();
                self.execute_job(job);
            } else {
                // nothing to do, back off until unparked or timed out
                backoff.wait();
            }
        }
    }

    fn find_job(&self, injector: &Injector<Job>) -> Option<Job> {
        // local queue first for cache locality
        if let Some(job) = self.local_queue.pop() {
            return Some(job);
        }

        // refill from the global injector
        loop {
            match injector.steal_batch_and_pop(&self.local_queue) {
                Steal::Success(job) => return Some(job),
                Steal::Empty => return None,
                Steal::Retry => continue,
            }
        }
    }

    fn execute_job(&self, job: Job) {
        let id = job.id;

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            job.run();
        }));

        if result.is_err() {
            tracing::error!(job = ?id, worker = self.id, "pool job panicked");
            self.state.jobs_panicked.fetch_add(1, Ordering::Relaxed);
        }

        self.state.jobs_executed.fetch_add(1, Ordering::Relaxed);
    }
}
