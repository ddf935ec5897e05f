use super::job::Job;
use super::worker::{Worker, WorkerId, WorkerState};
use crate::config::Config;
use crate::error::{Error, Result};
use crossbeam_deque::Injector;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Thread pool executing submitted units of work on background threads.
///
/// The only contract the rest of the runtime relies on: a submitted job
/// eventually runs exactly once on some worker.
pub struct CpuPool {
    workers: Vec<WorkerHandle>,
    injector: Arc<Injector<Job>>,
    shutdown: Arc<AtomicBool>,
    num_threads: usize,
    next_unpark: AtomicUsize,
    jobs_submitted: AtomicU64,
}

struct WorkerHandle {
    id: WorkerId,
    thread: Option<JoinHandle<()>>,
    unparker: thread::Thread,
    state: Arc<WorkerState>,
}

impl CpuPool {
    /// Build a pool sized by the configuration and start its workers.
    pub fn new(config: &Config) -> Result<Self> {
        let num_threads = config.worker_threads();
        if num_threads == 0 {
            return Err(Error::config("need at least 1 thread"));
        }

        let injector = Arc::new(Injector::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::with_capacity(num_threads);

        for id in 0..num_threads {
            let worker = Worker::new(id);
            let state = worker.state.clone();
            let injector_clone = injector.clone();
            let shutdown_clone = shutdown.clone();
            let name = format!("{}-{}", config.thread_name_prefix, id);

            let mut builder = thread::Builder::new().name(name);

            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }

            let thread = builder
                .spawn(move || {
                    worker.run(injector_clone, shutdown_clone);
                })
                .map_err(|e| Error::executor(format!("spawn failed: {}", e)))?;

            let unparker = thread.thread().clone();

            handles.push(WorkerHandle {
                id,
                thread: Some(thread),
                unparker,
                state,
            });
        }

        Ok(Self {
            workers: handles,
            injector,
            shutdown,
            num_threads,
            next_unpark: AtomicUsize::new(0),
            jobs_submitted: AtomicU64::new(0),
        })
    }

    pub(crate) fn submit(&self, job: Job) {
        self.injector.push(job);
        self.jobs_submitted.fetch_add(1, Ordering::Relaxed);

        // wake up a worker, round-robin
        let idx = self.next_unpark.fetch_add(1, Ordering::Relaxed) % self.num_threads;
        if let Some(worker) = self.workers.get(idx) {
            worker.unparker.unpark();
        }
    }

    /// Submit a closure as a unit of work.
    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let job = Job::new(f);
        self.submit(job);
    }

    /// Number of worker threads.
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Jobs submitted since the pool started.
    pub fn jobs_submitted(&self) -> u64 {
        self.jobs_submitted.load(Ordering::Relaxed)
    }

    /// Jobs executed across all workers.
    pub fn jobs_executed(&self) -> u64 {
        self.workers
            .iter()
            .map(|w| w.state.jobs_executed.load(Ordering::Relaxed))
            .sum()
    }

    /// Stop accepting progress and join all workers.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Release);

        // wake everyone up to check the shutdown flag
        for worker in &self.workers {
            worker.unparker.unpark();
        }

        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                tracing::trace!(worker = worker.id, "joining worker");
                let _ = thread.join();
            }
        }
    }
}

impl Drop for CpuPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for CpuPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuPool")
            .field("num_threads", &self.num_threads)
            .field("jobs_submitted", &self.jobs_submitted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn small_pool() -> CpuPool {
        let config = Config::builder().num_threads(2).build().unwrap();
        CpuPool::new(&config).unwrap()
    }

    #[test]
    fn test_pool_runs_jobs() {
        let pool = small_pool();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..64 {
            let counter = counter.clone();
            pool.execute(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            });
        }

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while counter.load(Ordering::Relaxed) < 64 {
            assert!(std::time::Instant::now() < deadline, "jobs did not finish");
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(pool.jobs_submitted(), 64);
    }

    #[test]
    fn test_pool_survives_panicking_job() {
        let pool = small_pool();
        let counter = Arc::new(AtomicUsize::new(0));

        pool.execute(|| panic!("boom"));
        let after = counter.clone();
        pool.execute(move || {
            after.fetch_add(1, Ordering::Relaxed);
        });

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while counter.load(Ordering::Relaxed) == 0 {
            assert!(std::time::Instant::now() < deadline, "pool died after panic");
            thread::sleep(Duration::from_millis(1));
        }
    }
}
