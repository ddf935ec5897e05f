//! Global runtime: worker pool, manager, and the drive thread bootstrap.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::CpuPool;
use crate::manager::Manager;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// The assembled runtime: worker pool plus manager plus drive thread.
pub struct Runtime {
    pool: Arc<CpuPool>,
    manager: Arc<Manager>,
    config: Config,
    driver_started: AtomicBool,
    driver_shutdown: Arc<AtomicBool>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl Runtime {
    /// Build a runtime from a validated configuration. The drive thread is
    /// not started here; see [`enable_runtime`].
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let pool = CpuPool::new(&config)?;

        Ok(Self {
            pool: Arc::new(pool),
            manager: Arc::new(Manager::new()),
            config,
            driver_started: AtomicBool::new(false),
            driver_shutdown: Arc::new(AtomicBool::new(false)),
            driver: Mutex::new(None),
        })
    }

    pub(crate) fn pool(&self) -> &Arc<CpuPool> {
        &self.pool
    }

    pub(crate) fn manager(&self) -> &Arc<Manager> {
        &self.manager
    }

    /// The configuration this runtime was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Snapshot of runtime counters.
    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            worker_threads: self.pool.num_threads(),
            jobs_submitted: self.pool.jobs_submitted(),
            jobs_executed: self.pool.jobs_executed(),
            timers_pending: self.manager.timers_pending(),
            drive_ticks: self.manager.ticks(),
            frames_reaped: self.manager.frames_reaped(),
        }
    }

    /// Start the drive thread. Idempotent: exactly one thread per runtime.
    fn start_driver(&self) -> Result<()> {
        if self.driver_started.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let manager = self.manager.clone();
        let pool = self.pool.clone();
        let shutdown = self.driver_shutdown.clone();
        let interval = self.config.tick_interval;

        let handle = thread::Builder::new()
            .name(format!("{}-driver", self.config.thread_name_prefix))
            .spawn(move || {
                tracing::debug!("drive thread started");
                while !shutdown.load(Ordering::Acquire) {
                    manager.tick(&pool);
                    thread::sleep(interval);
                }
                tracing::debug!("drive thread stopped");
            })
            .map_err(|e| Error::executor(format!("failed to start drive thread: {}", e)))?;

        *self.driver.lock() = Some(handle);
        Ok(())
    }

    fn stop_driver(&self) {
        self.driver_shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.driver.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.stop_driver();
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("workers", &self.pool.num_threads())
            .field("driving", &self.driver_started.load(Ordering::Relaxed))
            .finish()
    }
}

/// Counters exposed by [`runtime_stats`].
#[derive(Debug, Clone)]
pub struct RuntimeStats {
    /// Worker threads in the pool.
    pub worker_threads: usize,
    /// Jobs submitted to the pool since start.
    pub jobs_submitted: u64,
    /// Jobs executed by the pool since start.
    pub jobs_executed: u64,
    /// Timers currently armed.
    pub timers_pending: usize,
    /// Drive ticks completed.
    pub drive_ticks: u64,
    /// Frames reaped through the destroy queue.
    pub frames_reaped: u64,
}

// Global runtime slot
static GLOBAL_RUNTIME: RwLock<Option<Arc<Runtime>>> = RwLock::new(None);

/// Initialize the global runtime with the default configuration.
///
/// Errors with [`Error::AlreadyInitialized`] when a runtime exists; use
/// [`enable_runtime`] for the idempotent bootstrap.
pub fn init() -> Result<()> {
    init_with_config(Config::default())
}

/// Initialize the global runtime with an explicit configuration and start
/// its drive thread.
pub fn init_with_config(config: Config) -> Result<()> {
    let mut slot = GLOBAL_RUNTIME.write();

    if slot.is_some() {
        return Err(Error::AlreadyInitialized);
    }

    let runtime = Runtime::new(config)?;
    runtime.start_driver()?;
    *slot = Some(Arc::new(runtime));

    Ok(())
}

/// Idempotent bootstrap: create the global runtime with the default
/// configuration if absent, and make sure exactly one drive thread runs.
///
/// Must be called before any task is awaited; timers and awaited tasks
/// make no progress without the drive thread.
pub fn enable_runtime() -> Result<()> {
    {
        let slot = GLOBAL_RUNTIME.read();
        if let Some(runtime) = slot.as_ref() {
            return runtime.start_driver();
        }
    }

    let mut slot = GLOBAL_RUNTIME.write();
    // raced with another enabler between the read and the write lock
    if let Some(runtime) = slot.as_ref() {
        return runtime.start_driver();
    }

    let runtime = Runtime::new(Config::default())?;
    runtime.start_driver()?;
    *slot = Some(Arc::new(runtime));

    Ok(())
}

pub(crate) fn try_current_runtime() -> Option<Arc<Runtime>> {
    GLOBAL_RUNTIME.read().as_ref().cloned()
}

pub(crate) fn current_runtime() -> Arc<Runtime> {
    GLOBAL_RUNTIME
        .read()
        .as_ref()
        .expect("STRAND runtime not enabled - call strand_rs::enable_runtime() first")
        .clone()
}

/// Snapshot of the global runtime's counters, if it is up.
pub fn runtime_stats() -> Option<RuntimeStats> {
    try_current_runtime().map(|rt| rt.stats())
}

/// Tear the global runtime down, best-effort.
///
/// Stops the drive thread and joins the worker pool. In-flight tasks are
/// not drained: queued continuations are dropped unresumed and suspended
/// frames are released without settling. Deterministic shutdown is not
/// guaranteed.
pub fn shutdown() {
    let runtime = { GLOBAL_RUNTIME.write().take() };
    if let Some(runtime) = runtime {
        runtime.stop_driver();
        tracing::debug!("runtime shut down");
    }
}
