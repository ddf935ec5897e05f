//! STRAND - Suspendable Task Runtime with Asynchronous Nonblocking Delivery
//!
//! A user-space coroutine runtime: suspendable computations with typed
//! results, scheduled, resumed, timed, and cancelled correctly under
//! concurrent load.
//!
//! # Quick Start
//!
//! ```no_run
//! use strand_rs::prelude::*;
//!
//! // Start the drive thread (idempotent)
//! strand_rs::enable_runtime().unwrap();
//!
//! // Tasks start eagerly and suspend at await points
//! let task = spawn(async {
//!     sleep_for(std::time::Duration::from_millis(10)).await;
//!     42
//! });
//!
//! // Block at the sync/async boundary
//! let answer = sync_wait(task);
//! assert_eq!(answer, 42);
//! ```
//!
//! # Architecture
//!
//! - **Tasks** own their computation frames exclusively; dropping a task
//!   mid-execution defers the frame teardown to the manager.
//! - **The manager** drives timers, ready continuations, and deferred
//!   destructions from a dedicated thread, one tick at a time.
//! - **The worker pool** resumes continuations handed off by completions
//!   and runs fire-and-forget units of work.
//! - **Async promises** bridge callback-style producers to suspended
//!   consumers without losing wakeups.

// Lint configuration
#![warn(missing_docs, missing_debug_implementations)]

pub mod combinators;
pub mod config;
pub mod error;
pub mod executor;
pub mod promise;
pub mod prelude;
pub mod runtime;
pub mod task;
pub mod time;
pub mod util;

mod context;
mod manager;

// Re-export key types at crate root
pub use combinators::when_all;
pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use promise::AsyncPromise;
pub use runtime::{enable_runtime, init, init_with_config, runtime_stats, shutdown, RuntimeStats};
pub use task::{spawn, sync_wait, sync_wait_result, Task};
pub use time::sleep_for;
