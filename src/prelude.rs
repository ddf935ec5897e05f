//! Convenience re-exports for the common surface.

pub use crate::combinators::when_all;
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{Error, Result};
pub use crate::promise::AsyncPromise;
pub use crate::runtime::{enable_runtime, runtime_stats, shutdown};
pub use crate::task::{spawn, sync_wait, sync_wait_result, Task};
pub use crate::time::sleep_for;
