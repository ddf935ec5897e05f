//! Background execution infrastructure.
//!
//! This module provides the worker pool: an injector-fed set of worker
//! threads that run submitted units of work exactly once. Continuations
//! handed off for background resumption land here.

pub mod cpu_pool;
pub mod job;
pub mod worker;

pub use cpu_pool::CpuPool;
pub use job::JobId;

pub(crate) use job::Job;
