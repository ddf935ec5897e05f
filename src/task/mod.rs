//! Suspendable computations with typed results.
//!
//! [`Task<T>`] is the owning handle to a computation frame. Construction is
//! eager: the body runs on the constructing thread until its first
//! suspension. The handle can cancel the computation, query its lifecycle,
//! await it from another task, or block for the result at the sync/async
//! boundary.

pub(crate) mod raw;
pub(crate) mod state;

use crate::error::{Error, Result};
use crate::runtime;
use crate::task::raw::{RawTask, Resumable, Waiter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// Spawn a suspendable computation and return its owning handle.
///
/// The body starts eagerly: it runs on the calling thread until its first
/// suspension point. A body that never suspends is settled by the time this
/// returns.
pub fn spawn<F>(future: F) -> Task<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    Task::new(future)
}

/// Owning handle to a suspendable computation producing a `T`.
///
/// The handle exclusively owns its frame: moves transfer ownership and
/// there is no `Clone`. Dropping a settled task releases the frame
/// synchronously; dropping a task mid-execution defers the teardown to the
/// manager's destroy queue so a frame is never destroyed out from under a
/// resumption.
pub struct Task<T: Send + 'static> {
    core: Option<Arc<RawTask<T>>>,
}

impl<T: Send + 'static> Task<T> {
    /// Create a task from a future. See [`spawn`].
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        let core = Arc::new(RawTask::new(Box::pin(future)));
        // eager start: run to the first suspension on this thread
        core.clone().resume();
        Task { core: Some(core) }
    }

    fn core(&self) -> &Arc<RawTask<T>> {
        self.core
            .as_ref()
            .expect("task core is present until the handle is consumed")
    }

    /// Request cancellation. Advisory and idempotent: the body is never
    /// interrupted, but suspend points observe the flag and short-circuit,
    /// and a set flag gates the result write. The frame is also nudged
    /// through the ready queue so the flag is observed without waiting for
    /// whatever it was suspended on.
    pub fn cancel(&self) {
        let core = self.core();
        if core.state.is_settled() {
            return;
        }
        tracing::debug!("task cancellation requested");
        core.state.cancel();
        if let Some(rt) = runtime::try_current_runtime() {
            rt.manager().schedule_ready(RawTask::continuation(core));
        }
    }

    /// Cancel the task after `delay`, best-effort. A task settled by the
    /// time the delay elapses sees a no-op cancel.
    pub fn cancel_after(&self, delay: Duration) {
        let weak = Arc::downgrade(self.core());
        let rt = runtime::current_runtime();
        rt.pool().execute(move || {
            std::thread::sleep(delay);
            if let Some(core) = weak.upgrade() {
                if !core.state.is_settled() {
                    tracing::debug!("task cancelled by timeout");
                    core.state.cancel();
                    if let Some(rt) = runtime::try_current_runtime() {
                        rt.manager().schedule_ready(RawTask::continuation(&core));
                    }
                }
            }
        });
    }

    /// The result slot has not been written yet.
    pub fn is_pending(&self) -> bool {
        !self.core().state.is_settled()
    }

    /// The result slot has been written (value or error).
    pub fn is_settled(&self) -> bool {
        self.core().state.is_settled()
    }

    /// Settled with a value.
    pub fn is_fulfilled(&self) -> bool {
        self.core().state.is_fulfilled()
    }

    /// Settled with an error.
    pub fn is_rejected(&self) -> bool {
        self.core().state.is_rejected()
    }

    /// When the computation was initiated.
    pub fn created_at(&self) -> Instant {
        self.core().state.created_at()
    }

    /// Await this task from another computation. Ready immediately when the
    /// task is already settled; otherwise the awaiting frame suspends and
    /// is resumed on the worker pool when the task completes.
    pub fn wait(&self) -> JoinFuture<'_, T> {
        JoinFuture { task: self }
    }

    /// Block until the task settles and extract its value, degrading errors
    /// to `T::default()` with a logged message.
    ///
    /// Requires the runtime drive thread when the body suspends; see
    /// [`crate::enable_runtime`].
    pub fn get(self) -> T
    where
        T: Default,
    {
        match self.try_get() {
            Ok(value) => value,
            Err(error) => {
                tracing::error!(%error, "task failed; returning default value");
                T::default()
            }
        }
    }

    /// Block until the task settles and extract its result.
    pub fn try_get(mut self) -> Result<T> {
        let core = self
            .core
            .take()
            .expect("task core is present until the handle is consumed");
        core.state.wait_settled();
        match core.state.take_result() {
            Some(outcome) => outcome,
            // settled flag without a slot write cannot happen; be defensive
            None => Err(Error::CoroutineDestroyed),
        }
    }
}

impl<T: Send + 'static> Drop for Task<T> {
    fn drop(&mut self) {
        let Some(core) = self.core.take() else {
            return;
        };

        if core.state.is_settled() {
            // frame already released at completion; plain teardown
            return;
        }

        // Mid-execution drop: no further result writes are observable, and
        // the frame is reaped by the next drive tick, never on this stack.
        core.state.mark_destruction_pending();
        match runtime::try_current_runtime() {
            Some(rt) => {
                tracing::debug!("pending task dropped; frame queued for destruction");
                rt.manager().schedule_destroy(core);
            }
            None => core.discard(),
        }
    }
}

impl<T: Send + 'static> std::fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.core {
            None => "consumed",
            Some(core) if core.state.is_fulfilled() => "fulfilled",
            Some(core) if core.state.is_rejected() => "rejected",
            Some(_) => "pending",
        };
        f.debug_struct("Task").field("state", &state).finish()
    }
}

/// Future returned by [`Task::wait`].
pub struct JoinFuture<'a, T: Send + 'static> {
    task: &'a Task<T>,
}

impl<T: Send + 'static> Future for JoinFuture<'_, T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let state = &self.task.core().state;
        loop {
            if state.is_settled() {
                return Poll::Ready(match state.take_result() {
                    Some(outcome) => outcome,
                    None => Err(Error::CoroutineDestroyed),
                });
            }
            if state.register_waiter(Waiter::from_context(cx)) {
                return Poll::Pending;
            }
            // settled between the check and the registration: re-read
        }
    }
}

impl<T: Send + 'static> std::fmt::Debug for JoinFuture<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinFuture").finish()
    }
}

/// Block the calling thread until `task` settles, then extract its value.
///
/// The blocking extractor for host code at the sync/async boundary. Errors
/// degrade to `T::default()` with a logged message; use
/// [`sync_wait_result`] to observe them. The drive thread must be running
/// (see [`crate::enable_runtime`]); this function never drives the manager
/// itself.
pub fn sync_wait<T>(task: Task<T>) -> T
where
    T: Default + Send + 'static,
{
    task.get()
}

/// Block the calling thread until `task` settles, then extract its result.
pub fn sync_wait_result<T: Send + 'static>(task: Task<T>) -> Result<T> {
    task.try_get()
}
