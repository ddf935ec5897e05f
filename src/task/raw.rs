//! Type-erased task frames and their resumable handles.
//!
//! A [`RawTask`] is the heap-resident frame of a suspendable computation:
//! the boxed future plus the promise state. The frame is stepped (polled)
//! by whichever thread resumes it, drive thread or pool worker; the frame
//! mutex guarantees at most one stepper at a time.
//!
//! Everything that queues a resumption holds a [`Continuation`]: a weak,
//! thread-agnostic handle whose resume is a checked no-op once the owning
//! task has gone away. Ownership of the frame stays with the `Task` handle
//! (or the manager's destroy queue after the handle is dropped); the queues
//! only ever borrow.

use crate::error::Error;
use crate::task::state::TaskState;
use crate::{context, runtime};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll, Wake, Waker};

/// Erased view of a task frame: the operations the manager and the queues
/// need, independent of the result type.
pub(crate) trait Resumable: Send + Sync {
    /// Step the frame once. Must be a no-op on settled or reaped frames.
    fn resume(self: Arc<Self>);
    /// Settled, or marked for destruction: nothing left to resume.
    fn is_complete(&self) -> bool;
    fn is_cancelled(&self) -> bool;
    /// Tear the suspended frame down. Never called from inside the frame's
    /// own execution; the destroy queue is drained on the drive thread only.
    fn discard(&self);
}

/// Weak resumable handle; the unit held in every scheduling queue.
#[derive(Clone)]
pub(crate) struct Continuation {
    frame: Weak<dyn Resumable>,
}

impl Continuation {
    pub(crate) fn new(frame: Weak<dyn Resumable>) -> Self {
        Self { frame }
    }

    /// Resume the frame, skipping stale and settled handles.
    pub(crate) fn resume(&self) {
        let Some(frame) = self.frame.upgrade() else {
            tracing::trace!("skipping stale continuation");
            return;
        };
        if frame.is_complete() {
            tracing::trace!("skipping settled continuation");
            return;
        }
        frame.resume();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.frame
            .upgrade()
            .map(|frame| frame.is_cancelled())
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for Continuation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Continuation")
            .field("stale", &(self.frame.strong_count() == 0))
            .finish()
    }
}

/// A suspended party waiting on a completion: either one of our frames, or
/// a foreign future polled under someone else's executor.
pub(crate) enum Waiter {
    Frame(Continuation),
    Thread(Waker),
}

impl Waiter {
    /// Capture the waiter for the computation currently being polled.
    pub(crate) fn from_context(cx: &mut Context<'_>) -> Self {
        match context::current() {
            Some(cont) => Waiter::Frame(cont),
            None => Waiter::Thread(cx.waker().clone()),
        }
    }

    /// Completion path: frame waiters are handed to the worker pool (the
    /// uniform resume-on-pool pattern); foreign wakers are woken in place.
    pub(crate) fn complete(self) {
        match self {
            Waiter::Frame(cont) => match runtime::try_current_runtime() {
                Some(rt) => rt.pool().execute(move || cont.resume()),
                // runtime torn down mid-flight: best effort, resume here
                None => cont.resume(),
            },
            Waiter::Thread(waker) => waker.wake(),
        }
    }
}

impl std::fmt::Debug for Waiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Waiter::Frame(_) => f.write_str("Waiter::Frame"),
            Waiter::Thread(_) => f.write_str("Waiter::Thread"),
        }
    }
}

/// Waker handed to the frame's future on every poll. A generic wake marks
/// the continuation for background resumption: it lands on the manager's
/// offload queue and the next drive tick hands it to the worker pool. Our
/// own suspend points bypass this and register with the manager directly.
struct FrameWaker {
    cont: Continuation,
}

impl Wake for FrameWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        match runtime::try_current_runtime() {
            Some(rt) => rt.manager().schedule_offload(self.cont.clone()),
            None => tracing::error!("wakeup dropped - runtime not enabled"),
        }
    }
}

/// The frame: promise state plus the suspended computation itself.
pub(crate) struct RawTask<T: Send + 'static> {
    pub(crate) state: TaskState<T>,
    frame: Mutex<Option<BoxFuture<'static, T>>>,
}

impl<T: Send + 'static> RawTask<T> {
    pub(crate) fn new(future: BoxFuture<'static, T>) -> Self {
        Self {
            state: TaskState::new(),
            frame: Mutex::new(Some(future)),
        }
    }

    /// Weak resumable handle to this frame.
    pub(crate) fn continuation(this: &Arc<Self>) -> Continuation {
        let erased: Arc<dyn Resumable> = this.clone();
        Continuation::new(Arc::downgrade(&erased))
    }

    /// Settle and resume whoever was waiting. The waiter is taken after the
    /// slot write so a concurrent registration is either resumed here or
    /// refused by the settled flag.
    fn complete(&self, outcome: Result<T, Error>) {
        if !self.state.settle(outcome) {
            tracing::trace!("result write suppressed");
        }
        if let Some(waiter) = self.state.take_waiter() {
            waiter.complete();
        }
    }
}

impl<T: Send + 'static> Resumable for RawTask<T> {
    fn resume(self: Arc<Self>) {
        if self.state.is_settled() || self.state.is_destruction_pending() {
            return;
        }

        // Cancellation observed at the resume boundary: the suspended frame
        // is dropped without another poll and the task settles rejected.
        if self.state.is_cancelled() {
            let dropped = self.frame.lock().take().is_some();
            if dropped {
                tracing::debug!("frame short-circuited by cancellation");
            }
            self.complete(Err(Error::TaskCancelled));
            return;
        }

        let cont = RawTask::continuation(&self);
        let waker = Waker::from(Arc::new(FrameWaker { cont: cont.clone() }));
        let mut cx = Context::from_waker(&waker);
        let _guard = context::enter(cont);

        let mut frame = self.frame.lock();
        let Some(future) = frame.as_mut() else {
            // reaped between scheduling and execution
            return;
        };

        let poll = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            future.as_mut().poll(&mut cx)
        }));

        match poll {
            Ok(Poll::Pending) => {}
            Ok(Poll::Ready(value)) => {
                // drop the frame before publishing so a racing stepper
                // observes an empty slot, never a completed future
                frame.take();
                drop(frame);
                self.complete(Ok(value));
            }
            Err(panic) => {
                frame.take();
                drop(frame);
                let message = panic_message(panic.as_ref());
                tracing::error!(error = %message, "task body panicked");
                self.complete(Err(Error::unknown(message)));
            }
        }
    }

    fn is_complete(&self) -> bool {
        self.state.is_settled() || self.state.is_destruction_pending()
    }

    fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }

    fn discard(&self) {
        if self.frame.lock().take().is_some() {
            tracing::trace!("suspended frame reaped");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}

/// Test stub: a resumable that never does anything.
#[cfg(test)]
pub(crate) struct NeverResume;

#[cfg(test)]
impl Resumable for NeverResume {
    fn resume(self: Arc<Self>) {}
    fn is_complete(&self) -> bool {
        false
    }
    fn is_cancelled(&self) -> bool {
        false
    }
    fn discard(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_continuation_is_noop() {
        let cont = {
            let frame: Arc<dyn Resumable> = Arc::new(NeverResume);
            Continuation::new(Arc::downgrade(&frame))
        };
        // owner gone; both are checked no-ops
        cont.resume();
        assert!(!cont.is_cancelled());
    }

    fn frame_of<T: Send + 'static>(fut: BoxFuture<'static, T>) -> Arc<RawTask<T>> {
        Arc::new(RawTask::new(fut))
    }

    #[test]
    fn test_immediate_frame_settles_on_first_step() {
        let raw = frame_of(Box::pin(async { 41 + 1 }));
        raw.clone().resume();
        assert!(raw.state.is_fulfilled());
        assert_eq!(raw.state.take_result().unwrap().unwrap(), 42);
    }

    #[test]
    fn test_resume_after_settlement_is_noop() {
        let raw = frame_of(Box::pin(async { 1 }));
        raw.clone().resume();
        raw.clone().resume();
        assert!(raw.state.is_fulfilled());
    }

    #[test]
    fn test_panicking_frame_settles_rejected() {
        let raw = frame_of(Box::pin(async {
            panic!("deliberate");
        }));
        raw.clone().resume();
        assert!(raw.state.is_rejected());
        assert!(matches!(
            raw.state.take_result(),
            Some(Err(Error::UnknownError(_)))
        ));
    }

    #[test]
    fn test_cancelled_frame_rejects_without_polling() {
        let raw = frame_of(Box::pin(async {
            std::future::pending::<()>().await;
            0
        }));
        raw.state.cancel();
        raw.clone().resume();
        assert!(raw.state.is_rejected());
        assert!(matches!(
            raw.state.take_result(),
            Some(Err(Error::TaskCancelled))
        ));
    }

    #[test]
    fn test_discard_then_resume_is_noop() {
        let raw = frame_of(Box::pin(async {
            std::future::pending::<()>().await;
            0
        }));
        raw.clone().resume(); // suspends on pending
        raw.discard();
        raw.clone().resume(); // frame gone, nothing happens
        assert!(!raw.state.is_settled());
    }
}
