//! Thread-local handle to the task currently being resumed.
//!
//! Suspend points (timer, one-shot promise, task join) need the resumable
//! continuation of the frame that is polling them. The stepper publishes it
//! here for the duration of each resumption, so awaiters can register with
//! the manager without round-tripping through waker data.

use crate::task::raw::Continuation;
use std::cell::RefCell;

thread_local! {
    static CURRENT_TASK: RefCell<Option<Continuation>> = const { RefCell::new(None) };
}

/// Install `cont` as the current task for this thread; restored on drop.
pub(crate) fn enter(cont: Continuation) -> ContextGuard {
    let prev = CURRENT_TASK.with(|cell| cell.borrow_mut().replace(cont));
    ContextGuard { prev }
}

/// Continuation of the frame being resumed on this thread, if any.
pub(crate) fn current() -> Option<Continuation> {
    CURRENT_TASK.with(|cell| cell.borrow().clone())
}

/// True when the frame being resumed on this thread carries the cancel flag.
pub(crate) fn current_cancelled() -> bool {
    current().map(|cont| cont.is_cancelled()).unwrap_or(false)
}

pub(crate) struct ContextGuard {
    prev: Option<Continuation>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let prev = self.prev.take();
        CURRENT_TASK.with(|cell| *cell.borrow_mut() = prev);
    }
}
