//! Promise state carried by every task frame.

use crate::error::Error;
use crate::task::raw::Waiter;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// The typed result slot. Transitions `Empty -> Value | Error` exactly once
/// per lifetime; `Taken` marks a consumed result.
pub(crate) enum ResultSlot<T> {
    Empty,
    Value(T),
    Error(Error),
    Taken,
}

/// Per-task lifecycle state: result slot, flags, settle signal, waiter slot.
///
/// The slot mutex guards result transitions; the flags are readable without
/// it under acquire ordering. The condvar is bound to settlement so blocking
/// extractors wake eagerly instead of polling.
pub(crate) struct TaskState<T> {
    slot: Mutex<ResultSlot<T>>,
    settled_cv: Condvar,
    settled: AtomicBool,
    fulfilled: AtomicBool,
    cancelled: AtomicBool,
    destruction_pending: AtomicBool,
    waiter: Mutex<Option<Waiter>>,
    created_at: Instant,
}

impl<T> TaskState<T> {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(ResultSlot::Empty),
            settled_cv: Condvar::new(),
            settled: AtomicBool::new(false),
            fulfilled: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            destruction_pending: AtomicBool::new(false),
            waiter: Mutex::new(None),
            created_at: Instant::now(),
        }
    }

    pub(crate) fn created_at(&self) -> Instant {
        self.created_at
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }

    pub(crate) fn is_fulfilled(&self) -> bool {
        self.is_settled() && self.fulfilled.load(Ordering::Acquire)
    }

    pub(crate) fn is_rejected(&self) -> bool {
        self.is_settled() && !self.fulfilled.load(Ordering::Acquire)
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Monotonic: once set, never reverts. Idempotent.
    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub(crate) fn is_destruction_pending(&self) -> bool {
        self.destruction_pending.load(Ordering::Acquire)
    }

    /// After this, no result write is observable.
    pub(crate) fn mark_destruction_pending(&self) {
        self.destruction_pending.store(true, Ordering::Release);
    }

    /// Write the result. Returns false when the write was suppressed: the
    /// slot was already written, or destruction is pending. A success
    /// outcome is gated into `TaskCancelled` when the cancel flag was set
    /// before the write.
    pub(crate) fn settle(&self, outcome: Result<T, Error>) -> bool {
        let mut slot = self.slot.lock();
        if self.destruction_pending.load(Ordering::Acquire) {
            return false;
        }
        if !matches!(*slot, ResultSlot::Empty) {
            return false;
        }

        let outcome = if outcome.is_ok() && self.is_cancelled() {
            Err(Error::TaskCancelled)
        } else {
            outcome
        };

        *slot = match outcome {
            Ok(value) => {
                self.fulfilled.store(true, Ordering::Release);
                ResultSlot::Value(value)
            }
            Err(error) => ResultSlot::Error(error),
        };

        self.settled.store(true, Ordering::Release);
        self.settled_cv.notify_all();
        true
    }

    /// Move the settled result out. `None` when nothing was ever written;
    /// reading twice yields `InvalidOperation`.
    pub(crate) fn take_result(&self) -> Option<Result<T, Error>> {
        let mut slot = self.slot.lock();
        match std::mem::replace(&mut *slot, ResultSlot::Taken) {
            ResultSlot::Empty => {
                *slot = ResultSlot::Empty;
                None
            }
            ResultSlot::Value(value) => Some(Ok(value)),
            ResultSlot::Error(error) => Some(Err(error)),
            ResultSlot::Taken => Some(Err(Error::invalid_operation(
                "task result already consumed",
            ))),
        }
    }

    /// Block the calling thread until the slot is written.
    pub(crate) fn wait_settled(&self) {
        let mut slot = self.slot.lock();
        while !self.settled.load(Ordering::Acquire) {
            self.settled_cv.wait(&mut slot);
        }
    }

    /// Install the waiter that settlement must resume. Returns false when
    /// the task is already settled; the caller should read instead of
    /// suspending. Registration and the settled check share the waiter
    /// lock, so a concurrent settle either sees the waiter or the caller
    /// sees the settled flag.
    pub(crate) fn register_waiter(&self, waiter: Waiter) -> bool {
        let mut slot = self.waiter.lock();
        if self.is_settled() {
            return false;
        }
        *slot = Some(waiter);
        true
    }

    pub(crate) fn take_waiter(&self) -> Option<Waiter> {
        self.waiter.lock().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_exactly_once() {
        let state = TaskState::new();
        assert!(state.settle(Ok(1)));
        assert!(!state.settle(Ok(2)));
        assert_eq!(state.take_result().unwrap().unwrap(), 1);
    }

    #[test]
    fn test_settled_is_sticky() {
        let state: TaskState<i32> = TaskState::new();
        assert!(!state.is_settled());
        state.settle(Ok(1));
        assert!(state.is_settled());
        state.take_result();
        assert!(state.is_settled());
    }

    #[test]
    fn test_destruction_pending_suppresses_write() {
        let state: TaskState<i32> = TaskState::new();
        state.mark_destruction_pending();
        assert!(!state.settle(Ok(1)));
        assert!(!state.is_settled());
        assert!(state.take_result().is_none());
    }

    #[test]
    fn test_cancel_gates_value_write() {
        let state: TaskState<i32> = TaskState::new();
        state.cancel();
        state.cancel(); // idempotent
        assert!(state.settle(Ok(7)));
        assert!(state.is_rejected());
        assert!(matches!(
            state.take_result(),
            Some(Err(Error::TaskCancelled))
        ));
    }

    #[test]
    fn test_double_read_is_invalid_operation() {
        let state = TaskState::new();
        state.settle(Ok("once".to_string()));
        assert!(state.take_result().unwrap().is_ok());
        assert!(matches!(
            state.take_result(),
            Some(Err(Error::InvalidOperation(_)))
        ));
    }

    #[test]
    fn test_register_waiter_refused_after_settle() {
        let state = TaskState::new();
        state.settle(Ok(0));
        let registered = state.register_waiter(Waiter::Thread(futures::task::noop_waker()));
        assert!(!registered);
        assert!(state.take_waiter().is_none());
    }
}
