//! One-shot rendezvous between a producer and a suspended consumer.
//!
//! [`AsyncPromise`] bridges callback-style producers (a network callback on
//! a foreign thread, typically) to a single awaiting computation. The
//! producer publishes exactly once with [`AsyncPromise::set_value`] or
//! [`AsyncPromise::set_error`]; the consumer awaits the promise and reads
//! the payload with the publication ordered before the read.
//!
//! The payload slots are guarded by a plain mutex rather than a lock-free
//! protocol: the payload types are arbitrary and the critical section is
//! O(1), so serialising publication is the simpler contract. The ready
//! flag is the acquire/release edge consumers check first.

use crate::error::{Error, Result};
use crate::task::raw::Waiter;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

struct Inner<T> {
    value: Option<T>,
    error: Option<Error>,
    waiter: Option<Waiter>,
    consumed: bool,
}

struct OneShot<T> {
    ready: AtomicBool,
    inner: Mutex<Inner<T>>,
}

/// Single-producer, single-consumer one-shot promise.
///
/// Clones share the same rendezvous state: keep one clone as the producer
/// handle and await another as the consumer. At most one consumer may
/// suspend on a promise; a second waiter is rejected by immediate
/// reschedule without installation.
pub struct AsyncPromise<T: Send + 'static> {
    state: Arc<OneShot<T>>,
}

impl<T: Send + 'static> AsyncPromise<T> {
    /// Create an unresolved promise.
    pub fn new() -> Self {
        Self {
            state: Arc::new(OneShot {
                ready: AtomicBool::new(false),
                inner: Mutex::new(Inner {
                    value: None,
                    error: None,
                    waiter: None,
                    consumed: false,
                }),
            }),
        }
    }

    /// True once a value or error has been published.
    pub fn is_ready(&self) -> bool {
        self.state.ready.load(Ordering::Acquire)
    }

    /// Publish a value and resume the waiting consumer, if any. The first
    /// publication wins; later calls are logged no-ops.
    pub fn set_value(&self, value: T) {
        self.publish(Some(value), None);
    }

    /// Publish an error and resume the waiting consumer, if any.
    pub fn set_error(&self, error: Error) {
        self.publish(None, Some(error));
    }

    fn publish(&self, value: Option<T>, error: Option<Error>) {
        let waiter = {
            let mut inner = self.state.inner.lock();
            if self.state.ready.load(Ordering::Relaxed) {
                tracing::debug!("publication after ready is a no-op");
                return;
            }
            inner.value = value;
            inner.error = error;
            self.state.ready.store(true, Ordering::Release);
            // take-and-null under the mutex; resume outside it
            inner.waiter.take()
        };

        if let Some(waiter) = waiter {
            waiter.complete();
        }
    }

    /// Move the published payload out. Exactly one read observes it.
    fn take_payload(&self) -> Result<T> {
        let mut inner = self.state.inner.lock();
        if inner.consumed {
            return Err(Error::invalid_operation("promise payload already consumed"));
        }
        if let Some(error) = inner.error.take() {
            inner.consumed = true;
            return Err(error);
        }
        match inner.value.take() {
            Some(value) => {
                inner.consumed = true;
                Ok(value)
            }
            None => Err(Error::invalid_operation("promise resolved without a value")),
        }
    }
}

impl<T: Send + 'static> Default for AsyncPromise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Clone for AsyncPromise<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: Send + 'static> Future for AsyncPromise<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // fast path: published before we got here, no suspension
        if self.state.ready.load(Ordering::Acquire) {
            return Poll::Ready(self.take_payload());
        }

        let mut inner = self.state.inner.lock();
        // re-check under the mutex: the producer may have published between
        // the flag read and the lock
        if self.state.ready.load(Ordering::Relaxed) {
            drop(inner);
            return Poll::Ready(self.take_payload());
        }

        if inner.waiter.is_some() {
            tracing::warn!("second waiter on a one-shot promise; rescheduling without installation");
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }

        inner.waiter = Some(Waiter::from_context(cx));
        Poll::Pending
    }
}

impl<T: Send + 'static> std::fmt::Debug for AsyncPromise<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncPromise")
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_producer_first_consumer_does_not_suspend() {
        let promise = AsyncPromise::new();
        promise.set_value(7);
        assert!(promise.is_ready());

        let got = futures::executor::block_on(promise.clone());
        assert_eq!(got.unwrap(), 7);
    }

    #[test]
    fn test_consumer_first_is_resumed_by_producer() {
        let promise = AsyncPromise::new();
        let producer = promise.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            producer.set_value("hello".to_string());
        });

        let got = futures::executor::block_on(promise.clone());
        assert_eq!(got.unwrap(), "hello");
        handle.join().unwrap();
    }

    #[test]
    fn test_first_publication_wins() {
        let promise = AsyncPromise::new();
        promise.set_value(1);
        promise.set_value(2);
        promise.set_error(Error::unknown("late"));

        let got = futures::executor::block_on(promise.clone());
        assert_eq!(got.unwrap(), 1);
    }

    #[test]
    fn test_error_publication_surfaces() {
        let promise: AsyncPromise<i32> = AsyncPromise::new();
        promise.set_error(Error::unknown("remote failure"));

        let got = futures::executor::block_on(promise.clone());
        assert!(matches!(got, Err(Error::UnknownError(_))));
    }

    #[test]
    fn test_second_read_is_invalid_operation() {
        let promise = AsyncPromise::new();
        promise.set_value(9);

        assert!(futures::executor::block_on(promise.clone()).is_ok());
        let again = futures::executor::block_on(promise.clone());
        assert!(matches!(again, Err(Error::InvalidOperation(_))));
    }
}
