//! Time primitives. The manager's timer heap is the only time source.

use crate::context;
use crate::runtime;
use crate::task::raw::Waiter;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// Suspend the current computation for at least `duration`.
///
/// A zero duration never suspends. Otherwise the deadline is registered
/// with the manager on first poll and the drive tick is the sole resumer,
/// so resumption happens no earlier than the deadline and no later than
/// roughly one tick after it.
pub fn sleep_for(duration: Duration) -> Sleep {
    Sleep {
        duration,
        deadline: None,
    }
}

/// Awaiter returned by [`sleep_for`].
#[derive(Debug)]
pub struct Sleep {
    duration: Duration,
    deadline: Option<Instant>,
}

impl Future for Sleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.duration.is_zero() {
            return Poll::Ready(());
        }

        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Poll::Ready(());
            }
            // armed already; the drive tick resumes us
            return Poll::Pending;
        }

        if context::current_cancelled() {
            // don't arm a timer for a cancelled task; reschedule so the
            // stepper observes the flag instead
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }

        let deadline = Instant::now() + self.duration;
        self.deadline = Some(deadline);
        runtime::current_runtime()
            .manager()
            .schedule_timer(deadline, Waiter::from_context(cx));
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_sleep_is_ready_immediately() {
        // never touches the runtime: poll through a plain block_on
        futures::executor::block_on(sleep_for(Duration::ZERO));
    }

    #[test]
    fn test_positive_sleep_registers_once() {
        let mut sleep = sleep_for(Duration::from_millis(5));
        assert!(sleep.deadline.is_none());
        assert!(!sleep.duration.is_zero());
    }
}
