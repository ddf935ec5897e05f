//! The central drive actor: timers, ready queue, deferred destruction.
//!
//! The manager owns four mailboxes, each behind its own mutex held only
//! for enqueue and swap-out: a min-heap of armed timers, a FIFO of ready
//! continuations resumed inline on the drive thread, a FIFO of
//! continuations marked for background resumption (a thin passthrough to
//! the worker pool), and a FIFO of frames pending destruction. One
//! [`Manager::tick`] drains them in a fixed order; the drive loop in
//! [`crate::runtime`] calls it on a dedicated thread at the configured
//! cadence.

use crate::executor::CpuPool;
use crate::task::raw::{Continuation, Resumable, Waiter};
use parking_lot::Mutex;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// An armed timer: resume `waiter` no earlier than `deadline`.
struct TimerEntry {
    deadline: Instant,
    seq: u64,
    waiter: Waiter,
}

// BinaryHeap is a max-heap; order entries by reversed deadline so the
// earliest deadline surfaces first. The sequence number keeps equal
// deadlines FIFO.
impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for TimerEntry {}

pub(crate) struct Manager {
    timers: Mutex<BinaryHeap<TimerEntry>>,
    ready: Mutex<VecDeque<Continuation>>,
    offload: Mutex<VecDeque<Continuation>>,
    destroy: Mutex<Vec<Arc<dyn Resumable>>>,
    timer_seq: AtomicU64,
    ticks: AtomicU64,
    frames_reaped: AtomicU64,
}

impl Manager {
    pub(crate) fn new() -> Self {
        Self {
            timers: Mutex::new(BinaryHeap::new()),
            ready: Mutex::new(VecDeque::new()),
            offload: Mutex::new(VecDeque::new()),
            destroy: Mutex::new(Vec::new()),
            timer_seq: AtomicU64::new(0),
            ticks: AtomicU64::new(0),
            frames_reaped: AtomicU64::new(0),
        }
    }

    /// Arm a timer. The drive tick is the sole resumer; the waiter fires no
    /// earlier than `deadline`.
    pub(crate) fn schedule_timer(&self, deadline: Instant, waiter: Waiter) {
        let seq = self.timer_seq.fetch_add(1, Ordering::Relaxed);
        self.timers.lock().push(TimerEntry {
            deadline,
            seq,
            waiter,
        });
    }

    /// Queue a continuation for inline resumption on the drive thread.
    pub(crate) fn schedule_ready(&self, cont: Continuation) {
        self.ready.lock().push_back(cont);
    }

    /// Queue a continuation for background resumption on the worker pool.
    pub(crate) fn schedule_offload(&self, cont: Continuation) {
        self.offload.lock().push_back(cont);
    }

    /// Transfer ownership of a dropped task's frame; the next tick reaps it.
    pub(crate) fn schedule_destroy(&self, frame: Arc<dyn Resumable>) {
        self.destroy.lock().push(frame);
    }

    pub(crate) fn timers_pending(&self) -> usize {
        self.timers.lock().len()
    }

    pub(crate) fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub(crate) fn frames_reaped(&self) -> u64 {
        self.frames_reaped.load(Ordering::Relaxed)
    }

    /// One drive tick. Order is part of the contract: background handoffs
    /// first, then expired timers feed the ready queue, then the ready
    /// queue is resumed inline, and destructions run strictly last so a
    /// continuation resumed in this tick cannot lose its frame in the same
    /// tick.
    pub(crate) fn tick(&self, pool: &CpuPool) {
        let offloaded: Vec<Continuation> = {
            let mut queue = self.offload.lock();
            queue.drain(..).collect()
        };
        for cont in offloaded {
            pool.execute(move || cont.resume());
        }

        let now = Instant::now();
        let mut expired = Vec::new();
        {
            let mut timers = self.timers.lock();
            while timers.peek().map_or(false, |entry| entry.deadline <= now) {
                if let Some(entry) = timers.pop() {
                    expired.push(entry);
                }
            }
        }
        for entry in expired {
            match entry.waiter {
                Waiter::Frame(cont) => self.ready.lock().push_back(cont),
                Waiter::Thread(waker) => waker.wake(),
            }
        }

        let ready: VecDeque<Continuation> = {
            let mut queue = self.ready.lock();
            std::mem::take(&mut *queue)
        };
        for cont in ready {
            cont.resume();
        }

        let doomed: Vec<Arc<dyn Resumable>> = {
            let mut queue = self.destroy.lock();
            std::mem::take(&mut *queue)
        };
        for frame in doomed {
            frame.discard();
            self.frames_reaped.fetch_add(1, Ordering::Relaxed);
        }

        self.ticks.fetch_add(1, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("timers_pending", &self.timers_pending())
            .field("ticks", &self.ticks())
            .field("frames_reaped", &self.frames_reaped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::time::Duration;

    /// Records the order of lifecycle events on a shared log.
    struct Probe {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Probe {
        fn new(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                log: log.clone(),
            })
        }
    }

    impl Resumable for Probe {
        fn resume(self: Arc<Self>) {
            self.log.lock().push(format!("{}:resumed", self.name));
        }
        fn is_complete(&self) -> bool {
            false
        }
        fn is_cancelled(&self) -> bool {
            false
        }
        fn discard(&self) {
            self.log.lock().push(format!("{}:discarded", self.name));
        }
    }

    fn cont_of(probe: &Arc<Probe>) -> Continuation {
        let erased: Arc<dyn Resumable> = probe.clone();
        Continuation::new(Arc::downgrade(&erased))
    }

    fn test_pool() -> CpuPool {
        let config = Config::builder().num_threads(1).build().unwrap();
        CpuPool::new(&config).unwrap()
    }

    #[test]
    fn test_tick_order_timers_then_ready_then_destroy() {
        let manager = Manager::new();
        let pool = test_pool();
        let log = Arc::new(Mutex::new(Vec::new()));

        let ready_probe = Probe::new("ready", &log);
        let timer_probe = Probe::new("timer", &log);
        let doomed_probe = Probe::new("doomed", &log);

        manager.schedule_ready(cont_of(&ready_probe));
        manager.schedule_timer(
            Instant::now() - Duration::from_millis(1),
            Waiter::Frame(cont_of(&timer_probe)),
        );
        manager.schedule_destroy(doomed_probe.clone());

        manager.tick(&pool);

        let events = log.lock().clone();
        assert_eq!(
            events,
            vec![
                "ready:resumed".to_string(),
                "timer:resumed".to_string(),
                "doomed:discarded".to_string()
            ]
        );
        assert_eq!(manager.frames_reaped(), 1);
    }

    #[test]
    fn test_timer_never_fires_early() {
        let manager = Manager::new();
        let pool = test_pool();
        let log = Arc::new(Mutex::new(Vec::new()));

        let probe = Probe::new("late", &log);
        manager.schedule_timer(
            Instant::now() + Duration::from_secs(60),
            Waiter::Frame(cont_of(&probe)),
        );

        manager.tick(&pool);

        assert!(log.lock().is_empty());
        assert_eq!(manager.timers_pending(), 1);
    }

    #[test]
    fn test_equal_deadlines_fire_fifo() {
        let manager = Manager::new();
        let pool = test_pool();
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = Probe::new("first", &log);
        let second = Probe::new("second", &log);
        let deadline = Instant::now() - Duration::from_millis(1);

        manager.schedule_timer(deadline, Waiter::Frame(cont_of(&first)));
        manager.schedule_timer(deadline, Waiter::Frame(cont_of(&second)));

        manager.tick(&pool);

        let events = log.lock().clone();
        assert_eq!(events, vec!["first:resumed", "second:resumed"]);
    }

    #[test]
    fn test_stale_continuation_skipped() {
        let manager = Manager::new();
        let pool = test_pool();
        let log = Arc::new(Mutex::new(Vec::new()));

        {
            let probe = Probe::new("gone", &log);
            manager.schedule_ready(cont_of(&probe));
            // probe dropped here; the queued continuation goes stale
        }

        manager.tick(&pool);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_offload_reaches_the_pool() {
        let manager = Manager::new();
        let pool = test_pool();
        let log = Arc::new(Mutex::new(Vec::new()));

        let probe = Probe::new("bg", &log);
        manager.schedule_offload(cont_of(&probe));
        manager.tick(&pool);

        let deadline = Instant::now() + Duration::from_secs(5);
        while log.lock().is_empty() {
            assert!(Instant::now() < deadline, "offload never ran");
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(log.lock().clone(), vec!["bg:resumed"]);
    }
}
