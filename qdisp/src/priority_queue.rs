//! The FIFO priority queue the dispatch thread pool pulls from. Grounded on
//! `qdisp/QdispPool.h`'s `PriorityQueue`/`PriQ`/`PriorityCommand`: a small
//! set of priority levels, each with a guaranteed minimum and a hard maximum
//! concurrent budget, so a flood of low-priority background scans cannot
//! starve interactive queries.

use std::collections::{BTreeMap, VecDeque};

use parking_lot::{Condvar, Mutex};
use snafu::ensure;

use crate::error::{DuplicatePrioritySnafu, Result};

/// A unit of work for the dispatch pool: an opaque closure plus the priority
/// it was queued under. Constructed via [`PriorityCommand::new`]; the
/// priority field is filled in by [`PriorityQueue::queue`], mirroring
/// `PriorityCommand::_priority` being private to `PriorityQueue` in the
/// original.
pub struct PriorityCommand {
    priority: i32,
    func: Box<dyn FnOnce() + Send>,
}

impl PriorityCommand {
    pub fn new(func: impl FnOnce() + Send + 'static) -> PriorityCommand {
        PriorityCommand {
            priority: 0,
            func: Box::new(func),
        }
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn run(self) {
        (self.func)()
    }
}

struct PriQueue {
    min_running: i32,
    max_running: i32,
    running: i32,
    fifo: VecDeque<PriorityCommand>,
}

impl PriQueue {
    fn new(min_running: i32, max_running: i32) -> PriQueue {
        PriQueue {
            min_running,
            max_running,
            running: 0,
            fifo: VecDeque::new(),
        }
    }
}

struct Inner {
    queues: BTreeMap<i32, PriQueue>,
    default_priority: i32,
    shutting_down: bool,
}

/// Lower integer values are higher priority. Threads ask the lowest-numbered
/// non-empty queue with room under its max budget first, but never skip past
/// a higher-priority queue that hasn't reached its `min_running` reservation:
/// those slots are held idle so an interactive query arriving at a
/// higher-priority level is never stuck waiting behind a flood of
/// lower-priority background work (§4.6/§9).
pub struct PriorityQueue {
    inner: Mutex<Inner>,
    cv: Condvar,
}

impl PriorityQueue {
    pub fn new(default_priority: i32, min_running: i32, max_running: i32) -> PriorityQueue {
        let mut queues = BTreeMap::new();
        queues.insert(default_priority, PriQueue::new(min_running, max_running));
        PriorityQueue {
            inner: Mutex::new(Inner {
                queues,
                default_priority,
                shutting_down: false,
            }),
            cv: Condvar::new(),
        }
    }

    pub fn add_pri_queue(&self, priority: i32, min_running: i32, max_running: i32) -> Result<()> {
        let mut inner = self.inner.lock();
        ensure!(
            !inner.queues.contains_key(&priority),
            DuplicatePrioritySnafu { priority }
        );
        inner.queues.insert(priority, PriQueue::new(min_running, max_running));
        Ok(())
    }

    /// Queues `cmd` under `priority`. An unregistered priority falls back to
    /// the lowest-priority (highest-numbered) registered queue - "invalid
    /// priorities get the lowest priority, which is the bottom of the heap."
    pub fn queue(&self, mut cmd: PriorityCommand, priority: i32) {
        let mut inner = self.inner.lock();
        let resolved = if inner.queues.contains_key(&priority) {
            priority
        } else {
            *inner.queues.keys().next_back().unwrap_or(&inner.default_priority)
        };
        cmd.priority = resolved;
        inner
            .queues
            .get_mut(&resolved)
            .expect("resolved priority is always a registered key")
            .fifo
            .push_back(cmd);
        drop(inner);
        self.cv.notify_one();
    }

    /// Picks and removes the highest-priority runnable command, blocking
    /// until one is available (or the queue is shut down) when `wait` is
    /// true. Returns `None` once shut down with nothing left to run.
    pub fn get_cmd(&self, wait: bool) -> Option<PriorityCommand> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(priority) = Self::pick_runnable(&inner) {
                let q = inner.queues.get_mut(&priority).expect("picked from existing queue");
                return q.fifo.pop_front();
            }
            if inner.shutting_down {
                return None;
            }
            if !wait {
                return None;
            }
            self.cv.wait(&mut inner);
        }
    }

    /// Walks priorities highest-first. Picks the first queue with pending
    /// work and room under its max, *unless* an earlier (higher-priority)
    /// queue is still below its `min_running` reservation - in that case no
    /// lower-priority queue is ever returned, even if this one has nothing
    /// to run right now, so the reserved slot stays free for it.
    fn pick_runnable(inner: &Inner) -> Option<i32> {
        let mut reserved = false;
        for (&priority, q) in inner.queues.iter() {
            if !reserved && !q.fifo.is_empty() && q.running < q.max_running {
                return Some(priority);
            }
            if q.running < q.min_running {
                reserved = true;
            }
        }
        None
    }

    /// Called by the dispatch loop immediately before running a command
    /// popped via `get_cmd`, to account it against its queue's running
    /// budget.
    pub fn command_start(&self, cmd: &PriorityCommand) {
        let mut inner = self.inner.lock();
        if let Some(q) = inner.queues.get_mut(&cmd.priority) {
            q.running += 1;
        }
    }

    /// Called by the dispatch loop after a command finishes running.
    pub fn command_finish(&self, cmd: &PriorityCommand) {
        let mut inner = self.inner.lock();
        if let Some(q) = inner.queues.get_mut(&cmd.priority) {
            q.running = q.running.saturating_sub(1);
        }
        drop(inner);
        self.cv.notify_all();
    }

    /// Flags the queue as shutting down and wakes every waiting thread so
    /// idle pool threads can observe it and exit.
    pub fn prepare_shutdown(&self) {
        let mut inner = self.inner.lock();
        inner.shutting_down = true;
        drop(inner);
        self.cv.notify_all();
    }

    pub fn stats_str(&self) -> String {
        let inner = self.inner.lock();
        inner
            .queues
            .iter()
            .map(|(p, q)| format!("p{}: {}/{} running, {} queued", p, q.running, q.max_running, q.fifo.len()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn higher_priority_runs_before_lower() {
        let pq = PriorityQueue::new(1, 0, 4);
        pq.add_pri_queue(0, 0, 4).unwrap();
        pq.queue(PriorityCommand::new(|| {}), 1);
        pq.queue(PriorityCommand::new(|| {}), 0);
        let first = pq.get_cmd(false).unwrap();
        assert_eq!(first.priority(), 0);
        let second = pq.get_cmd(false).unwrap();
        assert_eq!(second.priority(), 1);
    }

    #[test]
    fn unknown_priority_falls_back_to_lowest() {
        let pq = PriorityQueue::new(1, 0, 4);
        pq.add_pri_queue(5, 0, 4).unwrap();
        pq.queue(PriorityCommand::new(|| {}), 99);
        let cmd = pq.get_cmd(false).unwrap();
        assert_eq!(cmd.priority(), 5);
    }

    #[test]
    fn max_running_budget_blocks_additional_dispatch() {
        let pq = PriorityQueue::new(0, 0, 1);
        pq.queue(PriorityCommand::new(|| {}), 0);
        pq.queue(PriorityCommand::new(|| {}), 0);
        let cmd = pq.get_cmd(false).unwrap();
        pq.command_start(&cmd);
        assert!(pq.get_cmd(false).is_none());
        pq.command_finish(&cmd);
        assert!(pq.get_cmd(false).is_some());
    }

    #[test]
    fn min_running_reservation_blocks_lower_priority_while_unmet() {
        let pq = PriorityQueue::new(1, 0, 4);
        pq.add_pri_queue(0, 2, 4).unwrap();
        // Priority 0 has no pending work and running=0, below its min of 2:
        // priority 1's pending command must not be dispatched.
        pq.queue(PriorityCommand::new(|| {}), 1);
        assert!(pq.get_cmd(false).is_none());
    }

    #[test]
    fn min_running_reservation_releases_once_met() {
        let pq = PriorityQueue::new(1, 0, 4);
        pq.add_pri_queue(0, 1, 4).unwrap();
        pq.queue(PriorityCommand::new(|| {}), 0);
        let p0 = pq.get_cmd(false).unwrap();
        pq.command_start(&p0);
        pq.queue(PriorityCommand::new(|| {}), 1);
        let next = pq.get_cmd(false).unwrap();
        assert_eq!(next.priority(), 1);
    }

    #[test]
    fn duplicate_priority_registration_is_an_error() {
        let pq = PriorityQueue::new(1, 0, 4);
        test_helpers::assert_error_contains(&pq.add_pri_queue(1, 0, 4).unwrap_err(), "already has an entry");
    }

    #[test]
    fn shutdown_wakes_blocked_waiters() {
        let pq = Arc::new(PriorityQueue::new(1, 0, 4));
        let woke = Arc::new(AtomicUsize::new(0));
        let pq2 = pq.clone();
        let woke2 = woke.clone();
        let handle = std::thread::spawn(move || {
            let result = pq2.get_cmd(true);
            woke2.store(if result.is_none() { 1 } else { 2 }, Ordering::SeqCst);
        });
        std::thread::sleep(std::time::Duration::from_millis(20));
        pq.prepare_shutdown();
        handle.join().unwrap();
        assert_eq!(woke.load(Ordering::SeqCst), 1);
    }
}
