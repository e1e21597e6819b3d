//! `Executive`: turns queued jobs into running worker dispatches, tracks
//! which are still in flight, and is the synchronization point a query's
//! `submit()`/`join()`/`kill()` pair is built on. Grounded on
//! `qdisp/Executive.h`/`.cc`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, AtomicI64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use observability_deps::tracing::{debug, warn};
use parking_lot::{Condvar, Mutex};

use crate::job_description::{JobDescription, JobOutcome, ResultHandler, WorkerTransport};
use crate::priority_queue::{PriorityCommand, PriorityQueue};
use crate::resource_unit::ResourceUnit;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum JobStatus {
    Queued,
    Running,
}

/// Minimal ambient instrumentation (§ SPEC_FULL "Metrics surface"): counts
/// jobs queued, currently running, and failed, mirroring the shape of the
/// teacher's `metric::Registry` counters (see also `merger::MergerMetrics`)
/// without pulling in the full metrics crate.
#[derive(Default)]
pub struct ExecutiveMetrics {
    pub jobs_queued: AtomicI64,
    pub jobs_running: AtomicI64,
    pub jobs_failed: AtomicI64,
}

struct Shared {
    in_flight: Mutex<HashMap<i32, JobStatus>>,
    cv: Condvar,
    cancelled: std::sync::atomic::AtomicBool,
    transport: Arc<dyn WorkerTransport>,
    metrics: ExecutiveMetrics,
}

/// Priority-scheduled dispatcher for one query's worker jobs: wraps a
/// [`PriorityQueue`] with job-level bookkeeping (in-flight count,
/// cancellation, a fixed pool of dispatch threads). One `Executive` per
/// `UserQuery`, per §3's ownership table.
pub struct Executive {
    shared: Arc<Shared>,
    pq: Arc<PriorityQueue>,
    next_job_id: AtomicI32,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl Executive {
    /// `num_threads` dispatch threads pull from a priority queue seeded
    /// with one `default_priority` level of `(min_running, max_running)`;
    /// callers that need more levels follow with [`Executive::add_pri_queue`].
    pub fn new(
        transport: Arc<dyn WorkerTransport>,
        num_threads: usize,
        default_priority: i32,
        min_running: i32,
        max_running: i32,
    ) -> Executive {
        let pq = Arc::new(PriorityQueue::new(default_priority, min_running, max_running));
        let shared = Arc::new(Shared {
            in_flight: Mutex::new(HashMap::new()),
            cv: Condvar::new(),
            cancelled: std::sync::atomic::AtomicBool::new(false),
            transport,
            metrics: ExecutiveMetrics::default(),
        });
        let threads = (0..num_threads.max(1))
            .map(|_| spawn_dispatch_thread(Arc::clone(&pq)))
            .collect();
        Executive {
            shared,
            pq,
            next_job_id: AtomicI32::new(1),
            threads: Mutex::new(threads),
        }
    }

    pub fn add_pri_queue(&self, priority: i32, min_running: i32, max_running: i32) -> crate::error::Result<()> {
        self.pq.add_pri_queue(priority, min_running, max_running)
    }

    /// Assigns a job id, registers it in the in-flight map, and enqueues an
    /// "issue" command under `priority`. Returns the assigned job id.
    /// Grounded on `Executive::add`: "registers it in an in-flight map and
    /// enqueues an issue command."
    pub fn add(
        &self,
        query_id: i64,
        resource_unit: ResourceUnit,
        task_msg: Vec<u8>,
        result_handler: Arc<dyn ResultHandler>,
        priority: i32,
    ) -> i32 {
        let job_id = self.next_job_id.fetch_add(1, Ordering::SeqCst);
        let job = JobDescription::new(query_id, job_id, resource_unit, task_msg, result_handler);
        self.shared.in_flight.lock().insert(job_id, JobStatus::Queued);
        self.shared.metrics.jobs_queued.fetch_add(1, Ordering::Relaxed);
        debug!(query_id, job_id, resource = %job.resource_unit(), "job queued");

        let shared = Arc::clone(&self.shared);
        let cmd = PriorityCommand::new(move || run_job(shared, job));
        self.pq.queue(cmd, priority);
        job_id
    }

    /// True once [`Executive::squash`] has been called. The submit loop
    /// (§8 scenario 6, "kill during submit") checks this once per chunk and
    /// stops enqueueing new jobs as soon as it flips.
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }

    /// Best-effort, asynchronous cancellation: flags the query cancelled
    /// and wakes anything blocked in `join`. In-flight jobs observe the
    /// flag (via the closure built in `add`) and finish without delivering
    /// a result; already-queued-but-not-started jobs are reported as
    /// `JobOutcome::Cancelled` without ever reaching the transport.
    pub fn squash(&self) {
        self.shared.cancelled.store(true, Ordering::SeqCst);
        self.shared.cv.notify_all();
    }

    /// Blocks until every job added so far has finished, or until
    /// `squash()` is called - whichever comes first. Returns `false` if the
    /// query was cancelled, matching §5/§8: "After squash, join() returns
    /// false and the query transitions to ABORTED."
    pub fn join(&self) -> bool {
        let mut in_flight = self.shared.in_flight.lock();
        loop {
            if self.shared.cancelled.load(Ordering::SeqCst) {
                return false;
            }
            if in_flight.is_empty() {
                return true;
            }
            self.shared.cv.wait(&mut in_flight);
        }
    }

    /// Number of jobs registered but not yet finished.
    pub fn in_flight_count(&self) -> usize {
        self.shared.in_flight.lock().len()
    }

    pub fn stats_str(&self) -> String {
        self.pq.stats_str()
    }

    pub fn metrics(&self) -> &ExecutiveMetrics {
        &self.shared.metrics
    }
}

impl Drop for Executive {
    fn drop(&mut self) {
        self.pq.prepare_shutdown();
        for handle in self.threads.get_mut().drain(..) {
            if handle.join().is_err() {
                warn!("dispatch thread panicked during executive shutdown");
            }
        }
    }
}

fn spawn_dispatch_thread(pq: Arc<PriorityQueue>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        while let Some(cmd) = pq.get_cmd(true) {
            pq.command_start(&cmd);
            cmd.run();
            pq.command_finish(&cmd);
        }
    })
}

fn run_job(shared: Arc<Shared>, job: JobDescription) {
    let job_id = job.job_id();
    shared.in_flight.lock().insert(job_id, JobStatus::Running);
    shared.metrics.jobs_queued.fetch_sub(1, Ordering::Relaxed);
    shared.metrics.jobs_running.fetch_add(1, Ordering::Relaxed);

    let outcome = if shared.cancelled.load(Ordering::SeqCst) {
        JobOutcome::Cancelled
    } else {
        let cancelled = &shared.cancelled;
        shared
            .transport
            .execute(&job, &|| cancelled.load(Ordering::SeqCst))
    };

    if matches!(outcome, JobOutcome::Failure { .. }) {
        shared.metrics.jobs_failed.fetch_add(1, Ordering::Relaxed);
    }
    job.result_handler().handle(job.resource_unit().chunk_id(), job_id, outcome);

    shared.metrics.jobs_running.fetch_sub(1, Ordering::Relaxed);
    shared.in_flight.lock().remove(&job_id);
    shared.cv.notify_all();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job_description::Severity;
    use std::sync::atomic::AtomicUsize;

    struct EchoTransport;
    impl WorkerTransport for EchoTransport {
        fn execute(&self, job: &JobDescription, _cancelled: &(dyn Fn() -> bool + Sync)) -> JobOutcome {
            JobOutcome::Success {
                result_table: format!("r_{}_{}", job.query_id(), job.job_id()),
                result_file: format!("/tmp/r_{}_{}.tsv", job.query_id(), job.job_id()),
            }
        }
    }

    struct FailTransport;
    impl WorkerTransport for FailTransport {
        fn execute(&self, _job: &JobDescription, _cancelled: &(dyn Fn() -> bool + Sync)) -> JobOutcome {
            JobOutcome::Failure {
                code: 1234,
                severity: Severity::Error,
                description: "boom".to_string(),
            }
        }
    }

    struct BlockingTransport;
    impl WorkerTransport for BlockingTransport {
        fn execute(&self, _job: &JobDescription, cancelled: &(dyn Fn() -> bool + Sync)) -> JobOutcome {
            while !cancelled() {
                std::thread::sleep(std::time::Duration::from_millis(5));
            }
            JobOutcome::Cancelled
        }
    }

    struct CountingHandler {
        successes: AtomicUsize,
        failures: AtomicUsize,
        cancellations: AtomicUsize,
    }

    impl CountingHandler {
        fn new() -> Arc<CountingHandler> {
            Arc::new(CountingHandler {
                successes: AtomicUsize::new(0),
                failures: AtomicUsize::new(0),
                cancellations: AtomicUsize::new(0),
            })
        }
    }

    impl ResultHandler for CountingHandler {
        fn handle(&self, _chunk_id: i32, _job_id: i32, outcome: JobOutcome) {
            match outcome {
                JobOutcome::Success { .. } => self.successes.fetch_add(1, Ordering::SeqCst),
                JobOutcome::Failure { .. } => self.failures.fetch_add(1, Ordering::SeqCst),
                JobOutcome::Cancelled => self.cancellations.fetch_add(1, Ordering::SeqCst),
            };
        }
    }

    #[test]
    fn join_waits_for_all_jobs_to_complete() {
        let exec = Executive::new(Arc::new(EchoTransport), 4, 0, 0, 4);
        let handler = CountingHandler::new();
        for i in 0..10 {
            exec.add(1, ResourceUnit::new("LSST", i), vec![], handler.clone(), 0);
        }
        assert!(exec.join());
        assert_eq!(handler.successes.load(Ordering::SeqCst), 10);
        assert_eq!(exec.in_flight_count(), 0);
    }

    #[test]
    fn worker_failure_is_delivered_to_result_handler() {
        let exec = Executive::new(Arc::new(FailTransport), 2, 0, 0, 2);
        let handler = CountingHandler::new();
        exec.add(1, ResourceUnit::new("LSST", 100), vec![], handler.clone(), 0);
        assert!(exec.join());
        assert_eq!(handler.failures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn squash_cancels_in_flight_jobs_and_join_reports_false() {
        let exec = Arc::new(Executive::new(Arc::new(BlockingTransport), 2, 0, 0, 2));
        let handler = CountingHandler::new();
        exec.add(1, ResourceUnit::new("LSST", 1), vec![], handler.clone(), 0);
        std::thread::sleep(std::time::Duration::from_millis(20));
        exec.squash();
        assert!(!exec.join());
        assert!(exec.is_cancelled());
    }

    #[test]
    fn cancelled_before_dispatch_never_reaches_transport() {
        let exec = Executive::new(Arc::new(EchoTransport), 1, 0, 0, 1);
        exec.squash();
        let handler = CountingHandler::new();
        exec.add(1, ResourceUnit::new("LSST", 1), vec![], handler.clone(), 0);
        assert!(!exec.join());
    }

    #[test]
    fn metrics_count_queued_and_failed_jobs() {
        let exec = Executive::new(Arc::new(FailTransport), 2, 0, 0, 2);
        let handler = CountingHandler::new();
        exec.add(1, ResourceUnit::new("LSST", 1), vec![], handler.clone(), 0);
        assert!(exec.join());
        assert_eq!(exec.metrics().jobs_failed.load(Ordering::SeqCst), 1);
        assert_eq!(exec.metrics().jobs_running.load(Ordering::SeqCst), 0);
    }
}
