//! `JobDescription`: the unit of dispatchable work the `Executive` turns a
//! `ChunkSpec` fragment into. Grounded on `qdisp/JobDescription.h`/
//! `JobQuery.h`: a reference number, a worker resource address, an opaque
//! serialized task message, and a result handler.

use std::sync::Arc;

use crate::resource_unit::ResourceUnit;

/// Severity of a message recorded against a job, mirroring the
/// `{code, severity, description}` shape §6/§7 attach to worker and merge
/// errors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// What a dispatched job produced. `WorkerTransport::execute` returns one of
/// these; the `Executive` dispatch loop feeds it to the job's
/// `ResultHandler` and updates the in-flight bookkeeping accordingly.
#[derive(Clone, Debug)]
pub enum JobOutcome {
    /// The worker produced a result, staged at `result_file` under the
    /// per-chunk temporary table name `result_table` (§6 "Naming"), ready
    /// for the merger to ingest via `LOAD DATA LOCAL INFILE`.
    Success {
        result_table: String,
        result_file: String,
    },
    /// The worker reported a failure, or the transport itself failed.
    Failure {
        code: i32,
        severity: Severity,
        description: String,
    },
    /// The job never ran (or was aborted mid-flight) because the query was
    /// squashed.
    Cancelled,
}

/// Receives the outcome of one job. Implemented by the component that owns
/// the merger and message store for a query (`czar`'s `UserQuery`), kept as
/// a trait here so `qdisp` has no dependency on `merger` or `czar`.
pub trait ResultHandler: Send + Sync {
    fn handle(&self, chunk_id: i32, job_id: i32, outcome: JobOutcome);
}

/// Abstraction of the wire protocol and transport to worker nodes (§6,
/// "Toward workers" - explicitly out of scope to implement). `execute` is
/// called on a dispatch-pool thread and is expected to block on worker I/O;
/// it must check `cancelled` periodically and return
/// `JobOutcome::Cancelled` promptly once it does, per §5's cooperative
/// cancellation model.
pub trait WorkerTransport: Send + Sync {
    fn execute(&self, job: &JobDescription, cancelled: &(dyn Fn() -> bool + Sync)) -> JobOutcome;
}

/// Stand-in `WorkerTransport` for driving the dispatch/merge pipeline
/// without a real worker RPC stack (§6, "Toward workers" - explicitly out
/// of scope), the way `FakeSecondaryIndex`/`MemMetadataStore` stand in for
/// their respective external collaborators. Always reports success, staging
/// the result at the job's own temporary table name.
pub struct FakeWorkerTransport;

impl WorkerTransport for FakeWorkerTransport {
    fn execute(&self, job: &JobDescription, _cancelled: &(dyn Fn() -> bool + Sync)) -> JobOutcome {
        JobOutcome::Success {
            result_table: format!("r_{}_{}", job.query_id(), job.job_id()),
            result_file: format!("/tmp/r_{}_{}.tsv", job.query_id(), job.job_id()),
        }
    }
}

/// One dispatchable unit: a `ChunkQuerySpec` fragment serialized into an
/// opaque task message, addressed at a worker resource, with a result
/// handler to deliver its outcome to. Grounded on `qdisp/JobDescription.h`.
pub struct JobDescription {
    query_id: i64,
    job_id: i32,
    resource_unit: ResourceUnit,
    task_msg: Vec<u8>,
    result_handler: Arc<dyn ResultHandler>,
}

impl JobDescription {
    pub fn new(
        query_id: i64,
        job_id: i32,
        resource_unit: ResourceUnit,
        task_msg: Vec<u8>,
        result_handler: Arc<dyn ResultHandler>,
    ) -> JobDescription {
        JobDescription {
            query_id,
            job_id,
            resource_unit,
            task_msg,
            result_handler,
        }
    }

    pub fn query_id(&self) -> i64 {
        self.query_id
    }

    pub fn job_id(&self) -> i32 {
        self.job_id
    }

    pub fn resource_unit(&self) -> &ResourceUnit {
        &self.resource_unit
    }

    pub fn task_msg(&self) -> &[u8] {
        &self.task_msg
    }

    pub fn result_handler(&self) -> &Arc<dyn ResultHandler> {
        &self.result_handler
    }
}
