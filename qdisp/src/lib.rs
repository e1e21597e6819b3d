//! Priority-scheduled dispatch of per-chunk jobs to worker nodes (§4.6): the
//! FIFO priority queue, the fixed-size dispatch thread pool built on top of
//! it, and per-job lifecycle/cancellation bookkeeping. Grounded on
//! `qdisp/QdispPool.h`, `qdisp/Executive.h`/`.cc`, `qdisp/JobDescription.h`.

mod error;
mod executive;
mod job_description;
mod message_store;
mod priority_queue;
mod resource_unit;

pub use error::{Error, Result};
pub use executive::{Executive, ExecutiveMetrics};
pub use job_description::{FakeWorkerTransport, JobDescription, JobOutcome, ResultHandler, Severity, WorkerTransport};
pub use message_store::{Message, MessageStore};
pub use priority_queue::{PriorityCommand, PriorityQueue};
pub use resource_unit::ResourceUnit;
