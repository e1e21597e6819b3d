//! The wire contract toward worker nodes (§6, "Toward workers"): a
//! `ResourceUnit` (reused from `qdisp`) addresses the worker resource, and
//! `TaskMsg` is the opaque serialized message a `TaskMsgFactory` builds
//! bit-exactly from a `ChunkQuerySpec`. Grounded on `qproc/TaskMsgFactory.h`
//! (forward-declared and constructed in `UserQuerySelect::submit`) and the
//! scan-hint flags SPEC_FULL's supplement calls out (`scanInteractive`,
//! `scanPriority`).

use query_session::ChunkQuerySpec;
use serde::{Deserialize, Serialize};

/// One worker-bound task: a chunk (or sub-chunk fragment), the parallel
/// query fragments to run against it, the result table to stage output
/// under, and the scan-hint flags a worker uses to schedule local disk
/// scans. Serialized with `serde_json` for a deterministic, bit-exact wire
/// form - every field order is fixed by this struct's declaration order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskMsg {
    pub query_id: i64,
    pub job_id: i32,
    pub db: String,
    pub chunk_id: i32,
    pub sub_chunk_ids: Vec<i32>,
    pub fragments: Vec<String>,
    pub result_table: String,
    pub scan_interactive: bool,
    pub scan_priority: i32,
}

impl TaskMsg {
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("TaskMsg always serializes")
    }

    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<TaskMsg> {
        serde_json::from_slice(bytes)
    }
}

/// Builds [`TaskMsg`]s for one query, tagging every fragment with the
/// query's interactive-scan classification (§ SPEC_FULL, "Interactive-query
/// scan limit") and dispatch priority.
pub struct TaskMsgFactory {
    query_id: i64,
    scan_interactive: bool,
    scan_priority: i32,
}

impl TaskMsgFactory {
    pub fn new(query_id: i64, scan_interactive: bool, scan_priority: i32) -> TaskMsgFactory {
        TaskMsgFactory {
            query_id,
            scan_interactive,
            scan_priority,
        }
    }

    pub fn build(&self, job_id: i32, spec: &ChunkQuerySpec, result_table: String, sub_chunk_ids: Vec<i32>) -> TaskMsg {
        TaskMsg {
            query_id: self.query_id,
            job_id,
            db: spec.db.clone(),
            chunk_id: spec.chunk_id,
            sub_chunk_ids,
            fragments: spec.parallel_queries.clone(),
            result_table,
            scan_interactive: self.scan_interactive,
            scan_priority: self.scan_priority,
        }
    }
}
