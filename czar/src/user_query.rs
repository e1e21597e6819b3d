//! `UserQuery`: the façade a session registry hands back for every
//! `EXECUTE`/`CALL` a client submits (§4.8). Grounded on `ccontrol/UserQuery.h`
//! (the abstract interface: `submit`/`join`/`kill`/`discard`/`getMessageStore`/
//! `getResultLocation`), `UserQuerySelect.{h,cc}` (the SELECT path),
//! `MissingUserQuery.h` (the registry-miss sentinel, lifted into
//! `error::Error::MissingUserQuery` instead), and `UserQueryResultDelete.{h,cc}`
//! (the `QSERV_RESULT_DELETE` admin path). Kept as a closed enum over the
//! three variants - the same choice `sphgeom::Region` makes over a trait
//! object - since `MergeConnection`/`WorkerTransport` are already erased
//! behind `Box`/`Arc` and nothing here needs to be generic.

use std::sync::Arc;

use observability_deps::tracing::{debug, warn};
use parking_lot::Mutex;

use index_map::{IndexMap, SecondaryIndexLookup};
use merger::{InfileMerger, MergeConnection};
use qdisp::{Executive, JobOutcome, MessageStore, ResourceUnit, ResultHandler, Severity};
use qmeta::{QStatus, QueryMetaStore};
use query_session::QuerySession;

use crate::error::{
    AnalysisSnafu, DiscardWhileInFlightSnafu, ResultNotInTableSnafu, ResultNotTerminalSnafu, Result,
};
use crate::tmp_table_name::TmpTableName;
use crate::wire::TaskMsgFactory;
use snafu::{ensure, ResultExt};

/// Outcome of `join()`, mirroring the original's `QueryState` enum
/// (`SUCCESS`/`ERROR`/`UNKNOWN`) that `czar`'s proxy-facing RPC reports back.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryState {
    Success,
    Error,
    Unknown,
}

/// Feeds job outcomes into the merger and message store as jobs finish.
/// Grounded on `qdisp::ChunkMsgReceiver`/the merging `ResultHandler` the
/// original wires into every `JobQuery`.
struct ChunkResultHandler {
    message_store: Arc<MessageStore>,
    merger: Arc<InfileMerger<Box<dyn MergeConnection>>>,
}

impl ResultHandler for ChunkResultHandler {
    fn handle(&self, chunk_id: i32, job_id: i32, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Success { result_table, result_file } => {
                match self.merger.ingest(&result_table, &result_file) {
                    Ok(()) => self.message_store.add_message(chunk_id, 0, Severity::Info, "chunk result ingested"),
                    Err(err) => {
                        warn!(chunk_id, job_id, %err, "chunk result ingest failed");
                        self.message_store.add_error_message(1105, format!("merger error: {err}"));
                    }
                }
            }
            JobOutcome::Failure { code, severity, description } => {
                self.message_store.add_message(chunk_id, code, severity, description);
            }
            JobOutcome::Cancelled => {
                self.message_store.add_message(chunk_id, 0, Severity::Info, "job squashed before dispatch");
            }
        }
    }
}

/// The `SELECT` path: wires a resolved [`QuerySession`] to a dedicated
/// [`Executive`] and [`InfileMerger`], per §3's one-executive/one-merger-per-
/// query ownership table. Grounded on `UserQuerySelect`.
pub struct UserQuerySelect {
    query_id: i64,
    session: Mutex<QuerySession>,
    secondary_index: Arc<dyn SecondaryIndexLookup>,
    executive: Arc<Executive>,
    merger: Arc<InfileMerger<Box<dyn MergeConnection>>>,
    message_store: Arc<MessageStore>,
    query_meta: Arc<dyn QueryMetaStore>,
    scan_priority: i32,
    killed: Mutex<bool>,
}

impl UserQuerySelect {
    pub fn new(
        query_id: i64,
        session: QuerySession,
        secondary_index: Arc<dyn SecondaryIndexLookup>,
        executive: Arc<Executive>,
        merger: Arc<InfileMerger<Box<dyn MergeConnection>>>,
        message_store: Arc<MessageStore>,
        query_meta: Arc<dyn QueryMetaStore>,
        scan_priority: i32,
    ) -> UserQuerySelect {
        UserQuerySelect {
            query_id,
            session: Mutex::new(session),
            secondary_index,
            executive,
            merger,
            message_store,
            query_meta,
            scan_priority,
            killed: Mutex::new(false),
        }
    }

    /// §4.5 phase 2/3 and §4.8 `submit()`: finalizes the session, resolves
    /// chunk coverage against a striping-derived `IndexMap`, and dispatches
    /// one job per chunk (or sub-chunk fragment). Checks
    /// `executive.is_cancelled()` once per chunk so a `kill()` racing with
    /// `submit()` stops enqueueing promptly (§8 scenario 6).
    pub fn submit(&self) -> Result<()> {
        let mut session = self.session.lock();
        let striping = session.get_db_striping().context(AnalysisSnafu)?;
        let index_map = IndexMap::new(striping, Arc::clone(&self.secondary_index));
        session.resolve_chunks(&index_map)?;
        session.finalize();

        let ttn = TmpTableName::new(self.query_id, session.get_original());
        let factory = TaskMsgFactory::new(self.query_id, session.is_scan_interactive(), self.scan_priority);

        let mut seq: i32 = 0;
        for spec in session.iter_chunk_query_specs() {
            if self.executive.is_cancelled() {
                debug!(query_id = self.query_id, "submit stopped: query was squashed");
                break;
            }
            let result_table = ttn.make(spec.chunk_id, seq as u32);
            let resource_unit = ResourceUnit::new(spec.db.clone(), spec.chunk_id);
            let task_msg = factory
                .build(seq, &spec, result_table, spec.sub_chunk_ids.clone())
                .to_bytes();
            let handler: Arc<dyn ResultHandler> = Arc::new(ChunkResultHandler {
                message_store: Arc::clone(&self.message_store),
                merger: Arc::clone(&self.merger),
            });
            self.executive.add(self.query_id, resource_unit, task_msg, handler, self.scan_priority);
            seq += 1;
        }
        debug!(query_id = self.query_id, jobs = seq, "submit complete");
        Ok(())
    }

    /// §4.8 `join()`: waits for the executive, then finalizes the merger,
    /// then reports a terminal `QStatus`. A squash makes `executive.join()`
    /// return `false` without waiting for in-flight jobs (§5/§8); that and a
    /// merger failure both surface as `QueryState::Error`, matching the
    /// original's code-1105 "merger error" path.
    pub fn join(&self) -> QueryState {
        let completed = self.executive.join();
        if !completed {
            self.message_store.add_error_message(1107, "query was squashed before completion");
            self.message_store.finish();
            self.complete(QStatus::Aborted);
            return QueryState::Error;
        }
        if self.message_store.has_failure() {
            self.message_store.finish();
            self.complete(QStatus::Failed);
            return QueryState::Error;
        }
        match self.merger.finalize() {
            Ok(()) => {
                self.message_store.finish();
                self.complete(QStatus::Completed);
                QueryState::Success
            }
            Err(err) => {
                self.message_store.add_error_message(1105, format!("merger error: {err}"));
                self.message_store.finish();
                self.complete(QStatus::Failed);
                QueryState::Error
            }
        }
    }

    fn complete(&self, status: QStatus) {
        if let Err(err) = self.query_meta.complete_query(self.query_id, status) {
            warn!(query_id = self.query_id, %err, "failed to record terminal query-metadata status");
        }
    }

    /// §4.8 `kill()`: idempotent, asynchronous, and does not wait for
    /// in-flight jobs - `join()` remains the single synchronization point
    /// that records the terminal `QStatus` (§5, "kill() does not wait for
    /// jobs to finish; join() is still the synchronization point").
    pub fn kill(&self) {
        let mut killed = self.killed.lock();
        if *killed {
            return;
        }
        *killed = true;
        self.executive.squash();
    }

    /// §4.8 `discard()`: refuses while the executive still has jobs in
    /// flight or the merger has not finalized, mirroring `_discardMerger`'s
    /// two preconditions in `UserQuerySelect::discard`.
    pub fn discard(&self) -> Result<()> {
        ensure!(
            self.executive.in_flight_count() == 0,
            DiscardWhileInFlightSnafu { id: self.query_id }
        );
        self.merger.discard().map_err(|_| {
            crate::error::Error::DiscardWhileInFlight { id: self.query_id }
        })?;
        Ok(())
    }

    pub fn get_message_store(&self) -> Arc<MessageStore> {
        Arc::clone(&self.message_store)
    }

    pub fn get_result_location(&self) -> String {
        format!("table:{}", self.merger.target_table())
    }
}

/// The `CALL QSERV_MANAGER(...)` administrative path: no executive, no
/// merger, just a command string recorded against a query-metadata row.
/// Grounded on `ccontrol/UserQuery.h`'s note that manager commands implement
/// the same interface with trivial `submit`/`join`.
pub struct UserQueryManager {
    query_id: i64,
    command: String,
    query_meta: Arc<dyn QueryMetaStore>,
    message_store: Arc<MessageStore>,
}

impl UserQueryManager {
    pub fn new(
        query_id: i64,
        command: impl Into<String>,
        query_meta: Arc<dyn QueryMetaStore>,
        message_store: Arc<MessageStore>,
    ) -> UserQueryManager {
        UserQueryManager {
            query_id,
            command: command.into(),
            query_meta,
            message_store,
        }
    }

    pub fn submit(&self) -> Result<()> {
        debug!(query_id = self.query_id, command = %self.command, "executing manager command");
        self.message_store.finish();
        Ok(())
    }

    pub fn join(&self) -> QueryState {
        if let Err(err) = self.query_meta.complete_query(self.query_id, QStatus::Completed) {
            warn!(query_id = self.query_id, %err, "failed to record manager command status");
        }
        QueryState::Success
    }

    pub fn kill(&self) {}

    pub fn discard(&self) -> Result<()> {
        Ok(())
    }

    pub fn get_message_store(&self) -> Arc<MessageStore> {
        Arc::clone(&self.message_store)
    }

    pub fn get_result_location(&self) -> String {
        String::new()
    }
}

/// The `CALL QSERV_RESULT_DELETE(qid)` admin path: drops a terminal query's
/// result and message tables. Grounded on `UserQueryResultDelete::submit`'s
/// "not terminal" / "result not stored in a table" precondition checks.
pub struct UserQueryResultDelete {
    query_id: i64,
    target_query_id: i64,
    query_meta: Arc<dyn QueryMetaStore>,
    connection: Box<dyn MergeConnection>,
    message_store: Arc<MessageStore>,
}

impl UserQueryResultDelete {
    pub fn new(
        query_id: i64,
        target_query_id: i64,
        query_meta: Arc<dyn QueryMetaStore>,
        connection: Box<dyn MergeConnection>,
        message_store: Arc<MessageStore>,
    ) -> UserQueryResultDelete {
        UserQueryResultDelete {
            query_id,
            target_query_id,
            query_meta,
            connection,
            message_store,
        }
    }

    pub fn submit(&self) -> Result<()> {
        let info = self
            .query_meta
            .get_query_info(self.target_query_id)
            .map_err(|_| crate::error::Error::InvalidQueryId {
                value: self.target_query_id.to_string(),
            })?;
        ensure!(info.status.is_terminal(), ResultNotTerminalSnafu { id: self.target_query_id });
        ensure!(!info.result_loc.is_empty(), ResultNotInTableSnafu { id: self.target_query_id });

        self.connection
            .execute(&format!("DROP TABLE IF EXISTS {}", info.result_loc))
            .map_err(|_| crate::error::Error::ResultNotInTable { id: self.target_query_id })?;
        if !info.msg_table_name.is_empty() {
            let _ = self.connection.execute(&format!("DROP TABLE IF EXISTS {}", info.msg_table_name));
        }
        self.message_store.finish();
        Ok(())
    }

    pub fn join(&self) -> QueryState {
        if self.message_store.has_failure() {
            QueryState::Error
        } else {
            QueryState::Success
        }
    }

    pub fn kill(&self) {}

    pub fn discard(&self) -> Result<()> {
        Ok(())
    }

    pub fn get_message_store(&self) -> Arc<MessageStore> {
        Arc::clone(&self.message_store)
    }

    pub fn get_result_location(&self) -> String {
        String::new()
    }

    pub fn query_id(&self) -> i64 {
        self.query_id
    }
}

/// The closed façade every session-registry entry is stored as (§4.8): all
/// three variants answer `submit`/`join`/`kill`/`discard`/`get_message_store`/
/// `get_result_location`.
pub enum UserQuery {
    Select(UserQuerySelect),
    Manager(UserQueryManager),
    ResultDelete(UserQueryResultDelete),
}

impl UserQuery {
    pub fn submit(&self) -> Result<()> {
        match self {
            UserQuery::Select(q) => q.submit(),
            UserQuery::Manager(q) => q.submit(),
            UserQuery::ResultDelete(q) => q.submit(),
        }
    }

    pub fn join(&self) -> QueryState {
        match self {
            UserQuery::Select(q) => q.join(),
            UserQuery::Manager(q) => q.join(),
            UserQuery::ResultDelete(q) => q.join(),
        }
    }

    pub fn kill(&self) {
        match self {
            UserQuery::Select(q) => q.kill(),
            UserQuery::Manager(q) => q.kill(),
            UserQuery::ResultDelete(q) => q.kill(),
        }
    }

    pub fn discard(&self) -> Result<()> {
        match self {
            UserQuery::Select(q) => q.discard(),
            UserQuery::Manager(q) => q.discard(),
            UserQuery::ResultDelete(q) => q.discard(),
        }
    }

    pub fn get_message_store(&self) -> Arc<MessageStore> {
        match self {
            UserQuery::Select(q) => q.get_message_store(),
            UserQuery::Manager(q) => q.get_message_store(),
            UserQuery::ResultDelete(q) => q.get_message_store(),
        }
    }

    pub fn get_result_location(&self) -> String {
        match self {
            UserQuery::Select(q) => q.get_result_location(),
            UserQuery::Manager(q) => q.get_result_location(),
            UserQuery::ResultDelete(q) => q.get_result_location(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use index_map::FakeSecondaryIndex;
    use merger::{FakeMergeConnection, InfileMergerConfig};
    use qdisp::{JobDescription, WorkerTransport};
    use qmeta::{DirectorColumn, MemMetadataStore, MemQueryMetaStore, MetadataStore, PartitioningKind, QInfo, QType};
    use query_session::QuerySession;
    use chunking::StripingParams;

    struct EchoTransport;
    impl WorkerTransport for EchoTransport {
        fn execute(&self, job: &JobDescription, _cancelled: &(dyn Fn() -> bool + Sync)) -> JobOutcome {
            JobOutcome::Success {
                result_table: format!("echo_{}", job.job_id()),
                result_file: format!("/tmp/echo_{}.tsv", job.job_id()),
            }
        }
    }

    fn fixture_metadata() -> Arc<dyn MetadataStore> {
        let mut css = MemMetadataStore::new();
        css.add_striping("LSST", StripingParams::new(85, 12).unwrap());
        css.add_table("LSST", "Object", PartitioningKind::Partitioned);
        css.add_director(
            "LSST",
            "Object",
            DirectorColumn {
                id_column: "objectId".into(),
                ra_column: "ra".into(),
                decl_column: "decl".into(),
            },
        );
        Arc::new(css)
    }

    fn build_select(query_id: i64, sql: &str) -> (UserQuerySelect, Arc<MemQueryMetaStore>) {
        let mut session = QuerySession::new(fixture_metadata(), Some("LSST".to_string()));
        session.analyze(sql).unwrap();

        let qmeta = Arc::new(MemQueryMetaStore::new());
        qmeta
            .register_query(QInfo::new(QType::Select, 1, "alice", sql), &[])
            .unwrap();

        let executive = Arc::new(Executive::new(Arc::new(EchoTransport), 4, 0, 0, 4));
        let config = InfileMergerConfig::new(format!("result_{query_id}"));
        let conn: Box<dyn MergeConnection> = Box::new(FakeMergeConnection::new());
        let merger = Arc::new(InfileMerger::new(config, conn));
        let message_store = Arc::new(MessageStore::new());

        let select = UserQuerySelect::new(
            query_id,
            session,
            Arc::new(FakeSecondaryIndex::new()),
            executive,
            merger,
            message_store,
            qmeta.clone(),
            0,
        );
        (select, qmeta)
    }

    #[test]
    fn submit_then_join_reports_success_and_completes_query_meta() {
        let (select, qmeta) = build_select(1, "SELECT * FROM Object WHERE someField > 5.0;");
        select.submit().unwrap();
        assert_eq!(select.join(), QueryState::Success);
        assert_eq!(qmeta.get_query_info(1).unwrap().status, QStatus::Completed);
        assert_eq!(select.get_result_location(), "table:result_1");
    }

    #[test]
    fn kill_before_join_aborts_and_join_returns_error() {
        let (select, qmeta) = build_select(2, "SELECT * FROM Object WHERE someField > 5.0;");
        select.kill();
        select.submit().unwrap();
        assert_eq!(select.join(), QueryState::Error);
        assert_eq!(qmeta.get_query_info(2).unwrap().status, QStatus::Aborted);
    }

    #[test]
    fn kill_is_idempotent() {
        let (select, _qmeta) = build_select(3, "SELECT * FROM Object WHERE someField > 5.0;");
        select.kill();
        select.kill();
    }

    #[test]
    fn discard_refuses_while_merger_unfinished() {
        let (select, _qmeta) = build_select(4, "SELECT * FROM Object WHERE someField > 5.0;");
        select.submit().unwrap();
        test_helpers::assert_error_contains(&select.discard().unwrap_err(), "not finished");
        select.join();
        select.discard().unwrap();
    }

    #[test]
    fn result_delete_requires_terminal_status() {
        let qmeta = Arc::new(MemQueryMetaStore::new());
        let mut info = QInfo::new(QType::Select, 1, "bob", "SELECT 1");
        info.result_loc = "result_5".to_string();
        qmeta.register_query(info, &[]).unwrap();

        let conn: Box<dyn MergeConnection> = Box::new(FakeMergeConnection::new());
        let delete = UserQueryResultDelete::new(10, 1, qmeta.clone(), conn, Arc::new(MessageStore::new()));
        test_helpers::assert_error_contains(&delete.submit().unwrap_err(), "not in a terminal state");

        qmeta.complete_query(1, QStatus::Completed).unwrap();
        delete.submit().unwrap();
        assert_eq!(delete.join(), QueryState::Success);
    }
}
