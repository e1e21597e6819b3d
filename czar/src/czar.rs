//! `Czar`: the top-level facade that wires a [`CzarConfig`] to live
//! collaborators (metadata store, query-metadata store, merge connection,
//! worker transport) and turns `EXECUTE`/`CALL` requests into registered
//! [`UserQuery`] handles. Grounded on `ccontrol/UserQueryFactory.h` (the
//! original's single entry point that inspects a SQL string and constructs
//! the right `UserQuery` subclass) plus `czar/Czar.h`'s role as the
//! process-wide owner of the session registry.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use index_map::SecondaryIndexLookup;
use merger::{InfileMerger, InfileMergerConfig, MergeConnection};
use observability_deps::tracing::info;
use qdisp::{Executive, MessageStore, WorkerTransport};
use qmeta::{MetadataStore, QInfo, QType, QueryMetaStore};
use query_session::QuerySession;

use crate::config::CzarConfig;
use crate::error::Result;
use crate::session_registry::SessionRegistry;
use crate::user_query::{QueryState, UserQuery, UserQueryManager, UserQueryResultDelete, UserQuerySelect};

/// Builds a fresh `Box<dyn MergeConnection>` per query; queries never share
/// a merge-database connection (§3's ownership table gives each query its
/// own `InfileMerger`).
pub trait MergeConnectionFactory: Send + Sync {
    fn connect(&self) -> Box<dyn MergeConnection>;
}

pub struct Czar {
    config: CzarConfig,
    metadata: Arc<dyn MetadataStore>,
    secondary_index: Arc<dyn SecondaryIndexLookup>,
    query_meta: Arc<dyn QueryMetaStore>,
    merge_connections: Arc<dyn MergeConnectionFactory>,
    transport: Arc<dyn WorkerTransport>,
    registry: SessionRegistry,
    next_czar_local_id: AtomicI64,
}

impl Czar {
    pub fn new(
        config: CzarConfig,
        metadata: Arc<dyn MetadataStore>,
        secondary_index: Arc<dyn SecondaryIndexLookup>,
        query_meta: Arc<dyn QueryMetaStore>,
        merge_connections: Arc<dyn MergeConnectionFactory>,
        transport: Arc<dyn WorkerTransport>,
    ) -> Czar {
        Czar {
            config,
            metadata,
            secondary_index,
            query_meta,
            merge_connections,
            transport,
            registry: SessionRegistry::new(),
            next_czar_local_id: AtomicI64::new(1),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Analyzes `sql`, registers it with the query-metadata store, and
    /// returns the dispatched (but not yet joined) query's id. Grounded on
    /// `UserQueryFactory::newUserQuery`'s SELECT path: analyze, then build
    /// the executive/merger/message-store triple, then `submit()`.
    pub fn submit_select(&self, user: &str, db: Option<&str>, sql: &str) -> Result<i64> {
        let mut session = QuerySession::new(Arc::clone(&self.metadata), db.map(str::to_string));
        session.set_interactive_chunk_limit(self.config.interactive_chunk_limit);
        session.analyze(sql)?;

        let query_id = self
            .query_meta
            .register_query(QInfo::new(QType::Select, self.next_czar_local_id.fetch_add(1, Ordering::SeqCst), user, sql), &[])?;

        let message_store = Arc::new(MessageStore::new());
        let executive = Arc::new(Executive::new(
            Arc::clone(&self.transport),
            self.config.dispatch_threads,
            0,
            self.config.priority_min_running,
            self.config.priority_max_running,
        ));
        let target_table = format!("result_{query_id}");
        let mut merger_config = InfileMergerConfig::new(target_table);
        if let Some(merge_stmt) = session.get_merge_stmt() {
            merger_config = merger_config.with_merge_stmt(merge_stmt);
        }
        let merger = Arc::new(InfileMerger::new(merger_config, self.merge_connections.connect()));

        let select = UserQuerySelect::new(
            query_id,
            session,
            Arc::clone(&self.secondary_index),
            executive,
            merger,
            message_store,
            Arc::clone(&self.query_meta),
            0,
        );
        let handle = self.registry.insert(query_id, UserQuery::Select(select));
        info!(query_id, user, "submitted select query");
        handle.submit()?;
        Ok(query_id)
    }

    /// `CALL QSERV_MANAGER(...)`: recorded and completed synchronously,
    /// unlike a SELECT's asynchronous dispatch.
    pub fn submit_manager(&self, user: &str, command: &str) -> Result<i64> {
        let query_id = self
            .query_meta
            .register_query(QInfo::new(QType::Manager, self.next_czar_local_id.fetch_add(1, Ordering::SeqCst), user, command), &[])?;
        let manager = UserQueryManager::new(
            query_id,
            command,
            Arc::clone(&self.query_meta),
            Arc::new(MessageStore::new()),
        );
        let handle = self.registry.insert(query_id, UserQuery::Manager(manager));
        handle.submit()?;
        handle.join();
        Ok(query_id)
    }

    /// `CALL QSERV_RESULT_DELETE(targetQueryId)`: drops a terminal query's
    /// result and message tables. Grounded on `UserQueryResultDelete`.
    pub fn submit_result_delete(&self, user: &str, target_query_id: i64) -> Result<i64> {
        let command = format!("CALL QSERV_RESULT_DELETE({target_query_id})");
        let query_id = self
            .query_meta
            .register_query(QInfo::new(QType::Manager, self.next_czar_local_id.fetch_add(1, Ordering::SeqCst), user, &command), &[])?;
        let delete = UserQueryResultDelete::new(
            query_id,
            target_query_id,
            Arc::clone(&self.query_meta),
            self.merge_connections.connect(),
            Arc::new(MessageStore::new()),
        );
        let handle = self.registry.insert(query_id, UserQuery::ResultDelete(delete));
        handle.submit()?;
        Ok(query_id)
    }

    pub fn join(&self, query_id: i64) -> Result<QueryState> {
        Ok(self.registry.get(query_id)?.join())
    }

    pub fn kill(&self, query_id: i64) -> Result<()> {
        self.registry.get(query_id)?.kill();
        Ok(())
    }

    pub fn discard(&self, query_id: i64) -> Result<()> {
        self.registry.discard(query_id)
    }

    pub fn result_location(&self, query_id: i64) -> Result<String> {
        Ok(self.registry.get(query_id)?.get_result_location())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunking::StripingParams;
    use index_map::FakeSecondaryIndex;
    use merger::FakeMergeConnection;
    use clap::Parser;
    use qdisp::{JobDescription, JobOutcome};
    use qmeta::{DirectorColumn, MemMetadataStore, MemQueryMetaStore, PartitioningKind};

    struct EchoTransport;
    impl WorkerTransport for EchoTransport {
        fn execute(&self, job: &JobDescription, _cancelled: &(dyn Fn() -> bool + Sync)) -> JobOutcome {
            JobOutcome::Success {
                result_table: format!("echo_{}", job.job_id()),
                result_file: format!("/tmp/echo_{}.tsv", job.job_id()),
            }
        }
    }

    struct FakeMergeConnectionFactory;
    impl MergeConnectionFactory for FakeMergeConnectionFactory {
        fn connect(&self) -> Box<dyn MergeConnection> {
            Box::new(FakeMergeConnection::new())
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

    fn fixture_czar() -> Czar {
        Czar::new(
            CzarConfig::parse_from(["czar"]),
            fixture_metadata(),
            Arc::new(FakeSecondaryIndex::new()),
            Arc::new(MemQueryMetaStore::new()),
            Arc::new(FakeMergeConnectionFactory),
            Arc::new(EchoTransport),
        )
    }

    #[test]
    fn submit_select_then_join_completes_successfully() {
        let czar = fixture_czar();
        let id = czar
            .submit_select("alice", Some("LSST"), "SELECT * FROM Object WHERE someField > 5.0;")
            .unwrap();
        assert_eq!(czar.join(id).unwrap(), QueryState::Success);
        assert_eq!(czar.result_location(id).unwrap(), format!("table:result_{id}"));
    }

    #[test]
    fn kill_then_join_reports_error() {
        let czar = fixture_czar();
        let id = czar
            .submit_select("alice", Some("LSST"), "SELECT * FROM Object WHERE someField > 5.0;")
            .unwrap();
        czar.kill(id).unwrap();
        assert_eq!(czar.join(id).unwrap(), QueryState::Error);
    }

    #[test]
    fn manager_command_completes_synchronously() {
        let czar = fixture_czar();
        let id = czar.submit_manager("alice", "CALL QSERV_MANAGER('foo')").unwrap();
        assert_eq!(czar.join(id).unwrap(), QueryState::Success);
    }

    #[test]
    fn unknown_query_id_is_a_missing_user_query_error() {
        let czar = fixture_czar();
        test_helpers::assert_error_contains(&czar.join(999).unwrap_err(), "Invalid UserQuery[999]");
    }
}
