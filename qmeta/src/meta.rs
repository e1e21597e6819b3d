//! The query-metadata store: a small CRUD interface recording query
//! lifecycle (§6, "Toward the query-metadata store"). Out of scope to
//! implement as a persistent store; [`QueryMetaStore`] is the trait surface
//! the rest of the workspace programs against, and [`MemQueryMetaStore`] is
//! an in-memory fake for tests.

use parking_lot::Mutex;
use std::collections::HashMap;

use crate::error::{AlreadyTerminalSnafu, MissingQueryInfoSnafu, Result};
use snafu::{ensure, OptionExt};

/// A query's lifecycle status, as tracked in the query-metadata store.
/// Monotonic: `Executing` -> one of `{Completed, Failed, Aborted}`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QStatus {
    Executing,
    Completed,
    Failed,
    Aborted,
}

impl QStatus {
    /// A terminal status is one result-delete is allowed to act on;
    /// `Executing` is not terminal (see `QueryMapping`/`UserQueryResultDelete`
    /// precondition carried forward from the original in SPEC_FULL.md).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, QStatus::Executing)
    }
}

/// The query type a `QInfo` row was registered for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QType {
    Select,
    Manager,
}

/// A query-metadata row: everything the query-metadata store needs to
/// persist about one query's lifecycle.
#[derive(Clone, Debug)]
pub struct QInfo {
    pub qtype: QType,
    pub czar_id: i64,
    pub user: String,
    pub original_sql: String,
    pub template: String,
    pub merge_sql: String,
    pub order_by: String,
    pub result_loc: String,
    pub msg_table_name: String,
    pub status: QStatus,
    pub chunks: Vec<i32>,
}

impl QInfo {
    pub fn new(qtype: QType, czar_id: i64, user: impl Into<String>, original_sql: impl Into<String>) -> QInfo {
        QInfo {
            qtype,
            czar_id,
            user: user.into(),
            original_sql: original_sql.into(),
            template: String::new(),
            merge_sql: String::new(),
            order_by: String::new(),
            result_loc: String::new(),
            msg_table_name: String::new(),
            status: QStatus::Executing,
            chunks: Vec::new(),
        }
    }
}

/// Read/write interface to the persistent query-metadata store.
pub trait QueryMetaStore: Send + Sync {
    /// Registers a new query, returning the assigned query id.
    fn register_query(&self, info: QInfo, table_names: &[String]) -> Result<i64>;
    /// Updates a registered query's lifecycle status.
    fn complete_query(&self, query_id: i64, status: QStatus) -> Result<()>;
    /// Records the set of chunks a (still executing) query has dispatched
    /// so far - used by async queries that report progress incrementally.
    fn add_chunks(&self, query_id: i64, chunk_ids: &[i32]) -> Result<()>;
    fn get_query_info(&self, query_id: i64) -> Result<QInfo>;
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    rows: HashMap<i64, QInfo>,
}

/// An in-memory [`QueryMetaStore`], the way `MemCatalog`/`MemCss` stand in
/// for a real persistent store in the teacher's and this repo's test suites.
pub struct MemQueryMetaStore {
    inner: Mutex<Inner>,
}

impl Default for MemQueryMetaStore {
    fn default() -> Self {
        MemQueryMetaStore {
            inner: Mutex::new(Inner {
                next_id: 1,
                rows: HashMap::new(),
            }),
        }
    }
}

impl MemQueryMetaStore {
    pub fn new() -> MemQueryMetaStore {
        MemQueryMetaStore::default()
    }
}

impl QueryMetaStore for MemQueryMetaStore {
    fn register_query(&self, info: QInfo, _table_names: &[String]) -> Result<i64> {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.rows.insert(id, info);
        Ok(id)
    }

    fn complete_query(&self, query_id: i64, status: QStatus) -> Result<()> {
        let mut inner = self.inner.lock();
        let row = inner
            .rows
            .get_mut(&query_id)
            .context(MissingQueryInfoSnafu { query_id })?;
        ensure!(!row.status.is_terminal(), AlreadyTerminalSnafu { query_id });
        row.status = status;
        Ok(())
    }

    fn add_chunks(&self, query_id: i64, chunk_ids: &[i32]) -> Result<()> {
        let mut inner = self.inner.lock();
        let row = inner
            .rows
            .get_mut(&query_id)
            .context(MissingQueryInfoSnafu { query_id })?;
        row.chunks.extend_from_slice(chunk_ids);
        Ok(())
    }

    fn get_query_info(&self, query_id: i64) -> Result<QInfo> {
        let inner = self.inner.lock();
        inner
            .rows
            .get(&query_id)
            .cloned()
            .context(MissingQueryInfoSnafu { query_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_complete_round_trips_status() {
        let store = MemQueryMetaStore::new();
        let info = QInfo::new(QType::Select, 1, "alice", "SELECT 1");
        let id = store.register_query(info, &[]).unwrap();
        assert_eq!(store.get_query_info(id).unwrap().status, QStatus::Executing);
        store.complete_query(id, QStatus::Completed).unwrap();
        assert_eq!(store.get_query_info(id).unwrap().status, QStatus::Completed);
    }

    #[test]
    fn missing_query_info_is_an_error() {
        let store = MemQueryMetaStore::new();
        test_helpers::assert_error_contains(
            &store.get_query_info(999).unwrap_err(),
            "no query registered",
        );
    }

    #[test]
    fn add_chunks_accumulates() {
        let store = MemQueryMetaStore::new();
        let id = store
            .register_query(QInfo::new(QType::Select, 1, "bob", "SELECT 2"), &[])
            .unwrap();
        store.add_chunks(id, &[1, 2]).unwrap();
        store.add_chunks(id, &[3]).unwrap();
        assert_eq!(store.get_query_info(id).unwrap().chunks, vec![1, 2, 3]);
    }

    #[test]
    fn completing_an_already_terminal_query_is_an_error() {
        let store = MemQueryMetaStore::new();
        let id = store
            .register_query(QInfo::new(QType::Select, 1, "carol", "SELECT 3"), &[])
            .unwrap();
        store.complete_query(id, QStatus::Completed).unwrap();
        test_helpers::assert_error_contains(
            &store.complete_query(id, QStatus::Aborted).unwrap_err(),
            "already reached a terminal status",
        );
    }

    #[test]
    fn terminal_status_excludes_executing() {
        assert!(!QStatus::Executing.is_terminal());
        assert!(QStatus::Completed.is_terminal());
        assert!(QStatus::Failed.is_terminal());
        assert!(QStatus::Aborted.is_terminal());
    }
}
