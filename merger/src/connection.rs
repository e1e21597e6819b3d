//! `MergeConnection`: the minimal connection interface §6 ("Toward the
//! local merge SQL") gives the coordinator toward its local SQL server -
//! `execute`, `loadInfile`, and a row iterator for schema discovery. No
//! MySQL-specific dialect is used beyond `LOAD DATA LOCAL INFILE` and
//! ordinary SQL, so this is expressed as a plain trait rather than a
//! concrete MySQL client dependency.

use parking_lot::Mutex;

use crate::error::{ConnectionSnafu, Result};
use snafu::ensure;

/// One row read back from `query_rows`, kept as an untyped string vector
/// since the merger only ever uses this for schema discovery and the
/// occasional `SHOW`-style introspection, never for filtering rows itself.
pub type Row = Vec<String>;

/// The local merge database connection. The merge database is expected to
/// be MySQL-compatible (§6) but this workspace never depends on a concrete
/// MySQL driver: callers plug in whatever client speaks the wire protocol.
pub trait MergeConnection: Send + Sync {
    fn execute(&self, sql: &str) -> Result<()>;
    fn load_infile(&self, path: &str, table: &str) -> Result<()>;
    fn query_rows(&self, sql: &str) -> Result<Vec<Row>>;
}

/// Lets callers hold `InfileMerger<Box<dyn MergeConnection>>` - one
/// concrete merger type regardless of which connection backend a
/// particular deployment plugs in - the same way `std::io::Read` is
/// implemented for `Box<dyn Read>`.
impl MergeConnection for Box<dyn MergeConnection> {
    fn execute(&self, sql: &str) -> Result<()> {
        (**self).execute(sql)
    }

    fn load_infile(&self, path: &str, table: &str) -> Result<()> {
        (**self).load_infile(path, table)
    }

    fn query_rows(&self, sql: &str) -> Result<Vec<Row>> {
        (**self).query_rows(sql)
    }
}

/// In-memory fake used by tests and by callers that want to exercise the
/// merge pipeline without a real MySQL-compatible server, the way
/// `index_map::FakeSecondaryIndex` stands in for a real director database.
#[derive(Default)]
pub struct FakeMergeConnection {
    inner: Mutex<FakeInner>,
}

#[derive(Default)]
struct FakeInner {
    executed: Vec<String>,
    loaded: Vec<(String, String)>,
    fail_execute: bool,
    fail_load: bool,
}

impl FakeMergeConnection {
    pub fn new() -> FakeMergeConnection {
        FakeMergeConnection::default()
    }

    /// Makes every subsequent `execute` call fail, to exercise the
    /// `finalize` failure path (§7, merger error, code 1105).
    pub fn fail_next_execute(&self) {
        self.inner.lock().fail_execute = true;
    }

    pub fn fail_next_load(&self) {
        self.inner.lock().fail_load = true;
    }

    pub fn executed_statements(&self) -> Vec<String> {
        self.inner.lock().executed.clone()
    }

    pub fn loaded_files(&self) -> Vec<(String, String)> {
        self.inner.lock().loaded.clone()
    }
}

impl MergeConnection for FakeMergeConnection {
    fn execute(&self, sql: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        ensure!(
            !inner.fail_execute,
            ConnectionSnafu {
                message: "simulated execute failure".to_string(),
            }
        );
        inner.executed.push(sql.to_string());
        Ok(())
    }

    fn load_infile(&self, path: &str, table: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        ensure!(
            !inner.fail_load,
            ConnectionSnafu {
                message: "simulated load failure".to_string(),
            }
        );
        inner.loaded.push((path.to_string(), table.to_string()));
        Ok(())
    }

    fn query_rows(&self, _sql: &str) -> Result<Vec<Row>> {
        Ok(Vec::new())
    }
}
