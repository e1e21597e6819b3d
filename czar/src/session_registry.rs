//! `SessionRegistry`: maps the integer query id a client polls by to the
//! live [`UserQuery`] handle executing it. Grounded on `ccontrol/UserQuery.h`'s
//! note that the czar keeps a process-wide map from query id to `UserQuery`,
//! and on `MissingUserQuery.h` for the not-found sentinel (folded here into
//! `Error::MissingUserQuery` rather than kept as its own `UserQuery` variant,
//! since a registry miss is a lookup failure, not a fourth kind of query).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{MissingUserQuerySnafu, Result};
use crate::user_query::UserQuery;
use snafu::OptionExt;

#[derive(Default)]
pub struct SessionRegistry {
    queries: Mutex<HashMap<i64, Arc<UserQuery>>>,
}

impl SessionRegistry {
    pub fn new() -> SessionRegistry {
        SessionRegistry::default()
    }

    pub fn insert(&self, query_id: i64, query: UserQuery) -> Arc<UserQuery> {
        let query = Arc::new(query);
        self.queries.lock().insert(query_id, Arc::clone(&query));
        query
    }

    pub fn get(&self, query_id: i64) -> Result<Arc<UserQuery>> {
        self.queries
            .lock()
            .get(&query_id)
            .cloned()
            .context(MissingUserQuerySnafu { id: query_id })
    }

    /// Drops a query from the registry once its caller is done with it.
    /// Mirrors the original's behavior of retaining `UserQuery` objects only
    /// long enough for a client to retrieve their final status and results.
    pub fn discard(&self, query_id: i64) -> Result<()> {
        let query = self.get(query_id)?;
        query.discard()?;
        self.queries.lock().remove(&query_id);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.queries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user_query::UserQueryManager;
    use qdisp::MessageStore;
    use qmeta::{MemQueryMetaStore, QInfo, QType};

    fn manager_query(id: i64) -> UserQuery {
        let qmeta = Arc::new(MemQueryMetaStore::new());
        qmeta
            .register_query(QInfo::new(QType::Manager, 1, "alice", "CALL QSERV_MANAGER('foo')"), &[])
            .unwrap();
        UserQuery::Manager(UserQueryManager::new(id, "foo", qmeta, Arc::new(MessageStore::new())))
    }

    #[test]
    fn lookup_after_insert_succeeds() {
        let registry = SessionRegistry::new();
        registry.insert(1, manager_query(1));
        assert!(registry.get(1).is_ok());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lookup_of_unknown_id_is_missing_user_query() {
        let registry = SessionRegistry::new();
        test_helpers::assert_error_contains(&registry.get(42).unwrap_err(), "Invalid UserQuery[42]");
    }

    #[test]
    fn discard_removes_from_registry() {
        let registry = SessionRegistry::new();
        registry.insert(7, manager_query(7));
        registry.discard(7).unwrap();
        assert!(registry.is_empty());
        test_helpers::assert_error_contains(&registry.get(7).unwrap_err(), "Invalid UserQuery[7]");
    }
}
