//! The metadata store ("CSS" in the original) that holds schema, striping
//! parameters, and empty-chunk lists for every partitioned database. §6
//! describes this as a read-only key/value interface towards a collaborator
//! the coordinator does not persist; [`MetadataStore`] is that interface,
//! and [`MemMetadataStore`] is an in-memory fake so the rest of the
//! workspace can be exercised without a real director database.

use chunking::StripingParams;
use std::collections::{HashMap, HashSet};

use crate::error::{Result, UnknownDatabaseSnafu};
use snafu::ensure;

/// Whether a table is partitioned, and if so, whether it carries the
/// sub-chunk overlap tables needed for a partition-local self join.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PartitioningKind {
    NotPartitioned,
    Partitioned,
    PartitionedWithSubChunks,
}

/// Identifies the secondary-index ("director") column for a partitioned
/// table: the object-id column that the director table is keyed by, plus
/// the spatial columns `qserv_areaspec_*` restrictors are evaluated
/// against.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DirectorColumn {
    pub id_column: String,
    pub ra_column: String,
    pub decl_column: String,
}

#[derive(Clone, Debug, Default)]
struct TableMeta {
    kind: PartitioningKind,
    director: Option<DirectorColumn>,
}

impl Default for PartitioningKind {
    fn default() -> Self {
        PartitioningKind::NotPartitioned
    }
}

/// Read-only interface to the persistent metadata store: striping
/// parameters, empty-chunk lists, and per-table partitioning/director
/// metadata. The coordinator never writes through this interface.
pub trait MetadataStore: Send + Sync {
    fn table_exists(&self, db: &str, table: &str) -> bool;
    fn striping_params(&self, db: &str) -> Result<StripingParams>;
    fn empty_chunks(&self, db: &str) -> Result<HashSet<i32>>;
    fn partitioning_kind(&self, db: &str, table: &str) -> Result<PartitioningKind>;
    fn director_column(&self, db: &str, table: &str) -> Result<Option<DirectorColumn>>;
}

/// An in-memory [`MetadataStore`] populated by test/demo setup code, the way
/// `MemCatalog` stands in for a real catalog in the teacher's test suites.
#[derive(Default)]
pub struct MemMetadataStore {
    databases: HashMap<String, HashMap<String, TableMeta>>,
    striping: HashMap<String, StripingParams>,
    empty_chunks: HashMap<String, HashSet<i32>>,
}

impl MemMetadataStore {
    pub fn new() -> MemMetadataStore {
        MemMetadataStore::default()
    }

    pub fn add_striping(&mut self, db: &str, params: StripingParams) {
        self.striping.insert(db.to_string(), params);
    }

    pub fn add_empty_chunks(&mut self, db: &str, chunks: impl IntoIterator<Item = i32>) {
        self.empty_chunks
            .insert(db.to_string(), chunks.into_iter().collect());
    }

    pub fn add_table(&mut self, db: &str, table: &str, kind: PartitioningKind) {
        self.databases
            .entry(db.to_string())
            .or_default()
            .insert(table.to_string(), TableMeta { kind, director: None });
    }

    pub fn add_director(&mut self, db: &str, table: &str, director: DirectorColumn) {
        let entry = self
            .databases
            .entry(db.to_string())
            .or_default()
            .entry(table.to_string())
            .or_insert_with(|| TableMeta {
                kind: PartitioningKind::Partitioned,
                director: None,
            });
        entry.director = Some(director);
    }

    fn table_meta(&self, db: &str, table: &str) -> Result<&TableMeta> {
        let tables = self
            .databases
            .get(db)
            .context_db(db)?;
        tables
            .get(table)
            .ok_or_else(|| crate::error::Error::UnknownTable {
                db: db.to_string(),
                table: table.to_string(),
            })
    }
}

/// Tiny local helper trait so `table_meta` can read naturally left-to-right;
/// kept private, it only exists to turn an `Option` into the crate's
/// `UnknownDatabase` error without repeating the `ok_or_else` at each call
/// site.
trait OptionExt<T> {
    fn context_db(self, db: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn context_db(self, db: &str) -> Result<T> {
        self.ok_or_else(|| crate::error::Error::UnknownDatabase { db: db.to_string() })
    }
}

impl MetadataStore for MemMetadataStore {
    fn table_exists(&self, db: &str, table: &str) -> bool {
        self.databases
            .get(db)
            .map(|tables| tables.contains_key(table))
            .unwrap_or(false)
    }

    fn striping_params(&self, db: &str) -> Result<StripingParams> {
        ensure!(self.databases.contains_key(db), UnknownDatabaseSnafu { db });
        self.striping
            .get(db)
            .copied()
            .ok_or_else(|| crate::error::Error::UnknownDatabase { db: db.to_string() })
    }

    fn empty_chunks(&self, db: &str) -> Result<HashSet<i32>> {
        ensure!(self.databases.contains_key(db), UnknownDatabaseSnafu { db });
        Ok(self.empty_chunks.get(db).cloned().unwrap_or_default())
    }

    fn partitioning_kind(&self, db: &str, table: &str) -> Result<PartitioningKind> {
        Ok(self.table_meta(db, table)?.kind)
    }

    fn director_column(&self, db: &str, table: &str) -> Result<Option<DirectorColumn>> {
        Ok(self.table_meta(db, table)?.director.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunking::StripingParams;

    fn fixture() -> MemMetadataStore {
        let mut css = MemMetadataStore::new();
        css.add_striping("LSST", StripingParams::new(85, 12).unwrap());
        css.add_table("LSST", "Object", PartitioningKind::Partitioned);
        css.add_director(
            "LSST",
            "Object",
            DirectorColumn {
                id_column: "objectId".into(),
                ra_column: "ra_PS".into(),
                decl_column: "decl_PS".into(),
            },
        );
        css
    }

    #[test]
    fn table_exists_is_false_for_unknown_db() {
        let css = fixture();
        assert!(!css.table_exists("Bad", "Object"));
        assert!(css.table_exists("LSST", "Object"));
        assert!(!css.table_exists("LSST", "Nope"));
    }

    #[test]
    fn striping_params_lookup_fails_for_unknown_db() {
        let css = fixture();
        test_helpers::assert_error_contains(
            &css.striping_params("Bad").unwrap_err(),
            "unknown database",
        );
        assert_eq!(css.striping_params("LSST").unwrap().stripes, 85);
    }

    #[test]
    fn director_column_round_trips() {
        let css = fixture();
        let dc = css.director_column("LSST", "Object").unwrap().unwrap();
        assert_eq!(dc.id_column, "objectId");
    }
}
