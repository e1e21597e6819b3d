//! `SecondaryIndex`: issues the lookup SQL a [`crate::SecIdxRestrictor`]
//! produces and turns the returned `(chunkId, subChunkId)` rows into a
//! [`chunking::ChunkSpecVector`]. Grounded on `SecondaryIndex.cc`'s
//! `Backend` interface (`MySqlBackend`/`FakeBackend`).

use std::collections::BTreeMap;

use chunking::{normalize, ChunkSpec, ChunkSpecVector};
use observability_deps::tracing::debug;

use crate::error::{Result, SecondaryIndexLookupSnafu};
use crate::sec_idx_restrictor::SecIdxRestrictor;
use snafu::ensure;

/// A single row read back from a director-table lookup query.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IndexRow {
    pub chunk_id: i32,
    pub sub_chunk_id: i32,
}

/// A connection capable of running the lookup SQL a `SecIdxRestrictor`
/// produces, abstracting the director database the way §6 describes: a
/// key/value-ish interface, not a MySQL dialect dependency.
pub trait DirectorConnection: Send + Sync {
    fn query_rows(&self, sql: &str) -> Result<Vec<IndexRow>>;
}

/// Resolves secondary-index restrictors to chunk coverage. Mirrors
/// `SecondaryIndex`'s pluggable backend: [`SqlSecondaryIndex`] issues real
/// lookup SQL through a [`DirectorConnection`]; [`FakeSecondaryIndex`]
/// returns deterministic canned output for tests, as `FakeBackend` does.
pub trait SecondaryIndexLookup: Send + Sync {
    fn lookup(&self, restrictors: &[SecIdxRestrictor]) -> Result<ChunkSpecVector>;
}

pub struct SqlSecondaryIndex<C> {
    connection: C,
}

impl<C: DirectorConnection> SqlSecondaryIndex<C> {
    pub fn new(connection: C) -> SqlSecondaryIndex<C> {
        SqlSecondaryIndex { connection }
    }
}

impl<C: DirectorConnection> SecondaryIndexLookup for SqlSecondaryIndex<C> {
    fn lookup(&self, restrictors: &[SecIdxRestrictor]) -> Result<ChunkSpecVector> {
        let mut by_chunk: BTreeMap<i32, Vec<i32>> = BTreeMap::new();
        for restrictor in restrictors {
            let sql = restrictor.lookup_sql();
            debug!(%sql, "secondary index lookup");
            let rows = self.connection.query_rows(&sql)?;
            for row in rows {
                by_chunk.entry(row.chunk_id).or_default().push(row.sub_chunk_id);
            }
        }
        let mut output: ChunkSpecVector = by_chunk
            .into_iter()
            .map(|(chunk_id, sub_chunks)| ChunkSpec {
                chunk_id,
                sub_chunks,
            })
            .collect();
        normalize(&mut output)?;
        Ok(output)
    }
}

/// An in-memory [`SecondaryIndexLookup`] for tests: a fixed table of
/// restrictor-column -> chunk coverage, set up by the test. Unlike the
/// original's `FakeBackend` (which returns the same three bogus chunks for
/// any restrictor), this fake is configurable so tests can assert on
/// specific coverage.
#[derive(Default)]
pub struct FakeSecondaryIndex {
    rows: Vec<IndexRow>,
}

impl FakeSecondaryIndex {
    pub fn new() -> FakeSecondaryIndex {
        FakeSecondaryIndex::default()
    }

    pub fn with_row(mut self, chunk_id: i32, sub_chunk_id: i32) -> FakeSecondaryIndex {
        self.rows.push(IndexRow { chunk_id, sub_chunk_id });
        self
    }
}

impl SecondaryIndexLookup for FakeSecondaryIndex {
    fn lookup(&self, restrictors: &[SecIdxRestrictor]) -> Result<ChunkSpecVector> {
        ensure!(
            !restrictors.is_empty(),
            SecondaryIndexLookupSnafu {
                message: "lookup called with no restrictors".to_string(),
            }
        );
        let mut by_chunk: BTreeMap<i32, Vec<i32>> = BTreeMap::new();
        for row in &self.rows {
            by_chunk.entry(row.chunk_id).or_default().push(row.sub_chunk_id);
        }
        let mut output: ChunkSpecVector = by_chunk
            .into_iter()
            .map(|(chunk_id, sub_chunks)| ChunkSpec {
                chunk_id,
                sub_chunks,
            })
            .collect();
        normalize(&mut output)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sec_idx_restrictor::{SecIdxColumnRef, SecIdxPredicate};

    fn restrictor() -> SecIdxRestrictor {
        SecIdxRestrictor::new(
            SecIdxColumnRef {
                db: "LSST".into(),
                table: "Object".into(),
                column: "objectIdObjTest".into(),
            },
            SecIdxPredicate::In(vec!["2".into(), "3145".into(), "9999".into()]),
        )
    }

    #[test]
    fn fake_lookup_groups_rows_by_chunk() {
        let fake = FakeSecondaryIndex::new()
            .with_row(100, 1)
            .with_row(100, 2)
            .with_row(101, 5);
        let out = fake.lookup(&[restrictor()]).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].chunk_id, 100);
        assert_eq!(out[0].sub_chunks, vec![1, 2]);
        assert_eq!(out[1].chunk_id, 101);
    }

    #[test]
    fn sql_backed_lookup_queries_connection_and_normalizes() {
        struct Conn;
        impl DirectorConnection for Conn {
            fn query_rows(&self, _sql: &str) -> Result<Vec<IndexRow>> {
                Ok(vec![
                    IndexRow { chunk_id: 5, sub_chunk_id: 2 },
                    IndexRow { chunk_id: 5, sub_chunk_id: 1 },
                ])
            }
        }
        let idx = SqlSecondaryIndex::new(Conn);
        let out = idx.lookup(&[restrictor()]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].sub_chunks, vec![1, 2]);
    }
}
