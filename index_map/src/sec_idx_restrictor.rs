//! `SecIdxRestrictor`: the value extracted from an equality/IN/BETWEEN
//! predicate over a secondary-index ("director") column during analysis
//! (§4.5 plugin (c)). Grounded on `SecondaryIndex.cc`'s
//! `getSecIdxLookupQuery` call sites; the predicate-specific SQL rendering
//! lives here rather than on a `query::SecIdxRestrictor` base class, since
//! this workspace models restrictors as a closed enum (see `sphgeom::Region`
//! for the same choice and its rationale).

pub const SEC_INDEX_DB: &str = "qservMeta";
pub const CHUNK_COLUMN: &str = "chunkId";
pub const SUB_CHUNK_COLUMN: &str = "subChunkId";

/// The column a secondary-index predicate targets: `db.table.column`
/// resolves to the `db__table` director table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SecIdxColumnRef {
    pub db: String,
    pub table: String,
    pub column: String,
}

/// The predicate kind recognized by the secondary-index analysis plugin.
#[derive(Clone, Debug, PartialEq)]
pub enum SecIdxPredicate {
    In(Vec<String>),
    Between(String, String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SecIdxRestrictor {
    pub column: SecIdxColumnRef,
    pub predicate: SecIdxPredicate,
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

impl SecIdxRestrictor {
    pub fn new(column: SecIdxColumnRef, predicate: SecIdxPredicate) -> SecIdxRestrictor {
        SecIdxRestrictor { column, predicate }
    }

    fn index_table_name(&self) -> String {
        format!(
            "{}__{}",
            sanitize_name(&self.column.db),
            sanitize_name(&self.column.table)
        )
    }

    /// Renders the SQL that looks up the chunk/sub-chunk coverage for this
    /// restrictor's values in the director table, as `SecondaryIndex.cc`'s
    /// `MySqlBackend::lookup` does via `getSecIdxLookupQuery`.
    pub fn lookup_sql(&self) -> String {
        let predicate = match &self.predicate {
            SecIdxPredicate::In(values) => format!("{} IN ({})", self.column.column, values.join(",")),
            SecIdxPredicate::Between(lo, hi) => {
                format!("{} BETWEEN {} AND {}", self.column.column, lo, hi)
            }
        };
        format!(
            "SELECT {}, {} FROM {}.{} WHERE {}",
            CHUNK_COLUMN,
            SUB_CHUNK_COLUMN,
            SEC_INDEX_DB,
            self.index_table_name(),
            predicate
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_restrictor_renders_lookup_sql() {
        let r = SecIdxRestrictor::new(
            SecIdxColumnRef {
                db: "LSST".into(),
                table: "Object".into(),
                column: "objectIdObjTest".into(),
            },
            SecIdxPredicate::In(vec!["2".into(), "3145".into(), "9999".into()]),
        );
        assert_eq!(
            r.lookup_sql(),
            "SELECT chunkId, subChunkId FROM qservMeta.LSST__Object WHERE objectIdObjTest IN (2,3145,9999)"
        );
    }

    #[test]
    fn between_restrictor_renders_lookup_sql() {
        let r = SecIdxRestrictor::new(
            SecIdxColumnRef {
                db: "LSST".into(),
                table: "Object".into(),
                column: "objectId".into(),
            },
            SecIdxPredicate::Between("100".into(), "200".into()),
        );
        assert_eq!(
            r.lookup_sql(),
            "SELECT chunkId, subChunkId FROM qservMeta.LSST__Object WHERE objectId BETWEEN 100 AND 200"
        );
    }
}
