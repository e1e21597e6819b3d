//! `QuerySession`: the stateful per-query object that turns a SQL string
//! into a resolved chunk coverage and a ready-to-dispatch template set.
//! Grounded on `qproc/QuerySession.h`.

use std::collections::HashSet;
use std::sync::Arc;

use chunking::{ChunkSpec, ChunkSpecVector, StripingParams};
use index_map::{AreaRestrictor, IndexMap, SecIdxRestrictor};
use observability_deps::tracing::{debug, warn};
use once_cell::sync::OnceCell;
use qmeta::MetadataStore;

use crate::ast::{OrderItem, SelectStmt};
use crate::chunk_query_spec::{ChunkQuerySpec, ChunkQuerySpecIter};
use crate::error::{AnalysisSnafu, Result};
use crate::plugins::{
    analyze_joins, chunk_template, extract_area_restrictors, extract_sec_idx_restrictors,
    place_clauses, resolve_tables, rewrite_aggregates, AnalysisState, JoinOverlapStrategy,
};
use crate::template::QueryTemplate;

/// A sentinel chunk id for [`QuerySession::set_dummy`]: queries with no
/// partitioned tables run against this single synthetic chunk rather than
/// being special-cased at the dispatch layer (`QuerySession.h`'s
/// `setDummy`/`_isDummy`).
pub const DUMMY_CHUNK_ID: i32 = 1234567890;

const DEFAULT_INTERACTIVE_CHUNK_LIMIT: usize = 10;

pub struct QuerySession {
    metadata: Arc<dyn MetadataStore>,
    default_db: Option<String>,
    merge_table_name: String,

    original: String,
    dominant_db: Option<String>,
    area_restrictors: Vec<AreaRestrictor>,
    sec_idx_restrictors: Vec<SecIdxRestrictor>,
    join_overlap: JoinOverlapStrategy,

    parallel_templates: Vec<QueryTemplate>,
    merge_stmt: Option<SelectStmt>,
    has_merge: bool,
    proxy_order_by: Vec<OrderItem>,
    proxy_limit: Option<u64>,

    error: Option<String>,
    is_final: bool,
    is_dummy: bool,
    chunks: ChunkSpecVector,

    striping_cache: OnceCell<StripingParams>,
    empty_chunks_cache: OnceCell<HashSet<i32>>,

    interactive_chunk_limit: usize,
    scan_interactive: bool,
}

impl QuerySession {
    pub fn new(metadata: Arc<dyn MetadataStore>, default_db: Option<String>) -> QuerySession {
        QuerySession {
            metadata,
            default_db,
            merge_table_name: "result".to_string(),
            original: String::new(),
            dominant_db: None,
            area_restrictors: Vec::new(),
            sec_idx_restrictors: Vec::new(),
            join_overlap: JoinOverlapStrategy::None,
            parallel_templates: Vec::new(),
            merge_stmt: None,
            has_merge: false,
            proxy_order_by: Vec::new(),
            proxy_limit: None,
            error: None,
            is_final: false,
            is_dummy: false,
            chunks: Vec::new(),
            striping_cache: OnceCell::new(),
            empty_chunks_cache: OnceCell::new(),
            interactive_chunk_limit: DEFAULT_INTERACTIVE_CHUNK_LIMIT,
            scan_interactive: true,
        }
    }

    pub fn set_merge_table_name(&mut self, name: impl Into<String>) {
        self.merge_table_name = name.into();
    }

    pub fn set_interactive_chunk_limit(&mut self, limit: usize) {
        self.interactive_chunk_limit = limit;
    }

    pub fn get_original(&self) -> &str {
        &self.original
    }

    pub fn get_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn get_dominant_db(&self) -> Option<&str> {
        self.dominant_db.as_deref()
    }

    pub fn needs_merge(&self) -> bool {
        self.has_merge
    }

    pub fn has_chunks(&self) -> bool {
        !self.chunks.is_empty()
    }

    pub fn is_scan_interactive(&self) -> bool {
        self.scan_interactive
    }

    pub fn area_restrictors(&self) -> &[AreaRestrictor] {
        &self.area_restrictors
    }

    pub fn sec_idx_restrictors(&self) -> &[SecIdxRestrictor] {
        &self.sec_idx_restrictors
    }

    /// Runs the full rewrite-plugin chain over `sql` (§4.5 phase 1). On
    /// analysis failure the error text is both returned and retained for
    /// `get_error()`, matching the original's dual reporting path.
    pub fn analyze(&mut self, sql: &str) -> Result<()> {
        self.original = sql.to_string();
        let run = self.analyze_inner(sql);
        if let Err(err) = &run {
            let message = err.to_string();
            warn!(%message, "query analysis failed");
            self.error = Some(message);
        }
        run
    }

    fn analyze_inner(&mut self, sql: &str) -> Result<()> {
        let mut stmt = crate::parser::parse_select(sql)?;
        let mut state = AnalysisState::default();

        resolve_tables(self.metadata.as_ref(), self.default_db.as_deref(), &mut stmt, &mut state)?;
        chunk_template(self.metadata.as_ref(), &mut stmt)?;
        extract_area_restrictors(self.metadata.as_ref(), &mut stmt, &mut state)?;
        extract_sec_idx_restrictors(self.metadata.as_ref(), &stmt, &mut state)?;
        analyze_joins(&mut stmt, &mut state)?;

        self.dominant_db = state.dominant_db;
        self.area_restrictors = state.area_restrictors;
        self.sec_idx_restrictors = state.sec_idx_restrictors;
        self.join_overlap = state.join_overlap;
        self.proxy_order_by = stmt.order_by.clone();
        self.proxy_limit = stmt.limit;

        let (parallel_items, merge_items, has_merge) = rewrite_aggregates(&stmt.select_list);
        let placement = place_clauses(&stmt, has_merge);

        let parallel_stmt = SelectStmt {
            distinct: placement.parallel_distinct,
            select_list: parallel_items,
            from: stmt.from.clone(),
            where_clause: stmt.where_clause.clone(),
            group_by: placement.parallel_group_by,
            having: if has_merge { None } else { stmt.having.clone() },
            order_by: Vec::new(),
            limit: None,
        };
        debug!(template = %parallel_stmt.render(), "built parallel template");
        self.parallel_templates = vec![QueryTemplate::new(parallel_stmt.render())];
        self.has_merge = has_merge;

        self.merge_stmt = if has_merge {
            let merge_from = crate::ast::TableRef {
                db: None,
                table: self.merge_table_name.clone(),
                alias: None,
            };
            Some(SelectStmt {
                distinct: placement.merge_distinct,
                select_list: merge_items,
                from: vec![merge_from],
                where_clause: Vec::new(),
                group_by: placement.merge_group_by,
                having: placement.merge_having,
                order_by: Vec::new(),
                limit: None,
            })
        } else {
            None
        };

        Ok(())
    }

    pub fn get_merge_stmt(&self) -> Option<String> {
        self.merge_stmt.as_ref().map(SelectStmt::render)
    }

    /// The ORDER BY clause the front-end proxy applies at result retrieval,
    /// after the merge (§4.7): never folded into the parallel or merge
    /// templates.
    pub fn get_proxy_order_by(&self) -> String {
        if self.proxy_order_by.is_empty() {
            return String::new();
        }
        let items: Vec<String> = self.proxy_order_by.iter().map(OrderItem::render).collect();
        format!("ORDER BY {}", items.join(", "))
    }

    pub fn get_proxy_limit(&self) -> Option<u64> {
        self.proxy_limit
    }

    /// Queries (and caches) the dominant database's striping parameters.
    pub fn get_db_striping(&self) -> Result<StripingParams> {
        let db = self.dominant_db.as_deref().ok_or_else(|| {
            AnalysisSnafu {
                message: "no dominant database resolved for this query".to_string(),
            }
            .build()
        })?;
        self.striping_cache
            .get_or_try_init(|| self.metadata.striping_params(db).map_err(Into::into))
            .copied()
    }

    /// Queries (and caches) the dominant database's empty-chunk set.
    pub fn get_empty_chunks(&self) -> Result<HashSet<i32>> {
        let db = self.dominant_db.as_deref().ok_or_else(|| {
            AnalysisSnafu {
                message: "no dominant database resolved for this query".to_string(),
            }
            .build()
        })?;
        self.empty_chunks_cache
            .get_or_try_init(|| self.metadata.empty_chunks(db).map_err(Into::into))
            .cloned()
    }

    /// Flags this session to run against a single synthetic chunk rather
    /// than a resolved partitioning - for queries with no partitioned
    /// tables (pure metadata or constant queries).
    pub fn set_dummy(&mut self) {
        self.is_dummy = true;
        self.chunks = vec![ChunkSpec::new(DUMMY_CHUNK_ID)];
    }

    /// §4.4: resolves this session's restrictors against `index_map`,
    /// intersects with the dominant database's non-empty chunks, and stores
    /// the result as the session's chunk coverage.
    pub fn resolve_chunks(&mut self, index_map: &IndexMap) -> Result<()> {
        if self.is_dummy {
            return Ok(());
        }
        let mut chunks = index_map.get_chunks(&self.area_restrictors, &self.sec_idx_restrictors)?;
        let empty = self.get_empty_chunks()?;
        if !empty.is_empty() {
            chunks.retain(|c| !empty.contains(&c.chunk_id));
        }
        if matches!(self.join_overlap, JoinOverlapStrategy::SubChunkSelfJoin { .. }) {
            // A self-join's overlap predicate needs every sub-chunk of each
            // surviving chunk, not just the ones a spatial/secondary-index
            // restrictor happened to narrow to - area/secondary restrictors
            // only narrow chunk membership here (see index_map's grounding
            // notes), so the sub-chunk dimension has to be filled in
            // separately for queries that actually need it.
            let chunker = self.get_db_striping()?.build_chunker()?;
            for chunk in &mut chunks {
                if chunk.sub_chunks.is_empty() {
                    chunk.sub_chunks = chunker.all_sub_chunks(chunk.chunk_id);
                }
            }
        }
        self.scan_interactive = chunks.len() <= self.interactive_chunk_limit;
        self.chunks = chunks;
        Ok(())
    }

    /// For test/debug harnesses that want to drive specific chunk coverage
    /// without a real `IndexMap`/metadata round trip.
    pub fn add_chunk(&mut self, spec: ChunkSpec) {
        self.chunks.push(spec);
        chunking::normalize(&mut self.chunks).expect("single push cannot mismatch chunk ids");
        self.scan_interactive = self.chunks.len() <= self.interactive_chunk_limit;
    }

    pub fn chunks(&self) -> &[ChunkSpec] {
        &self.chunks
    }

    /// Fixes the parallel-template vector and merge statement and flips
    /// `is_final`; chunk coverage may still be updated after this (the
    /// original allows `addChunk` to run after `finalize`).
    pub fn finalize(&mut self) {
        self.is_final = true;
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    /// §4.5 phase 3: iterates the resolved chunk coverage, producing one
    /// `ChunkQuerySpec` per chunk (or per sub-chunk fragment, when the join
    /// overlap strategy requires sub-chunk tables).
    pub fn iter_chunk_query_specs(&self) -> impl Iterator<Item = ChunkQuerySpec> + '_ {
        let db = self.dominant_db.clone().unwrap_or_default();
        self.chunks
            .iter()
            .cloned()
            .flat_map(move |spec| ChunkQuerySpecIter::new(db.clone(), &self.parallel_templates, spec))
    }

    pub fn join_overlap_strategy(&self) -> &JoinOverlapStrategy {
        &self.join_overlap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qmeta::{DirectorColumn, MemMetadataStore, PartitioningKind};

    fn fixture_metadata() -> Arc<dyn MetadataStore> {
        let mut css = MemMetadataStore::new();
        css.add_striping("LSST", StripingParams::new(85, 12).unwrap());
        css.add_table("LSST", "Object", PartitioningKind::Partitioned);
        css.add_table("LSST", "Source", PartitioningKind::Partitioned);
        css.add_director(
            "LSST",
            "Object",
            DirectorColumn {
                id_column: "objectIdObjTest".into(),
                ra_column: "ra".into(),
                decl_column: "decl".into(),
            },
        );
        Arc::new(css)
    }

    #[test]
    fn trivial_chunked_select_has_no_merge_statement() {
        let mut session = QuerySession::new(fixture_metadata(), Some("LSST".to_string()));
        session
            .analyze("SELECT * FROM Object WHERE someField > 5.0;")
            .unwrap();
        assert!(!session.needs_merge());
        assert_eq!(session.parallel_templates.len(), 1);
        assert_eq!(
            session.parallel_templates[0].render(100, None),
            "SELECT * FROM LSST.Object_100 AS QST_1_ WHERE someField > 5.0"
        );
        assert!(session.get_merge_stmt().is_none());
    }

    #[test]
    fn aggregate_rewrite_produces_parallel_and_merge_statements() {
        let mut session = QuerySession::new(fixture_metadata(), Some("LSST".to_string()));
        session
            .analyze("SELECT objectId, AVG(taiMidPoint) FROM Source GROUP BY objectId ORDER BY objectId ASC")
            .unwrap();
        assert!(session.needs_merge());
        assert_eq!(
            session.parallel_templates[0].render(100, None),
            "SELECT objectId, COUNT(taiMidPoint) AS QS1_COUNT, SUM(taiMidPoint) AS QS2_SUM FROM LSST.Source_100 AS QST_1_ GROUP BY objectId"
        );
        assert_eq!(
            session.get_merge_stmt().unwrap(),
            "SELECT objectId, SUM(QS2_SUM)/SUM(QS1_COUNT) AS AVG(taiMidPoint) FROM result GROUP BY objectId"
        );
        assert_eq!(session.get_proxy_order_by(), "ORDER BY objectId ASC");
    }

    #[test]
    fn area_restrictor_is_extracted_and_replaced_with_scisql_predicate() {
        let mut session = QuerySession::new(fixture_metadata(), Some("LSST".to_string()));
        session
            .analyze("SELECT * FROM Object WHERE qserv_areaspec_box(2,2,3,3)")
            .unwrap();
        assert_eq!(session.area_restrictors().len(), 1);
        assert_eq!(session.area_restrictors()[0].sql_fragment(), "qserv_areaspec_box(2,2,3,3)");
        let rendered = session.parallel_templates[0].render(100, None);
        assert!(rendered.contains("scisql_s2PtInBox(QST_1_.ra,QST_1_.decl,2,2,3,3)=1"));
        assert!(!rendered.contains("qserv_areaspec_box"));
    }

    #[test]
    fn secondary_index_predicate_is_extracted_without_removing_it() {
        let mut session = QuerySession::new(fixture_metadata(), Some("LSST".to_string()));
        session
            .analyze("SELECT * FROM Object WHERE objectIdObjTest IN (2,3145,9999)")
            .unwrap();
        assert_eq!(session.sec_idx_restrictors().len(), 1);
        assert_eq!(
            session.sec_idx_restrictors()[0].lookup_sql(),
            "SELECT chunkId, subChunkId FROM qservMeta.LSST__Object WHERE objectIdObjTest IN (2,3145,9999)"
        );
        let rendered = session.parallel_templates[0].render(100, None);
        assert!(rendered.contains("objectIdObjTest IN (2,3145,9999)"));
    }

    #[test]
    fn unknown_database_fails_analysis_with_literal_error() {
        let mut session = QuerySession::new(fixture_metadata(), None);
        let err = session
            .analyze("SELECT count(*) FROM Bad.Object AS o1, Object o2 WHERE o1.objectId = o2.objectId")
            .unwrap_err();
        assert_eq!(err.to_string(), "AnalysisError: Invalid db/table: Bad.Object");
        assert_eq!(session.get_error(), Some("AnalysisError: Invalid db/table: Bad.Object"));
    }

    #[test]
    fn self_join_on_partitioned_table_requires_sub_chunk_overlap() {
        let mut session = QuerySession::new(fixture_metadata(), Some("LSST".to_string()));
        session
            .analyze("SELECT * FROM Object o1, Object o2 WHERE o1.objectId = o2.objectId")
            .unwrap();
        assert_eq!(
            session.join_overlap_strategy(),
            &JoinOverlapStrategy::SubChunkSelfJoin {
                table: "Object".to_string()
            }
        );
        assert!(session.parallel_templates[0].as_str().contains("_%CC%_%SS%"));
    }

    #[test]
    fn dummy_chunk_bypasses_index_map_resolution() {
        let mut session = QuerySession::new(fixture_metadata(), Some("LSST".to_string()));
        session.set_dummy();
        assert_eq!(session.chunks().len(), 1);
        assert_eq!(session.chunks()[0].chunk_id, DUMMY_CHUNK_ID);
    }
}
