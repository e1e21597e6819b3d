//! The rewrite-plugin chain: an ordered sequence of passes over the typed
//! AST and a running [`AnalysisState`], each implementing one of the
//! responsibilities enumerated for the original's `QueryPlugin` chain.
//! Modeled as plain functions per the re-architecture note in `DESIGN.md`'s
//! Open Questions - no plugin registry, no runtime reflection.

use index_map::{AreaRestrictor, SecIdxColumnRef, SecIdxPredicate, SecIdxRestrictor};
use qmeta::{MetadataStore, PartitioningKind};

use crate::ast::{Conjunct, Expr, SelectItem, SelectStmt};
use crate::error::{AnalysisSnafu, Result};
use snafu::ensure;

/// How a self-join on a partitioned table is evaluated. The original injects
/// sub-chunk table aliases via regex replacement of `_sc1`/`_sc2`/`_sfo`
/// suffixes (`qana/QueryMapping.cc`); this models the same decision as an
/// explicit value on the analysis state instead, per REDESIGN FLAG (c).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum JoinOverlapStrategy {
    /// No self-join requiring sub-chunk overlap was detected.
    None,
    /// A self-join on `table` needs sub-chunk-level overlap resolution: both
    /// sides of the join get templated with `%CC%_%SS%` rather than plain
    /// `%CC%`.
    SubChunkSelfJoin { table: String },
}

/// Accumulates what the logic-hook plugins extract from the AST: the
/// dominant database, the restrictor vectors `IndexMap` will consume, the
/// join-overlap decision, and any non-fatal diagnostics.
#[derive(Default)]
pub struct AnalysisState {
    pub dominant_db: Option<String>,
    pub area_restrictors: Vec<AreaRestrictor>,
    pub sec_idx_restrictors: Vec<SecIdxRestrictor>,
    pub join_overlap: JoinOverlapStrategy,
    pub diagnostics: Vec<String>,
}

impl Default for JoinOverlapStrategy {
    fn default() -> JoinOverlapStrategy {
        JoinOverlapStrategy::None
    }
}

/// Plugin (a): resolves every FROM-clause table reference against the
/// metadata store, filling in `default_db` where the reference was
/// unqualified, and rejects references to unknown databases or tables.
/// Also picks the dominant database: the db of the first partitioned table.
pub fn resolve_tables(
    metadata: &dyn MetadataStore,
    default_db: Option<&str>,
    stmt: &mut SelectStmt,
    state: &mut AnalysisState,
) -> Result<()> {
    for table_ref in &mut stmt.from {
        if table_ref.db.is_none() {
            table_ref.db = default_db.map(|s| s.to_string());
        }
        let db = table_ref.db.clone().unwrap_or_default();
        ensure!(
            metadata.table_exists(&db, &table_ref.table),
            AnalysisSnafu {
                message: format!("Invalid db/table: {}.{}", db, table_ref.table),
            }
        );
        if state.dominant_db.is_none()
            && !matches!(
                metadata.partitioning_kind(&db, &table_ref.table)?,
                PartitioningKind::NotPartitioned
            )
        {
            state.dominant_db = Some(db);
        }
    }
    Ok(())
}

/// Recovers the un-chunked table name `chunk_template` (plugin (d)) may
/// already have rewritten into `table_%CC%` form, so later passes can still
/// look up director-column metadata by the table's real name. Plugin (d)
/// deliberately runs before (b)/(c) so the chunk alias it assigns is visible
/// to the predicates those passes render.
fn director_table_name(table: &str) -> &str {
    table.strip_suffix("_%CC%").unwrap_or(table)
}

/// Plugin (b): extracts `qserv_areaspec_*` calls from the WHERE clause into
/// `AreaRestrictor` values, replacing each with the equivalent sciSQL
/// row-level predicate against the dominant table's spatial columns.
pub fn extract_area_restrictors(
    metadata: &dyn MetadataStore,
    stmt: &mut SelectStmt,
    state: &mut AnalysisState,
) -> Result<()> {
    let dominant_table = match &state.dominant_db {
        Some(db) => stmt
            .from
            .iter()
            .find(|t| t.db.as_deref() == Some(db.as_str()))
            .or_else(|| stmt.from.first()),
        None => stmt.from.first(),
    };
    let (table_alias, ra_col, decl_col) = match dominant_table {
        Some(t) => {
            let db = t.db.clone().unwrap_or_default();
            let director = metadata.director_column(&db, director_table_name(&t.table))?;
            let (ra, decl) = director
                .map(|d| (d.ra_column, d.decl_column))
                .unwrap_or_else(|| ("ra".to_string(), "decl".to_string()));
            (t.effective_alias().to_string(), ra, decl)
        }
        None => return Ok(()),
    };

    let mut rewritten = Vec::with_capacity(stmt.where_clause.len());
    for conjunct in std::mem::take(&mut stmt.where_clause) {
        match conjunct {
            Conjunct::AreaSpec { func, args } => {
                let restrictor = match func.as_str() {
                    "qserv_areaspec_box" => AreaRestrictor::new_box(args)?,
                    "qserv_areaspec_circle" => AreaRestrictor::new_circle(args)?,
                    "qserv_areaspec_ellipse" => AreaRestrictor::new_ellipse(args)?,
                    "qserv_areaspec_poly" => AreaRestrictor::new_poly(args)?,
                    _ => unreachable!("parser only recognizes the four qserv_areaspec_* names"),
                };
                rewritten.push(Conjunct::Raw(restrictor.as_sci_sql_factor(
                    &table_alias,
                    &ra_col,
                    &decl_col,
                )));
                state.area_restrictors.push(restrictor);
            }
            other => rewritten.push(other),
        }
    }
    stmt.where_clause = rewritten;
    Ok(())
}

/// Plugin (c): detects equality/IN/BETWEEN predicates on a table's director
/// (secondary-index) column and extracts them into `SecIdxRestrictor`
/// values. The predicate itself is left in the WHERE clause for per-row
/// filtering - the director-table lookup only narrows chunk coverage.
pub fn extract_sec_idx_restrictors(
    metadata: &dyn MetadataStore,
    stmt: &SelectStmt,
    state: &mut AnalysisState,
) -> Result<()> {
    for table_ref in &stmt.from {
        let db = table_ref.db.clone().unwrap_or_default();
        let director = match metadata.director_column(&db, director_table_name(&table_ref.table))? {
            Some(d) => d,
            None => continue,
        };
        for conjunct in &stmt.where_clause {
            let Conjunct::Raw(text) = conjunct else { continue };
            if let Some((column, predicate)) = parse_index_predicate(text, &director.id_column) {
                state.sec_idx_restrictors.push(SecIdxRestrictor::new(
                    SecIdxColumnRef {
                        db: db.clone(),
                        table: director_table_name(&table_ref.table).to_string(),
                        column,
                    },
                    predicate,
                ));
            }
        }
    }
    Ok(())
}

fn parse_index_predicate(text: &str, director_column: &str) -> Option<(String, SecIdxPredicate)> {
    let text = text.trim();
    let upper = text.to_ascii_uppercase();
    let column_upper = director_column.to_ascii_uppercase();
    if let Some(rest) = upper.strip_prefix(&column_upper) {
        let rest_raw = &text[text.len() - rest.len()..];
        let rest_trim = rest_raw.trim_start();
        let rest_upper = rest_trim.to_ascii_uppercase();
        if let Some(list) = rest_upper.strip_prefix("IN") {
            let list_raw = rest_trim[rest_trim.len() - list.len()..].trim();
            if let Some(inner) = list_raw.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
                let values = inner.split(',').map(|v| v.trim().to_string()).collect();
                return Some((director_column.to_string(), SecIdxPredicate::In(values)));
            }
        }
        if let Some(range) = rest_upper.strip_prefix("BETWEEN") {
            let range_raw = rest_trim[rest_trim.len() - range.len()..].trim();
            if let Some((lo, hi)) = split_between(range_raw) {
                return Some((
                    director_column.to_string(),
                    SecIdxPredicate::Between(lo, hi),
                ));
            }
        }
    }
    None
}

fn split_between(s: &str) -> Option<(String, String)> {
    let upper = s.to_ascii_uppercase();
    let pos = upper.find(" AND ")?;
    let lo = s[..pos].trim().to_string();
    let hi = s[pos + 5..].trim().to_string();
    Some((lo, hi))
}

/// Plugin (d): rewrites partitioned table references into chunk-templated
/// form, substituting `%CC%` for the chunk id at dispatch time. Tables with
/// no existing alias get a synthetic `QST_<n>_` alias (matching the
/// original's generated alias naming) so later passes and self-joins have a
/// stable per-occurrence name to qualify columns with.
pub fn chunk_template(
    metadata: &dyn MetadataStore,
    stmt: &mut SelectStmt,
) -> Result<()> {
    for (idx, table_ref) in stmt.from.iter_mut().enumerate() {
        let db = table_ref.db.clone().unwrap_or_default();
        if matches!(
            metadata.partitioning_kind(&db, &table_ref.table)?,
            PartitioningKind::Partitioned | PartitioningKind::PartitionedWithSubChunks
        ) {
            if table_ref.alias.is_none() {
                table_ref.alias = Some(format!("QST_{}_", idx + 1));
            }
            table_ref.table = format!("{}_%CC%", table_ref.table);
        }
    }
    Ok(())
}

/// Plugin (e): detects a self-join on the same partitioned table (the same
/// table name appearing twice in FROM) and flags it as needing sub-chunk
/// overlap resolution, upgrading both occurrences' chunk token to
/// `%CC%_%SS%`. Plugin (h)'s evaluability check below rejects any other
/// shape of partitioned-table join.
pub fn analyze_joins(stmt: &mut SelectStmt, state: &mut AnalysisState) -> Result<()> {
    let partitioned_base_names: Vec<String> = stmt
        .from
        .iter()
        .filter_map(|t| {
            t.table
                .strip_suffix("_%CC%")
                .map(|base| base.to_string())
        })
        .collect();

    if partitioned_base_names.len() < 2 {
        return Ok(());
    }

    let first = &partitioned_base_names[0];
    let all_same = partitioned_base_names.iter().all(|n| n == first);
    ensure!(
        all_same,
        AnalysisSnafu {
            message: "Query involves partitioned table joins that Qserv does not know how to \
                      evaluate using only partition-local data"
                .to_string(),
        }
    );

    state.join_overlap = JoinOverlapStrategy::SubChunkSelfJoin {
        table: first.clone(),
    };
    for table_ref in &mut stmt.from {
        if table_ref.table.ends_with("_%CC%") {
            table_ref.table = format!("{}_%SS%", table_ref.table);
        }
    }
    Ok(())
}

/// One sub-expression an aggregate rewrites into on the parallel side, and
/// the corresponding merge-side expression.
struct AggregateSplit {
    parallel_items: Vec<SelectItem>,
    merge_expr: Expr,
    merge_alias: String,
}

/// Plugin (f): rewrites every aggregate expression in the select list into
/// a parallel/merge pair, e.g. `avg(x) -> (count(x) AS c, sum(x) AS s)`
/// parallel and `sum(s)/sum(c)` merge. Returns the two select lists; the
/// caller is responsible for deciding whether a merge statement is needed
/// at all (it is, iff any aggregate was rewritten).
pub fn rewrite_aggregates(select_list: &[SelectItem]) -> (Vec<SelectItem>, Vec<SelectItem>, bool) {
    let mut parallel = Vec::new();
    let mut merge = Vec::new();
    let mut has_aggregate = false;
    let mut counter = 0usize;
    let mut next_label = |suffix: &str| {
        counter += 1;
        format!("QS{}_{}", counter, suffix)
    };

    for item in select_list {
        if item.expr.is_aggregate() {
            has_aggregate = true;
            let split = split_aggregate(&item.expr, item.alias.as_deref(), &mut next_label);
            parallel.extend(split.parallel_items);
            merge.push(SelectItem {
                expr: split.merge_expr,
                alias: Some(split.merge_alias),
            });
        } else {
            parallel.push(item.clone());
            merge.push(item.clone());
        }
    }
    (parallel, merge, has_aggregate)
}

fn split_aggregate(
    expr: &Expr,
    user_alias: Option<&str>,
    next_label: &mut impl FnMut(&str) -> String,
) -> AggregateSplit {
    let Expr::Func { name, args } = expr else {
        unreachable!("caller only invokes this for Expr::Func aggregates")
    };
    let merge_alias = user_alias.map(str::to_string).unwrap_or_else(|| expr.render());
    let func_upper = name.to_ascii_uppercase();
    let arg = args.first().cloned().unwrap_or(Expr::Star);

    match func_upper.as_str() {
        "AVG" => {
            let count_label = next_label("COUNT");
            let sum_label = next_label("SUM");
            AggregateSplit {
                parallel_items: vec![
                    SelectItem {
                        expr: Expr::Func {
                            name: "COUNT".to_string(),
                            args: vec![arg.clone()],
                        },
                        alias: Some(count_label.clone()),
                    },
                    SelectItem {
                        expr: Expr::Func {
                            name: "SUM".to_string(),
                            args: vec![arg],
                        },
                        alias: Some(sum_label.clone()),
                    },
                ],
                merge_expr: Expr::Div(
                    Box::new(Expr::Func {
                        name: "SUM".to_string(),
                        args: vec![Expr::Column(sum_label)],
                    }),
                    Box::new(Expr::Func {
                        name: "SUM".to_string(),
                        args: vec![Expr::Column(count_label)],
                    }),
                ),
                merge_alias,
            }
        }
        "COUNT" => {
            let label = next_label("COUNT");
            AggregateSplit {
                parallel_items: vec![SelectItem {
                    expr: Expr::Func {
                        name: "COUNT".to_string(),
                        args: vec![arg],
                    },
                    alias: Some(label.clone()),
                }],
                merge_expr: Expr::Func {
                    name: "SUM".to_string(),
                    args: vec![Expr::Column(label)],
                },
                merge_alias,
            }
        }
        "SUM" => {
            let label = next_label("SUM");
            AggregateSplit {
                parallel_items: vec![SelectItem {
                    expr: Expr::Func {
                        name: "SUM".to_string(),
                        args: vec![arg],
                    },
                    alias: Some(label.clone()),
                }],
                merge_expr: Expr::Func {
                    name: "SUM".to_string(),
                    args: vec![Expr::Column(label)],
                },
                merge_alias,
            }
        }
        "MIN" | "MAX" => {
            let label = next_label(&func_upper);
            AggregateSplit {
                parallel_items: vec![SelectItem {
                    expr: Expr::Func {
                        name: func_upper.clone(),
                        args: vec![arg],
                    },
                    alias: Some(label.clone()),
                }],
                merge_expr: Expr::Func {
                    name: func_upper,
                    args: vec![Expr::Column(label)],
                },
                merge_alias,
            }
        }
        other => unreachable!("unrecognized aggregate function {}", other),
    }
}

/// Plugin (g): decides which of DISTINCT/GROUP BY/HAVING belong on the
/// parallel statement, the merge statement, or both. ORDER BY and LIMIT are
/// never pushed into either - both are retained on the session for the
/// front-end proxy to apply after the merge (§4.7).
pub struct ClausePlacement {
    pub parallel_distinct: bool,
    pub parallel_group_by: Vec<String>,
    pub merge_distinct: bool,
    pub merge_group_by: Vec<String>,
    pub merge_having: Option<String>,
}

pub fn place_clauses(stmt: &SelectStmt, has_merge: bool) -> ClausePlacement {
    if has_merge {
        ClausePlacement {
            parallel_distinct: false,
            parallel_group_by: stmt.group_by.clone(),
            merge_distinct: stmt.distinct,
            merge_group_by: stmt.group_by.clone(),
            merge_having: stmt.having.clone(),
        }
    } else {
        ClausePlacement {
            parallel_distinct: stmt.distinct,
            parallel_group_by: stmt.group_by.clone(),
            merge_distinct: false,
            merge_group_by: Vec::new(),
            merge_having: None,
        }
    }
}
