//! `InfileMergerConfig`: the per-query configuration an `InfileMerger` is
//! built from - the target table results land in, and the optional merge
//! statement run against it at finalize. Grounded on `rproc/InfileMerger.h`'s
//! `InfileMergerConfig` (forward-declared in `UserQuerySelect.h`; `czar`
//! fills `targetTable`/`mergeStmt` in `_setupMerger`).

#[derive(Clone, Debug, Default)]
pub struct InfileMergerConfig {
    /// The table worker results are loaded into as they stream in
    /// (`result_<queryId>` by default, §6 "Naming").
    pub target_table: String,
    /// The post-merge aggregate-rewrite/sort/limit statement (§4.7), absent
    /// for queries that needed no merge-side rewrite.
    pub merge_stmt: Option<String>,
}

impl InfileMergerConfig {
    pub fn new(target_table: impl Into<String>) -> InfileMergerConfig {
        InfileMergerConfig {
            target_table: target_table.into(),
            merge_stmt: None,
        }
    }

    pub fn with_merge_stmt(mut self, merge_stmt: impl Into<String>) -> InfileMergerConfig {
        self.merge_stmt = Some(merge_stmt.into());
        self
    }
}
