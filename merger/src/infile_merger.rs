//! `InfileMerger`: streams per-chunk worker results into a target table via
//! `LOAD DATA LOCAL INFILE`, then runs the merge statement at `finalize`
//! (§4.7). Grounded on `rproc/InfileMerger.h` (forward-declared throughout
//! `ccontrol/UserQuerySelect.{h,cc}`: `_setupMerger` builds one from a
//! `InfileMergerConfig` with `targetTable`/`mergeStmt` filled in, `join()`
//! calls `finalize()` and reports failure via message-store code 1105).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use observability_deps::tracing::{debug, error};

use crate::config::InfileMergerConfig;
use crate::connection::MergeConnection;
use crate::error::{DiscardWhileUnfinishedSnafu, IngestSnafu, Result};
use snafu::ensure;

/// Minimal ambient instrumentation (§ SPEC_FULL "Metrics surface"): counts
/// rows ingested and ingest failures, mirroring the shape of the teacher's
/// `metric::Registry` counters without pulling in the full metrics crate.
#[derive(Default)]
pub struct MergerMetrics {
    pub rows_ingested: AtomicU64,
    pub ingest_failures: AtomicU64,
}

/// Accepts streamed per-chunk result files keyed by their temporary table
/// name, loads them into one target table, and applies the merge statement
/// at finalize. One `InfileMerger` per `UserQuery` (§3's ownership table).
pub struct InfileMerger<C> {
    config: InfileMergerConfig,
    connection: C,
    finished: AtomicBool,
    metrics: MergerMetrics,
}

impl<C: MergeConnection> InfileMerger<C> {
    pub fn new(config: InfileMergerConfig, connection: C) -> InfileMerger<C> {
        InfileMerger {
            config,
            connection,
            finished: AtomicBool::new(false),
            metrics: MergerMetrics::default(),
        }
    }

    pub fn metrics(&self) -> &MergerMetrics {
        &self.metrics
    }

    /// Stages one chunk's result file and loads it into the target table.
    /// `chunk_result_table` is the per-chunk temporary table name (§6
    /// "Naming": `r_<queryId>_<md5(queryText)>_<chunkId>_<seq>`) a worker's
    /// result file is keyed by; concurrent calls from multiple worker
    /// threads are serialized by the connection, per §5.
    pub fn ingest(&self, chunk_result_table: &str, file_path: &str) -> Result<()> {
        debug!(table = %self.config.target_table, %chunk_result_table, %file_path, "ingesting chunk result");
        match self.connection.load_infile(file_path, &self.config.target_table) {
            Ok(()) => {
                self.metrics.rows_ingested.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(err) => {
                self.metrics.ingest_failures.fetch_add(1, Ordering::Relaxed);
                error!(%chunk_result_table, %err, "chunk result ingest failed");
                IngestSnafu {
                    table: self.config.target_table.clone(),
                    message: err.to_string(),
                }
                .fail()
            }
        }
    }

    /// Runs the merge statement (if any) against the target table and
    /// flips the finished flag. §4.7: "finalize() runs the merge statement
    /// against the target table when present, yielding the final result in
    /// the result table." Errors here are code-1105 merger errors (§6, §7).
    pub fn finalize(&self) -> Result<()> {
        if let Some(merge_stmt) = &self.config.merge_stmt {
            debug!(sql = %merge_stmt, "running merge statement");
            self.connection.execute(merge_stmt)?;
        }
        self.finished.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Releases the merger's resources. Refuses while unfinished, mirroring
    /// `_discardMerger`'s "merger unfinished, cannot discard" check.
    pub fn discard(&self) -> Result<()> {
        ensure!(self.is_finished(), DiscardWhileUnfinishedSnafu);
        Ok(())
    }

    pub fn target_table(&self) -> &str {
        &self.config.target_table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::FakeMergeConnection;

    #[test]
    fn ingest_then_finalize_runs_merge_statement() {
        let config = InfileMergerConfig::new("result_1").with_merge_stmt("SELECT SUM(c) FROM result_1");
        let conn = FakeMergeConnection::new();
        let merger = InfileMerger::new(config, conn);
        merger.ingest("r_1_abc_100_0", "/tmp/r_1_abc_100_0.tsv").unwrap();
        assert!(!merger.is_finished());
        merger.finalize().unwrap();
        assert!(merger.is_finished());
        assert_eq!(merger.connection.executed_statements(), vec!["SELECT SUM(c) FROM result_1".to_string()]);
        assert_eq!(merger.metrics().rows_ingested.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn finalize_without_merge_stmt_just_marks_finished() {
        let config = InfileMergerConfig::new("result_1");
        let merger = InfileMerger::new(config, FakeMergeConnection::new());
        merger.finalize().unwrap();
        assert!(merger.connection.executed_statements().is_empty());
        assert!(merger.is_finished());
    }

    #[test]
    fn discard_refuses_while_unfinished() {
        let config = InfileMergerConfig::new("result_1");
        let merger = InfileMerger::new(config, FakeMergeConnection::new());
        test_helpers::assert_error_contains(&merger.discard().unwrap_err(), "not finished");
        merger.finalize().unwrap();
        merger.discard().unwrap();
    }

    #[test]
    fn ingest_failure_increments_failure_metric_and_surfaces_error() {
        let config = InfileMergerConfig::new("result_1");
        let conn = FakeMergeConnection::new();
        conn.fail_next_load();
        let merger = InfileMerger::new(config, conn);
        let err = merger.ingest("r_1_abc_100_0", "/tmp/missing.tsv").unwrap_err();
        test_helpers::assert_error_contains(&err, "LOAD DATA INFILE failed");
        assert_eq!(merger.metrics().ingest_failures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn finalize_failure_does_not_mark_finished() {
        let config = InfileMergerConfig::new("result_1").with_merge_stmt("BAD SQL");
        let conn = FakeMergeConnection::new();
        conn.fail_next_execute();
        let merger = InfileMerger::new(config, conn);
        assert!(merger.finalize().is_err());
        assert!(!merger.is_finished());
    }
}
