//! CLI/environment configuration for the `czar` binary, following the
//! `clap::Parser` + `env` fallback pattern the teacher uses for its
//! connection-string configs (`clap_blocks::catalog_dsn::CatalogDsnConfig`).

use clap::Parser;

/// Configuration for one `czar` process. Every field can be set from the
/// command line or from an environment variable, mirroring the teacher's
/// DSN config blocks; `czar`-specific defaults (striping, priority budgets)
/// have no original-source equivalent CLI flag and are set to the values
/// `StripingParams`/`Executive` already default to in tests.
#[derive(Debug, Clone, Parser)]
#[clap(name = "czar", about = "Sharded-query coordinator")]
pub struct CzarConfig {
    /// Address the czar's client-facing RPC endpoint binds to.
    #[clap(long = "bind-address", env = "CZAR_BIND_ADDRESS", default_value = "127.0.0.1:4040")]
    pub bind_address: String,

    /// Connection string for the metadata ("CSS") store.
    #[clap(long = "metadata-dsn", env = "CZAR_METADATA_DSN", default_value = "mem")]
    pub metadata_dsn: String,

    /// Connection string for the query-metadata store.
    #[clap(long = "qmeta-dsn", env = "CZAR_QMETA_DSN", default_value = "mem")]
    pub qmeta_dsn: String,

    /// Connection string for the local merge database.
    #[clap(long = "merge-dsn", env = "CZAR_MERGE_DSN", default_value = "mem")]
    pub merge_dsn: String,

    /// Connection string for the secondary-index ("director") database.
    #[clap(long = "secondary-index-dsn", env = "CZAR_SECONDARY_INDEX_DSN", default_value = "mem")]
    pub secondary_index_dsn: String,

    /// Number of dispatch threads each query's `Executive` starts.
    #[clap(long = "dispatch-threads", env = "CZAR_DISPATCH_THREADS", default_value = "50")]
    pub dispatch_threads: usize,

    /// Default priority level's minimum concurrently running jobs.
    #[clap(long = "priority-min-running", env = "CZAR_PRIORITY_MIN_RUNNING", default_value = "0")]
    pub priority_min_running: i32,

    /// Default priority level's maximum concurrently running jobs.
    #[clap(long = "priority-max-running", env = "CZAR_PRIORITY_MAX_RUNNING", default_value = "50")]
    pub priority_max_running: i32,

    /// Chunk-count threshold under which a query is classified
    /// scan-interactive (§ SPEC_FULL, "Interactive-query scan limit").
    #[clap(long = "interactive-chunk-limit", env = "CZAR_INTERACTIVE_CHUNK_LIMIT", default_value = "10")]
    pub interactive_chunk_limit: usize,

    /// Log filter directive, passed straight to `tracing_subscriber::EnvFilter`.
    #[clap(long = "log-filter", env = "CZAR_LOG_FILTER", default_value = "info")]
    pub log_filter: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_with_no_arguments() {
        let config = CzarConfig::parse_from(["czar"]);
        assert_eq!(config.bind_address, "127.0.0.1:4040");
        assert_eq!(config.dispatch_threads, 50);
        assert_eq!(config.interactive_chunk_limit, 10);
    }

    #[test]
    fn bind_address_is_overridable() {
        let config = CzarConfig::parse_from(["czar", "--bind-address", "0.0.0.0:9999"]);
        assert_eq!(config.bind_address, "0.0.0.0:9999");
    }
}
