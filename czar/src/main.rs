//! Binary entry point. Parses [`CzarConfig`], wires up in-memory
//! collaborators for the external, out-of-scope-to-implement stores (§6)
//! and a [`qdisp::FakeWorkerTransport`] standing in for the worker RPC
//! layer, then idles until shut down - mirroring `router2`'s `command()`
//! shape (`CommonServerState`/logging setup, build the server, run it)
//! without the HTTP surface this workspace's Non-goals exclude.

use std::sync::Arc;

use clap::Parser;
use czar::{Czar, CzarConfig, MergeConnectionFactory};
use index_map::FakeSecondaryIndex;
use merger::{FakeMergeConnection, MergeConnection};
use observability_deps::tracing::info;
use qdisp::FakeWorkerTransport;
use qmeta::{MemMetadataStore, MemQueryMetaStore};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

struct InMemoryMergeConnections;

impl MergeConnectionFactory for InMemoryMergeConnections {
    fn connect(&self) -> Box<dyn MergeConnection> {
        Box::new(FakeMergeConnection::new())
    }
}

/// Top-level error for the binary's own startup/shutdown plumbing, as
/// opposed to [`czar::Error`], which covers a registered query's lifecycle.
/// Mirrors `commands::run::router2::Error`'s role: one `thiserror` enum per
/// binary entry point, wrapping whatever its `command()`-equivalent can fail
/// on.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid log filter directive {0:?}: {1}")]
    LogFilter(String, #[source] tracing_subscriber::filter::ParseError),

    #[error("waiting for shutdown signal: {0}")]
    Signal(#[from] std::io::Error),
}

pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Wires up in-memory collaborators and idles until shut down. Mirrors
/// `router2::command(config) -> Result<()>`'s shape: a fallible async
/// function the thin `main()` below drives to completion and maps onto an
/// exit code.
async fn command(config: CzarConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.log_filter)
        .map_err(|source| CliError::LogFilter(config.log_filter.clone(), source))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(bind_address = %config.bind_address, "starting czar");

    let metadata = Arc::new(MemMetadataStore::new());
    let query_meta = Arc::new(MemQueryMetaStore::new());
    let secondary_index = Arc::new(FakeSecondaryIndex::new());

    let _czar = Czar::new(
        config,
        metadata,
        secondary_index,
        query_meta,
        Arc::new(InMemoryMergeConnections),
        Arc::new(FakeWorkerTransport),
    );

    info!("czar ready; waiting for shutdown signal");
    tokio::signal::ctrl_c().await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let config = CzarConfig::parse();
    if let Err(err) = command(config).await {
        eprintln!("czar exited with an error: {err}");
        std::process::exit(1);
    }
}
