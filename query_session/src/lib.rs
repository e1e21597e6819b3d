//! Per-query analysis: parses a SELECT statement, runs the rewrite-plugin
//! chain over it, and materializes the per-chunk fragments the dispatcher
//! hands to workers (§4.5). Grounded on `qproc/QuerySession.h`.

mod ast;
mod chunk_query_spec;
mod error;
mod parser;
mod plugins;
mod session;
mod template;

pub use ast::{Conjunct, Expr, OrderItem, SelectItem, SelectStmt, TableRef};
pub use chunk_query_spec::{ChunkQuerySpec, ChunkQuerySpecIter};
pub use error::{Error, Result};
pub use parser::parse_select;
pub use plugins::JoinOverlapStrategy;
pub use session::{QuerySession, DUMMY_CHUNK_ID};
pub use template::QueryTemplate;
