//! Sharded-query coordinator: rewrites a SELECT into per-shard fragments,
//! dispatches them to workers, and merges the results (§1-§4). Built on top
//! of `query_session` (analysis/rewrite), `index_map`/`chunking` (chunk
//! resolution), `qdisp` (dispatch and cancellation), and `merger` (result
//! ingestion), following the layering the original's `czar` module sits
//! above `qproc`/`qdisp`/`rproc`.

mod config;
mod czar;
mod error;
mod session_registry;
mod tmp_table_name;
mod user_query;
mod wire;

pub use config::CzarConfig;
pub use czar::{Czar, MergeConnectionFactory};
pub use error::{Error, Result};
pub use session_registry::SessionRegistry;
pub use tmp_table_name::TmpTableName;
pub use user_query::{QueryState, UserQuery, UserQueryManager, UserQueryResultDelete, UserQuerySelect};
pub use wire::{TaskMsg, TaskMsgFactory};
