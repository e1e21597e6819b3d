//! Streams per-chunk worker results into a local merge table and runs the
//! post-merge aggregate/sort/limit statement (§4.7). Grounded on
//! `rproc/InfileMerger.h` (forward-declared in `ccontrol/UserQuerySelect.h`,
//! driven from `UserQuerySelect::join`).

mod config;
mod connection;
mod error;
mod infile_merger;

pub use config::InfileMergerConfig;
pub use connection::{FakeMergeConnection, MergeConnection, Row};
pub use error::{Error, Result};
pub use infile_merger::{InfileMerger, MergerMetrics};
