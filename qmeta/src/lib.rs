//! Trait surface (plus in-memory fakes) for the coordinator's two external,
//! out-of-scope-to-implement collaborators: the metadata store (§6,
//! "Toward the metadata store") and the query-metadata store (§6, "Toward
//! the query-metadata store"). Neither store is persisted by this crate;
//! both traits exist so `query_session`, `index_map`, and `czar` can be
//! written and tested against a stable interface.

mod css;
mod error;
mod meta;

pub use css::{DirectorColumn, MemMetadataStore, MetadataStore, PartitioningKind};
pub use error::{Error, Result};
pub use meta::{MemQueryMetaStore, QInfo, QStatus, QType, QueryMetaStore};
