//! Translates a query's spatial and secondary-index restrictors into the
//! set of chunks (and, where known, sub-chunks) that can satisfy it (§4.4).
//! Grounded on `qproc/IndexMap.h`/`.cc`, `qproc/geomAdapter.h` and
//! `qproc/SecondaryIndex.h`/`.cc`.

mod area_restrictor;
mod error;
mod index_map;
mod sec_idx_restrictor;
mod secondary_index;

pub use area_restrictor::AreaRestrictor;
pub use error::{Error, Result};
pub use index_map::IndexMap;
pub use sec_idx_restrictor::{SecIdxColumnRef, SecIdxPredicate, SecIdxRestrictor, SEC_INDEX_DB};
pub use secondary_index::{
    DirectorConnection, FakeSecondaryIndex, IndexRow, SecondaryIndexLookup, SqlSecondaryIndex,
};
