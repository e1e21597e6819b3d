//! Partitioning of the sky into chunks and sub-chunks ([`Chunker`]), and the
//! small set-algebra over chunk/sub-chunk ids ([`ChunkSpec`] and friends)
//! used to describe and combine the partial results of resolving a query
//! predicate against the spatial and secondary indexes.

mod chunk_spec;
mod chunker;
mod error;
mod striping_params;

pub use chunk_spec::{
    intersect, intersect_sorted, normalize, ChunkSpec, ChunkSpecFragmenter, ChunkSpecSingle,
    ChunkSpecVector, CHUNKID_INVALID,
};
pub use chunker::{Chunker, SubChunks};
pub use error::{Error, Result};
pub use striping_params::StripingParams;
