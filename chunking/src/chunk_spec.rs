use crate::error::{MismatchedChunkIdSnafu, NoSubChunksSnafu, Result};
use snafu::ensure;
use std::cmp::Ordering;

/// A "good" number of sub-chunks to include in a single chunk query. This is
/// a guess; the best value is an open question.
const GOOD_SUBCHUNK_COUNT: usize = 20;

pub const CHUNKID_INVALID: i32 = -1;

/// A chunk id together with the (possibly empty) set of its sub-chunks that
/// a query needs to visit.
///
/// An empty `sub_chunks` means the whole chunk is in scope and sub-chunk
/// resolution was not necessary or not performed. `ChunkSpec` supports the
/// same set algebra as the sub-chunk sets it's built from: [`ChunkSpec::intersect`],
/// [`ChunkSpec::merge_union`], and [`ChunkSpec::normalize`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ChunkSpec {
    pub chunk_id: i32,
    pub sub_chunks: Vec<i32>,
}

impl ChunkSpec {
    pub fn new(chunk_id: i32) -> ChunkSpec {
        ChunkSpec {
            chunk_id,
            sub_chunks: Vec::new(),
        }
    }

    pub fn add_sub_chunk(&mut self, sub_chunk_id: i32) {
        self.sub_chunks.push(sub_chunk_id);
    }

    /// True if this spec has enough sub-chunks that it should be fragmented
    /// into several smaller queries (see [`ChunkSpecFragmenter`]).
    pub fn should_split(&self) -> bool {
        self.sub_chunks.len() > GOOD_SUBCHUNK_COUNT
    }

    /// Returns the intersection of this spec and `rhs`, which must share a
    /// chunk id. Both operands are normalized first, so duplicate sub-chunk
    /// ids and ordering in the inputs don't matter.
    pub fn intersect(&self, rhs: &ChunkSpec) -> Result<ChunkSpec> {
        let mut out = self.clone();
        out.normalize();
        let mut rhs = rhs.clone();
        rhs.normalize();
        out.restrict(&rhs)?;
        Ok(out)
    }

    /// In-place set intersection of `sub_chunks` with `rhs.sub_chunks`.
    /// `self` and `rhs` must both be normalized (sorted, deduplicated) for
    /// this to behave as a set intersection.
    pub fn restrict(&mut self, rhs: &ChunkSpec) -> Result<()> {
        ensure!(
            self.chunk_id == rhs.chunk_id,
            MismatchedChunkIdSnafu {
                lhs: self.chunk_id,
                rhs: rhs.chunk_id,
            }
        );
        let mut out = Vec::with_capacity(rhs.sub_chunks.len());
        let (mut i, mut j) = (0, 0);
        while i < self.sub_chunks.len() && j < rhs.sub_chunks.len() {
            match self.sub_chunks[i].cmp(&rhs.sub_chunks[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    out.push(self.sub_chunks[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        self.sub_chunks = out;
        Ok(())
    }

    /// In-place set union with `rhs`.
    pub fn merge_union(&mut self, rhs: &ChunkSpec) -> Result<()> {
        ensure!(
            self.chunk_id == rhs.chunk_id,
            MismatchedChunkIdSnafu {
                lhs: self.chunk_id,
                rhs: rhs.chunk_id,
            }
        );
        let mut out = Vec::with_capacity(self.sub_chunks.len() + rhs.sub_chunks.len());
        out.extend_from_slice(&self.sub_chunks);
        out.extend_from_slice(&rhs.sub_chunks);
        out.sort_unstable();
        out.dedup();
        self.sub_chunks = out;
        Ok(())
    }

    /// Sorts and deduplicates `sub_chunks`.
    pub fn normalize(&mut self) {
        self.sub_chunks.sort_unstable();
        self.sub_chunks.dedup();
    }

    /// Builds a fake spec for testing: chunk id `chunk_id`, and if
    /// `with_sub_chunks` three sub-chunks derived from it.
    pub fn make_fake(chunk_id: i32, with_sub_chunks: bool) -> ChunkSpec {
        assert!(chunk_id < 1_000_000);
        let mut cs = ChunkSpec::new(chunk_id);
        if with_sub_chunks {
            let base = 1000 * chunk_id;
            cs.sub_chunks = vec![base, base + 10, base + 20];
        }
        cs
    }
}

impl Ord for ChunkSpec {
    fn cmp(&self, rhs: &ChunkSpec) -> Ordering {
        self.chunk_id
            .cmp(&rhs.chunk_id)
            .then_with(|| self.sub_chunks.cmp(&rhs.sub_chunks))
    }
}

impl PartialOrd for ChunkSpec {
    fn partial_cmp(&self, rhs: &ChunkSpec) -> Option<Ordering> {
        Some(self.cmp(rhs))
    }
}

pub type ChunkSpecVector = Vec<ChunkSpec>;

/// Computes the intersection of `dest` with `a`, overwriting `dest`.
///
/// Both vectors must already be normalized: sorted by chunk id, with at
/// most one entry per chunk id.
pub fn intersect_sorted(dest: &mut ChunkSpecVector, a: &ChunkSpecVector) -> Result<()> {
    let mut tmp = Vec::new();
    let mut ai = 0;
    for d in dest.iter() {
        while ai < a.len() && a[ai].chunk_id < d.chunk_id {
            ai += 1;
        }
        if ai >= a.len() {
            break;
        }
        if a[ai].chunk_id == d.chunk_id {
            let mut cs = d.clone();
            cs.restrict(&a[ai])?;
            if d.chunk_id != CHUNKID_INVALID {
                tmp.push(cs);
            }
        }
    }
    *dest = tmp;
    Ok(())
}

/// Returns the intersection of `a` and `b` as a freshly normalized vector.
pub fn intersect(a: &ChunkSpecVector, b: &ChunkSpecVector) -> Result<ChunkSpecVector> {
    let mut a_sorted = a.clone();
    let mut b_sorted = b.clone();
    normalize(&mut a_sorted)?;
    normalize(&mut b_sorted)?;
    intersect_sorted(&mut a_sorted, &b_sorted)?;
    Ok(a_sorted)
}

/// Sorts `specs` by chunk id and merges entries that share a chunk id,
/// unioning their sub-chunk sets.
pub fn normalize(specs: &mut ChunkSpecVector) -> Result<()> {
    specs.sort();
    let mut output = Vec::with_capacity(specs.len());
    let mut i = 0;
    while i < specs.len() {
        specs[i].normalize();
        let mut j = i + 1;
        while j < specs.len() && specs[i].chunk_id == specs[j].chunk_id {
            specs[j].normalize();
            let rhs = specs[j].clone();
            specs[i].merge_union(&rhs)?;
            j += 1;
        }
        output.push(specs[i].clone());
        i = j;
    }
    *specs = output;
    Ok(())
}

/// Splits [`ChunkSpec`]s with many sub-chunks into a sequence of smaller
/// specs, each with at most [`GOOD_SUBCHUNK_COUNT`] sub-chunks, so that a
/// single dispatched query doesn't grow unboundedly large.
pub struct ChunkSpecFragmenter {
    original: ChunkSpec,
    pos: usize,
}

impl ChunkSpecFragmenter {
    pub fn new(spec: ChunkSpec) -> ChunkSpecFragmenter {
        ChunkSpecFragmenter {
            original: spec,
            pos: 0,
        }
    }

    pub fn get(&self) -> ChunkSpec {
        let end = (self.pos + GOOD_SUBCHUNK_COUNT).min(self.original.sub_chunks.len());
        ChunkSpec {
            chunk_id: self.original.chunk_id,
            sub_chunks: self.original.sub_chunks[self.pos..end].to_vec(),
        }
    }

    pub fn next(&mut self) {
        self.pos += GOOD_SUBCHUNK_COUNT;
    }

    pub fn is_done(&self) -> bool {
        self.pos >= self.original.sub_chunks.len()
    }
}

impl Iterator for ChunkSpecFragmenter {
    type Item = ChunkSpec;

    fn next(&mut self) -> Option<ChunkSpec> {
        if self.is_done() {
            return None;
        }
        let fragment = self.get();
        ChunkSpecFragmenter::next(self);
        Some(fragment)
    }
}

/// A single (chunk id, sub-chunk id) pair - the unit a worker actually
/// executes a query fragment against.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChunkSpecSingle {
    pub chunk_id: i32,
    pub sub_chunk_id: i32,
}

impl ChunkSpecSingle {
    /// Expands a [`ChunkSpec`] into one [`ChunkSpecSingle`] per sub-chunk.
    /// `spec.sub_chunks` must not be empty.
    pub fn vector_from(spec: &ChunkSpec) -> Result<Vec<ChunkSpecSingle>> {
        ensure!(
            !spec.sub_chunks.is_empty(),
            NoSubChunksSnafu {
                chunk_id: spec.chunk_id,
            }
        );
        Ok(spec
            .sub_chunks
            .iter()
            .map(|&sub_chunk_id| ChunkSpecSingle {
                chunk_id: spec.chunk_id,
                sub_chunk_id,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restrict_computes_set_intersection() {
        let mut a = ChunkSpec {
            chunk_id: 1,
            sub_chunks: vec![1, 2, 3, 4],
        };
        let b = ChunkSpec {
            chunk_id: 1,
            sub_chunks: vec![2, 4, 6],
        };
        a.restrict(&b).unwrap();
        assert_eq!(a.sub_chunks, vec![2, 4]);
    }

    #[test]
    fn restrict_rejects_mismatched_chunk_ids() {
        test_helpers::maybe_start_logging();
        let mut a = ChunkSpec::new(1);
        let b = ChunkSpec::new(2);
        let err = a.restrict(&b).unwrap_err();
        test_helpers::assert_error_contains(&err, "mismatched chunk ids");
    }

    #[test]
    fn merge_union_deduplicates() {
        let mut a = ChunkSpec {
            chunk_id: 1,
            sub_chunks: vec![1, 3],
        };
        let b = ChunkSpec {
            chunk_id: 1,
            sub_chunks: vec![2, 3, 4],
        };
        a.merge_union(&b).unwrap();
        assert_eq!(a.sub_chunks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn should_split_past_the_good_subchunk_count() {
        let small = ChunkSpec {
            chunk_id: 1,
            sub_chunks: (0..10).collect(),
        };
        let large = ChunkSpec {
            chunk_id: 1,
            sub_chunks: (0..25).collect(),
        };
        assert!(!small.should_split());
        assert!(large.should_split());
    }

    #[test]
    fn normalize_merges_duplicate_chunk_ids() {
        let mut specs = vec![
            ChunkSpec {
                chunk_id: 5,
                sub_chunks: vec![1, 2],
            },
            ChunkSpec {
                chunk_id: 3,
                sub_chunks: vec![9],
            },
            ChunkSpec {
                chunk_id: 5,
                sub_chunks: vec![2, 3],
            },
        ];
        normalize(&mut specs).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].chunk_id, 3);
        assert_eq!(specs[1].chunk_id, 5);
        assert_eq!(specs[1].sub_chunks, vec![1, 2, 3]);
    }

    #[test]
    fn intersect_vectors_keeps_only_shared_chunks_with_shared_subchunks() {
        let a = vec![
            ChunkSpec {
                chunk_id: 1,
                sub_chunks: vec![1, 2, 3],
            },
            ChunkSpec {
                chunk_id: 2,
                sub_chunks: vec![1],
            },
        ];
        let b = vec![ChunkSpec {
            chunk_id: 1,
            sub_chunks: vec![2, 3, 4],
        }];
        let result = intersect(&a, &b).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].chunk_id, 1);
        assert_eq!(result[0].sub_chunks, vec![2, 3]);
    }

    #[test]
    fn fragmenter_splits_into_good_subchunk_count_pieces() {
        let spec = ChunkSpec {
            chunk_id: 7,
            sub_chunks: (0..45).collect(),
        };
        let fragments: Vec<ChunkSpec> = ChunkSpecFragmenter::new(spec).collect();
        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[0].sub_chunks.len(), 20);
        assert_eq!(fragments[1].sub_chunks.len(), 20);
        assert_eq!(fragments[2].sub_chunks.len(), 5);
        for f in &fragments {
            assert_eq!(f.chunk_id, 7);
        }
    }

    #[test]
    fn chunk_spec_single_expands_one_per_subchunk() {
        let spec = ChunkSpec::make_fake(4, true);
        let singles = ChunkSpecSingle::vector_from(&spec).unwrap();
        assert_eq!(singles.len(), 3);
        assert!(singles.iter().all(|s| s.chunk_id == 4));
    }

    #[test]
    fn chunk_spec_single_rejects_empty_subchunks() {
        let spec = ChunkSpec::new(4);
        let err = ChunkSpecSingle::vector_from(&spec).unwrap_err();
        test_helpers::assert_error_contains(&err, "without sub-chunks");
    }
}
