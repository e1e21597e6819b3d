//! `ChunkQuerySpec`: the per-chunk unit of work a session iteration step
//! produces, ready to hand to the dispatcher. Grounded on
//! `qproc/ChunkQuerySpec.h`.

use chunking::{ChunkSpec, ChunkSpecFragmenter, ChunkSpecSingle};

use crate::template::QueryTemplate;

/// One dispatchable fragment: a chunk (and, for sub-chunk overlap queries,
/// the sub-chunk tables within it) plus the rendered parallel queries to run
/// against it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkQuerySpec {
    pub db: String,
    pub chunk_id: i32,
    pub sub_chunk_ids: Vec<i32>,
    pub parallel_queries: Vec<String>,
}

/// Lazily materializes the sequence of [`ChunkQuerySpec`] fragments for one
/// resolved `ChunkSpec`, splitting oversized sub-chunk lists via
/// [`ChunkSpecFragmenter`] so no single fragment asks a worker to run an
/// unbounded number of parallel queries. Exposed as an explicit
/// `next`/`is_done` iterator per the "iterator over fragments" design note,
/// rather than building the whole fragment list eagerly.
pub struct ChunkQuerySpecIter<'a> {
    db: String,
    templates: &'a [QueryTemplate],
    needs_sub_chunks: bool,
    emitted_whole_chunk: bool,
    fragmenter: ChunkSpecFragmenter,
}

impl<'a> ChunkQuerySpecIter<'a> {
    pub fn new(db: impl Into<String>, templates: &'a [QueryTemplate], spec: ChunkSpec) -> ChunkQuerySpecIter<'a> {
        let needs_sub_chunks = templates.iter().any(QueryTemplate::has_sub_chunk_token);
        ChunkQuerySpecIter {
            db: db.into(),
            templates,
            needs_sub_chunks,
            emitted_whole_chunk: false,
            fragmenter: ChunkSpecFragmenter::new(spec),
        }
    }

    pub fn is_done(&self) -> bool {
        if self.needs_sub_chunks {
            self.fragmenter.is_done()
        } else {
            self.emitted_whole_chunk
        }
    }
}

impl<'a> Iterator for ChunkQuerySpecIter<'a> {
    type Item = ChunkQuerySpec;

    fn next(&mut self) -> Option<ChunkQuerySpec> {
        if self.needs_sub_chunks {
            if self.fragmenter.is_done() {
                return None;
            }
            let fragment = self.fragmenter.get();
            self.fragmenter.next();
            let chunk_id = fragment.chunk_id;
            let singles = ChunkSpecSingle::vector_from(&fragment).ok()?;
            let parallel_queries = self
                .templates
                .iter()
                .flat_map(|t| {
                    singles
                        .iter()
                        .map(move |s| t.render(s.chunk_id, Some(s.sub_chunk_id)))
                })
                .collect();
            Some(ChunkQuerySpec {
                db: self.db.clone(),
                chunk_id,
                sub_chunk_ids: fragment.sub_chunks,
                parallel_queries,
            })
        } else {
            if self.emitted_whole_chunk {
                return None;
            }
            self.emitted_whole_chunk = true;
            let chunk_id = self.fragmenter.get().chunk_id;
            let parallel_queries = self.templates.iter().map(|t| t.render(chunk_id, None)).collect();
            Some(ChunkQuerySpec {
                db: self.db.clone(),
                chunk_id,
                sub_chunk_ids: Vec::new(),
                parallel_queries,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_chunk_spec_yields_one_fragment() {
        let templates = vec![QueryTemplate::new("SELECT * FROM LSST.Object_%CC% AS QST_1_")];
        let spec = ChunkSpec::new(100);
        let fragments: Vec<_> = ChunkQuerySpecIter::new("LSST", &templates, spec).collect();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].chunk_id, 100);
        assert_eq!(
            fragments[0].parallel_queries,
            vec!["SELECT * FROM LSST.Object_100 AS QST_1_".to_string()]
        );
    }

    #[test]
    fn sub_chunk_spec_splits_into_fragments_of_twenty() {
        let templates = vec![QueryTemplate::new("LSST.Object_%CC%_%SS%")];
        let spec = ChunkSpec {
            chunk_id: 5,
            sub_chunks: (0..25).collect(),
        };
        let fragments: Vec<_> = ChunkQuerySpecIter::new("LSST", &templates, spec).collect();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].parallel_queries.len(), 20);
        assert_eq!(fragments[1].parallel_queries.len(), 5);
    }
}
