//! `IndexMap`: combines spatial and secondary-index restrictors into the
//! chunk coverage a query needs to visit (§4.4). Grounded on
//! `qproc/IndexMap.h`/`.cc`.

use std::sync::Arc;

use chunking::{intersect, normalize, ChunkSpec, ChunkSpecVector, StripingParams};

use crate::area_restrictor::AreaRestrictor;
use crate::error::Result;
use crate::sec_idx_restrictor::SecIdxRestrictor;
use crate::secondary_index::SecondaryIndexLookup;

/// Computes chunk coverage for a query's area and secondary-index
/// restrictors against one database's partitioning scheme.
///
/// Per §4.4: restrictors of the same kind are combined with OR (union);
/// the cumulative spatial coverage and the cumulative secondary-index
/// coverage are then combined with AND (intersection). When one side is
/// absent it defaults to "all chunks" - matching the original's only
/// supported composition ("Index and spatial lookup composition is only
/// supported using SQL AND operator for now").
pub struct IndexMap {
    striping: StripingParams,
    secondary_index: Arc<dyn SecondaryIndexLookup>,
}

impl IndexMap {
    pub fn new(striping: StripingParams, secondary_index: Arc<dyn SecondaryIndexLookup>) -> IndexMap {
        IndexMap {
            striping,
            secondary_index,
        }
    }

    /// The full partitioning enumeration: every chunk, no sub-chunks.
    pub fn get_all_chunks(&self) -> Result<ChunkSpecVector> {
        let chunker = self.striping.build_chunker()?;
        Ok(chunker.all_chunks().into_iter().map(ChunkSpec::new).collect())
    }

    fn get_area_chunks(&self, area_restrictors: &[AreaRestrictor]) -> Result<ChunkSpecVector> {
        if area_restrictors.is_empty() {
            return self.get_all_chunks();
        }
        let chunker = self.striping.build_chunker()?;
        let mut union: ChunkSpecVector = Vec::new();
        for restrictor in area_restrictors {
            let region = restrictor.to_region()?;
            union.extend(chunker.chunks_intersecting(&region).into_iter().map(ChunkSpec::new));
        }
        normalize(&mut union)?;
        Ok(union)
    }

    fn get_sec_idx_chunks(&self, sec_idx_restrictors: &[SecIdxRestrictor]) -> Result<ChunkSpecVector> {
        if sec_idx_restrictors.is_empty() {
            return self.get_all_chunks();
        }
        self.secondary_index.lookup(sec_idx_restrictors)
    }

    /// Computes chunk coverage for the given restrictors, extracted during
    /// query analysis (§4.5 plugins (b), (c)).
    pub fn get_chunks(
        &self,
        area_restrictors: &[AreaRestrictor],
        sec_idx_restrictors: &[SecIdxRestrictor],
    ) -> Result<ChunkSpecVector> {
        if area_restrictors.is_empty() && sec_idx_restrictors.is_empty() {
            return self.get_all_chunks();
        }
        let area = self.get_area_chunks(area_restrictors)?;
        let sec_idx = self.get_sec_idx_chunks(sec_idx_restrictors)?;
        Ok(intersect(&area, &sec_idx)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secondary_index::FakeSecondaryIndex;
    use sphgeom::{Angle, LonLat, UnitVector3d};

    fn striping() -> StripingParams {
        StripingParams::new(85, 12).unwrap()
    }

    #[test]
    fn no_restrictors_means_all_chunks() {
        let im = IndexMap::new(striping(), Arc::new(FakeSecondaryIndex::new()));
        let all = im.get_all_chunks().unwrap();
        let got = im.get_chunks(&[], &[]).unwrap();
        assert_eq!(all.len(), got.len());
    }

    #[test]
    fn area_restrictor_narrows_to_a_small_subset() {
        let im = IndexMap::new(striping(), Arc::new(FakeSecondaryIndex::new()));
        let all = im.get_all_chunks().unwrap();
        let ar = AreaRestrictor::new_box(vec!["1".into(), "1".into(), "2".into(), "2".into()])
            .unwrap();
        let got = im.get_chunks(&[ar], &[]).unwrap();
        assert!(!got.is_empty());
        assert!(got.len() < all.len());
    }

    #[test]
    fn area_and_sec_idx_restrictors_are_intersected() {
        let center = UnitVector3d::from_lon_lat(LonLat::from_degrees(10.0, 10.0));
        let _ = Angle::from_degrees(1.0);
        let chunker = striping().build_chunker().unwrap();
        let region = sphgeom::Region::from(sphgeom::Circle::from_center_and_angle(
            center,
            Angle::from_degrees(5.0),
        ));
        let hit_chunks = chunker.chunks_intersecting(&region);
        let in_area_chunk = hit_chunks[0];

        let fake = FakeSecondaryIndex::new().with_row(in_area_chunk, 1);
        let im = IndexMap::new(striping(), Arc::new(fake));
        let ar = AreaRestrictor::new_circle(vec!["10".into(), "10".into(), "5".into()]).unwrap();
        let sir = crate::sec_idx_restrictor::SecIdxRestrictor::new(
            crate::sec_idx_restrictor::SecIdxColumnRef {
                db: "LSST".into(),
                table: "Object".into(),
                column: "objectId".into(),
            },
            crate::sec_idx_restrictor::SecIdxPredicate::In(vec!["1".into()]),
        );
        let got = im.get_chunks(&[ar], &[sir]).unwrap();
        assert!(got.iter().any(|cs| cs.chunk_id == in_area_chunk));
    }
}
