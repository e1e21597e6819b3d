use crate::error::{NonPositiveStripesSnafu, Result, SubStripesTooSmallSnafu};
use snafu::ensure;
use sphgeom::{Angle, AngleInterval, Box, Region};

const PI: f64 = std::f64::consts::PI;

/// ~1 micro-arcsecond. Chunk and sub-chunk bounding boxes are dilated by this
/// much before being tested against a query region, so that a region
/// touching a boundary isn't missed due to floating point round-off.
const EPSILON: Angle = Angle::from_radians(5.0e-12);

/// The set of sub-chunk ids belonging to one chunk that intersect some
/// region.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubChunks {
    pub chunk_id: i32,
    pub sub_chunk_ids: Vec<i32>,
}

#[derive(Clone, Copy, Debug)]
struct Stripe {
    chunk_width: Angle,
    num_chunks_per_stripe: i32,
}

#[derive(Clone, Copy, Debug)]
struct SubStripe {
    sub_chunk_width: Angle,
    num_sub_chunks_per_chunk: i32,
}

/// Partitions the unit sphere into longitude/latitude boxes.
///
/// The sphere is divided into latitude "stripes" of fixed height. Each
/// stripe is further divided into chunks of a width chosen so that two
/// points in the stripe separated by at least that width are also
/// separated by at least the stripe height in angular distance - this
/// keeps chunks roughly square regardless of latitude. The same procedure
/// is applied a second time within each stripe, using a configurable
/// number of equal-height "sub-stripes", to produce sub-chunks.
#[derive(Clone, Debug)]
pub struct Chunker {
    num_stripes: i32,
    num_sub_stripes_per_stripe: i32,
    num_sub_stripes: i32,
    max_sub_chunks_per_sub_stripe_chunk: i32,
    sub_stripe_height: Angle,
    stripes: Vec<Stripe>,
    sub_stripes: Vec<SubStripe>,
}

/// Computes the number of equal-width segments a stripe of the given height
/// should be divided into, such that any two points in the stripe separated
/// by at least one segment width are at least `width` apart in angular
/// distance. `latitudes` gives the stripe's latitude bounds.
fn compute_num_segments(latitudes: AngleInterval, width: Angle) -> i32 {
    if width.as_radians() > PI {
        return 1;
    }
    let max_abs_lat = latitudes.a().abs().max(latitudes.b().abs());
    if max_abs_lat.as_radians() > 0.5 * PI - 4.85e-6 {
        return 1;
    }
    let cos_width = sphgeom::cos(width);
    let sin_lat = sphgeom::sin(max_abs_lat);
    let cos_lat = sphgeom::cos(max_abs_lat);
    let x = cos_width - sin_lat * sin_lat;
    let u = cos_lat * cos_lat;
    let y = (u * u - x * x).abs().sqrt();
    (2.0 * PI / y.atan2(x).abs()).floor() as i32
}

impl Chunker {
    pub fn new(num_stripes: i32, num_sub_stripes_per_stripe: i32) -> Result<Chunker> {
        ensure!(
            num_stripes >= 1 && num_sub_stripes_per_stripe >= 1,
            NonPositiveStripesSnafu {
                num_stripes,
                num_sub_stripes_per_stripe,
            }
        );
        ensure!(
            (num_stripes as i64) * (num_sub_stripes_per_stripe as i64) <= 180 * 3600,
            SubStripesTooSmallSnafu {
                num_stripes,
                num_sub_stripes_per_stripe,
            }
        );
        let num_sub_stripes = num_stripes * num_sub_stripes_per_stripe;
        let sub_stripe_height = Angle::from_radians(PI) / num_sub_stripes as f64;
        let stripe_height = Angle::from_radians(PI) / num_stripes as f64;
        let half_pi = Angle::from_radians(0.5 * PI);

        let mut stripes = Vec::with_capacity(num_stripes as usize);
        let mut sub_stripes = Vec::with_capacity(num_sub_stripes as usize);
        let mut max_sub_chunks_per_sub_stripe_chunk = 0;

        for s in 0..num_stripes {
            let s_lat = AngleInterval::new(
                stripe_height * s as f64 - half_pi,
                stripe_height * (s + 1) as f64 - half_pi,
            );
            let nc = compute_num_segments(s_lat, stripe_height);
            let chunk_width = Angle::from_radians(2.0 * PI) / nc as f64;

            let ss_start = s * num_sub_stripes_per_stripe;
            let ss_end = ss_start + num_sub_stripes_per_stripe;
            for ss in ss_start..ss_end {
                let ss_lat = AngleInterval::new(
                    sub_stripe_height * ss as f64 - half_pi,
                    sub_stripe_height * (ss + 1) as f64 - half_pi,
                );
                let nsc = compute_num_segments(ss_lat, sub_stripe_height) / nc;
                if nsc > max_sub_chunks_per_sub_stripe_chunk {
                    max_sub_chunks_per_sub_stripe_chunk = nsc;
                }
                let sub_chunk_width = Angle::from_radians(2.0 * PI) / (nsc * nc) as f64;
                sub_stripes.push(SubStripe {
                    sub_chunk_width,
                    num_sub_chunks_per_chunk: nsc,
                });
            }
            stripes.push(Stripe {
                chunk_width,
                num_chunks_per_stripe: nc,
            });
        }

        Ok(Chunker {
            num_stripes,
            num_sub_stripes_per_stripe,
            num_sub_stripes,
            max_sub_chunks_per_sub_stripe_chunk,
            sub_stripe_height,
            stripes,
            sub_stripes,
        })
    }

    pub fn num_stripes(&self) -> i32 {
        self.num_stripes
    }

    pub fn num_sub_stripes_per_stripe(&self) -> i32 {
        self.num_sub_stripes_per_stripe
    }

    fn get_stripe(&self, chunk_id: i32) -> i32 {
        chunk_id / (2 * self.num_stripes)
    }

    fn get_chunk_id(&self, stripe: i32, chunk: i32) -> i32 {
        stripe * 2 * self.num_stripes + chunk
    }

    fn get_sub_chunk_id(&self, stripe: i32, sub_stripe: i32, chunk: i32, sub_chunk: i32) -> i32 {
        let y = sub_stripe - stripe * self.num_sub_stripes_per_stripe;
        let x = sub_chunk - chunk * self.sub_stripes[sub_stripe as usize].num_sub_chunks_per_chunk;
        y * self.max_sub_chunks_per_sub_stripe_chunk + x
    }

    fn get_chunk_bounding_box(&self, stripe: i32, chunk: i32) -> Box {
        let chunk_width = self.stripes[stripe as usize].chunk_width;
        let lon = sphgeom::NormalizedAngleInterval::from_angles(
            chunk_width * chunk as f64,
            chunk_width * (chunk + 1) as f64,
        );
        let ss = stripe * self.num_sub_stripes_per_stripe;
        let ss_end = ss + self.num_sub_stripes_per_stripe;
        let half_pi = Angle::from_radians(0.5 * PI);
        let lat = AngleInterval::new(
            self.sub_stripe_height * ss as f64 - half_pi,
            self.sub_stripe_height * ss_end as f64 - half_pi,
        );
        Box::new(lon, lat).dilated_by(EPSILON)
    }

    fn get_sub_chunk_bounding_box(&self, sub_stripe: i32, sub_chunk: i32) -> Box {
        let sub_chunk_width = self.sub_stripes[sub_stripe as usize].sub_chunk_width;
        let lon = sphgeom::NormalizedAngleInterval::from_angles(
            sub_chunk_width * sub_chunk as f64,
            sub_chunk_width * (sub_chunk + 1) as f64,
        );
        let half_pi = Angle::from_radians(0.5 * PI);
        let lat = AngleInterval::new(
            self.sub_stripe_height * sub_stripe as f64 - half_pi,
            self.sub_stripe_height * (sub_stripe + 1) as f64 - half_pi,
        );
        Box::new(lon, lat).dilated_by(EPSILON)
    }

    /// Bounds on the range of sub-stripes and stripes that can possibly
    /// intersect `b`'s latitude range.
    fn stripe_range(&self, b: Box) -> (i32, i32, i32, i32) {
        let half_pi = Angle::from_radians(0.5 * PI);
        let ya = ((b.lat().a() + half_pi) / self.sub_stripe_height).floor();
        let yb = ((b.lat().b() + half_pi) / self.sub_stripe_height).floor();
        let min_ss = (ya as i32).min(self.num_sub_stripes - 1);
        let max_ss = (yb as i32).min(self.num_sub_stripes - 1);
        let min_s = min_ss / self.num_sub_stripes_per_stripe;
        let max_s = max_ss / self.num_sub_stripes_per_stripe;
        (min_ss, max_ss, min_s, max_s)
    }

    /// Returns the ids of the chunks that potentially intersect `r`.
    pub fn chunks_intersecting(&self, r: &Region) -> Vec<i32> {
        let mut chunk_ids = Vec::new();
        let b = r.bounding_box().dilated_by(EPSILON);
        let (_min_ss, _max_ss, min_s, max_s) = self.stripe_range(b);

        for s in min_s..=max_s {
            let chunk_width = self.stripes[s as usize].chunk_width;
            let nc = self.stripes[s as usize].num_chunks_per_stripe;
            let xa = (b.lon().a().as_radians() / chunk_width.as_radians()).floor();
            let xb = (b.lon().b().as_radians() / chunk_width.as_radians()).floor();
            let mut ca = (xa as i32).min(nc - 1);
            let mut cb = (xb as i32).min(nc - 1);
            if ca == cb && b.lon().wraps() {
                ca = 0;
                cb = nc - 1;
            }
            if ca <= cb {
                for c in ca..=cb {
                    if r.relate_box(self.get_chunk_bounding_box(s, c))
                        .contains(sphgeom::Relation::INTERSECTS)
                    {
                        chunk_ids.push(self.get_chunk_id(s, c));
                    }
                }
            } else {
                for c in 0..=cb {
                    if r.relate_box(self.get_chunk_bounding_box(s, c))
                        .contains(sphgeom::Relation::INTERSECTS)
                    {
                        chunk_ids.push(self.get_chunk_id(s, c));
                    }
                }
                for c in ca..nc {
                    if r.relate_box(self.get_chunk_bounding_box(s, c))
                        .contains(sphgeom::Relation::INTERSECTS)
                    {
                        chunk_ids.push(self.get_chunk_id(s, c));
                    }
                }
            }
        }
        chunk_ids
    }

    /// Returns the sub-chunks, grouped by chunk, that potentially intersect
    /// `r`.
    pub fn sub_chunks_intersecting(&self, r: &Region) -> Vec<SubChunks> {
        let mut chunks = Vec::new();
        let b = r.bounding_box().dilated_by(EPSILON);
        let (min_ss, max_ss, min_s, max_s) = self.stripe_range(b);

        for s in min_s..=max_s {
            let chunk_width = self.stripes[s as usize].chunk_width;
            let nc = self.stripes[s as usize].num_chunks_per_stripe;
            let xa = (b.lon().a().as_radians() / chunk_width.as_radians()).floor();
            let xb = (b.lon().b().as_radians() / chunk_width.as_radians()).floor();
            let mut ca = (xa as i32).min(nc - 1);
            let mut cb = (xb as i32).min(nc - 1);
            if ca == cb && b.lon().wraps() {
                ca = 0;
                cb = nc - 1;
            }
            if ca <= cb {
                for c in ca..=cb {
                    self.get_sub_chunks(&mut chunks, r, b.lon(), s, c, min_ss, max_ss);
                }
            } else {
                for c in 0..=cb {
                    self.get_sub_chunks(&mut chunks, r, b.lon(), s, c, min_ss, max_ss);
                }
                for c in ca..nc {
                    self.get_sub_chunks(&mut chunks, r, b.lon(), s, c, min_ss, max_ss);
                }
            }
        }
        chunks
    }

    fn get_sub_chunks(
        &self,
        chunks: &mut Vec<SubChunks>,
        r: &Region,
        lon: sphgeom::NormalizedAngleInterval,
        stripe: i32,
        chunk: i32,
        min_ss: i32,
        max_ss: i32,
    ) {
        let chunk_id = self.get_chunk_id(stripe, chunk);
        let mut sub_chunk_ids = Vec::new();

        if r.relate_box(self.get_chunk_bounding_box(stripe, chunk))
            .contains(sphgeom::Relation::CONTAINS)
        {
            // r contains the entire chunk - no need to test sub-chunks.
            sub_chunk_ids = self.all_sub_chunks(chunk_id);
        } else {
            let min_ss = min_ss.max(stripe * self.num_sub_stripes_per_stripe);
            let max_ss = max_ss.min((stripe + 1) * self.num_sub_stripes_per_stripe - 1);
            let nc = self.stripes[stripe as usize].num_chunks_per_stripe;

            for ss in min_ss..=max_ss {
                let sub_chunk_width = self.sub_stripes[ss as usize].sub_chunk_width;
                let nsc = self.sub_stripes[ss as usize].num_sub_chunks_per_chunk;
                let xa = (lon.a().as_radians() / sub_chunk_width.as_radians()).floor();
                let xb = (lon.b().as_radians() / sub_chunk_width.as_radians()).floor();
                let mut sca = (xa as i32).min(nc * nsc - 1);
                let mut scb = (xb as i32).min(nc * nsc - 1);
                if sca == scb && lon.wraps() {
                    sca = 0;
                    scb = nc * nsc - 1;
                }
                let min_sc_default = chunk * nsc;
                let max_sc_default = (chunk + 1) * nsc - 1;

                if sca <= scb {
                    let min_sc = sca.max(min_sc_default);
                    let max_sc = scb.min(max_sc_default);
                    for sc in min_sc..=max_sc {
                        if r.relate_box(self.get_sub_chunk_bounding_box(ss, sc))
                            .contains(sphgeom::Relation::INTERSECTS)
                        {
                            sub_chunk_ids.push(self.get_sub_chunk_id(stripe, ss, chunk, sc));
                        }
                    }
                } else {
                    let sca = sca.max(min_sc_default);
                    let scb = scb.min(max_sc_default);
                    for sc in sca..=max_sc_default {
                        if r.relate_box(self.get_sub_chunk_bounding_box(ss, sc))
                            .contains(sphgeom::Relation::INTERSECTS)
                        {
                            sub_chunk_ids.push(self.get_sub_chunk_id(stripe, ss, chunk, sc));
                        }
                    }
                    for sc in min_sc_default..=scb {
                        if r.relate_box(self.get_sub_chunk_bounding_box(ss, sc))
                            .contains(sphgeom::Relation::INTERSECTS)
                        {
                            sub_chunk_ids.push(self.get_sub_chunk_id(stripe, ss, chunk, sc));
                        }
                    }
                }
            }
        }

        if !sub_chunk_ids.is_empty() {
            chunks.push(SubChunks {
                chunk_id,
                sub_chunk_ids,
            });
        }
    }

    /// Returns the complete set of chunk ids for the unit sphere.
    pub fn all_chunks(&self) -> Vec<i32> {
        let mut chunk_ids = Vec::new();
        for s in 0..self.num_stripes {
            let nc = self.stripes[s as usize].num_chunks_per_stripe;
            for c in 0..nc {
                chunk_ids.push(self.get_chunk_id(s, c));
            }
        }
        chunk_ids
    }

    /// Returns the complete set of sub-chunk ids for the given chunk.
    ///
    /// Sub-chunk ids are encoded consistently with [`Chunker::get_sub_chunk_id`]
    /// (stripe-relative sub-stripe offset times the per-stripe maximum
    /// sub-chunk count, plus a chunk-relative sub-chunk offset) everywhere,
    /// including here.
    pub fn all_sub_chunks(&self, chunk_id: i32) -> Vec<i32> {
        let stripe = self.get_stripe(chunk_id);
        let chunk = chunk_id - stripe * 2 * self.num_stripes;
        let ss_start = stripe * self.num_sub_stripes_per_stripe;
        let ss_end = ss_start + self.num_sub_stripes_per_stripe;
        let mut sub_chunk_ids = Vec::new();
        for ss in ss_start..ss_end {
            let nsc = self.sub_stripes[ss as usize].num_sub_chunks_per_chunk;
            for sc_in_chunk in 0..nsc {
                let sc = chunk * nsc + sc_in_chunk;
                sub_chunk_ids.push(self.get_sub_chunk_id(stripe, ss, chunk, sc));
            }
        }
        sub_chunk_ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sphgeom::{Circle, LonLat, UnitVector3d};

    fn small_circle(lon_deg: f64, lat_deg: f64, radius_deg: f64) -> Region {
        Region::from(Circle::from_center_and_angle(
            UnitVector3d::from_lon_lat(LonLat::from_degrees(lon_deg, lat_deg)),
            Angle::from_degrees(radius_deg),
        ))
    }

    #[test]
    fn rejects_non_positive_stripe_counts() {
        test_helpers::maybe_start_logging();
        let err = Chunker::new(0, 1).unwrap_err();
        test_helpers::assert_error_contains(&err, "must be positive");
    }

    #[test]
    fn rejects_excessive_sub_stripes() {
        let err = Chunker::new(180 * 3600, 2).unwrap_err();
        test_helpers::assert_error_contains(&err, "too small");
    }

    #[test]
    fn all_chunks_covers_every_stripe() {
        let c = Chunker::new(85, 12).unwrap();
        let chunks = c.all_chunks();
        assert!(!chunks.is_empty());
        // Every chunk must resolve to a valid stripe.
        for &id in &chunks {
            assert!(c.get_stripe(id) < c.num_stripes());
        }
    }

    #[test]
    fn all_sub_chunks_are_unique_per_chunk() {
        let c = Chunker::new(85, 12).unwrap();
        let chunk_id = c.all_chunks()[0];
        let subs = c.all_sub_chunks(chunk_id);
        let mut sorted = subs.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), subs.len());
    }

    #[test]
    fn chunks_intersecting_a_small_circle_is_a_small_subset() {
        let c = Chunker::new(85, 12).unwrap();
        let all = c.all_chunks();
        let r = small_circle(0.0, 0.0, 1.0);
        let hit = c.chunks_intersecting(&r);
        assert!(!hit.is_empty());
        assert!(hit.len() < all.len());
    }

    #[test]
    fn sub_chunks_intersecting_a_point_like_circle_is_small() {
        let c = Chunker::new(85, 12).unwrap();
        let r = small_circle(10.0, 10.0, 0.01);
        let hit = c.sub_chunks_intersecting(&r);
        assert!(!hit.is_empty());
        for group in &hit {
            assert!(!group.sub_chunk_ids.is_empty());
        }
    }

    #[test]
    fn a_full_sky_region_contains_every_chunk() {
        let c = Chunker::new(20, 4).unwrap();
        let r = Region::from(sphgeom::Box::full());
        let all = c.all_chunks();
        let hit = c.chunks_intersecting(&r);
        let mut hit_sorted = hit.clone();
        hit_sorted.sort_unstable();
        let mut all_sorted = all.clone();
        all_sorted.sort_unstable();
        assert_eq!(hit_sorted, all_sorted);
    }
}
