use crate::bbox::Box;
use crate::circle::Circle;
use crate::error::{Result, TooFewVerticesSnafu};
use crate::lonlat::LonLat;
use crate::normalized_angle_interval::NormalizedAngleInterval;
use crate::orientation::orientation;
use crate::relation::Relation;
use crate::unit_vector3d::UnitVector3d;
use crate::vector3d::Vector3d;
use snafu::ensure;

/// A closed convex polygon on the unit sphere with great-circle edges.
///
/// Vertices are stored in counter-clockwise order (as seen from outside the
/// sphere). Containment is tested the usual way for a convex polygon: a
/// point is inside iff it is on the "inward" side of every edge's great
/// circle, i.e. `orientation(v_i, v_{i+1}, p) >= 0` for every edge.
///
/// Constructing the convex hull of an arbitrary point set is not
/// implemented; callers build a `ConvexPolygon` directly from an
/// already-convex, counter-clockwise vertex list (e.g. one parsed from a
/// `scisql_s2CPolyIn`-style literal in a query predicate).
#[derive(Clone, Debug, PartialEq)]
pub struct ConvexPolygon {
    vertices: Vec<UnitVector3d>,
}

impl ConvexPolygon {
    pub fn new(vertices: Vec<UnitVector3d>) -> Result<ConvexPolygon> {
        ensure!(
            vertices.len() >= 3,
            TooFewVerticesSnafu { count: vertices.len() }
        );
        Ok(ConvexPolygon { vertices })
    }

    pub fn vertices(&self) -> &[UnitVector3d] {
        &self.vertices
    }

    pub fn contains_vector(&self, p: UnitVector3d) -> bool {
        let n = self.vertices.len();
        (0..n).all(|i| {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            orientation(a, b, p) >= 0
        })
    }

    pub fn centroid(&self) -> UnitVector3d {
        let sum = self
            .vertices
            .iter()
            .fold(Vector3d::zero(), |acc, v| acc + v.vector());
        UnitVector3d::new(sum)
    }

    pub fn bounding_circle(&self) -> Circle {
        let center = self.centroid();
        let max_cl2 = self
            .vertices
            .iter()
            .map(|v| (v.vector() - center.vector()).squared_norm())
            .fold(0.0_f64, f64::max);
        Circle::new(center, max_cl2)
    }

    pub fn bounding_box(&self) -> Box {
        let mut lon_lo = f64::INFINITY;
        let mut lon_hi = f64::NEG_INFINITY;
        let mut lat_lo = f64::INFINITY;
        let mut lat_hi = f64::NEG_INFINITY;
        for v in &self.vertices {
            let p = LonLat::from_vector(v.vector());
            lon_lo = lon_lo.min(p.lon().as_radians());
            lon_hi = lon_hi.max(p.lon().as_radians());
            lat_lo = lat_lo.min(p.lat().as_radians());
            lat_hi = lat_hi.max(p.lat().as_radians());
        }
        // Vertex longitudes are normalized into [0, 2*PI); a polygon that
        // straddles the 0/2*PI meridian needs the min/max taken the other
        // way round. We approximate by also trying the complementary
        // interval and keeping whichever is narrower, which is exact for
        // polygons that do not span more than half the sphere in longitude.
        let direct = NormalizedAngleInterval::from_angles(
            crate::angle::Angle::from_radians(lon_lo),
            crate::angle::Angle::from_radians(lon_hi),
        );
        let wrapped = NormalizedAngleInterval::from_angles(
            crate::angle::Angle::from_radians(lon_hi),
            crate::angle::Angle::from_radians(lon_lo),
        );
        let lon = if direct.size().as_radians() <= wrapped.size().as_radians() {
            direct
        } else {
            wrapped
        };
        Box::new(
            lon,
            crate::interval::AngleInterval::new(
                crate::angle::Angle::from_radians(lat_lo),
                crate::angle::Angle::from_radians(lat_hi),
            ),
        )
    }

    /// Conservative relation to a box, computed via this polygon's bounding
    /// circle. See [`crate::Ellipse::relate_box`] for the same tradeoff:
    /// `DISJOINT`/`INTERSECTS` are exact, `WITHIN` is exact, `CONTAINS` is
    /// never reported.
    pub fn relate_box(&self, b: Box) -> Relation {
        let bc = self.bounding_circle().relate_box(b);
        let mut f = Relation::NONE;
        if bc.contains(Relation::DISJOINT) {
            f |= Relation::DISJOINT;
        } else {
            f |= Relation::INTERSECTS;
        }
        if b.contains(self.bounding_box()) {
            f |= Relation::WITHIN;
        }
        f
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_around_equator() -> ConvexPolygon {
        ConvexPolygon::new(vec![
            UnitVector3d::from_lon_lat(LonLat::from_degrees(-10.0, -10.0)),
            UnitVector3d::from_lon_lat(LonLat::from_degrees(10.0, -10.0)),
            UnitVector3d::from_lon_lat(LonLat::from_degrees(10.0, 10.0)),
            UnitVector3d::from_lon_lat(LonLat::from_degrees(-10.0, 10.0)),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_degenerate_polygons() {
        test_helpers::maybe_start_logging();
        let err = ConvexPolygon::new(vec![UnitVector3d::x_axis(), UnitVector3d::y_axis()]).unwrap_err();
        test_helpers::assert_error_contains(&err, "at least 3 vertices");
    }

    #[test]
    fn contains_center() {
        let p = square_around_equator();
        assert!(p.contains_vector(UnitVector3d::from_lon_lat(LonLat::from_degrees(0.0, 0.0))));
    }

    #[test]
    fn does_not_contain_far_point() {
        let p = square_around_equator();
        assert!(!p.contains_vector(UnitVector3d::from_lon_lat(LonLat::from_degrees(90.0, 0.0))));
    }

    #[test]
    fn bounding_circle_contains_all_vertices() {
        let p = square_around_equator();
        let bc = p.bounding_circle();
        for &v in p.vertices() {
            assert!(bc.contains_vector(v));
        }
    }
}
