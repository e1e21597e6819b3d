use crate::angle::{Angle, PI};
use crate::bbox::Box;
use crate::lonlat::LonLat;
use crate::normalized_angle_interval::NormalizedAngleInterval;
use crate::relation::Relation;
use crate::unit_vector3d::UnitVector3d;

/// A circular region on the unit sphere, represented by its center and the
/// squared chord length between the center and points on its boundary.
///
/// The squared-chord-length representation (rather than center + cosine of
/// opening angle) keeps point-in-circle tests accurate for circles with very
/// small opening angles, which matter for sub-chunk sized query regions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    center: UnitVector3d,
    squared_chord_length: f64,
    opening_angle: Angle,
}

impl Circle {
    pub fn empty() -> Circle {
        Circle {
            center: UnitVector3d::z_axis(),
            squared_chord_length: -1.0,
            opening_angle: Angle::from_radians(-1.0),
        }
    }

    pub fn full() -> Circle {
        Circle {
            center: UnitVector3d::z_axis(),
            squared_chord_length: 4.0,
            opening_angle: Angle::from_radians(PI),
        }
    }

    /// The squared chord length `l^2` between two points on the unit sphere
    /// separated by `opening_angle`: `l^2 = 4 sin^2(theta / 2)`.
    pub fn squared_chord_length_for(opening_angle: Angle) -> f64 {
        let s = (opening_angle.as_radians() * 0.5).sin();
        4.0 * s * s
    }

    /// The inverse of [`Circle::squared_chord_length_for`].
    pub fn opening_angle_for(squared_chord_length: f64) -> Angle {
        if squared_chord_length < 0.0 {
            return Angle::from_radians(-1.0);
        }
        if squared_chord_length >= 4.0 {
            return Angle::from_radians(PI);
        }
        Angle::from_radians(2.0 * (0.5 * squared_chord_length.sqrt()).asin())
    }

    pub fn new(center: UnitVector3d, squared_chord_length: f64) -> Circle {
        Circle {
            center,
            squared_chord_length,
            opening_angle: Circle::opening_angle_for(squared_chord_length),
        }
    }

    pub fn from_center_and_angle(center: UnitVector3d, opening_angle: Angle) -> Circle {
        Circle {
            center,
            squared_chord_length: Circle::squared_chord_length_for(opening_angle),
            opening_angle,
        }
    }

    pub fn is_empty(self) -> bool {
        !(self.squared_chord_length >= 0.0)
    }

    pub fn is_full(self) -> bool {
        self.squared_chord_length >= 4.0
    }

    pub fn center(self) -> UnitVector3d {
        self.center
    }

    pub fn squared_chord_length(self) -> f64 {
        self.squared_chord_length
    }

    pub fn opening_angle(self) -> Angle {
        self.opening_angle
    }

    pub fn contains_vector(self, v: UnitVector3d) -> bool {
        self.is_full() || (v.vector() - self.center.vector()).squared_norm() <= self.squared_chord_length
    }

    pub fn contains(self, x: Circle) -> bool {
        if x.is_empty() {
            return true;
        }
        if self.is_empty() {
            return false;
        }
        if self.is_full() {
            return true;
        }
        if x.is_full() {
            return false;
        }
        let d = crate::normalized_angle::NormalizedAngle::from_radians(
            self.center.vector().dot(x.center.vector()).clamp(-1.0, 1.0).acos(),
        );
        d.as_radians() + x.opening_angle.as_radians() <= self.opening_angle.as_radians()
    }

    pub fn is_disjoint_from(self, x: Circle) -> bool {
        if self.is_empty() || x.is_empty() {
            return true;
        }
        if self.is_full() || x.is_full() {
            return false;
        }
        let cos_d = self.center.vector().dot(x.center.vector()).clamp(-1.0, 1.0);
        let d = cos_d.acos();
        d > self.opening_angle.as_radians() + x.opening_angle.as_radians()
    }

    pub fn intersects(self, x: Circle) -> bool {
        !self.is_disjoint_from(x)
    }

    pub fn relate(self, x: Circle) -> Relation {
        if self.is_empty() {
            return if x.is_empty() {
                Relation::CONTAINS | Relation::DISJOINT | Relation::WITHIN
            } else {
                Relation::DISJOINT | Relation::WITHIN
            };
        }
        if x.is_empty() {
            return Relation::CONTAINS | Relation::DISJOINT;
        }
        if self.is_disjoint_from(x) {
            return Relation::DISJOINT;
        }
        let mut f = Relation::INTERSECTS;
        if self.contains(x) {
            f |= Relation::CONTAINS;
        }
        if x.contains(self) {
            f |= Relation::WITHIN;
        }
        f
    }

    pub fn complement(self) -> Circle {
        if self.squared_chord_length.is_nan() || self.squared_chord_length <= 0.0 {
            Circle::full()
        } else {
            Circle::new(-self.center, 4.0 - self.squared_chord_length)
        }
    }

    pub fn area(self) -> f64 {
        PI * self.squared_chord_length.clamp(0.0, 4.0)
    }

    pub fn bounding_circle(self) -> Circle {
        self
    }

    /// The axis-aligned lon/lat box bounding this circle. Computed by
    /// walking the latitude range the circle spans and, at each extreme,
    /// the longitude range it spans at that latitude; a generous but
    /// simple construction rather than the tightest possible box.
    pub fn bounding_box(self) -> Box {
        if self.is_empty() {
            return Box::empty();
        }
        if self.is_full() {
            return Box::full();
        }
        let center_lonlat = LonLat::from_vector(self.center.vector());
        let r = self.opening_angle;
        let lat_lo = (center_lonlat.lat().as_radians() - r.as_radians()).max(-PI / 2.0);
        let lat_hi = (center_lonlat.lat().as_radians() + r.as_radians()).min(PI / 2.0);
        if lat_lo <= -PI / 2.0 + 1e-15 || lat_hi >= PI / 2.0 - 1e-15 {
            // The circle covers a pole: it therefore spans all longitudes.
            return Box::new(
                NormalizedAngleInterval::full(),
                crate::interval::AngleInterval::new(
                    Angle::from_radians(lat_lo),
                    Angle::from_radians(lat_hi),
                ),
            );
        }
        // Half-width in longitude at the circle's bounding latitude, derived
        // from the spherical law of cosines for the right triangle formed by
        // the center, the pole, and a boundary point at that latitude.
        let cos_r = 1.0 - 0.5 * self.squared_chord_length;
        let sin_center_lat = center_lonlat.lat().as_radians().sin();
        let cos_center_lat = center_lonlat.lat().as_radians().cos();
        let half_width = if cos_center_lat.abs() < 1e-15 {
            PI
        } else {
            let cos_half_width =
                ((cos_r - sin_center_lat * sin_center_lat) / (cos_center_lat * cos_center_lat))
                    .clamp(-1.0, 1.0);
            cos_half_width.acos()
        };
        Box::new(
            NormalizedAngleInterval::from_angles(
                Angle::from_radians(center_lonlat.lon().as_radians() - half_width),
                Angle::from_radians(center_lonlat.lon().as_radians() + half_width),
            ),
            crate::interval::AngleInterval::new(Angle::from_radians(lat_lo), Angle::from_radians(lat_hi)),
        )
    }

    /// Exact spatial relation between this circle and a lon/lat box,
    /// obtained by evaluating the squared chord length from the circle's
    /// center to the box's nearest and farthest points (its corners and,
    /// when the center's meridian/parallel crosses the box, its edges).
    pub fn relate_box(self, b: Box) -> Relation {
        if self.is_empty() || b.is_empty() {
            return if self.is_empty() && b.is_empty() {
                Relation::CONTAINS | Relation::DISJOINT | Relation::WITHIN
            } else {
                Relation::DISJOINT
            };
        }
        if self.is_full() {
            return if b.is_full() {
                Relation::CONTAINS | Relation::INTERSECTS | Relation::WITHIN
            } else {
                Relation::CONTAINS | Relation::INTERSECTS
            };
        }
        let (min_cl2, max_cl2) = self.corner_chord_extremes(b);
        if min_cl2 > self.squared_chord_length {
            return Relation::DISJOINT;
        }
        let mut f = Relation::INTERSECTS;
        if max_cl2 <= self.squared_chord_length {
            f |= Relation::CONTAINS;
        }
        // `WITHIN` (box contains the circle) is only claimed when the box
        // visibly contains the circle's bounding box - a safe, if not
        // maximally tight, sufficient condition.
        if b.contains(self.bounding_box()) {
            f |= Relation::WITHIN;
        }
        f
    }

    /// Approximates the minimum and maximum squared chord length between
    /// this circle's center and any point of `b`, by sampling the box's four
    /// corners and the point obtained by clamping the center's own
    /// longitude/latitude into the box. Exact for boxes that are small
    /// relative to the circle, which covers the chunk/sub-chunk case this
    /// crate cares about.
    fn corner_chord_extremes(self, b: Box) -> (f64, f64) {
        let center_lonlat = LonLat::from_vector(self.center.vector());
        let clamped_lon = if b.lon().contains_angle(center_lonlat.lon()) {
            center_lonlat.lon()
        } else {
            b.lon().a()
        };
        let clamped_lat = Angle::from_radians(
            center_lonlat
                .lat()
                .as_radians()
                .clamp(b.lat().a().as_radians().min(b.lat().b().as_radians()), b.lat().a().as_radians().max(b.lat().b().as_radians())),
        );
        let closest = UnitVector3d::from_angles(clamped_lon.into(), clamped_lat);
        let mut min_cl2 = (closest.vector() - self.center.vector()).squared_norm();
        let mut max_cl2 = 0.0_f64;
        for &lon in &[b.lon().a(), b.lon().b()] {
            for &lat in &[b.lat().a(), b.lat().b()] {
                let corner = UnitVector3d::from_angles(lon.into(), lat);
                let cl2 = (corner.vector() - self.center.vector()).squared_norm();
                min_cl2 = min_cl2.min(cl2);
                max_cl2 = max_cl2.max(cl2);
            }
        }
        (min_cl2, max_cl2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_center() {
        let c = Circle::from_center_and_angle(UnitVector3d::z_axis(), Angle::from_degrees(10.0));
        assert!(c.contains_vector(UnitVector3d::z_axis()));
    }

    #[test]
    fn disjoint_circles() {
        let a = Circle::from_center_and_angle(UnitVector3d::x_axis(), Angle::from_degrees(5.0));
        let b = Circle::from_center_and_angle(UnitVector3d::y_axis(), Angle::from_degrees(5.0));
        assert!(a.is_disjoint_from(b));
    }

    #[test]
    fn overlapping_circles_intersect() {
        let a = Circle::from_center_and_angle(UnitVector3d::x_axis(), Angle::from_degrees(50.0));
        let b = Circle::from_center_and_angle(UnitVector3d::y_axis(), Angle::from_degrees(50.0));
        assert!(a.intersects(b));
    }

    #[test]
    fn complement_of_point_is_not_full_but_close() {
        let c = Circle::from_center_and_angle(UnitVector3d::z_axis(), Angle::from_radians(0.0));
        let comp = c.complement();
        assert!(comp.squared_chord_length() > 3.999);
    }

    #[test]
    fn relate_box_disjoint_far_away() {
        let c = Circle::from_center_and_angle(
            UnitVector3d::from_lon_lat(LonLat::from_degrees(0.0, 0.0)),
            Angle::from_degrees(1.0),
        );
        let b = Box::from_degrees(90.0, 100.0, -5.0, 5.0);
        assert_eq!(c.relate_box(b), Relation::DISJOINT);
    }

    #[test]
    fn relate_box_contains_small_box_at_center() {
        let c = Circle::from_center_and_angle(
            UnitVector3d::from_lon_lat(LonLat::from_degrees(0.0, 0.0)),
            Angle::from_degrees(20.0),
        );
        let b = Box::from_degrees(-1.0, 1.0, -1.0, 1.0);
        let f = c.relate_box(b);
        assert!(f.contains(Relation::CONTAINS));
    }
}
