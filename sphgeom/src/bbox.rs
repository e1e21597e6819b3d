use crate::angle::Angle;
use crate::circle::Circle;
use crate::interval::AngleInterval;
use crate::lonlat::LonLat;
use crate::normalized_angle::NormalizedAngle;
use crate::normalized_angle_interval::NormalizedAngleInterval;
use crate::relation::Relation;
use crate::unit_vector3d::UnitVector3d;

/// A longitude/latitude rectangle on the unit sphere: the Cartesian product
/// of a [`NormalizedAngleInterval`] (longitude) and an [`AngleInterval`]
/// (latitude). This is the region type used to describe chunks, sub-chunks
/// and stripes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Box {
    lon: NormalizedAngleInterval,
    lat: AngleInterval,
}

impl Box {
    pub fn empty() -> Box {
        Box {
            lon: NormalizedAngleInterval::empty(),
            lat: AngleInterval::empty(),
        }
    }

    pub fn full() -> Box {
        Box {
            lon: NormalizedAngleInterval::full(),
            lat: Box::all_latitudes(),
        }
    }

    pub fn all_latitudes() -> AngleInterval {
        AngleInterval::new(Angle::from_degrees(-90.0), Angle::from_degrees(90.0))
    }

    pub fn all_longitudes() -> NormalizedAngleInterval {
        NormalizedAngleInterval::full()
    }

    pub fn from_degrees(lon1: f64, lon2: f64, lat1: f64, lat2: f64) -> Box {
        Box::new(
            NormalizedAngleInterval::from_degrees(lon1, lon2),
            AngleInterval::from_degrees(lat1, lat2),
        )
    }

    pub fn new(lon: NormalizedAngleInterval, lat: AngleInterval) -> Box {
        let mut b = Box { lon, lat };
        b.enforce_invariants();
        b
    }

    pub fn point(p: LonLat) -> Box {
        Box::new(
            NormalizedAngleInterval::point(p.lon()),
            AngleInterval::point(p.lat()),
        )
    }

    fn enforce_invariants(&mut self) {
        if !self.lat.is_empty() {
            let all = Box::all_latitudes();
            self.lat = AngleInterval::new(self.lat.a().max(all.a()), self.lat.b().min(all.b()));
        }
        if self.lat.is_empty() {
            self.lon = NormalizedAngleInterval::empty();
        } else if self.lon.is_empty() {
            self.lat = AngleInterval::empty();
        }
    }

    pub fn lon(self) -> NormalizedAngleInterval {
        self.lon
    }

    pub fn lat(self) -> AngleInterval {
        self.lat
    }

    pub fn is_empty(self) -> bool {
        self.lat.is_empty()
    }

    pub fn is_full(self) -> bool {
        self.lon.is_full() && self.lat == Box::all_latitudes()
    }

    pub fn center(self) -> LonLat {
        LonLat::new(self.lon.center(), self.lat.center())
    }

    pub fn width(self) -> NormalizedAngle {
        self.lon.size()
    }

    pub fn height(self) -> Angle {
        self.lat.size()
    }

    pub fn contains_lonlat(self, p: LonLat) -> bool {
        self.lat.contains_angle(p.lat()) && self.lon.contains_angle(p.lon())
    }

    pub fn contains(self, x: Box) -> bool {
        self.lat.contains(x.lat) && self.lon.contains(x.lon)
    }

    pub fn intersects(self, x: Box) -> bool {
        self.lat.intersects(x.lat) && self.lon.intersects(x.lon)
    }

    pub fn contains_vector(self, v: UnitVector3d) -> bool {
        self.contains_lonlat(LonLat::from_vector(v.into()))
    }

    pub fn bounding_box(self) -> Box {
        self
    }

    pub fn bounding_circle(self) -> Circle {
        if self.is_empty() {
            return Circle::empty();
        }
        if self.is_full() {
            return Circle::full();
        }
        // The bounding circle is centered on the box's center longitude and
        // the midpoint latitude of its (possibly asymmetric) latitude range,
        // with radius equal to the farthest corner.
        let center = UnitVector3d::from_lon_lat(self.center());
        let mut max_cl2 = 0.0_f64;
        for &lon in &[self.lon.a(), self.lon.b()] {
            for &lat in &[self.lat.a(), self.lat.b()] {
                let corner = UnitVector3d::from_angles(lon.into(), lat);
                let cl2 = (corner.vector() - center.vector()).squared_norm();
                max_cl2 = max_cl2.max(cl2);
            }
        }
        Circle::new(center, max_cl2)
    }

    /// `relate` computes the exact spatial relation between two boxes by
    /// combining the relations of their longitude and latitude intervals:
    /// `CONTAINS`/`INTERSECTS`/`WITHIN` require both intervals to agree,
    /// while either interval being `DISJOINT` makes the boxes disjoint.
    pub fn relate(self, b: Box) -> Relation {
        let lon_rel = self.lon.relate(b.lon);
        let lat_rel = self.lat.relate(b.lat);
        let agree = Relation::CONTAINS | Relation::INTERSECTS | Relation::WITHIN;
        let mut result = Relation::NONE;
        for bit in [Relation::CONTAINS, Relation::INTERSECTS, Relation::WITHIN] {
            if agree.contains(bit) && lon_rel.contains(bit) && lat_rel.contains(bit) {
                result |= bit;
            }
        }
        if lon_rel.contains(Relation::DISJOINT) || lat_rel.contains(Relation::DISJOINT) {
            result |= Relation::DISJOINT;
        }
        result
    }

    pub fn relate_lonlat(self, p: LonLat) -> Relation {
        self.relate(Box::point(p))
    }

    /// Returns a box expanded by `x` in both longitude and latitude, clamped
    /// to valid latitudes. Used to pad chunk/sub-chunk boundaries by a small
    /// epsilon so that regions touching a boundary aren't missed due to
    /// floating point round-off.
    pub fn dilated_by(self, x: Angle) -> Box {
        if self.is_empty() {
            return self;
        }
        Box::new(self.lon.dilated_by(x), self.lat.dilated_by(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_point() {
        let b = Box::from_degrees(10.0, 20.0, -5.0, 5.0);
        assert!(b.contains_lonlat(LonLat::from_degrees(15.0, 0.0)));
        assert!(!b.contains_lonlat(LonLat::from_degrees(25.0, 0.0)));
    }

    #[test]
    fn relate_box_box_contains() {
        let outer = Box::from_degrees(0.0, 30.0, -10.0, 10.0);
        let inner = Box::from_degrees(10.0, 20.0, -5.0, 5.0);
        let f = outer.relate(inner);
        assert!(f.contains(Relation::CONTAINS));
        assert!(!f.contains(Relation::DISJOINT));
    }

    #[test]
    fn relate_box_box_disjoint() {
        let a = Box::from_degrees(0.0, 10.0, -5.0, 5.0);
        let b = Box::from_degrees(20.0, 30.0, -5.0, 5.0);
        assert_eq!(a.relate(b), Relation::DISJOINT);
    }

    #[test]
    fn latitude_is_clipped_to_valid_range() {
        let b = Box::new(
            NormalizedAngleInterval::full(),
            AngleInterval::from_degrees(-100.0, 100.0),
        );
        assert_eq!(b.lat(), Box::all_latitudes());
    }

    #[test]
    fn bounding_circle_contains_the_box() {
        let b = Box::from_degrees(10.0, 40.0, -20.0, 20.0);
        let bc = b.bounding_circle();
        for &lon in &[10.0_f64, 25.0, 40.0] {
            for &lat in &[-20.0_f64, 0.0, 20.0] {
                let v = UnitVector3d::from_lon_lat(LonLat::from_degrees(lon, lat));
                assert!(bc.contains_vector(v));
            }
        }
    }
}
