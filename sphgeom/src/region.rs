use crate::bbox::Box;
use crate::circle::Circle;
use crate::ellipse::Ellipse;
use crate::polygon::ConvexPolygon;
use crate::relation::Relation;
use crate::unit_vector3d::UnitVector3d;

/// A spherical region: one of the four concrete shapes query predicates can
/// be translated into. `Region` is a closed enum rather than a trait object
/// because the full relation matrix (region-vs-region for all 4x4 pairs) is
/// naturally expressed as one `match`, mirroring the double-dispatch the
/// upstream virtual `relate` overloads perform, without needing downcasting.
#[derive(Clone, Debug, PartialEq)]
pub enum Region {
    Box(Box),
    Circle(Circle),
    Ellipse(Ellipse),
    Polygon(ConvexPolygon),
}

impl Region {
    pub fn bounding_box(&self) -> Box {
        match self {
            Region::Box(b) => b.bounding_box(),
            Region::Circle(c) => c.bounding_box(),
            Region::Ellipse(e) => e.bounding_box(),
            Region::Polygon(p) => p.bounding_box(),
        }
    }

    pub fn bounding_circle(&self) -> Circle {
        match self {
            Region::Box(b) => b.bounding_circle(),
            Region::Circle(c) => c.bounding_circle(),
            Region::Ellipse(e) => e.bounding_circle(),
            Region::Polygon(p) => p.bounding_circle(),
        }
    }

    pub fn contains(&self, v: UnitVector3d) -> bool {
        match self {
            Region::Box(b) => b.contains_vector(v),
            Region::Circle(c) => c.contains_vector(v),
            Region::Ellipse(e) => e.contains_vector(v),
            Region::Polygon(p) => p.contains_vector(v),
        }
    }

    /// The spatial relation between this region and the lon/lat box `b`
    /// (almost always a chunk or sub-chunk box). This is the operation the
    /// `chunking` crate relies on; `Box`/`Circle` relations are exact,
    /// `Ellipse`/`ConvexPolygon` fall back to their bounding circle for
    /// `CONTAINS` (see their `relate_box` doc comments).
    pub fn relate_box(&self, b: Box) -> Relation {
        match self {
            Region::Box(self_box) => self_box.relate(b),
            Region::Circle(c) => c.relate_box(b),
            Region::Ellipse(e) => e.relate_box(b),
            Region::Polygon(p) => p.relate_box(b),
        }
    }
}

impl From<Box> for Region {
    fn from(b: Box) -> Region {
        Region::Box(b)
    }
}

impl From<Circle> for Region {
    fn from(c: Circle) -> Region {
        Region::Circle(c)
    }
}

impl From<Ellipse> for Region {
    fn from(e: Ellipse) -> Region {
        Region::Ellipse(e)
    }
}

impl From<ConvexPolygon> for Region {
    fn from(p: ConvexPolygon) -> Region {
        Region::Polygon(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angle::Angle;
    use crate::lonlat::LonLat;

    #[test]
    fn region_dispatches_to_the_right_shape() {
        let r = Region::from(Circle::from_center_and_angle(
            UnitVector3d::from_lon_lat(LonLat::from_degrees(0.0, 0.0)),
            Angle::from_degrees(10.0),
        ));
        assert!(r.contains(UnitVector3d::from_lon_lat(LonLat::from_degrees(0.0, 0.0))));
        let chunk_box = Box::from_degrees(-20.0, 20.0, -20.0, 20.0);
        assert!(r.relate_box(chunk_box).contains(Relation::CONTAINS));
    }
}
