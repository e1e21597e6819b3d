use crate::angle::{Angle, PI};
use crate::bbox::Box;
use crate::circle::Circle;
use crate::relation::Relation;
use crate::unit_vector3d::UnitVector3d;

/// An elliptical region on the unit sphere, defined by its two foci and the
/// angle sum threshold `alpha`: a point `v` is in the ellipse iff
/// `d(v, f1) + d(v, f2) <= 2 * alpha`, where `d` is the angle between two
/// unit vectors.
///
/// This mirrors the defining equation of the upstream ellipse rather than
/// its precomputed quadratic-form matrix representation - simpler to reason
/// about, at the cost of a transcendental `acos` per point test instead of a
/// single quadratic form evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ellipse {
    f1: UnitVector3d,
    f2: UnitVector3d,
    alpha: Angle,
}

impl Ellipse {
    pub fn empty() -> Ellipse {
        Ellipse {
            f1: UnitVector3d::z_axis(),
            f2: UnitVector3d::z_axis(),
            alpha: Angle::from_radians(-1.0),
        }
    }

    pub fn full() -> Ellipse {
        Ellipse {
            f1: UnitVector3d::z_axis(),
            f2: UnitVector3d::z_axis(),
            alpha: Angle::from_radians(PI),
        }
    }

    pub fn new(f1: UnitVector3d, f2: UnitVector3d, alpha: Angle) -> Ellipse {
        Ellipse { f1, f2, alpha }
    }

    pub fn from_circle(center: UnitVector3d, opening_angle: Angle) -> Ellipse {
        Ellipse::new(center, center, opening_angle)
    }

    fn focal_distance(self) -> Angle {
        Angle::from_radians(self.f1.vector().dot(self.f2.vector()).clamp(-1.0, 1.0).acos())
    }

    pub fn is_empty(self) -> bool {
        !(self.alpha.as_radians() >= 0.0) || 2.0 * self.alpha.as_radians() < self.focal_distance().as_radians()
    }

    pub fn is_full(self) -> bool {
        2.0 * PI - 2.0 * self.alpha.as_radians() <= self.focal_distance().as_radians()
    }

    pub fn foci(self) -> (UnitVector3d, UnitVector3d) {
        (self.f1, self.f2)
    }

    pub fn alpha(self) -> Angle {
        self.alpha
    }

    pub fn contains_vector(self, v: UnitVector3d) -> bool {
        if self.is_full() {
            return true;
        }
        if self.is_empty() {
            return false;
        }
        let d1 = v.vector().dot(self.f1.vector()).clamp(-1.0, 1.0).acos();
        let d2 = v.vector().dot(self.f2.vector()).clamp(-1.0, 1.0).acos();
        d1 + d2 <= 2.0 * self.alpha.as_radians()
    }

    pub fn complement(self) -> Ellipse {
        Ellipse::new(-self.f1, -self.f2, Angle::from_radians(PI - self.alpha.as_radians()))
    }

    /// The tightest circle bounding this ellipse, centered on the midpoint
    /// of its foci with radius `alpha` plus half the inter-focal distance.
    pub fn bounding_circle(self) -> Circle {
        if self.is_empty() {
            return Circle::empty();
        }
        if self.is_full() {
            return Circle::full();
        }
        let mid = (self.f1.vector() + self.f2.vector())
            .normalize()
            .map(|(u, _)| u)
            .unwrap_or(self.f1);
        let radius = Angle::from_radians(self.alpha.as_radians() + self.focal_distance().as_radians() / 2.0);
        Circle::from_center_and_angle(mid, radius)
    }

    pub fn bounding_box(self) -> Box {
        self.bounding_circle().bounding_box()
    }

    /// Conservative relation to a box: obtained by substituting this
    /// ellipse's bounding circle, per the allowance that a region may
    /// implement `relate` against a simplified version of itself. `CONTAINS`
    /// is therefore never reported here (a bounding circle containing a box
    /// does not imply the tighter ellipse does), while `DISJOINT` and the
    /// derived `INTERSECTS` remain exact.
    pub fn relate_box(self, b: Box) -> Relation {
        if self.is_empty() {
            return Relation::DISJOINT | Relation::WITHIN;
        }
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

    #[test]
    fn circle_shaped_ellipse_contains_center() {
        let e = Ellipse::from_circle(UnitVector3d::z_axis(), Angle::from_degrees(10.0));
        assert!(e.contains_vector(UnitVector3d::z_axis()));
    }

    #[test]
    fn empty_when_foci_too_far_apart() {
        let e = Ellipse::new(UnitVector3d::x_axis(), UnitVector3d::y_axis(), Angle::from_degrees(1.0));
        assert!(e.is_empty());
    }

    #[test]
    fn contains_point_between_foci() {
        let e = Ellipse::new(UnitVector3d::x_axis(), UnitVector3d::y_axis(), Angle::from_degrees(50.0));
        assert!(!e.is_empty());
        let midpoint = UnitVector3d::new((UnitVector3d::x_axis().vector() + UnitVector3d::y_axis().vector()));
        assert!(e.contains_vector(midpoint));
    }
}
