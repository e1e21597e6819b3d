use crate::angle::{Angle, PI};
use crate::normalized_angle::NormalizedAngle;
use crate::relation::Relation;

/// A closed interval of [`NormalizedAngle`]s, i.e. an interval of the unit
/// circle.
///
/// A point on the unit circle is represented by the angle in `[0, 2*PI)`
/// between it and a reference point. An interval is given by a pair of
/// bounding points `a` and `b`; its points are traced out by counter-clockwise
/// rotation of `a` until it reaches `b`. Because endpoints are normalized,
/// `a` can be greater than `b` — in that case the interval is
/// `[a, 2*PI) union [0, b]` and [`NormalizedAngleInterval::wraps`] returns
/// true.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedAngleInterval {
    a: NormalizedAngle,
    b: NormalizedAngle,
}

impl Default for NormalizedAngleInterval {
    fn default() -> NormalizedAngleInterval {
        NormalizedAngleInterval::empty()
    }
}

impl NormalizedAngleInterval {
    pub fn empty() -> NormalizedAngleInterval {
        NormalizedAngleInterval {
            a: NormalizedAngle::nan(),
            b: NormalizedAngle::nan(),
        }
    }

    pub fn full() -> NormalizedAngleInterval {
        NormalizedAngleInterval {
            a: NormalizedAngle::from_radians(0.0),
            b: NormalizedAngle::from_radians(2.0 * PI),
        }
    }

    pub fn from_degrees(a: f64, b: f64) -> NormalizedAngleInterval {
        NormalizedAngleInterval::from_angles(Angle::from_degrees(a), Angle::from_degrees(b))
    }

    /// Creates an interval from unnormalized endpoints. If both lie in
    /// `[0, 2*PI)`, `y` may be less than `x`, producing a wrapping interval.
    /// Otherwise `x` must be no greater than `y`.
    pub fn from_angles(x: Angle, y: Angle) -> NormalizedAngleInterval {
        NormalizedAngleInterval {
            a: NormalizedAngle::from_angle(x),
            b: NormalizedAngle::from_angle(y),
        }
    }

    pub fn point(x: NormalizedAngle) -> NormalizedAngleInterval {
        NormalizedAngleInterval { a: x, b: x }
    }

    pub fn new(a: NormalizedAngle, b: NormalizedAngle) -> NormalizedAngleInterval {
        NormalizedAngleInterval { a, b }
    }

    pub fn a(self) -> NormalizedAngle {
        self.a
    }

    pub fn b(self) -> NormalizedAngle {
        self.b
    }

    pub fn is_empty(self) -> bool {
        self.a.is_nan() || self.b.is_nan()
    }

    pub fn is_full(self) -> bool {
        self.a.as_radians() == 0.0 && self.b.as_radians() == 2.0 * PI
    }

    pub fn wraps(self) -> bool {
        self.a.as_radians() > self.b.as_radians()
    }

    pub fn center(self) -> NormalizedAngle {
        NormalizedAngle::center(self.a, self.b)
    }

    pub fn size(self) -> NormalizedAngle {
        self.a.angle_to(self.b)
    }

    pub fn contains_angle(self, x: NormalizedAngle) -> bool {
        if x.is_nan() {
            return true;
        }
        if self.wraps() {
            x <= self.b || self.a <= x
        } else {
            self.a <= x && x <= self.b
        }
    }

    pub fn contains(self, x: NormalizedAngleInterval) -> bool {
        if x.is_empty() {
            return true;
        }
        if self.is_empty() {
            return false;
        }
        if !self.wraps() {
            if !x.wraps() {
                self.a <= x.a && self.b >= x.b
            } else {
                false
            }
        } else if x.wraps() {
            self.a <= x.a && self.b >= x.b
        } else {
            self.contains_angle(x.a) && self.contains_angle(x.b)
        }
    }

    pub fn intersects_angle(self, x: NormalizedAngle) -> bool {
        self.contains_angle(x)
    }

    pub fn intersects(self, x: NormalizedAngleInterval) -> bool {
        !self.is_disjoint_from(x)
    }

    pub fn is_disjoint_from(self, x: NormalizedAngleInterval) -> bool {
        if self.is_empty() || x.is_empty() {
            return true;
        }
        if !self.wraps() && !x.wraps() {
            self.a > x.b || self.b < x.a
        } else {
            !(self.contains_angle(x.a) || self.contains_angle(x.b) || x.contains_angle(self.a))
        }
    }

    pub fn relate_angle(self, x: NormalizedAngle) -> Relation {
        if self.is_empty() {
            return if x.is_nan() {
                Relation::CONTAINS | Relation::DISJOINT | Relation::WITHIN
            } else {
                Relation::DISJOINT | Relation::WITHIN
            };
        }
        if x.is_nan() {
            return Relation::CONTAINS | Relation::DISJOINT;
        }
        if self.a == x && self.b == x {
            return Relation::CONTAINS | Relation::INTERSECTS | Relation::WITHIN;
        }
        if self.contains_angle(x) {
            Relation::CONTAINS | Relation::INTERSECTS
        } else {
            Relation::DISJOINT
        }
    }

    pub fn relate(self, x: NormalizedAngleInterval) -> Relation {
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
        if self.a == x.a && self.b == x.b {
            return Relation::CONTAINS | Relation::INTERSECTS | Relation::WITHIN;
        }
        if self.is_disjoint_from(x) {
            return Relation::DISJOINT;
        }
        if self.contains(x) {
            return Relation::CONTAINS | Relation::INTERSECTS;
        }
        if x.contains(self) {
            return Relation::INTERSECTS | Relation::WITHIN;
        }
        Relation::INTERSECTS
    }

    pub fn expanded_to(self, x: NormalizedAngle) -> NormalizedAngleInterval {
        if x.is_nan() || self.contains_angle(x) {
            return self;
        }
        if self.is_empty() {
            return NormalizedAngleInterval::point(x);
        }
        // Extend via whichever endpoint requires the smaller rotation; the
        // result is not unique in general, matching the upstream contract.
        let extend_a = x.angle_to(self.a);
        let extend_b = self.b.angle_to(x);
        if extend_a.as_radians() <= extend_b.as_radians() {
            NormalizedAngleInterval::new(x, self.b)
        } else {
            NormalizedAngleInterval::new(self.a, x)
        }
    }

    pub fn dilated_by(self, x: Angle) -> NormalizedAngleInterval {
        if x.is_nan() || self.is_empty() || x.as_radians() == 0.0 {
            return self;
        }
        if self.size().as_radians() + 2.0 * x.as_radians().abs() >= 2.0 * PI && x.as_radians() > 0.0
        {
            return NormalizedAngleInterval::full();
        }
        NormalizedAngleInterval::from_angles(
            Angle::from(self.a) - x,
            Angle::from(self.b) + x,
        )
    }

    pub fn eroded_by(self, x: Angle) -> NormalizedAngleInterval {
        self.dilated_by(-x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_wrapping_contains() {
        let i = NormalizedAngleInterval::from_degrees(10.0, 20.0);
        assert!(!i.wraps());
        assert!(i.contains_angle(NormalizedAngle::from_degrees(15.0)));
        assert!(!i.contains_angle(NormalizedAngle::from_degrees(5.0)));
    }

    #[test]
    fn wrapping_interval_contains_across_zero() {
        let i = NormalizedAngleInterval::from_degrees(350.0, 10.0);
        assert!(i.wraps());
        assert!(i.contains_angle(NormalizedAngle::from_degrees(0.0)));
        assert!(i.contains_angle(NormalizedAngle::from_degrees(355.0)));
        assert!(i.contains_angle(NormalizedAngle::from_degrees(5.0)));
        assert!(!i.contains_angle(NormalizedAngle::from_degrees(180.0)));
    }

    #[test]
    fn wrapping_intersects_non_wrapping() {
        let wrap = NormalizedAngleInterval::from_degrees(350.0, 10.0);
        let plain = NormalizedAngleInterval::from_degrees(5.0, 40.0);
        assert!(wrap.intersects(plain));
    }

    #[test]
    fn full_contains_everything() {
        let full = NormalizedAngleInterval::full();
        assert!(full.contains_angle(NormalizedAngle::from_degrees(271.5)));
        assert!(full.contains(NormalizedAngleInterval::from_degrees(10.0, 350.0)));
    }
}
