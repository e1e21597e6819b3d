use crate::angle::{Angle, PI, RAD_PER_DEG};
use std::fmt;

/// An angle that lies in `[0, 2*PI)`, with one exception: a `NormalizedAngle`
/// can be NaN.
#[derive(Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct NormalizedAngle(Angle);

impl NormalizedAngle {
    pub fn nan() -> NormalizedAngle {
        NormalizedAngle(Angle::nan())
    }

    pub fn from_degrees(a: f64) -> NormalizedAngle {
        NormalizedAngle::from_radians(a * RAD_PER_DEG)
    }

    /// Creates a `NormalizedAngle` with the given value in radians,
    /// normalized to lie in `[0, 2*PI)`.
    pub fn from_radians(a: f64) -> NormalizedAngle {
        let rad = if a < 0.0 {
            a.rem_euclid(2.0 * PI)
        } else if a > 2.0 * PI {
            a % (2.0 * PI)
        } else {
            a
        };
        NormalizedAngle(Angle::from_radians(rad))
    }

    pub fn from_angle(a: Angle) -> NormalizedAngle {
        NormalizedAngle::from_radians(a.as_radians())
    }

    /// Returns the smaller of `a.angle_to(b)` and `b.angle_to(a)`, a value in
    /// `[0, PI]`.
    pub fn between(a: NormalizedAngle, b: NormalizedAngle) -> NormalizedAngle {
        let fwd = a.angle_to(b);
        let back = b.angle_to(a);
        if fwd.as_radians() <= back.as_radians() {
            fwd
        } else {
            back
        }
    }

    /// Returns the angle `m` such that `a.angle_to(m) == m.angle_to(b)`.
    pub fn center(a: NormalizedAngle, b: NormalizedAngle) -> NormalizedAngle {
        let d = a.angle_to(b);
        a + Angle::from_radians(d.as_radians() / 2.0)
    }

    pub fn as_degrees(self) -> f64 {
        self.0.as_degrees()
    }

    pub fn as_radians(self) -> f64 {
        self.0.as_radians()
    }

    pub fn is_nan(self) -> bool {
        self.0.is_nan()
    }

    pub fn angle(self) -> Angle {
        self.0
    }

    /// Computes the angle `alpha` in `[0, 2*PI)` such that adding `alpha` to
    /// this angle and normalizing the result yields `a`.
    pub fn angle_to(self, a: NormalizedAngle) -> NormalizedAngle {
        let d = a.as_radians() - self.as_radians();
        let d = if d < 0.0 { 2.0 * PI + d } else { d };
        NormalizedAngle(Angle::from_radians(d))
    }
}

impl std::ops::Add<Angle> for NormalizedAngle {
    type Output = Angle;
    fn add(self, rhs: Angle) -> Angle {
        self.0 + rhs
    }
}

impl std::ops::Sub<Angle> for NormalizedAngle {
    type Output = Angle;
    fn sub(self, rhs: Angle) -> Angle {
        self.0 - rhs
    }
}

impl From<NormalizedAngle> for Angle {
    fn from(a: NormalizedAngle) -> Angle {
        a.0
    }
}

impl fmt::Debug for NormalizedAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}rad (normalized)", self.0.as_radians())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_values_wrap() {
        let a = NormalizedAngle::from_degrees(-10.0);
        assert!((a.as_degrees() - 350.0).abs() < 1e-9);
    }

    #[test]
    fn large_values_wrap() {
        let a = NormalizedAngle::from_degrees(370.0);
        assert!((a.as_degrees() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn angle_to_is_non_negative() {
        let a = NormalizedAngle::from_degrees(350.0);
        let b = NormalizedAngle::from_degrees(10.0);
        let d = a.angle_to(b);
        assert!((d.as_degrees() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn between_picks_shorter_arc() {
        let a = NormalizedAngle::from_degrees(350.0);
        let b = NormalizedAngle::from_degrees(10.0);
        let d = NormalizedAngle::between(a, b);
        assert!((d.as_degrees() - 20.0).abs() < 1e-9);
    }
}
