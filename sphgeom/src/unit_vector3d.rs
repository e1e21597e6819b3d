use crate::angle::Angle;
use crate::lonlat::LonLat;
use crate::normalized_angle::NormalizedAngle;
use crate::vector3d::Vector3d;
use std::fmt;

/// A unit vector in ℝ³.
///
/// Conceptually a `UnitVector3d` is a [`Vector3d`], but it does not implement
/// `Deref`/`DerefMut` to one: every mutator on a unit vector must be an
/// isometry (rotation), so the type only exposes read access to its
/// underlying components plus operations that are known to preserve norm.
#[derive(Clone, Copy, PartialEq)]
pub struct UnitVector3d {
    v: Vector3d,
}

impl UnitVector3d {
    /// Wraps `v` as a unit vector without verifying that it has unit norm.
    /// Use only when `v` is already known to be normalized.
    pub fn new_unchecked(v: Vector3d) -> UnitVector3d {
        UnitVector3d { v }
    }

    pub fn from_normalized(x: f64, y: f64, z: f64) -> UnitVector3d {
        UnitVector3d::new_unchecked(Vector3d::new(x, y, z))
    }

    pub fn x_axis() -> UnitVector3d {
        UnitVector3d::from_normalized(1.0, 0.0, 0.0)
    }

    pub fn y_axis() -> UnitVector3d {
        UnitVector3d::from_normalized(0.0, 1.0, 0.0)
    }

    pub fn z_axis() -> UnitVector3d {
        UnitVector3d::from_normalized(0.0, 0.0, 1.0)
    }

    /// Creates the unit vector with the given direction, normalizing it.
    /// Panics if `v` is the zero vector — callers working with externally
    /// supplied vectors should check `v.normalize()` themselves first.
    pub fn new(v: Vector3d) -> UnitVector3d {
        let (u, _) = v.normalize().expect("cannot form a UnitVector3d from the zero vector");
        u
    }

    pub fn from_lon_lat(p: LonLat) -> UnitVector3d {
        UnitVector3d::from_angles(p.lon().into(), p.lat())
    }

    pub fn from_angles(lon: Angle, lat: Angle) -> UnitVector3d {
        let (sin_lon, cos_lon) = lon.as_radians().sin_cos();
        let (sin_lat, cos_lat) = lat.as_radians().sin_cos();
        UnitVector3d::from_normalized(cos_lon * cos_lat, sin_lon * cos_lat, sin_lat)
    }

    /// Returns the unit vector orthogonal to the meridian at longitude `a`.
    pub fn orthogonal_to_meridian(a: NormalizedAngle) -> UnitVector3d {
        UnitVector3d::from_normalized(-a.as_radians().sin(), a.as_radians().cos(), 0.0)
    }

    /// Returns an arbitrary unit vector orthogonal to `v`.
    pub fn orthogonal_to(v: Vector3d) -> UnitVector3d {
        let ax = v.x().abs();
        let ay = v.y().abs();
        let az = v.z().abs();
        let perp = if ax <= ay && ax <= az {
            Vector3d::new(0.0, -v.z(), v.y())
        } else if ay <= ax && ay <= az {
            Vector3d::new(v.z(), 0.0, -v.x())
        } else {
            Vector3d::new(-v.y(), v.x(), 0.0)
        };
        UnitVector3d::new(perp)
    }

    pub fn vector(self) -> Vector3d {
        self.v
    }

    pub fn x(self) -> f64 {
        self.v.x()
    }

    pub fn y(self) -> f64 {
        self.v.y()
    }

    pub fn z(self) -> f64 {
        self.v.z()
    }

    pub fn dot(self, rhs: Vector3d) -> f64 {
        self.v.dot(rhs)
    }

    pub fn cross(self, rhs: Vector3d) -> Vector3d {
        self.v.cross(rhs)
    }

    /// `(b + a).cross(b - a)`, twice the cross product of `a` and `b`.
    /// Stays well-conditioned even for nearly (anti-)parallel inputs,
    /// unlike a plain cross product.
    pub fn robust_cross(self, rhs: UnitVector3d) -> Vector3d {
        (rhs.v + self.v).cross(rhs.v - self.v)
    }

    pub fn rotated_around(self, k: UnitVector3d, a: Angle) -> UnitVector3d {
        UnitVector3d::new(self.v.rotated_around(k, a))
    }
}

impl std::ops::Neg for UnitVector3d {
    type Output = UnitVector3d;
    fn neg(self) -> UnitVector3d {
        UnitVector3d::new_unchecked(-self.v)
    }
}

impl From<UnitVector3d> for Vector3d {
    fn from(u: UnitVector3d) -> Vector3d {
        u.v
    }
}

impl fmt::Debug for UnitVector3d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (unit)", self.v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axes_are_orthogonal() {
        let x = UnitVector3d::x_axis();
        let y = UnitVector3d::y_axis();
        assert_eq!(x.dot(y.vector()), 0.0);
    }

    #[test]
    fn from_angles_round_trips_poles() {
        let north = UnitVector3d::from_angles(Angle::zero(), Angle::from_degrees(90.0));
        assert!((north.z() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn orthogonal_to_is_perpendicular() {
        let v = Vector3d::new(1.0, 2.0, 3.0);
        let o = UnitVector3d::orthogonal_to(v);
        assert!(o.dot(v).abs() < 1e-12);
    }
}
