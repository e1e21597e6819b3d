//! The orientation predicate: given three points `a`, `b`, `c` on the unit
//! sphere, determines whether the shortest path from `a` to `b` to `c` turns
//! left, right, or not at all.
//!
//! This is the spherical-geometry analog of the planar orientation predicate
//! used throughout computational geometry, and like its planar counterpart it
//! is sensitive to catastrophic cancellation when `a`, `b`, `c` are nearly
//! colinear (here: coplanar with the origin). A double-precision fast path
//! handles the overwhelming majority of inputs; when the result is too close
//! to zero to trust, an arbitrary-precision fallback recomputes the same
//! determinant exactly.

use crate::unit_vector3d::UnitVector3d;
use num_bigint::BigInt;

/// Returns `1` if the turn `a -> b -> c` is counter-clockwise (as seen from
/// outside the sphere, looking down at the origin), `-1` if clockwise, and
/// `0` if `a`, `b`, `c` and the origin are coplanar (including when any two
/// of the points coincide or are antipodal).
///
/// This is the sign of the scalar triple product `a . (b x c)`.
pub fn orientation(a: UnitVector3d, b: UnitVector3d, c: UnitVector3d) -> i8 {
    let bc = b.cross(c.vector());
    let det = a.dot(bc);

    // Conservative static filter: the triple product of three unit vectors
    // has each component bounded by 1, and the computation involves a
    // handful of double-precision multiplies/adds/subtracts. An error bound
    // of a few tens of machine epsilons comfortably covers the accumulated
    // rounding error; anything smaller than that is not trustworthy and
    // needs the exact fallback.
    const ERROR_BOUND: f64 = 64.0 * f64::EPSILON;
    if det.abs() > ERROR_BOUND {
        return if det > 0.0 { 1 } else { -1 };
    }
    orientation_exact(a, b, c)
}

/// Decomposes a finite `f64` into `(mantissa, exponent)` such that
/// `x == mantissa as f64 * 2f64.powi(exponent)` exactly, with `mantissa`
/// fitting in an `i64`. Mirrors what `frexp` gives you, except the mantissa
/// is left as an integer instead of being renormalized into `[0.5, 1)`.
fn decompose(x: f64) -> (i64, i32) {
    if x == 0.0 {
        return (0, 0);
    }
    let bits = x.to_bits();
    let sign: i64 = if bits >> 63 == 1 { -1 } else { 1 };
    let raw_exponent = ((bits >> 52) & 0x7ff) as i32;
    let raw_mantissa = bits & 0x000f_ffff_ffff_ffff;
    if raw_exponent == 0 {
        // Subnormal: no implicit leading bit, fixed exponent bias.
        (sign * raw_mantissa as i64, -1074)
    } else {
        // Normal: restore the implicit leading bit.
        let mantissa = raw_mantissa | 0x0010_0000_0000_0000;
        (sign * mantissa as i64, raw_exponent - 1075)
    }
}

/// A term of the form `mantissa * 2^exponent`, accumulated exactly.
struct ScaledInt {
    mantissa: BigInt,
    exponent: i32,
}

impl ScaledInt {
    fn from_product3(a: f64, b: f64, c: f64) -> ScaledInt {
        let (ma, ea) = decompose(a);
        let (mb, eb) = decompose(b);
        let (mc, ec) = decompose(c);
        ScaledInt {
            mantissa: BigInt::from(ma) * BigInt::from(mb) * BigInt::from(mc),
            exponent: ea + eb + ec,
        }
    }

    fn neg(mut self) -> ScaledInt {
        self.mantissa = -self.mantissa;
        self
    }
}

/// Sums `terms`, each of the form `mantissa * 2^exponent`, exactly, and
/// returns the sign of the sum (`-1`, `0`, or `1`).
fn sum_sign(terms: Vec<ScaledInt>) -> i8 {
    let min_exponent = terms.iter().map(|t| t.exponent).min().unwrap_or(0);
    let mut total = BigInt::from(0);
    for t in terms {
        let shift = (t.exponent - min_exponent) as u32;
        total += t.mantissa << shift;
    }
    use std::cmp::Ordering;
    match total.cmp(&BigInt::from(0)) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

/// Computes the exact sign of the determinant
/// `| ax ay az |`
/// `| bx by bz |`
/// `| cx cy cz |`
/// via arbitrary-precision integer arithmetic on the bit-exact mantissa and
/// exponent of each coordinate. Never mis-rounds, at the cost of being much
/// slower than the floating point fast path.
fn orientation_exact(a: UnitVector3d, b: UnitVector3d, c: UnitVector3d) -> i8 {
    let terms = vec![
        ScaledInt::from_product3(a.x(), b.y(), c.z()),
        ScaledInt::from_product3(a.y(), b.z(), c.x()),
        ScaledInt::from_product3(a.z(), b.x(), c.y()),
        ScaledInt::from_product3(a.x(), b.z(), c.y()).neg(),
        ScaledInt::from_product3(a.y(), b.x(), c.z()).neg(),
        ScaledInt::from_product3(a.z(), b.y(), c.x()).neg(),
    ];
    sum_sign(terms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ccw_triangle_on_equator() {
        let a = UnitVector3d::from_angles(crate::angle::Angle::zero(), crate::angle::Angle::zero());
        let b = UnitVector3d::from_angles(
            crate::angle::Angle::from_degrees(90.0),
            crate::angle::Angle::zero(),
        );
        let c = UnitVector3d::z_axis();
        assert_eq!(orientation(a, b, c), 1);
        assert_eq!(orientation(a, c, b), -1);
    }

    #[test]
    fn coplanar_points_are_zero() {
        let a = UnitVector3d::x_axis();
        let b = UnitVector3d::y_axis();
        let c = UnitVector3d::new_unchecked(-a.vector());
        assert_eq!(orientation(a, b, c), 0);
    }

    #[test]
    fn exact_fallback_agrees_with_fast_path_away_from_boundary() {
        let a = UnitVector3d::from_angles(
            crate::angle::Angle::from_degrees(10.0),
            crate::angle::Angle::from_degrees(5.0),
        );
        let b = UnitVector3d::from_angles(
            crate::angle::Angle::from_degrees(50.0),
            crate::angle::Angle::from_degrees(-20.0),
        );
        let c = UnitVector3d::from_angles(
            crate::angle::Angle::from_degrees(200.0),
            crate::angle::Angle::from_degrees(30.0),
        );
        assert_eq!(orientation(a, b, c), orientation_exact(a, b, c));
    }

    #[test]
    fn decompose_round_trips() {
        for x in [1.0_f64, -1.0, 0.5, 0.1, 1e-300, 1e300, 0.0] {
            let (m, e) = decompose(x);
            let reconstructed = m as f64 * 2f64.powi(e);
            assert_eq!(reconstructed, x, "failed for {x}");
        }
    }
}
