use crate::angle::Angle;
use crate::normalized_angle::NormalizedAngle;
use crate::vector3d::Vector3d;

/// A spherical coordinate (longitude, latitude) pair.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct LonLat {
    lon: NormalizedAngle,
    lat: Angle,
}

impl LonLat {
    pub fn from_degrees(lon: f64, lat: f64) -> LonLat {
        LonLat {
            lon: NormalizedAngle::from_degrees(lon),
            lat: Angle::from_degrees(lat),
        }
    }

    pub fn from_radians(lon: f64, lat: f64) -> LonLat {
        LonLat {
            lon: NormalizedAngle::from_radians(lon),
            lat: Angle::from_radians(lat),
        }
    }

    pub fn new(lon: NormalizedAngle, lat: Angle) -> LonLat {
        LonLat { lon, lat }
    }

    /// The point on the unit sphere in the direction of `v`.
    pub fn from_vector(v: Vector3d) -> LonLat {
        LonLat::new(LonLat::longitude_of(v), LonLat::latitude_of(v))
    }

    pub fn longitude_of(v: Vector3d) -> NormalizedAngle {
        NormalizedAngle::from_radians(v.y().atan2(v.x()))
    }

    pub fn latitude_of(v: Vector3d) -> Angle {
        let norm = v.norm();
        if norm == 0.0 {
            Angle::nan()
        } else {
            Angle::from_radians((v.z() / norm).asin())
        }
    }

    pub fn lon(self) -> NormalizedAngle {
        self.lon
    }

    pub fn lat(self) -> Angle {
        self.lat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equator_prime_meridian() {
        let p = LonLat::from_vector(Vector3d::new(1.0, 0.0, 0.0));
        assert!((p.lon().as_degrees()).abs() < 1e-9);
        assert!((p.lat().as_degrees()).abs() < 1e-9);
    }

    #[test]
    fn north_pole() {
        let p = LonLat::from_vector(Vector3d::new(0.0, 0.0, 1.0));
        assert!((p.lat().as_degrees() - 90.0).abs() < 1e-9);
    }
}
