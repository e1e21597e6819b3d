//! `AreaRestrictor`: the value extracted from a `qserv_areaspec_*` WHERE
//! clause predicate during analysis (§4.5 plugin (b)), and the geometry
//! adapter that turns its string parameters into a [`sphgeom::Region`] for
//! chunk resolution. Grounded on `qproc/geomAdapter.h`.

use crate::error::{InvalidParamCountSnafu, InvalidParamValueSnafu, Result};
use snafu::{ensure, ResultExt};
use sphgeom::{Angle, Circle, ConvexPolygon, Ellipse, LonLat, Region, UnitVector3d};

/// A spatial restrictor extracted from a `qserv_areaspec_box/circle/ellipse/poly`
/// call. Parameters are kept as the original decimal strings from the SQL
/// text (as the original `AreaRestrictor` does) so `sql_fragment` can
/// reproduce them verbatim; they're parsed to `f64` lazily by `to_region`.
#[derive(Clone, Debug, PartialEq)]
pub enum AreaRestrictor {
    Box(Vec<String>),
    Circle(Vec<String>),
    Ellipse(Vec<String>),
    Poly(Vec<String>),
}

impl AreaRestrictor {
    pub fn new_box(params: Vec<String>) -> Result<AreaRestrictor> {
        ensure!(
            params.len() == 4,
            InvalidParamCountSnafu {
                shape: "box",
                expected: "4",
                got: params.len(),
            }
        );
        Ok(AreaRestrictor::Box(params))
    }

    pub fn new_circle(params: Vec<String>) -> Result<AreaRestrictor> {
        ensure!(
            params.len() == 3,
            InvalidParamCountSnafu {
                shape: "circle",
                expected: "3",
                got: params.len(),
            }
        );
        Ok(AreaRestrictor::Circle(params))
    }

    pub fn new_ellipse(params: Vec<String>) -> Result<AreaRestrictor> {
        ensure!(
            params.len() == 5,
            InvalidParamCountSnafu {
                shape: "ellipse",
                expected: "5",
                got: params.len(),
            }
        );
        Ok(AreaRestrictor::Ellipse(params))
    }

    pub fn new_poly(params: Vec<String>) -> Result<AreaRestrictor> {
        ensure!(
            params.len() > 6 && params.len() % 2 == 0,
            InvalidParamCountSnafu {
                shape: "poly",
                expected: "an even number > 6",
                got: params.len(),
            }
        );
        Ok(AreaRestrictor::Poly(params))
    }

    fn params(&self) -> &[String] {
        match self {
            AreaRestrictor::Box(p)
            | AreaRestrictor::Circle(p)
            | AreaRestrictor::Ellipse(p)
            | AreaRestrictor::Poly(p) => p,
        }
    }

    fn func_name(&self) -> &'static str {
        match self {
            AreaRestrictor::Box(_) => "qserv_areaspec_box",
            AreaRestrictor::Circle(_) => "qserv_areaspec_circle",
            AreaRestrictor::Ellipse(_) => "qserv_areaspec_ellipse",
            AreaRestrictor::Poly(_) => "qserv_areaspec_poly",
        }
    }

    /// Reproduces the original `qserv_areaspec_*(...)` call, as it appeared
    /// (and was then stripped) from the WHERE clause.
    pub fn sql_fragment(&self) -> String {
        format!("{}({})", self.func_name(), self.params().join(","))
    }

    fn parsed(&self) -> Result<Vec<f64>> {
        self.params()
            .iter()
            .map(|p| {
                p.trim()
                    .parse::<f64>()
                    .context(InvalidParamValueSnafu { value: p.clone() })
            })
            .collect()
    }

    /// Converts the restrictor's string parameters into the spherical
    /// region the chunker is tested against. Ported from
    /// `getBoxFromParams`/`getCircleFromParams`/`getEllipseFromParams`/
    /// `getConvexPolyFromParams` in `qproc/geomAdapter.h`.
    pub fn to_region(&self) -> Result<Region> {
        let p = self.parsed()?;
        Ok(match self {
            AreaRestrictor::Box(_) => {
                Region::from(sphgeom::Box::from_degrees(p[0], p[2], p[1], p[3]))
            }
            AreaRestrictor::Circle(_) => {
                let center = UnitVector3d::from_lon_lat(LonLat::from_degrees(p[0], p[1]));
                Region::from(Circle::from_center_and_angle(
                    center,
                    Angle::from_degrees(p[2]),
                ))
            }
            AreaRestrictor::Ellipse(_) => Region::from(ellipse_from_params(&p)),
            AreaRestrictor::Poly(_) => {
                let vertices = p
                    .chunks(2)
                    .map(|ll| UnitVector3d::from_lon_lat(LonLat::from_degrees(ll[0], ll[1])))
                    .collect();
                Region::from(ConvexPolygon::new(vertices).expect("validated vertex count"))
            }
        })
    }

    /// Renders the `scisql_s2PtInBox`/`scisql_s2PtInCircle`/... row-level
    /// filter that's kept in the per-chunk parallel SQL alongside chunk
    /// resolution, so the worker doesn't need to re-derive the predicate
    /// from the stripped-out `qserv_areaspec_*` call.
    pub fn as_sci_sql_factor(&self, table: &str, ra_col: &str, decl_col: &str) -> String {
        let point = format!("{}.{},{}.{}", table, ra_col, table, decl_col);
        let func = match self {
            AreaRestrictor::Box(_) => "scisql_s2PtInBox",
            AreaRestrictor::Circle(_) => "scisql_s2PtInCircle",
            AreaRestrictor::Ellipse(_) => "scisql_s2PtInEllipse",
            AreaRestrictor::Poly(_) => "scisql_s2PtInCPoly",
        };
        format!("{}({},{})=1", func, point, self.params().join(","))
    }
}

/// `sg/Ellipse.h`'s simplified foci+angle-sum representation doesn't accept
/// `(center, semiMajorAxisAngle, semiMinorAxisAngle, positionAngle)`
/// directly the way the original's full ellipse constructor does. This
/// derives the two foci from that parameterization using the standard
/// spherical-ellipse relation `cos(alpha) = cos(beta) * cos(gamma)` (center
/// to minor-axis vertex is a spherical right triangle with legs `beta`
/// (center-to-vertex) and `gamma` (center-to-focus), hypotenuse `alpha`),
/// then places both foci at angular distance `gamma` from the center along
/// the position-angle bearing.
fn ellipse_from_params(p: &[f64]) -> Ellipse {
    let center = UnitVector3d::from_lon_lat(LonLat::from_degrees(p[0], p[1]));
    let alpha = Angle::from_degrees(p[2]);
    let beta = Angle::from_degrees(p[3]);
    let pos_angle = Angle::from_degrees(p[4]);

    let cos_gamma = (sphgeom::cos(alpha) / sphgeom::cos(beta)).clamp(-1.0, 1.0);
    let gamma = cos_gamma.acos();

    let lon = p[0].to_radians();
    let lat = p[1].to_radians();
    let north = sphgeom::Vector3d::new(
        -lat.sin() * lon.cos(),
        -lat.sin() * lon.sin(),
        lat.cos(),
    );
    let east = sphgeom::Vector3d::new(-lon.sin(), lon.cos(), 0.0);
    let bearing = north * sphgeom::cos(pos_angle) + east * sphgeom::sin(pos_angle);

    let sin_gamma = gamma.sin();
    let cos_gamma = gamma.cos();
    let f1 = UnitVector3d::new(center.vector() * cos_gamma + bearing * sin_gamma);
    let f2 = UnitVector3d::new(center.vector() * cos_gamma - bearing * sin_gamma);
    Ellipse::new(f1, f2, alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_sql_fragment_round_trips() {
        let ar = AreaRestrictor::new_box(vec!["2".into(), "2".into(), "3".into(), "3".into()])
            .unwrap();
        assert_eq!(ar.sql_fragment(), "qserv_areaspec_box(2,2,3,3)");
    }

    #[test]
    fn box_sci_sql_factor_renders_predicate() {
        let ar = AreaRestrictor::new_box(vec!["2".into(), "2".into(), "3".into(), "3".into()])
            .unwrap();
        assert_eq!(
            ar.as_sci_sql_factor("Object", "ra", "decl"),
            "scisql_s2PtInBox(Object.ra,Object.decl,2,2,3,3)=1"
        );
    }

    #[test]
    fn rejects_wrong_param_count() {
        let err = AreaRestrictor::new_circle(vec!["1".into()]).unwrap_err();
        test_helpers::assert_error_contains(&err, "invalid number of parameters for circle");
    }

    #[test]
    fn rejects_odd_polygon_param_count() {
        let err =
            AreaRestrictor::new_poly(vec!["1".into(), "2".into(), "3".into()]).unwrap_err();
        test_helpers::assert_error_contains(&err, "invalid number of parameters for poly");
    }

    #[test]
    fn box_to_region_contains_its_center() {
        let ar = AreaRestrictor::new_box(vec![
            "10".into(),
            "10".into(),
            "20".into(),
            "20".into(),
        ])
        .unwrap();
        let region = ar.to_region().unwrap();
        let center = UnitVector3d::from_lon_lat(LonLat::from_degrees(15.0, 15.0));
        assert!(region.contains(center));
    }

    #[test]
    fn ellipse_foci_are_symmetric_around_center() {
        let ar = AreaRestrictor::new_ellipse(vec![
            "0".into(),
            "0".into(),
            "2".into(),
            "1".into(),
            "0".into(),
        ])
        .unwrap();
        let region = ar.to_region().unwrap();
        let center = UnitVector3d::from_lon_lat(LonLat::from_degrees(0.0, 0.0));
        assert!(region.contains(center));
    }
}
