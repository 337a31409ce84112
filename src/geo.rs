//! WGS-84 geodesy for the deviation evaluators
//!
//! - local east/north offsets in a tangent plane at a reference point
//! - ellipsoidal (Vincenty) distances
//! - polar coordinates about registered sensor positions
//!
//! Every function returns `None` instead of a non-finite number so that
//! callers can count calculation errors.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::data::TargetPosition;

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);
const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);

pub const FT2M: f64 = 0.3048;
pub const KNOTS2M_S: f64 = 1852.0 / 3600.0;

/// Normalizes an angle into `[0, 360)` degrees.
pub fn normalize_angle(deg: f64) -> f64 {
    let a = deg.rem_euclid(360.0);
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// Signed minimal difference `a - b` in degrees, within `[-180, 180)`.
pub fn min_angle_difference(a: f64, b: f64) -> f64 {
    (a - b + 180.0).rem_euclid(360.0) - 180.0
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

fn ecef(latitude: f64, longitude: f64, height_m: f64) -> [f64; 3] {
    let (lat, lon) = (latitude.to_radians(), longitude.to_radians());
    let n = WGS84_A / (1.0 - WGS84_E2 * lat.sin().powi(2)).sqrt();
    [
        (n + height_m) * lat.cos() * lon.cos(),
        (n + height_m) * lat.cos() * lon.sin(),
        (n * (1.0 - WGS84_E2) + height_m) * lat.sin(),
    ]
}

/// East/north/up offset of `pos` in the tangent plane at `origin` (heights in metres).
pub fn enu(origin: &TargetPosition, origin_height_m: f64, pos: &TargetPosition, height_m: f64) -> Option<[f64; 3]> {
    let o = ecef(origin.latitude, origin.longitude, origin_height_m);
    let p = ecef(pos.latitude, pos.longitude, height_m);
    let d = [p[0] - o[0], p[1] - o[1], p[2] - o[2]];

    let (lat, lon) = (origin.latitude.to_radians(), origin.longitude.to_radians());
    let (slat, clat, slon, clon) = (lat.sin(), lat.cos(), lon.sin(), lon.cos());

    let east = -slon * d[0] + clon * d[1];
    let north = -slat * clon * d[0] - slat * slon * d[1] + clat * d[2];
    let up = clat * clon * d[0] + clat * slon * d[1] + slat * d[2];

    Some([finite(east)?, finite(north)?, finite(up)?])
}

/// Horizontal east/north offset of `pos` relative to `origin`, both projected at zero height.
pub fn local_offset(origin: &TargetPosition, pos: &TargetPosition) -> Option<(f64, f64)> {
    enu(origin, 0.0, pos, 0.0).map(|[e, n, _]| (e, n))
}

/// Ellipsoidal distance in metres (Vincenty inverse). `None` if the
/// iteration does not converge, e.g. for nearly antipodal points.
pub fn geodesic_distance(a: &TargetPosition, b: &TargetPosition) -> Option<f64> {
    let l = (b.longitude - a.longitude).to_radians();
    let u1 = ((1.0 - WGS84_F) * a.latitude.to_radians().tan()).atan();
    let u2 = ((1.0 - WGS84_F) * b.latitude.to_radians().tan()).atan();
    let (su1, cu1, su2, cu2) = (u1.sin(), u1.cos(), u2.sin(), u2.cos());

    let mut lambda = l;
    for _ in 0..200 {
        let (sl, cl) = (lambda.sin(), lambda.cos());
        let sin_sigma = ((cu2 * sl).powi(2) + (cu1 * su2 - su1 * cu2 * cl).powi(2)).sqrt();
        if sin_sigma == 0.0 {
            return Some(0.0);
        }
        let cos_sigma = su1 * su2 + cu1 * cu2 * cl;
        let sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cu1 * cu2 * sl / sin_sigma;
        let cos2_alpha = 1.0 - sin_alpha * sin_alpha;
        let cos_2sm = if cos2_alpha != 0.0 {
            cos_sigma - 2.0 * su1 * su2 / cos2_alpha
        } else {
            0.0
        };
        let c = WGS84_F / 16.0 * cos2_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos2_alpha));
        let prev = lambda;
        lambda = l
            + (1.0 - c)
                * WGS84_F
                * sin_alpha
                * (sigma + c * sin_sigma * (cos_2sm + c * cos_sigma * (-1.0 + 2.0 * cos_2sm * cos_2sm)));

        if (lambda - prev).abs() < 1e-12 {
            let u_sq = cos2_alpha * (WGS84_A * WGS84_A - WGS84_B * WGS84_B) / (WGS84_B * WGS84_B);
            let big_a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
            let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
            let delta_sigma = big_b
                * sin_sigma
                * (cos_2sm
                    + big_b / 4.0
                        * (cos_sigma * (-1.0 + 2.0 * cos_2sm * cos_2sm)
                            - big_b / 6.0
                                * cos_2sm
                                * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                                * (-3.0 + 4.0 * cos_2sm * cos_2sm)));
            return finite(WGS84_B * big_a * (sigma - delta_sigma));
        }
    }
    None
}

/// Along- and across-track components of the reference-to-test offset.
///
/// Along is positive ahead of the reference, across positive to its right.
pub fn along_across(reference: &TargetPosition, track_angle_deg: f64, test: &TargetPosition) -> Option<(f64, f64)> {
    let (east, north) = local_offset(reference, test)?;
    let distance = east.hypot(north);
    let bearing = east.atan2(north);
    let rel = bearing - track_angle_deg.to_radians();
    Some((finite(distance * rel.cos())?, finite(distance * rel.sin())?))
}

/// Ground range (m) and azimuth (deg) as seen from a sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Polar {
    pub ground_range: f64,
    pub azimuth: f64,
}

/// Sensor site of a data source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SensorSite {
    pub latitude: f64,
    pub longitude: f64,
    /// Antenna height above the ellipsoid in metres.
    #[serde(default)]
    pub height: f64,
}

/// Coordinate systems of the reporting sensors, registered once per run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DataSourceRegistry {
    #[serde(default)]
    sites: BTreeMap<u32, SensorSite>,
}

impl DataSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, ds_id: u32, site: SensorSite) {
        self.sites.insert(ds_id, site);
    }

    pub fn with_site(mut self, ds_id: u32, site: SensorSite) -> Self {
        self.register(ds_id, site);
        self
    }

    pub fn has(&self, ds_id: u32) -> bool {
        self.sites.contains_key(&ds_id)
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Horizontal polar coordinates of `pos` (at zero height) about the sensor.
    pub fn polar(&self, ds_id: u32, pos: &TargetPosition) -> Option<Polar> {
        let site = self.sites.get(&ds_id)?;
        let origin = TargetPosition::new(site.latitude, site.longitude);
        let [east, north, _] = enu(&origin, site.height, pos, 0.0)?;
        Some(Polar {
            ground_range: finite(east.hypot(north))?,
            azimuth: normalize_angle(finite(east.atan2(north).to_degrees())?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angles() {
        assert_eq!(normalize_angle(-10.0), 350.0);
        assert_eq!(normalize_angle(720.0), 0.0);
        assert_eq!(min_angle_difference(10.0, 350.0), 20.0);
        assert_eq!(min_angle_difference(350.0, 10.0), -20.0);
        assert_eq!(min_angle_difference(90.0, 90.0), 0.0);
    }

    #[test]
    fn test_geodesic_distance_one_degree_latitude() {
        let a = TargetPosition::new(0.0, 0.0);
        let b = TargetPosition::new(1.0, 0.0);
        let d = geodesic_distance(&a, &b).unwrap();
        assert!((d - 110_574.4).abs() < 1.0, "got {}", d);
        assert_eq!(geodesic_distance(&a, &a), Some(0.0));
    }

    #[test]
    fn test_along_across() {
        let reference = TargetPosition::new(48.0, 16.0);
        // ~111 m north of the reference
        let test = TargetPosition::new(48.001, 16.0);

        let (along, across) = along_across(&reference, 0.0, &test).unwrap();
        assert!((along - 111.2).abs() < 0.5, "along {}", along);
        assert!(across.abs() < 0.5);

        // heading east: the offset is to the left
        let (along, across) = along_across(&reference, 90.0, &test).unwrap();
        assert!(along.abs() < 0.5);
        assert!((across + 111.2).abs() < 0.5, "across {}", across);
    }

    #[test]
    fn test_registry_polar() {
        let registry = DataSourceRegistry::new().with_site(
            1,
            SensorSite { latitude: 48.0, longitude: 16.0, height: 0.0 },
        );
        let east = registry.polar(1, &TargetPosition::new(48.0, 16.1)).unwrap();
        assert!((east.azimuth - 90.0).abs() < 0.1);
        assert!((east.ground_range - 7_460.0).abs() < 20.0, "range {}", east.ground_range);
        assert!(registry.polar(2, &TargetPosition::new(48.0, 16.1)).is_none());
    }
}
