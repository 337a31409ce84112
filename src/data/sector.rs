//! Sector layers and containment checks.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::TargetPosition;

/// Containment capability consumed by the evaluators.
pub trait SectorContainment: Send + Sync {
    fn is_inside(&self, pos: &TargetPosition, has_ground_bit: bool, ground_bit_set: bool) -> bool;

    fn lat_min_max(&self) -> (f64, f64);
    fn lon_min_max(&self) -> (f64, f64);
}

/// Polygon sector with an optional altitude band (feet).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Sector {
    pub name: String,
    /// Polygon vertices as `[latitude, longitude]`.
    pub points: Vec<[f64; 2]>,
    #[serde(default)]
    pub min_altitude: Option<f64>,
    #[serde(default)]
    pub max_altitude: Option<f64>,
    /// Exclusion area punched out of the layer.
    #[serde(default)]
    pub exclude: bool,
}

impl Sector {
    pub fn new(name: impl Into<String>, points: Vec<[f64; 2]>) -> Self {
        Self {
            name: name.into(),
            points,
            min_altitude: None,
            max_altitude: None,
            exclude: false,
        }
    }

    pub fn with_altitude_band(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_altitude = min;
        self.max_altitude = max;
        self
    }

    pub fn excluding(mut self) -> Self {
        self.exclude = true;
        self
    }

    /// Ray casting over the polygon, latitude as y.
    pub fn contains_horizontal(&self, latitude: f64, longitude: f64) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let [yi, xi] = self.points[i];
            let [yj, xj] = self.points[j];
            if (yi > latitude) != (yj > latitude) {
                let x_cross = (xj - xi) * (latitude - yi) / (yj - yi) + xi;
                if longitude < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// On-ground reports and reports without altitude satisfy any band.
    pub fn contains_vertical(&self, pos: &TargetPosition, has_ground_bit: bool, ground_bit_set: bool) -> bool {
        if has_ground_bit && ground_bit_set {
            return true;
        }
        let Some(alt) = pos.altitude else {
            return true;
        };
        self.min_altitude.map_or(true, |min| alt >= min) && self.max_altitude.map_or(true, |max| alt <= max)
    }

    pub fn contains(&self, pos: &TargetPosition, has_ground_bit: bool, ground_bit_set: bool) -> bool {
        self.contains_horizontal(pos.latitude, pos.longitude)
            && self.contains_vertical(pos, has_ground_bit, ground_bit_set)
    }
}

/// Named group of sectors evaluated together.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SectorLayer {
    pub name: String,
    pub sectors: Vec<Sector>,
}

impl SectorLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), sectors: Vec::new() }
    }

    pub fn with_sector(mut self, sector: Sector) -> Self {
        self.sectors.push(sector);
        self
    }

    fn bounds(&self, axis: usize) -> (f64, f64) {
        self.sectors
            .iter()
            .filter(|s| !s.exclude)
            .flat_map(|s| s.points.iter().map(move |p| p[axis]))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
    }
}

impl SectorContainment for SectorLayer {
    fn is_inside(&self, pos: &TargetPosition, has_ground_bit: bool, ground_bit_set: bool) -> bool {
        let (lat_min, lat_max) = self.lat_min_max();
        let (lon_min, lon_max) = self.lon_min_max();
        if pos.latitude < lat_min || pos.latitude > lat_max || pos.longitude < lon_min || pos.longitude > lon_max {
            return false;
        }

        let included = self
            .sectors
            .iter()
            .any(|s| !s.exclude && s.contains(pos, has_ground_bit, ground_bit_set));

        included
            && !self
                .sectors
                .iter()
                .any(|s| s.exclude && s.contains(pos, has_ground_bit, ground_bit_set))
    }

    fn lat_min_max(&self) -> (f64, f64) {
        self.bounds(0)
    }

    fn lon_min_max(&self) -> (f64, f64) {
        self.bounds(1)
    }
}
