//! Target data and sector containment contracts
//!
//! The evaluation core reads reference and test samples only through
//! [`TargetData`] and scopes them with [`SectorContainment`]. Loading and
//! construction of targets happen elsewhere; [`InMemoryTarget`] is the
//! implementation used by the driver, tests and benches.

pub mod memory;
pub mod sector;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Duration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::utils::Timestamp;

pub use memory::{InMemoryTarget, Sample};
pub use sector::{Sector, SectorContainment, SectorLayer};

/// Unique target number.
pub type Utn = u32;

/// WGS-84 position, altitude in feet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TargetPosition {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
}

impl TargetPosition {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude, altitude: None }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }
}

/// Ground speed in m/s and track angle in degrees (north = 0, clockwise).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Velocity {
    pub speed: f64,
    pub track_angle: f64,
}

impl Velocity {
    pub fn new(speed: f64, track_angle: f64) -> Self {
        Self { speed, track_angle }
    }
}

/// Optional secondary fields compared between test and reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    TargetIdentification,
    TargetAddress,
    ModeA,
    ModeC,
}

impl Field {
    pub fn short_name(&self) -> &'static str {
        match self {
            Field::TargetIdentification => "ACID",
            Field::TargetAddress => "ACAD",
            Field::ModeA => "M3A",
            Field::ModeC => "MC",
        }
    }

    /// Renders a value the way operators read it: addresses in hex, Mode 3/A in octal.
    pub fn format(&self, value: &FieldValue) -> String {
        match (self, value) {
            (Field::TargetAddress, FieldValue::Code(c)) => format!("{:06X}", c),
            (Field::ModeA, FieldValue::Code(c)) => format!("{:04o}", c),
            (_, v) => v.to_string(),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Code(u32),
    Altitude(f64),
}

impl FieldValue {
    /// Equality, with `tolerance` applied to altitudes only.
    pub fn matches(&self, other: &FieldValue, tolerance: f64) -> bool {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => a.trim() == b.trim(),
            (FieldValue::Code(a), FieldValue::Code(b)) => a == b,
            (FieldValue::Altitude(a), FieldValue::Altitude(b)) => (a - b).abs() <= tolerance,
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s.trim()),
            FieldValue::Code(c) => write!(f, "{}", c),
            FieldValue::Altitude(a) => write!(f, "{:.2}", a),
        }
    }
}

/// Operator-settable "use this target" switch, shared between a target and
/// the results computed from it.
#[derive(Debug, Clone)]
pub struct UseFlag(Arc<AtomicBool>);

impl UseFlag {
    pub fn new(value: bool) -> Self {
        Self(Arc::new(AtomicBool::new(value)))
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, value: bool) {
        self.0.store(value, Ordering::Release)
    }
}

impl Default for UseFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Read-only access to one target's reference and test samples.
///
/// Test timestamps are unique per target. All lookups return `None` for
/// absent data instead of failing.
pub trait TargetData: Send + Sync {
    fn utn(&self) -> Utn;
    fn use_flag(&self) -> UseFlag;

    /// No secondary surveillance data in either chain.
    fn is_primary_only(&self) -> bool;
    fn is_mode_s(&self) -> bool;

    fn num_ref_updates(&self) -> usize;
    fn num_tst_updates(&self) -> usize;

    fn tst_timestamps(&self) -> Vec<Timestamp>;
    fn ref_timestamps(&self) -> Vec<Timestamp>;

    fn tst_pos(&self, t: Timestamp) -> Option<TargetPosition>;
    fn ref_pos(&self, t: Timestamp) -> Option<TargetPosition>;

    fn tst_value(&self, t: Timestamp, field: Field) -> Option<FieldValue>;
    /// Value of the reference sample exactly at `t`.
    fn ref_value(&self, t: Timestamp, field: Field) -> Option<FieldValue>;

    fn tst_velocity(&self, t: Timestamp) -> Option<Velocity>;
    fn tst_ground_bit(&self, t: Timestamp) -> Option<bool>;
    fn tst_track_num(&self, t: Timestamp) -> Option<u32>;
    fn tst_data_source(&self, t: Timestamp) -> Option<u32>;

    /// Reference ground bit at `t`, falling back to the nearest reference
    /// sample carrying one within `tolerance`.
    fn ref_ground_bit(&self, t: Timestamp, tolerance: Duration) -> Option<bool>;

    /// Reference timestamps bracketing `t` (lower <= t <= upper) within `max_diff`.
    fn mapped_ref_times(&self, t: Timestamp, max_diff: Duration) -> (Option<Timestamp>, Option<Timestamp>);

    /// Reference position at `t`: exact sample or interpolation between both neighbours.
    fn mapped_ref_pos(&self, t: Timestamp, max_diff: Duration) -> Option<TargetPosition>;
    fn mapped_ref_velocity(&self, t: Timestamp, max_diff: Duration) -> Option<Velocity>;

    fn is_timestamp_excluded(&self, _t: Timestamp) -> bool {
        false
    }

    fn has_mapped_ref_data(&self, t: Timestamp, max_diff: Duration) -> bool {
        let (lower, upper) = self.mapped_ref_times(t, max_diff);
        lower.is_some() || upper.is_some()
    }
}
