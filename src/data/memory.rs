//! In-memory target chains.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::{Field, FieldValue, TargetData, TargetPosition, UseFlag, Utn, Velocity};
use crate::geo::{min_angle_difference, normalize_angle};
use crate::utils::{seconds, Timestamp};

/// One reference or test update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: Timestamp,
    pub position: TargetPosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_bit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_identification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_address: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_a: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_c: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<Velocity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_num: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<u32>,
}

impl Sample {
    pub fn new(timestamp: Timestamp, position: TargetPosition) -> Self {
        Self {
            timestamp,
            position,
            ground_bit: None,
            target_identification: None,
            target_address: None,
            mode_a: None,
            mode_c: None,
            velocity: None,
            track_num: None,
            data_source: None,
        }
    }

    pub fn with_ground_bit(mut self, set: bool) -> Self {
        self.ground_bit = Some(set);
        self
    }

    pub fn with_identification(mut self, ident: impl Into<String>) -> Self {
        self.target_identification = Some(ident.into());
        self
    }

    pub fn with_address(mut self, address: u32) -> Self {
        self.target_address = Some(address);
        self
    }

    pub fn with_mode_a(mut self, code: u32) -> Self {
        self.mode_a = Some(code);
        self
    }

    pub fn with_mode_c(mut self, altitude_ft: f64) -> Self {
        self.mode_c = Some(altitude_ft);
        self
    }

    pub fn with_velocity(mut self, speed: f64, track_angle: f64) -> Self {
        self.velocity = Some(Velocity::new(speed, track_angle));
        self
    }

    pub fn with_track_num(mut self, track_num: u32) -> Self {
        self.track_num = Some(track_num);
        self
    }

    pub fn with_data_source(mut self, ds_id: u32) -> Self {
        self.data_source = Some(ds_id);
        self
    }

    pub fn value(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::TargetIdentification => self.target_identification.clone().map(FieldValue::Text),
            Field::TargetAddress => self.target_address.map(FieldValue::Code),
            Field::ModeA => self.mode_a.map(FieldValue::Code),
            Field::ModeC => self.mode_c.map(FieldValue::Altitude),
        }
    }

    fn has_secondary(&self) -> bool {
        self.target_identification.is_some()
            || self.target_address.is_some()
            || self.mode_a.is_some()
            || self.mode_c.is_some()
    }
}

/// Time window whose samples are excluded from evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExcludedWindow {
    pub begin: Timestamp,
    pub end: Timestamp,
}

#[derive(Deserialize)]
struct TargetRecord {
    utn: Utn,
    #[serde(default)]
    reference: Vec<Sample>,
    #[serde(default)]
    test: Vec<Sample>,
    #[serde(default)]
    excluded: Vec<ExcludedWindow>,
    #[serde(default = "default_use")]
    use_target: bool,
}

fn default_use() -> bool {
    true
}

impl From<TargetRecord> for InMemoryTarget {
    fn from(record: TargetRecord) -> Self {
        let mut target = InMemoryTarget::new(record.utn, record.reference, record.test);
        target.excluded = record.excluded;
        target.use_flag.set(record.use_target);
        target
    }
}

/// Target backed by two time-sorted sample vectors.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "TargetRecord")]
pub struct InMemoryTarget {
    utn: Utn,
    reference: Vec<Sample>,
    test: Vec<Sample>,
    excluded: Vec<ExcludedWindow>,
    use_flag: UseFlag,
    primary_only: bool,
    mode_s: bool,
}

impl InMemoryTarget {
    pub fn new(utn: Utn, mut reference: Vec<Sample>, mut test: Vec<Sample>) -> Self {
        reference.sort_by_key(|s| s.timestamp);
        test.sort_by_key(|s| s.timestamp);
        test.dedup_by_key(|s| s.timestamp);

        let primary_only = !reference.iter().chain(test.iter()).any(Sample::has_secondary);
        let mode_s = test.iter().any(|s| s.target_address.is_some());

        Self {
            utn,
            reference,
            test,
            excluded: Vec::new(),
            use_flag: UseFlag::default(),
            primary_only,
            mode_s,
        }
    }

    pub fn with_excluded(mut self, begin: Timestamp, end: Timestamp) -> Self {
        self.excluded.push(ExcludedWindow { begin, end });
        self
    }

    pub fn reference(&self) -> &[Sample] {
        &self.reference
    }

    pub fn test(&self) -> &[Sample] {
        &self.test
    }

    fn find(samples: &[Sample], t: Timestamp) -> Option<&Sample> {
        samples
            .binary_search_by(|s| s.timestamp.cmp(&t))
            .ok()
            .map(|i| &samples[i])
    }

    fn tst(&self, t: Timestamp) -> Option<&Sample> {
        Self::find(&self.test, t)
    }

    fn mapped_samples(&self, t: Timestamp, max_diff: Duration) -> (Option<&Sample>, Option<&Sample>) {
        let idx = self.reference.partition_point(|s| s.timestamp < t);

        let upper = self.reference.get(idx).filter(|s| s.timestamp - t <= max_diff);
        if let Some(exact) = upper.filter(|s| s.timestamp == t) {
            return (Some(exact), Some(exact));
        }

        let lower = idx
            .checked_sub(1)
            .and_then(|i| self.reference.get(i))
            .filter(|s| t - s.timestamp <= max_diff);

        (lower, upper)
    }

    fn fraction(lower: &Sample, upper: &Sample, t: Timestamp) -> f64 {
        let total = seconds(upper.timestamp - lower.timestamp);
        if total <= 0.0 {
            return 0.0;
        }
        seconds(t - lower.timestamp) / total
    }
}

impl TargetData for InMemoryTarget {
    fn utn(&self) -> Utn {
        self.utn
    }

    fn use_flag(&self) -> UseFlag {
        self.use_flag.clone()
    }

    fn is_primary_only(&self) -> bool {
        self.primary_only
    }

    fn is_mode_s(&self) -> bool {
        self.mode_s
    }

    fn num_ref_updates(&self) -> usize {
        self.reference.len()
    }

    fn num_tst_updates(&self) -> usize {
        self.test.len()
    }

    fn tst_timestamps(&self) -> Vec<Timestamp> {
        self.test.iter().map(|s| s.timestamp).collect()
    }

    fn ref_timestamps(&self) -> Vec<Timestamp> {
        self.reference.iter().map(|s| s.timestamp).collect()
    }

    fn tst_pos(&self, t: Timestamp) -> Option<TargetPosition> {
        self.tst(t).map(|s| s.position)
    }

    fn ref_pos(&self, t: Timestamp) -> Option<TargetPosition> {
        Self::find(&self.reference, t).map(|s| s.position)
    }

    fn tst_value(&self, t: Timestamp, field: Field) -> Option<FieldValue> {
        self.tst(t).and_then(|s| s.value(field))
    }

    fn ref_value(&self, t: Timestamp, field: Field) -> Option<FieldValue> {
        Self::find(&self.reference, t).and_then(|s| s.value(field))
    }

    fn tst_velocity(&self, t: Timestamp) -> Option<Velocity> {
        self.tst(t).and_then(|s| s.velocity)
    }

    fn tst_ground_bit(&self, t: Timestamp) -> Option<bool> {
        self.tst(t).and_then(|s| s.ground_bit)
    }

    fn tst_track_num(&self, t: Timestamp) -> Option<u32> {
        self.tst(t).and_then(|s| s.track_num)
    }

    fn tst_data_source(&self, t: Timestamp) -> Option<u32> {
        self.tst(t).and_then(|s| s.data_source)
    }

    fn ref_ground_bit(&self, t: Timestamp, tolerance: Duration) -> Option<bool> {
        if let Some(gb) = Self::find(&self.reference, t).and_then(|s| s.ground_bit) {
            return Some(gb);
        }

        let idx = self.reference.partition_point(|s| s.timestamp < t);
        let before = self.reference[..idx]
            .iter()
            .rev()
            .take_while(|s| t - s.timestamp <= tolerance)
            .find(|s| s.ground_bit.is_some());
        let after = self.reference[idx..]
            .iter()
            .take_while(|s| s.timestamp - t <= tolerance)
            .find(|s| s.ground_bit.is_some());

        match (before, after) {
            (Some(b), Some(a)) if t - b.timestamp <= a.timestamp - t => b.ground_bit,
            (_, Some(a)) => a.ground_bit,
            (Some(b), None) => b.ground_bit,
            (None, None) => None,
        }
    }

    fn mapped_ref_times(&self, t: Timestamp, max_diff: Duration) -> (Option<Timestamp>, Option<Timestamp>) {
        let (lower, upper) = self.mapped_samples(t, max_diff);
        (lower.map(|s| s.timestamp), upper.map(|s| s.timestamp))
    }

    fn mapped_ref_pos(&self, t: Timestamp, max_diff: Duration) -> Option<TargetPosition> {
        match self.mapped_samples(t, max_diff) {
            (Some(l), Some(u)) if l.timestamp == u.timestamp => Some(l.position),
            (Some(l), Some(u)) => {
                let f = Self::fraction(l, u, t);
                let (p0, p1) = (l.position, u.position);
                let altitude = match (p0.altitude, p1.altitude) {
                    (Some(a0), Some(a1)) => Some(a0 + f * (a1 - a0)),
                    (a0, a1) => a0.or(a1),
                };
                Some(TargetPosition {
                    latitude: p0.latitude + f * (p1.latitude - p0.latitude),
                    longitude: p0.longitude + f * (p1.longitude - p0.longitude),
                    altitude,
                })
            }
            _ => None,
        }
    }

    fn mapped_ref_velocity(&self, t: Timestamp, max_diff: Duration) -> Option<Velocity> {
        match self.mapped_samples(t, max_diff) {
            (Some(l), Some(u)) if l.timestamp == u.timestamp => l.velocity,
            (Some(l), Some(u)) => {
                let (v0, v1) = (l.velocity?, u.velocity?);
                let f = Self::fraction(l, u, t);
                let turn = min_angle_difference(v1.track_angle, v0.track_angle);
                Some(Velocity {
                    speed: v0.speed + f * (v1.speed - v0.speed),
                    track_angle: normalize_angle(v0.track_angle + f * turn),
                })
            }
            _ => None,
        }
    }

    fn is_timestamp_excluded(&self, t: Timestamp) -> bool {
        self.excluded.iter().any(|w| t >= w.begin && t <= w.end)
    }
}
