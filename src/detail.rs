//! Evidence details
//!
//! Every evaluator records one [`EvaluationDetail`] per interesting sample:
//! when it happened, where (one or more positions), the named values that
//! decided it and a human readable comment. Details are append-only and
//! keep their append order; running counters stored in them never decrease.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::TargetPosition;
use crate::utils::Timestamp;

/// Value keys shared by the evaluator families.
pub mod keys {
    pub const POS_INSIDE: &str = "PosInside";
    pub const REF_EXISTS: &str = "RefExists";
    pub const IS_NOT_OK: &str = "IsNotOk";
    pub const VALUE: &str = "Value";
    pub const THRESHOLD: &str = "Threshold";
    pub const VALUE_ACROSS: &str = "ValueAcross";
    pub const THRESHOLD_ACROSS: &str = "ThresholdAcross";
    pub const CHECK_PASSED: &str = "CheckPassed";
    pub const NUM_UPDATES: &str = "NumUpdates";
    pub const NUM_NO_REF: &str = "NumNoRef";
    pub const NUM_INSIDE: &str = "NumInside";
    pub const NUM_OUTSIDE: &str = "NumOutside";
    pub const NUM_PRESENT: &str = "NumPresent";
    pub const NUM_MISSING: &str = "NumMissing";
    pub const NUM_CORRECT: &str = "NumCorrect";
    pub const NUM_NOT_CORRECT: &str = "NumNotCorrect";
    pub const NUM_UNKNOWN: &str = "NumUnknown";
    pub const NUM_PASSED: &str = "NumPassed";
    pub const NUM_FAILED: &str = "NumFailed";
    pub const NUM_EXTRA: &str = "NumExtra";
    pub const NUM_OK: &str = "NumOk";
    pub const DIFF_TOD: &str = "DiffTOD";
    pub const MISS_OCCURRED: &str = "MissOccurred";
    pub const MISSED_UIS: &str = "MissedUIs";
    pub const TRACK_NUM: &str = "TrackNum";
    pub const EXTRA: &str = "Extra";
    pub const DUBIOUS: &str = "Dubious";
    pub const DURATION: &str = "Duration";
}

/// Comment group collecting per-reason dubious markers.
pub const DUBIOUS_REASONS: &str = "dubious";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationDetail {
    timestamp: Timestamp,
    positions: Vec<TargetPosition>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    values: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    comment: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    comment_groups: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<EvaluationDetail>,
}

impl EvaluationDetail {
    pub fn new(timestamp: Timestamp, position: TargetPosition) -> Self {
        Self::with_positions(timestamp, vec![position])
    }

    pub fn with_positions(timestamp: Timestamp, positions: Vec<TargetPosition>) -> Self {
        Self {
            timestamp,
            positions,
            values: BTreeMap::new(),
            comment: String::new(),
            comment_groups: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn add_position(mut self, position: Option<TargetPosition>) -> Self {
        if let Some(p) = position {
            self.positions.push(p);
        }
        self
    }

    pub fn with_value(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    /// Sets a value if present; `None` leaves the key unset.
    pub fn with_opt_value<V: Into<Value>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with_value(key, v),
            None => self,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_children(mut self, children: Vec<EvaluationDetail>) -> Self {
        self.children = children;
        self
    }

    pub fn add_group_comment(&mut self, group: &str, id: &str, text: impl Into<String>) {
        self.comment_groups
            .entry(group.to_string())
            .or_default()
            .insert(id.to_string(), text.into());
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn positions(&self) -> &[TargetPosition] {
        &self.positions
    }

    pub fn num_positions(&self) -> usize {
        self.positions.len()
    }

    pub fn first_pos(&self) -> Option<&TargetPosition> {
        self.positions.first()
    }

    pub fn last_pos(&self) -> Option<&TargetPosition> {
        self.positions.last()
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn comment_group(&self, group: &str) -> Option<&BTreeMap<String, String>> {
        self.comment_groups.get(group)
    }

    pub fn children(&self) -> &[EvaluationDetail] {
        &self.children
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn value_bool(&self, key: &str) -> Option<bool> {
        self.value(key).and_then(Value::as_bool)
    }

    pub fn value_u64(&self, key: &str) -> Option<u64> {
        self.value(key).and_then(Value::as_u64)
    }

    pub fn value_f64(&self, key: &str) -> Option<f64> {
        self.value(key).and_then(Value::as_f64)
    }

    /// Bounding box `(lat_min, lat_max, lon_min, lon_max)` of all positions,
    /// grown by `eps` degrees.
    pub fn bounds(&self, eps: f64) -> Option<(f64, f64, f64, f64)> {
        let first = self.positions.first()?;
        let init = (first.latitude, first.latitude, first.longitude, first.longitude);
        let (lat_min, lat_max, lon_min, lon_max) = self.positions.iter().fold(init, |b, p| {
            (b.0.min(p.latitude), b.1.max(p.latitude), b.2.min(p.longitude), b.3.max(p.longitude))
        });
        Some((lat_min - eps, lat_max + eps, lon_min - eps, lon_max + eps))
    }
}

pub type Details = Vec<EvaluationDetail>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::from_epoch_secs;

    #[test]
    fn test_detail_builder() {
        let mut d = EvaluationDetail::new(from_epoch_secs(1.0), TargetPosition::new(48.0, 16.0))
            .add_position(Some(TargetPosition::new(48.5, 15.5)))
            .add_position(None)
            .with_value(keys::CHECK_PASSED, true)
            .with_value(keys::VALUE, 12.5)
            .with_opt_value::<f64>(keys::DIFF_TOD, None)
            .with_comment("Passed");
        d.add_group_comment(DUBIOUS_REASONS, "Spd", "310.2");

        assert_eq!(d.num_positions(), 2);
        assert_eq!(d.value_bool(keys::CHECK_PASSED), Some(true));
        assert_eq!(d.value_f64(keys::VALUE), Some(12.5));
        assert!(d.value(keys::DIFF_TOD).is_none());
        assert_eq!(d.comment(), "Passed");
        assert_eq!(d.comment_group(DUBIOUS_REASONS).and_then(|g| g.get("Spd")).map(String::as_str), Some("310.2"));
        assert_eq!(d.last_pos().map(|p| p.longitude), Some(15.5));
    }

    #[test]
    fn test_bounds() {
        let d = EvaluationDetail::with_positions(
            from_epoch_secs(0.0),
            vec![TargetPosition::new(48.0, 16.0), TargetPosition::new(47.0, 17.0)],
        );
        assert_eq!(d.bounds(0.5), Some((46.5, 48.5, 15.5, 17.5)));
        assert_eq!(EvaluationDetail::with_positions(from_epoch_secs(0.0), vec![]).bounds(0.1), None);
    }
}
