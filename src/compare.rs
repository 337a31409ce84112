//! Tri-state comparison of one field between a test update and its
//! time-mapped reference.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::data::{Field, FieldValue, TargetData};
use crate::utils::{format_time, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonResult {
    Same,
    Different,
    /// Test carries the field, no reference neighbour does.
    UnknownNoReference,
    /// Reference carries the field, test does not.
    UnknownNoTest,
}

impl ComparisonResult {
    pub fn is_unknown(&self) -> bool {
        matches!(self, ComparisonResult::UnknownNoReference | ComparisonResult::UnknownNoTest)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub result: ComparisonResult,
    pub comment: String,
}

impl Comparison {
    fn new(result: ComparisonResult, comment: impl Into<String>) -> Self {
        Self { result, comment: comment.into() }
    }
}

/// Reference value at one mapped neighbour.
#[derive(Debug, Clone, PartialEq)]
pub struct RefValue {
    pub timestamp: Timestamp,
    pub value: Option<FieldValue>,
}

/// Compares a test value against the reference neighbours.
///
/// The sample is `Same` if any neighbour carries a matching value. A
/// mismatch reports the first neighbour that carries a value.
pub fn compare_values(field: Field, tst: Option<&FieldValue>, refs: &[RefValue], tolerance: f64) -> Comparison {
    let mut with_value = refs.iter().filter_map(|r| r.value.as_ref().map(|v| (r.timestamp, v))).peekable();

    if with_value.peek().is_none() {
        return Comparison::new(ComparisonResult::UnknownNoReference, "No ref value");
    }
    let Some(tst) = tst else {
        return Comparison::new(ComparisonResult::UnknownNoTest, "No test value");
    };

    let mut first_mismatch = None;
    for (ts, value) in with_value {
        if tst.matches(value, tolerance) {
            return Comparison::new(ComparisonResult::Same, "OK");
        }
        first_mismatch.get_or_insert((ts, value));
    }

    match first_mismatch {
        Some((ts, value)) => Comparison::new(
            ComparisonResult::Different,
            format!(
                "Not OK: tst '{}' ref at {} '{}'",
                field.format(tst),
                format_time(&ts),
                field.format(value)
            ),
        ),
        None => Comparison::new(ComparisonResult::UnknownNoReference, "No ref value"),
    }
}

/// Looks up the field on the test update at `t` and on both mapped
/// reference neighbours, then compares.
pub fn compare_field(
    target: &dyn TargetData,
    t: Timestamp,
    field: Field,
    max_ref_time_diff: Duration,
    tolerance: f64,
) -> Comparison {
    let (lower, upper) = target.mapped_ref_times(t, max_ref_time_diff);

    let mut refs = Vec::with_capacity(2);
    for ts in [lower, upper].into_iter().flatten() {
        if refs.iter().any(|r: &RefValue| r.timestamp == ts) {
            continue;
        }
        refs.push(RefValue { timestamp: ts, value: target.ref_value(ts, field) });
    }

    let tst = target.tst_value(t, field);
    compare_values(field, tst.as_ref(), &refs, tolerance)
}

/// True if either mapped reference neighbour carries the field.
pub fn ref_has_value(target: &dyn TargetData, t: Timestamp, field: Field, max_ref_time_diff: Duration) -> bool {
    let (lower, upper) = target.mapped_ref_times(t, max_ref_time_diff);
    [lower, upper]
        .into_iter()
        .flatten()
        .any(|ts| target.ref_value(ts, field).is_some())
}
