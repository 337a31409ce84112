//! Requirements and their evaluator families
//!
//! A [`Requirement`] is immutable configuration: identity, the pass condition
//! applied to its metric and exactly one family configuration
//! ([`RequirementKind`]). Each family configuration implements [`Evaluator`],
//! a pure function from one target (seen through [`TargetData`]) and one
//! sector layer to the counters and evidence of a single result.
//!
//! ## Usage
//!
//! ```ignore
//! let ctx = EvalContext::new(&settings, &layer, &registry);
//! let single = requirement.evaluate(&ctx, &target);
//! ```

pub mod correct;
pub mod deviation;
pub mod dubious;
pub mod extra;
pub mod falseness;
pub mod interval;
pub mod presence;

use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::EvaluationSettings;
use crate::data::{SectorContainment, SectorLayer, TargetData, TargetPosition};
use crate::detail::Details;
use crate::error::{EvalError, Result};
use crate::geo::DataSourceRegistry;
use crate::result::{Counts, SingleResult};
use crate::time_period::TimePeriod;
use crate::utils::{span, Timestamp};

pub use correct::{CorrectCounts, CorrectnessConfig};
pub use deviation::{DeviationConfig, DeviationCounts, DeviationMetric, Measure};
pub use dubious::{DubiousCounts, DubiousCriteria, DubiousTargetConfig, DubiousTargetCounts, DubiousTrackConfig};
pub use extra::{ExtraCounts, ExtraDataConfig, ExtraTrackConfig, IgnorePolicy};
pub use falseness::{FalseCounts, FalsenessConfig};
pub use interval::{IntervalConfig, IntervalCounts, Validity, ValidityPredicate, ValidityState};
pub use presence::{PresenceConfig, PresenceCounts};

/// Direction of a threshold comparison, `value <op> threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonType {
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl ComparisonType {
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            ComparisonType::LessThan => value < threshold,
            ComparisonType::LessThanOrEqual => value <= threshold,
            ComparisonType::GreaterThan => value > threshold,
            ComparisonType::GreaterThanOrEqual => value >= threshold,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonType::LessThan => "<",
            ComparisonType::LessThanOrEqual => "<=",
            ComparisonType::GreaterThan => ">",
            ComparisonType::GreaterThanOrEqual => ">=",
        }
    }
}

impl Default for ComparisonType {
    fn default() -> Self {
        ComparisonType::LessThanOrEqual
    }
}

impl fmt::Display for ComparisonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Family configuration; selects the evaluation algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum RequirementKind {
    Presence(PresenceConfig),
    Falseness(FalsenessConfig),
    Correctness(CorrectnessConfig),
    Interval(IntervalConfig),
    Deviation(DeviationConfig),
    ExtraData(ExtraDataConfig),
    ExtraTrack(ExtraTrackConfig),
    DubiousTrack(DubiousTrackConfig),
    DubiousTarget(DubiousTargetConfig),
}

impl RequirementKind {
    pub fn evaluator(&self) -> &dyn Evaluator {
        match self {
            RequirementKind::Presence(c) => c,
            RequirementKind::Falseness(c) => c,
            RequirementKind::Correctness(c) => c,
            RequirementKind::Interval(c) => c,
            RequirementKind::Deviation(c) => c,
            RequirementKind::ExtraData(c) => c,
            RequirementKind::ExtraTrack(c) => c,
            RequirementKind::DubiousTrack(c) => c,
            RequirementKind::DubiousTarget(c) => c,
        }
    }

    pub fn family(&self) -> &'static str {
        match self {
            RequirementKind::Presence(_) => "presence",
            RequirementKind::Falseness(_) => "falseness",
            RequirementKind::Correctness(_) => "correctness",
            RequirementKind::Interval(_) => "interval",
            RequirementKind::Deviation(_) => "deviation",
            RequirementKind::ExtraData(_) => "extra_data",
            RequirementKind::ExtraTrack(_) => "extra_track",
            RequirementKind::DubiousTrack(_) => "dubious_track",
            RequirementKind::DubiousTarget(_) => "dubious_target",
        }
    }
}

/// One configured performance criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Requirement {
    pub name: String,
    pub short_name: String,
    #[serde(default)]
    pub group: String,
    /// Threshold the metric is checked against.
    pub threshold: f64,
    #[serde(default)]
    pub check: ComparisonType,
    /// Joined result passes only if no single target failed.
    #[serde(default)]
    pub must_hold_for_any_target: bool,
    #[serde(flatten)]
    pub kind: RequirementKind,
}

impl Requirement {
    pub fn new(name: impl Into<String>, short_name: impl Into<String>, kind: RequirementKind) -> Self {
        Self {
            name: name.into(),
            short_name: short_name.into(),
            group: String::new(),
            threshold: 0.0,
            check: ComparisonType::default(),
            must_hold_for_any_target: false,
            kind,
        }
    }

    pub fn with_condition(mut self, check: ComparisonType, threshold: f64) -> Self {
        self.check = check;
        self.threshold = threshold;
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn must_hold_for_any_target(mut self, value: bool) -> Self {
        self.must_hold_for_any_target = value;
        self
    }

    pub fn condition_passed(&self, metric: f64) -> bool {
        self.check.holds(metric, self.threshold)
    }

    pub fn condition_str(&self) -> String {
        format!("{} {}", self.check, self.threshold)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(EvalError::Config("requirement without name".to_string()));
        }
        if !self.threshold.is_finite() {
            return Err(EvalError::Config(format!("requirement '{}': threshold not finite", self.name)));
        }
        self.kind
            .evaluator()
            .validate()
            .map_err(|e| EvalError::Config(format!("requirement '{}': {}", self.name, e)))
    }

    /// Evaluates one target in the context's sector layer.
    pub fn evaluate(self: &Arc<Self>, ctx: &EvalContext<'_>, target: &dyn TargetData) -> SingleResult {
        let evaluation = self.kind.evaluator().evaluate(ctx, target);
        SingleResult::new(Arc::clone(self), &ctx.sector_layer.name, target, evaluation)
    }
}

/// Read-only inputs shared by all evaluations of one run.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub settings: &'a EvaluationSettings,
    pub sector_layer: &'a SectorLayer,
    pub registry: &'a DataSourceRegistry,
}

impl<'a> EvalContext<'a> {
    pub fn new(settings: &'a EvaluationSettings, sector_layer: &'a SectorLayer, registry: &'a DataSourceRegistry) -> Self {
        Self { settings, sector_layer, registry }
    }

    pub fn max_ref_time_diff(&self) -> Duration {
        span(self.settings.max_ref_time_diff)
    }

    pub fn ground_bit_tolerance(&self) -> Duration {
        span(self.settings.ground_bit_tolerance)
    }

    pub fn skip_no_data_details(&self) -> bool {
        self.settings.skip_no_data_details
    }

    /// Mapped reference position inside the layer, judged with the
    /// reference ground bit (test ground bit as fallback).
    pub fn ref_pos_inside(&self, target: &dyn TargetData, t: Timestamp, ref_pos: &TargetPosition) -> bool {
        if target.is_timestamp_excluded(t) {
            return false;
        }
        let gb = target
            .ref_ground_bit(t, self.ground_bit_tolerance())
            .or_else(|| target.tst_ground_bit(t));
        self.sector_layer.is_inside(ref_pos, gb.is_some(), gb.unwrap_or(false))
    }

    /// Test position inside the layer, judged with the test ground bit.
    pub fn tst_pos_inside(&self, target: &dyn TargetData, t: Timestamp, tst_pos: &TargetPosition) -> bool {
        if target.is_timestamp_excluded(t) {
            return false;
        }
        let gb = target.tst_ground_bit(t);
        self.sector_layer.is_inside(tst_pos, gb.is_some(), gb.unwrap_or(false))
    }
}

/// Counters and evidence produced by one evaluation.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub counts: Counts,
    pub details: Details,
    /// Result excluded from pooling by the family's ignore policy.
    pub ignore: bool,
    pub ref_periods: Vec<TimePeriod>,
    pub missed_periods: Vec<TimePeriod>,
}

impl Evaluation {
    pub fn new(counts: Counts, details: Details) -> Self {
        Self {
            counts,
            details,
            ignore: false,
            ref_periods: Vec::new(),
            missed_periods: Vec::new(),
        }
    }

    pub fn ignored(mut self, ignore: bool) -> Self {
        self.ignore = ignore;
        self
    }
}

/// Family algorithm seam.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, ctx: &EvalContext<'_>, target: &dyn TargetData) -> Evaluation;

    /// Rejects unusable parameters before any evaluation runs.
    fn validate(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Reads `Option<f64>` seconds as a duration.
pub(crate) fn opt_span(secs: Option<f64>) -> Option<Duration> {
    secs.map(span)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_types() {
        assert!(ComparisonType::LessThan.holds(1.0, 2.0));
        assert!(!ComparisonType::LessThan.holds(2.0, 2.0));
        assert!(ComparisonType::LessThanOrEqual.holds(2.0, 2.0));
        assert!(ComparisonType::GreaterThan.holds(3.0, 2.0));
        assert!(ComparisonType::GreaterThanOrEqual.holds(2.0, 2.0));
        assert!(!ComparisonType::GreaterThanOrEqual.holds(1.9, 2.0));
    }

    #[test]
    fn test_requirement_yaml() {
        let yaml = r#"
name: Mode 3/A Present
short_name: MA-Present
threshold: 0.98
check: greater_than_or_equal
family: presence
field: mode_a
"#;
        let req: Requirement = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(req.kind.family(), "presence");
        assert!(req.condition_passed(0.99));
        assert!(!req.condition_passed(0.5));
        assert_eq!(req.condition_str(), ">= 0.98");
        assert!(req.validate().is_ok());
    }
}
