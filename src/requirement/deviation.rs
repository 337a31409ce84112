//! Geometric deviation family
//!
//! Every in-sector test update with a mapped reference yields one scalar
//! deviation (distance, along/across-track offset, radar range or azimuth
//! error, speed or track angle error). Each value is checked against the
//! threshold and kept in a [`ValueAccumulator`] so pooled statistics can be
//! derived without the raw values.
//!
//! [`Measure::AlongAcross`] is the one two-valued measure: along and across
//! are judged against their own maxima and an update passes only when both
//! hold. Along values go to `values`, across values to `across_values`.
//!
//! Non-finite results count as calculation errors and never enter the
//! value set.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{ComparisonType, EvalContext, Evaluation, Evaluator};
use crate::data::{TargetData, TargetPosition};
use crate::detail::{keys, EvaluationDetail};
use crate::geo::{along_across, geodesic_distance, min_angle_difference};
use crate::result::{ratio, Counts, LinearFit, Tally, ValueAccumulator};
use crate::utils::Timestamp;

/// What is measured per update. Distances in metres, speeds in m/s,
/// angles in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Measure {
    Distance,
    DistanceRms,
    /// Distance judged against `threshold_value` as a maximum; the default
    /// metric is the share of updates above it.
    MaxDistance,
    Along,
    Across,
    AlongAcross {
        max_along: f64,
        max_across: f64,
    },
    /// Reference minus test ground range about the reporting sensor.
    RadarRange,
    RadarAzimuth,
    Speed {
        /// Threshold as percent of the test speed.
        #[serde(default)]
        threshold_percent: f64,
        #[serde(default)]
        use_percent_if_higher: bool,
    },
    TrackAngle {
        /// Reference speeds below this (m/s) are not judged.
        #[serde(default)]
        minimum_speed: Option<f64>,
    },
}

impl Measure {
    pub fn default_metric(&self) -> DeviationMetric {
        match self {
            Measure::DistanceRms => DeviationMetric::Rms,
            Measure::RadarRange => DeviationMetric::Mean,
            Measure::MaxDistance | Measure::Speed { .. } | Measure::TrackAngle { .. } => {
                DeviationMetric::ProbabilityFailed
            }
            Measure::Distance
            | Measure::Along
            | Measure::Across
            | Measure::AlongAcross { .. }
            | Measure::RadarAzimuth => DeviationMetric::ProbabilityPassed,
        }
    }

    fn needs_data_source(&self) -> bool {
        matches!(self, Measure::RadarRange | Measure::RadarAzimuth)
    }

    fn needs_ref_velocity(&self) -> bool {
        matches!(
            self,
            Measure::Along
                | Measure::Across
                | Measure::AlongAcross { .. }
                | Measure::Speed { .. }
                | Measure::TrackAngle { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeviationMetric {
    ProbabilityPassed,
    ProbabilityFailed,
    Rms,
    Mean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DeviationConfig {
    pub measure: Measure,
    pub threshold_value: f64,
    /// Per-update check, `|value| <op> threshold_value`.
    #[serde(default)]
    pub threshold_check: ComparisonType,
    /// Overrides the measure's default pooled metric.
    #[serde(default)]
    pub metric: Option<DeviationMetric>,
}

impl DeviationConfig {
    pub fn new(measure: Measure, threshold_value: f64) -> Self {
        Self {
            measure,
            threshold_value,
            threshold_check: ComparisonType::LessThanOrEqual,
            metric: None,
        }
    }

    pub fn with_threshold_check(mut self, check: ComparisonType) -> Self {
        self.threshold_check = check;
        self
    }

    pub fn with_metric(mut self, metric: DeviationMetric) -> Self {
        self.metric = Some(metric);
        self
    }

    pub fn effective_metric(&self) -> DeviationMetric {
        self.metric.unwrap_or_else(|| self.measure.default_metric())
    }

    fn measure_update(
        &self,
        ctx: &EvalContext<'_>,
        target: &dyn TargetData,
        t: Timestamp,
        tst_pos: &TargetPosition,
        ref_pos: &TargetPosition,
    ) -> Outcome {
        let max_ref_time_diff = ctx.max_ref_time_diff();
        let thr = self.threshold_value;

        match &self.measure {
            Measure::Distance | Measure::DistanceRms | Measure::MaxDistance => match geodesic_distance(ref_pos, tst_pos) {
                Some(d) => Outcome::value(d, thr),
                None => Outcome::CalcError,
            },
            Measure::Along | Measure::Across => {
                let Some(vel) = target.mapped_ref_velocity(t, max_ref_time_diff) else {
                    return Outcome::CalcError;
                };
                match along_across(ref_pos, vel.track_angle, tst_pos) {
                    Some((along, _)) if self.measure == Measure::Along => Outcome::value(along, thr),
                    Some((_, across)) => Outcome::value(across, thr),
                    None => Outcome::CalcError,
                }
            }
            Measure::AlongAcross { max_along, max_across } => {
                let Some(vel) = target.mapped_ref_velocity(t, max_ref_time_diff) else {
                    return Outcome::CalcError;
                };
                match along_across(ref_pos, vel.track_angle, tst_pos) {
                    Some((along, across)) => Outcome::Pair {
                        along,
                        across,
                        max_along: *max_along,
                        max_across: *max_across,
                    },
                    None => Outcome::CalcError,
                }
            }
            Measure::RadarRange | Measure::RadarAzimuth => {
                let Some(ds_id) = target.tst_data_source(t) else {
                    return Outcome::CalcError;
                };
                let (Some(tst), Some(reference)) =
                    (ctx.registry.polar(ds_id, tst_pos), ctx.registry.polar(ds_id, ref_pos))
                else {
                    return Outcome::CalcError;
                };
                if self.measure == Measure::RadarRange {
                    Outcome::Value {
                        value: reference.ground_range - tst.ground_range,
                        threshold: thr,
                        fit: Some((reference.ground_range, tst.ground_range)),
                    }
                } else {
                    Outcome::value(min_angle_difference(tst.azimuth, reference.azimuth), thr)
                }
            }
            Measure::Speed { threshold_percent, use_percent_if_higher } => {
                let Some(ref_vel) = target.mapped_ref_velocity(t, max_ref_time_diff) else {
                    return Outcome::CalcError;
                };
                let Some(tst_vel) = target.tst_velocity(t) else {
                    return Outcome::NoTstValue;
                };
                let threshold = if *use_percent_if_higher {
                    thr.max(tst_vel.speed * threshold_percent / 100.0)
                } else {
                    thr
                };
                Outcome::value(ref_vel.speed - tst_vel.speed, threshold)
            }
            Measure::TrackAngle { minimum_speed } => {
                let Some(ref_vel) = target.mapped_ref_velocity(t, max_ref_time_diff) else {
                    return Outcome::CalcError;
                };
                if minimum_speed.is_some_and(|min| ref_vel.speed < min) {
                    return Outcome::RefSpeedLow;
                }
                let Some(tst_vel) = target.tst_velocity(t) else {
                    return Outcome::NoTstValue;
                };
                Outcome::value(min_angle_difference(tst_vel.track_angle, ref_vel.track_angle), thr)
            }
        }
    }
}

enum Outcome {
    Value {
        value: f64,
        threshold: f64,
        /// `(ref, tst)` pair for the range gain/bias fit.
        fit: Option<(f64, f64)>,
    },
    Pair {
        along: f64,
        across: f64,
        max_along: f64,
        max_across: f64,
    },
    NoTstValue,
    RefSpeedLow,
    CalcError,
}

impl Outcome {
    fn value(value: f64, threshold: f64) -> Self {
        Outcome::Value { value, threshold, fit: None }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviationCounts {
    pub num_pos: u32,
    pub num_no_ref: u32,
    pub num_pos_outside: u32,
    pub num_pos_inside: u32,
    pub num_passed: u32,
    pub num_failed: u32,
    pub num_calc_errors: u32,
    pub num_no_tst_value: u32,
    pub num_ref_spd_low: u32,
    pub values: ValueAccumulator,
    /// Along/across only: updates whose along or across value failed. An
    /// update failing both counts in each.
    pub num_along_failed: u32,
    pub num_across_failed: u32,
    pub across_values: ValueAccumulator,
    /// Test range against reference range.
    pub fit: LinearFit,
}

impl DeviationCounts {
    /// Range gain and bias from the least-squares fit, radar range only.
    pub fn gain_bias(&self) -> Option<(f64, f64)> {
        self.fit.gain_bias()
    }

    /// Share of judged updates with an acceptable along value.
    pub fn along_ok_ratio(&self) -> Option<f64> {
        let judged = self.num_passed + self.num_failed;
        ratio(judged - self.num_along_failed, judged)
    }

    /// Share of judged updates with an acceptable across value.
    pub fn across_ok_ratio(&self) -> Option<f64> {
        let judged = self.num_passed + self.num_failed;
        ratio(judged - self.num_across_failed, judged)
    }
}

impl Tally for DeviationCounts {
    type Config = DeviationConfig;

    fn check(&self) {
        assert_eq!(
            self.num_pos,
            self.num_no_ref + self.num_pos_inside + self.num_pos_outside,
            "deviation: inside + outside + no reference != updates"
        );
        assert_eq!(
            self.num_pos_inside,
            self.num_passed + self.num_failed + self.num_calc_errors + self.num_no_tst_value + self.num_ref_spd_low,
            "deviation: inside sub-buckets do not add up"
        );
        assert_eq!(
            self.values.count(),
            (self.num_passed + self.num_failed) as u64,
            "deviation: value count differs from judged updates"
        );
        assert!(
            self.num_along_failed <= self.num_failed && self.num_across_failed <= self.num_failed,
            "deviation: along/across failures exceed failed updates"
        );
        if self.across_values.count() > 0 {
            assert_eq!(
                self.across_values.count(),
                self.values.count(),
                "deviation: along and across value counts differ"
            );
            assert!(
                self.num_failed <= self.num_along_failed + self.num_across_failed,
                "deviation: failed update without an along or across failure"
            );
        }
    }

    fn merge(&mut self, o: &Self) {
        self.num_pos += o.num_pos;
        self.num_no_ref += o.num_no_ref;
        self.num_pos_outside += o.num_pos_outside;
        self.num_pos_inside += o.num_pos_inside;
        self.num_passed += o.num_passed;
        self.num_failed += o.num_failed;
        self.num_calc_errors += o.num_calc_errors;
        self.num_no_tst_value += o.num_no_tst_value;
        self.num_ref_spd_low += o.num_ref_spd_low;
        self.values.merge(&o.values);
        self.num_along_failed += o.num_along_failed;
        self.num_across_failed += o.num_across_failed;
        self.across_values.merge(&o.across_values);
        self.fit.merge(&o.fit);
    }

    fn metric(&self, config: &DeviationConfig) -> Option<f64> {
        let judged = self.num_passed + self.num_failed;
        match config.effective_metric() {
            DeviationMetric::ProbabilityPassed => ratio(self.num_passed, judged),
            DeviationMetric::ProbabilityFailed => ratio(self.num_failed, judged),
            DeviationMetric::Rms => self.values.rms(),
            DeviationMetric::Mean => self.values.mean(),
        }
    }

    fn num_issues(&self) -> u32 {
        self.num_failed
    }
}

impl Evaluator for DeviationConfig {
    fn evaluate(&self, ctx: &EvalContext<'_>, target: &dyn TargetData) -> Evaluation {
        let max_ref_time_diff = ctx.max_ref_time_diff();
        let skip_no_data = ctx.skip_no_data_details();

        let mut c = DeviationCounts::default();
        let mut details = Vec::new();

        for t in target.tst_timestamps() {
            let Some(tst_pos) = target.tst_pos(t) else {
                continue;
            };
            c.num_pos += 1;

            let detail = |c: &DeviationCounts, comment: &str| {
                EvaluationDetail::new(t, tst_pos)
                    .with_value(keys::NUM_UPDATES, c.num_pos)
                    .with_value(keys::NUM_NO_REF, c.num_no_ref)
                    .with_value(keys::NUM_INSIDE, c.num_pos_inside)
                    .with_value(keys::NUM_OUTSIDE, c.num_pos_outside)
                    .with_value(keys::NUM_PASSED, c.num_passed)
                    .with_value(keys::NUM_FAILED, c.num_failed)
                    .with_comment(comment)
            };

            let Some(ref_pos) = target.mapped_ref_pos(t, max_ref_time_diff) else {
                c.num_no_ref += 1;
                if !skip_no_data {
                    details.push(detail(&c, "No reference position").with_value(keys::REF_EXISTS, false));
                }
                continue;
            };

            if self.measure.needs_data_source()
                && !target.tst_data_source(t).is_some_and(|ds| ctx.registry.has(ds))
            {
                c.num_no_ref += 1;
                if !skip_no_data {
                    details.push(detail(&c, "No data source info").add_position(Some(ref_pos)));
                }
                continue;
            }

            if self.measure.needs_ref_velocity() && target.mapped_ref_velocity(t, max_ref_time_diff).is_none() {
                c.num_no_ref += 1;
                if !skip_no_data {
                    details.push(detail(&c, "No reference speed").add_position(Some(ref_pos)));
                }
                continue;
            }

            if !ctx.ref_pos_inside(target, t, &ref_pos) {
                c.num_pos_outside += 1;
                if !skip_no_data {
                    details.push(
                        detail(&c, "Outside sector")
                            .add_position(Some(ref_pos))
                            .with_value(keys::POS_INSIDE, false),
                    );
                }
                continue;
            }
            c.num_pos_inside += 1;

            let d = match self.measure_update(ctx, target, t, &tst_pos, &ref_pos) {
                Outcome::Value { value, threshold, fit } if value.is_finite() => {
                    let passed = self.threshold_check.holds(value.abs(), threshold);
                    if passed {
                        c.num_passed += 1;
                    } else {
                        c.num_failed += 1;
                    }
                    c.values.add(value);
                    if let Some((x, y)) = fit {
                        c.fit.add(x, y);
                    }
                    let comment = if passed {
                        "Passed".to_string()
                    } else {
                        format!("Failed: {:.2} {} {:.2} does not hold", value.abs(), self.threshold_check, threshold)
                    };
                    detail(&c, &comment)
                        .with_value(keys::VALUE, value)
                        .with_value(keys::THRESHOLD, threshold)
                        .with_value(keys::CHECK_PASSED, passed)
                        .with_value(keys::IS_NOT_OK, !passed)
                }
                Outcome::Pair {
                    along,
                    across,
                    max_along,
                    max_across,
                } if along.is_finite() && across.is_finite() => {
                    let along_ok = self.threshold_check.holds(along.abs(), max_along);
                    let across_ok = self.threshold_check.holds(across.abs(), max_across);
                    let passed = along_ok && across_ok;
                    if passed {
                        c.num_passed += 1;
                    } else {
                        c.num_failed += 1;
                    }
                    if !along_ok {
                        c.num_along_failed += 1;
                    }
                    if !across_ok {
                        c.num_across_failed += 1;
                    }
                    c.values.add(along);
                    c.across_values.add(across);
                    let comment = match (along_ok, across_ok) {
                        (true, true) => "Passed".to_string(),
                        (false, true) => format!(
                            "Failed: along {:.2} {} {:.2} does not hold",
                            along.abs(),
                            self.threshold_check,
                            max_along
                        ),
                        (true, false) => format!(
                            "Failed: across {:.2} {} {:.2} does not hold",
                            across.abs(),
                            self.threshold_check,
                            max_across
                        ),
                        (false, false) => "Failed: along and across".to_string(),
                    };
                    detail(&c, &comment)
                        .with_value(keys::VALUE, along)
                        .with_value(keys::THRESHOLD, max_along)
                        .with_value(keys::VALUE_ACROSS, across)
                        .with_value(keys::THRESHOLD_ACROSS, max_across)
                        .with_value(keys::CHECK_PASSED, passed)
                        .with_value(keys::IS_NOT_OK, !passed)
                }
                Outcome::Value { .. } | Outcome::Pair { .. } | Outcome::CalcError => {
                    c.num_calc_errors += 1;
                    detail(&c, "Calculation error")
                }
                Outcome::NoTstValue => {
                    c.num_no_tst_value += 1;
                    if skip_no_data {
                        continue;
                    }
                    detail(&c, "No test value")
                }
                Outcome::RefSpeedLow => {
                    c.num_ref_spd_low += 1;
                    if skip_no_data {
                        continue;
                    }
                    detail(&c, "Reference speed too low")
                }
            };
            details.push(d.add_position(Some(ref_pos)).with_value(keys::POS_INSIDE, true));
        }

        Evaluation::new(Counts::Deviation(c), details)
    }

    fn validate(&self) -> Result<(), String> {
        if !self.threshold_value.is_finite() {
            return Err("threshold_value not finite".to_string());
        }
        match &self.measure {
            Measure::Speed { threshold_percent, .. } if !(*threshold_percent >= 0.0) => {
                Err("threshold_percent must be >= 0".to_string())
            }
            Measure::TrackAngle { minimum_speed: Some(min) } if !(*min >= 0.0) => {
                Err("minimum_speed must be >= 0".to_string())
            }
            Measure::AlongAcross { max_along, max_across } if !(*max_along >= 0.0 && *max_across >= 0.0) => {
                Err("max_along and max_across must be >= 0".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvaluationSettings;
    use crate::data::{InMemoryTarget, Sample, Sector, SectorLayer};
    use crate::geo::{DataSourceRegistry, SensorSite};
    use crate::utils::from_epoch_secs;

    fn ts(s: f64) -> Timestamp {
        from_epoch_secs(s)
    }

    fn layer() -> SectorLayer {
        SectorLayer::new("fir").with_sector(Sector::new(
            "box",
            vec![[47.0, 15.0], [47.0, 17.0], [49.0, 17.0], [49.0, 15.0]],
        ))
    }

    fn evaluate(cfg: &DeviationConfig, target: &InMemoryTarget, registry: &DataSourceRegistry) -> DeviationCounts {
        let settings = EvaluationSettings::default();
        let layer = layer();
        let ctx = EvalContext::new(&settings, &layer, registry);
        match cfg.evaluate(&ctx, target).counts {
            Counts::Deviation(c) => {
                c.check();
                c
            }
            other => panic!("unexpected {}", other.family()),
        }
    }

    #[test]
    fn test_default_metrics() {
        assert_eq!(Measure::Distance.default_metric(), DeviationMetric::ProbabilityPassed);
        assert_eq!(Measure::DistanceRms.default_metric(), DeviationMetric::Rms);
        assert_eq!(Measure::RadarRange.default_metric(), DeviationMetric::Mean);
        assert_eq!(
            Measure::TrackAngle { minimum_speed: None }.default_metric(),
            DeviationMetric::ProbabilityFailed
        );
        assert_eq!(Measure::MaxDistance.default_metric(), DeviationMetric::ProbabilityFailed);
        assert_eq!(
            Measure::AlongAcross { max_along: 1.0, max_across: 1.0 }.default_metric(),
            DeviationMetric::ProbabilityPassed
        );
    }

    #[test]
    fn test_max_distance_share_above() {
        let reference: Vec<_> = (0..4)
            .map(|i| Sample::new(ts(i as f64), TargetPosition::new(48.0, 16.0)))
            .collect();
        // ~11, ~22, ~33 and ~111 m north of the reference
        let test = [0.0001, 0.0002, 0.0003, 0.001]
            .iter()
            .enumerate()
            .map(|(i, dlat)| Sample::new(ts(i as f64), TargetPosition::new(48.0 + dlat, 16.0)))
            .collect();
        let target = InMemoryTarget::new(1, reference, test);
        let cfg = DeviationConfig::new(Measure::MaxDistance, 100.0);

        let c = evaluate(&cfg, &target, &DataSourceRegistry::new());
        assert_eq!(c.num_pos_inside, 4);
        assert_eq!(c.num_failed, 1);
        assert_eq!(c.metric(&cfg), Some(0.25));
        assert_eq!(c.num_issues(), 1);
        assert!(c.values.max().is_some_and(|m| m > 100.0));
    }

    #[test]
    fn test_along_across_separate_maxima() {
        // northbound reference, so north is along and east is across
        let reference: Vec<_> = (0..4)
            .map(|i| Sample::new(ts(i as f64), TargetPosition::new(48.0, 16.0)).with_velocity(200.0, 0.0))
            .collect();
        // ~56 m along, ~45 m across, both, neither
        let offsets = [(0.0005, 0.0), (0.0, 0.0006), (0.0005, 0.0006), (0.0, 0.0)];
        let test = offsets
            .iter()
            .enumerate()
            .map(|(i, (dlat, dlon))| Sample::new(ts(i as f64), TargetPosition::new(48.0 + dlat, 16.0 + dlon)))
            .collect();
        let target = InMemoryTarget::new(1, reference, test);

        let cfg = DeviationConfig::new(Measure::AlongAcross { max_along: 30.0, max_across: 40.0 }, 0.0);
        let c = evaluate(&cfg, &target, &DataSourceRegistry::new());
        assert_eq!(c.num_passed, 1);
        assert_eq!(c.num_failed, 3);
        assert_eq!(c.num_along_failed, 2);
        assert_eq!(c.num_across_failed, 2);
        assert_eq!(c.across_values.count(), 4);
        assert_eq!(c.along_ok_ratio(), Some(0.5));
        assert_eq!(c.across_ok_ratio(), Some(0.5));
        assert_eq!(c.metric(&cfg), Some(0.25));

        let loose = DeviationConfig::new(Measure::AlongAcross { max_along: 60.0, max_across: 50.0 }, 0.0);
        let c = evaluate(&loose, &target, &DataSourceRegistry::new());
        assert_eq!(c.num_passed, 4);
        assert_eq!(c.metric(&loose), Some(1.0));

        let negative = DeviationConfig::new(Measure::AlongAcross { max_along: -1.0, max_across: 50.0 }, 0.0);
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_distance_pass_fail() {
        let reference = vec![
            Sample::new(ts(0.0), TargetPosition::new(48.0, 16.0)),
            Sample::new(ts(1.0), TargetPosition::new(48.0, 16.0)),
        ];
        // ~11 m and ~111 m north of the reference
        let test = vec![
            Sample::new(ts(0.0), TargetPosition::new(48.0001, 16.0)),
            Sample::new(ts(1.0), TargetPosition::new(48.001, 16.0)),
            Sample::new(ts(30.0), TargetPosition::new(48.0, 16.0)),
        ];
        let target = InMemoryTarget::new(1, reference, test);
        let cfg = DeviationConfig::new(Measure::Distance, 50.0);
        let c = evaluate(&cfg, &target, &DataSourceRegistry::new());

        assert_eq!(c.num_pos, 3);
        assert_eq!(c.num_no_ref, 1);
        assert_eq!(c.num_passed, 1);
        assert_eq!(c.num_failed, 1);
        assert_eq!(c.metric(&cfg), Some(0.5));
        assert_eq!(c.num_issues(), 1);

        let rms = DeviationConfig::new(Measure::DistanceRms, 50.0);
        let c = evaluate(&rms, &target, &DataSourceRegistry::new());
        let v = c.metric(&rms).unwrap();
        assert!(v > 70.0 && v < 90.0, "rms {v}");
    }

    #[test]
    fn test_radar_range_without_data_source() {
        let reference = vec![Sample::new(ts(0.0), TargetPosition::new(48.0, 16.0))];
        let test = vec![Sample::new(ts(0.0), TargetPosition::new(48.0, 16.0)).with_data_source(12)];
        let target = InMemoryTarget::new(1, reference, test);
        let cfg = DeviationConfig::new(Measure::RadarRange, 100.0);

        let c = evaluate(&cfg, &target, &DataSourceRegistry::new());
        assert_eq!(c.num_no_ref, 1);
        assert_eq!(c.num_pos_inside, 0);
        assert_eq!(c.metric(&cfg), None);

        let registry = DataSourceRegistry::new().with_site(12, SensorSite { latitude: 47.5, longitude: 16.0, height: 0.0 });
        let c = evaluate(&cfg, &target, &registry);
        assert_eq!(c.num_passed, 1);
        assert!(c.metric(&cfg).unwrap().abs() < 1e-6);
    }

    #[test]
    fn test_speed_percent_threshold() {
        let reference = vec![Sample::new(ts(0.0), TargetPosition::new(48.0, 16.0)).with_velocity(200.0, 90.0)];
        let test = vec![Sample::new(ts(0.0), TargetPosition::new(48.0, 16.0)).with_velocity(190.0, 90.0)];
        let target = InMemoryTarget::new(1, reference, test);

        let fixed = DeviationConfig::new(Measure::Speed { threshold_percent: 10.0, use_percent_if_higher: false }, 5.0);
        let c = evaluate(&fixed, &target, &DataSourceRegistry::new());
        assert_eq!(c.num_failed, 1);
        assert_eq!(c.metric(&fixed), Some(1.0));

        let percent = DeviationConfig::new(Measure::Speed { threshold_percent: 10.0, use_percent_if_higher: true }, 5.0);
        let c = evaluate(&percent, &target, &DataSourceRegistry::new());
        assert_eq!(c.num_passed, 1);
        assert_eq!(c.metric(&percent), Some(0.0));
    }

    #[test]
    fn test_track_angle_low_speed() {
        let reference = vec![Sample::new(ts(0.0), TargetPosition::new(48.0, 16.0)).with_velocity(2.0, 10.0)];
        let test = vec![Sample::new(ts(0.0), TargetPosition::new(48.0, 16.0)).with_velocity(2.0, 200.0)];
        let target = InMemoryTarget::new(1, reference, test);

        let cfg = DeviationConfig::new(Measure::TrackAngle { minimum_speed: Some(5.0) }, 15.0);
        let c = evaluate(&cfg, &target, &DataSourceRegistry::new());
        assert_eq!(c.num_ref_spd_low, 1);
        assert_eq!(c.metric(&cfg), None);
    }
}
