//! Interval family: detection-style scoring over update intervals.
//!
//! Reference coverage inside the sector is cut into periods; each period
//! is worth `floor(duration / update_interval)` update intervals. Gaps
//! between valid test updates inside a period count as missed intervals.
//! Which test updates are valid is decided by a [`ValidityPredicate`],
//! so the same scan scores plain detection as well as correctness of a
//! field over time.

use chrono::Duration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{opt_span, EvalContext, Evaluation, Evaluator};
use crate::compare::{compare_field, ComparisonResult};
use crate::data::{Field, TargetData, TargetPosition};
use crate::detail::{keys, EvaluationDetail};
use crate::result::{Counts, Tally};
use crate::time_period::{PeriodKind, TimePeriod, TimePeriodCollection};
use crate::utils::{seconds, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidityState {
    Valid,
    Invalid,
    /// Not enough reference data to judge; treated as valid.
    DataMissing,
}

impl ValidityState {
    pub fn counts_as_valid(&self) -> bool {
        !matches!(self, ValidityState::Invalid)
    }
}

/// Decides whether one test update counts as a valid update.
pub trait ValidityPredicate: Send + Sync {
    fn validity(&self, target: &dyn TargetData, t: Timestamp, max_ref_time_diff: Duration) -> (ValidityState, String);
}

/// Built-in validity strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Validity {
    /// Every test update is valid.
    Detection,
    /// The field must compare equal to the reference.
    FieldCorrect { field: Field },
    /// Mode C must lie within `max_difference` feet of the reference.
    ModeCCorrect { max_difference: f64 },
}

impl Default for Validity {
    fn default() -> Self {
        Validity::Detection
    }
}

impl ValidityPredicate for Validity {
    fn validity(&self, target: &dyn TargetData, t: Timestamp, max_ref_time_diff: Duration) -> (ValidityState, String) {
        let cmp = match self {
            Validity::Detection => return (ValidityState::Valid, "OK".to_string()),
            Validity::FieldCorrect { field } => compare_field(target, t, *field, max_ref_time_diff, 0.0),
            Validity::ModeCCorrect { max_difference } => {
                compare_field(target, t, Field::ModeC, max_ref_time_diff, *max_difference)
            }
        };
        let state = match cmp.result {
            ComparisonResult::Same => ValidityState::Valid,
            ComparisonResult::UnknownNoReference => ValidityState::DataMissing,
            ComparisonResult::Different | ComparisonResult::UnknownNoTest => ValidityState::Invalid,
        };
        (state, cmp.comment)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IntervalConfig {
    #[serde(default)]
    pub validity: Validity,
    /// Nominal update interval in seconds.
    pub update_interval: f64,
    /// Subtracted from every gap before counting misses.
    #[serde(default)]
    pub miss_tolerance: Option<f64>,
    #[serde(default)]
    pub min_gap_length: Option<f64>,
    #[serde(default)]
    pub max_gap_length: Option<f64>,
    /// Reference periods shorter than this are dropped.
    #[serde(default)]
    pub min_ref_period: Option<f64>,
    /// Report `missed / sum` instead of `1 - missed / sum`.
    #[serde(default)]
    pub invert_prob: bool,
}

impl IntervalConfig {
    pub fn new(validity: Validity, update_interval: f64) -> Self {
        Self {
            validity,
            update_interval,
            miss_tolerance: None,
            min_gap_length: None,
            max_gap_length: None,
            min_ref_period: None,
            invert_prob: false,
        }
    }

    pub fn with_miss_tolerance(mut self, secs: f64) -> Self {
        self.miss_tolerance = Some(secs);
        self
    }

    pub fn with_gap_limits(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_gap_length = min;
        self.max_gap_length = max;
        self
    }

    pub fn with_min_ref_period(mut self, secs: f64) -> Self {
        self.min_ref_period = Some(secs);
        self
    }

    pub fn inverted(mut self) -> Self {
        self.invert_prob = true;
        self
    }

    fn miss_threshold(&self) -> f64 {
        self.update_interval + self.miss_tolerance.unwrap_or(0.0)
    }

    /// Missed update intervals in a gap of `dt` seconds.
    pub fn missed_update_intervals(&self, dt: f64) -> u32 {
        let dt = dt - self.miss_tolerance.unwrap_or(0.0);
        if self.min_gap_length.is_some_and(|min| dt < min) || self.max_gap_length.is_some_and(|max| dt > max) {
            return 0;
        }
        if dt <= self.update_interval {
            return 0;
        }
        (dt / self.update_interval).floor() as u32
    }

    /// Runs the period scan with an arbitrary validity predicate.
    pub fn scan(&self, ctx: &EvalContext<'_>, target: &dyn TargetData, predicate: &dyn ValidityPredicate) -> Evaluation {
        let max_ref_time_diff = ctx.max_ref_time_diff();
        let skip_no_data = ctx.skip_no_data_details();
        let tst_times = target.tst_timestamps();

        let mut periods = TimePeriodCollection::from_reference(
            target,
            ctx.sector_layer,
            max_ref_time_diff,
            ctx.ground_bit_tolerance(),
        );
        if let Some(min) = opt_span(self.min_ref_period) {
            periods.remove_small_periods(min);
        }
        let ref_periods: Vec<TimePeriod> = periods.periods().to_vec();
        periods.fill_in_outside_periods(tst_times.first().copied(), tst_times.last().copied());

        let mut c = IntervalCounts {
            sum_uis: periods.update_intervals(self.update_interval),
            ..Default::default()
        };

        let mut events: Vec<(Timestamp, Event)> = Vec::new();
        for (idx, period) in periods.iter().enumerate() {
            if period.kind() == PeriodKind::InsideSector {
                events.push((period.begin(), Event::Enter(idx)));
                events.push((period.end(), Event::Leave(idx)));
            }
        }
        for &t in &tst_times {
            events.push((t, Event::Update));
        }
        events.sort_by_key(|(t, e)| (*t, e.rank()));

        let mut details = Vec::new();
        let mut missed_periods = Vec::new();
        let mut cursor: Option<Timestamp> = None;
        let mut had_valid = false;
        let threshold = self.miss_threshold();

        for (t, event) in events {
            match event {
                Event::Enter(idx) => {
                    cursor = Some(t);
                    had_valid = false;
                    details.push(
                        EvaluationDetail::with_positions(t, period_pos(target, t))
                            .with_value(keys::MISSED_UIS, c.missed_uis)
                            .with_comment(format!("Enter period {}", periods.period(idx))),
                    );
                }
                Event::Leave(idx) => {
                    let Some(from) = cursor.take() else {
                        continue;
                    };
                    // a period without any valid update counts no misses
                    if !had_valid {
                        if !skip_no_data {
                            details.push(
                                EvaluationDetail::with_positions(t, period_pos(target, t))
                                    .with_value(keys::MISS_OCCURRED, false)
                                    .with_value(keys::MISSED_UIS, c.missed_uis)
                                    .with_comment(format!("Leave empty period {}", periods.period(idx))),
                            );
                        }
                        continue;
                    }
                    let dt = seconds(t - from);
                    let n = self.missed_update_intervals(dt);
                    let mut comment = format!("Leave period {}", periods.period(idx));
                    if n > 0 {
                        c.missed_uis += n;
                        missed_periods.push(TimePeriod::new(from, t));
                        comment = format!("{comment}: {n} missed, DiffTOD {dt:.2} > {threshold:.2}");
                    }
                    details.push(
                        EvaluationDetail::with_positions(t, period_pos(target, t))
                            .with_value(keys::DIFF_TOD, dt)
                            .with_value(keys::MISS_OCCURRED, n > 0)
                            .with_value(keys::MISSED_UIS, c.missed_uis)
                            .with_comment(comment),
                    );
                }
                Event::Update => {
                    let Some(tst_pos) = target.tst_pos(t) else {
                        continue;
                    };
                    c.num_updates += 1;

                    let inside = cursor.is_some()
                        && periods
                            .period_index(t)
                            .is_some_and(|i| periods.period(i).kind() == PeriodKind::InsideSector);
                    if !inside {
                        c.num_outside += 1;
                        if !skip_no_data {
                            details.push(
                                EvaluationDetail::new(t, tst_pos)
                                    .with_value(keys::POS_INSIDE, false)
                                    .with_value(keys::MISSED_UIS, c.missed_uis)
                                    .with_comment("Outside sector"),
                            );
                        }
                        continue;
                    }
                    c.num_inside += 1;

                    let (state, reason) = predicate.validity(target, t, max_ref_time_diff);
                    match state {
                        ValidityState::Valid => c.num_valid += 1,
                        ValidityState::Invalid => c.num_invalid += 1,
                        ValidityState::DataMissing => c.num_data_missing += 1,
                    }
                    let ref_pos = target.mapped_ref_pos(t, max_ref_time_diff);

                    if !state.counts_as_valid() {
                        details.push(
                            EvaluationDetail::new(t, tst_pos)
                                .add_position(ref_pos)
                                .with_value(keys::POS_INSIDE, true)
                                .with_value(keys::REF_EXISTS, ref_pos.is_some())
                                .with_value(keys::IS_NOT_OK, true)
                                .with_value(keys::MISSED_UIS, c.missed_uis)
                                .with_comment(format!("Invalid: {reason}")),
                        );
                        continue;
                    }

                    had_valid = true;
                    let from = cursor.replace(t).unwrap_or(t);
                    let dt = seconds(t - from);
                    let n = self.missed_update_intervals(dt);
                    let comment = if n > 0 {
                        c.missed_uis += n;
                        missed_periods.push(TimePeriod::new(from, t));
                        format!("{n} missed, DiffTOD {dt:.2} > {threshold:.2}")
                    } else {
                        "OK".to_string()
                    };

                    if skip_no_data && state == ValidityState::DataMissing {
                        continue;
                    }
                    details.push(
                        EvaluationDetail::new(t, tst_pos)
                            .add_position(ref_pos)
                            .with_value(keys::POS_INSIDE, true)
                            .with_value(keys::REF_EXISTS, ref_pos.is_some())
                            .with_value(keys::DIFF_TOD, dt)
                            .with_value(keys::MISS_OCCURRED, n > 0)
                            .with_value(keys::MISSED_UIS, c.missed_uis)
                            .with_comment(comment),
                    );
                }
            }
        }

        c.missed_uis = c.missed_uis.min(c.sum_uis);

        let mut evaluation = Evaluation::new(Counts::Interval(c), details);
        evaluation.ref_periods = ref_periods;
        evaluation.missed_periods = missed_periods;
        evaluation
    }
}

#[derive(Debug, Clone, Copy)]
enum Event {
    Enter(usize),
    Update,
    Leave(usize),
}

impl Event {
    /// Same-time ordering: a period opens before and closes after its updates.
    fn rank(&self) -> u8 {
        match self {
            Event::Enter(_) => 0,
            Event::Update => 1,
            Event::Leave(_) => 2,
        }
    }
}

fn period_pos(target: &dyn TargetData, t: Timestamp) -> Vec<TargetPosition> {
    target.ref_pos(t).into_iter().collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntervalCounts {
    pub sum_uis: u32,
    pub missed_uis: u32,
    pub num_updates: u32,
    pub num_outside: u32,
    pub num_inside: u32,
    pub num_valid: u32,
    pub num_invalid: u32,
    pub num_data_missing: u32,
}

impl Tally for IntervalCounts {
    type Config = IntervalConfig;

    fn check(&self) {
        assert!(self.missed_uis <= self.sum_uis, "interval: more missed than expected update intervals");
        assert_eq!(
            self.num_updates,
            self.num_inside + self.num_outside,
            "interval: inside + outside != updates"
        );
        assert_eq!(
            self.num_inside,
            self.num_valid + self.num_invalid + self.num_data_missing,
            "interval: inside sub-buckets do not add up"
        );
    }

    fn merge(&mut self, o: &Self) {
        self.sum_uis += o.sum_uis;
        self.missed_uis += o.missed_uis;
        self.num_updates += o.num_updates;
        self.num_outside += o.num_outside;
        self.num_inside += o.num_inside;
        self.num_valid += o.num_valid;
        self.num_invalid += o.num_invalid;
        self.num_data_missing += o.num_data_missing;
    }

    fn metric(&self, config: &IntervalConfig) -> Option<f64> {
        if self.sum_uis == 0 {
            return None;
        }
        let missed = self.missed_uis as f64 / self.sum_uis as f64;
        Some(if config.invert_prob { missed } else { 1.0 - missed })
    }

    fn num_issues(&self) -> u32 {
        self.missed_uis
    }
}

impl Evaluator for IntervalConfig {
    fn evaluate(&self, ctx: &EvalContext<'_>, target: &dyn TargetData) -> Evaluation {
        self.scan(ctx, target, &self.validity)
    }

    fn validate(&self) -> Result<(), String> {
        if !(self.update_interval > 0.0) {
            return Err("update_interval must be > 0".to_string());
        }
        if let (Some(min), Some(max)) = (self.min_gap_length, self.max_gap_length) {
            if min > max {
                return Err("min_gap_length exceeds max_gap_length".to_string());
            }
        }
        if let Validity::ModeCCorrect { max_difference } = self.validity {
            if !(max_difference >= 0.0) {
                return Err("max_difference must be >= 0".to_string());
            }
        }
        Ok(())
    }
}
