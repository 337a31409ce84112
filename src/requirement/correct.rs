//! Multi-field correctness: identification, address and Mode 3/A checked
//! together, combined with AND or OR.
//!
//! A field fails on `Different` or `UnknownNoTest`. A missing reference
//! value does not fail the field. Primary-only targets are not comparable
//! and produce empty counters.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{EvalContext, Evaluation, Evaluator};
use crate::compare::{compare_field, Comparison, ComparisonResult};
use crate::data::{Field, TargetData};
use crate::detail::{keys, EvaluationDetail};
use crate::result::{ratio, Counts, Tally};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CorrectnessConfig {
    pub fields: Vec<Field>,
    /// AND over the fields if set, OR otherwise.
    #[serde(default = "default_require_all")]
    pub require_all_correct: bool,
    /// Altitude tolerance in feet, used by Mode C.
    #[serde(default)]
    pub max_difference: f64,
}

fn default_require_all() -> bool {
    true
}

impl CorrectnessConfig {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields, require_all_correct: true, max_difference: 0.0 }
    }

    pub fn with_require_all_correct(mut self, value: bool) -> Self {
        self.require_all_correct = value;
        self
    }

    pub fn with_max_difference(mut self, feet: f64) -> Self {
        self.max_difference = feet;
        self
    }

    /// Combines the per-field comparisons of one sample.
    ///
    /// Returns `None` when no field has a reference value, otherwise the
    /// overall verdict and the failure comments.
    pub fn judge(&self, comparisons: &[(Field, Comparison)]) -> Option<(bool, Vec<String>)> {
        if comparisons.is_empty() {
            return Some((false, vec!["No fields configured".to_string()]));
        }
        if comparisons.iter().all(|(_, c)| c.result == ComparisonResult::UnknownNoReference) {
            return None;
        }

        let failed = |c: &Comparison| matches!(c.result, ComparisonResult::Different | ComparisonResult::UnknownNoTest);
        let comments = comparisons
            .iter()
            .filter(|(_, c)| failed(c))
            .map(|(field, c)| format!("{} failed ({})", field.short_name(), c.comment))
            .collect();

        let correct = if self.require_all_correct {
            comparisons.iter().all(|(_, c)| !failed(c))
        } else {
            comparisons.iter().any(|(_, c)| !failed(c))
        };
        Some((correct, comments))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrectCounts {
    pub num_updates: u32,
    pub num_no_ref_pos: u32,
    pub num_pos_outside: u32,
    pub num_pos_inside: u32,
    pub num_no_ref_id: u32,
    pub num_correct: u32,
    pub num_not_correct: u32,
}

impl Tally for CorrectCounts {
    type Config = CorrectnessConfig;

    fn check(&self) {
        assert!(self.num_no_ref_pos <= self.num_updates, "correctness: more no-reference samples than updates");
        assert_eq!(
            self.num_updates - self.num_no_ref_pos,
            self.num_pos_inside + self.num_pos_outside,
            "correctness: inside + outside != updates with reference"
        );
        assert_eq!(
            self.num_pos_inside,
            self.num_no_ref_id + self.num_correct + self.num_not_correct,
            "correctness: inside sub-buckets do not add up"
        );
    }

    fn merge(&mut self, o: &Self) {
        self.num_updates += o.num_updates;
        self.num_no_ref_pos += o.num_no_ref_pos;
        self.num_pos_outside += o.num_pos_outside;
        self.num_pos_inside += o.num_pos_inside;
        self.num_no_ref_id += o.num_no_ref_id;
        self.num_correct += o.num_correct;
        self.num_not_correct += o.num_not_correct;
    }

    fn metric(&self, _config: &CorrectnessConfig) -> Option<f64> {
        ratio(self.num_correct, self.num_correct + self.num_not_correct)
    }

    fn num_issues(&self) -> u32 {
        self.num_not_correct
    }
}

impl Evaluator for CorrectnessConfig {
    fn evaluate(&self, ctx: &EvalContext<'_>, target: &dyn TargetData) -> Evaluation {
        if target.is_primary_only() {
            return Evaluation::new(Counts::Correctness(CorrectCounts::default()), Vec::new());
        }

        let max_ref_time_diff = ctx.max_ref_time_diff();
        let skip_no_data = ctx.skip_no_data_details();

        let mut c = CorrectCounts::default();
        let mut details = Vec::new();

        for t in target.tst_timestamps() {
            let Some(tst_pos) = target.tst_pos(t) else {
                continue;
            };
            c.num_updates += 1;

            let detail = |c: &CorrectCounts, comment: &str| {
                EvaluationDetail::new(t, tst_pos)
                    .with_value(keys::NUM_UPDATES, c.num_updates)
                    .with_value(keys::NUM_NO_REF, c.num_no_ref_pos)
                    .with_value(keys::NUM_INSIDE, c.num_pos_inside)
                    .with_value(keys::NUM_OUTSIDE, c.num_pos_outside)
                    .with_value(keys::NUM_CORRECT, c.num_correct)
                    .with_value(keys::NUM_NOT_CORRECT, c.num_not_correct)
                    .with_comment(comment)
            };

            let Some(ref_pos) = target.mapped_ref_pos(t, max_ref_time_diff) else {
                c.num_no_ref_pos += 1;
                if !skip_no_data {
                    details.push(detail(&c, "No reference position").with_value(keys::REF_EXISTS, false));
                }
                continue;
            };

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

            let comparisons: Vec<(Field, Comparison)> = self
                .fields
                .iter()
                .map(|&f| (f, compare_field(target, t, f, max_ref_time_diff, self.max_difference)))
                .collect();

            let (ref_exists, is_not_ok, comment) = match self.judge(&comparisons) {
                None => {
                    c.num_no_ref_id += 1;
                    (false, false, "No reference value".to_string())
                }
                Some((true, _)) => {
                    c.num_correct += 1;
                    (true, false, "OK".to_string())
                }
                Some((false, comments)) => {
                    c.num_not_correct += 1;
                    (true, true, comments.join(", "))
                }
            };

            if skip_no_data && !ref_exists {
                continue;
            }
            details.push(
                detail(&c, &comment)
                    .add_position(Some(ref_pos))
                    .with_value(keys::POS_INSIDE, true)
                    .with_value(keys::REF_EXISTS, ref_exists)
                    .with_value(keys::IS_NOT_OK, is_not_ok),
            );
        }

        Evaluation::new(Counts::Correctness(c), details)
    }

    fn validate(&self) -> Result<(), String> {
        if !(self.max_difference >= 0.0) {
            return Err("max_difference must be >= 0".to_string());
        }
        Ok(())
    }
}
