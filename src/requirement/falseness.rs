//! Falseness family: is a present field wrong.
//!
//! Unknown outcomes (no reference value, no test value) are counted but
//! kept out of the metric denominator.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{EvalContext, Evaluation, Evaluator};
use crate::compare::{compare_field, ComparisonResult};
use crate::data::{Field, TargetData};
use crate::detail::{keys, EvaluationDetail};
use crate::result::{ratio, Counts, Tally};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FalsenessConfig {
    pub field: Field,
    /// Accepted altitude difference in feet (Mode C only).
    #[serde(default)]
    pub max_difference: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FalseCounts {
    pub num_updates: u32,
    pub num_no_ref_pos: u32,
    pub num_pos_outside: u32,
    pub num_pos_inside: u32,
    pub num_no_ref_val: u32,
    pub num_unknown: u32,
    pub num_correct: u32,
    pub num_false: u32,
}

impl Tally for FalseCounts {
    type Config = FalsenessConfig;

    fn check(&self) {
        assert!(self.num_no_ref_pos <= self.num_updates, "falseness: more no-reference samples than updates");
        assert_eq!(
            self.num_updates - self.num_no_ref_pos,
            self.num_pos_inside + self.num_pos_outside,
            "falseness: inside + outside != updates with reference"
        );
        assert_eq!(
            self.num_pos_inside,
            self.num_no_ref_val + self.num_unknown + self.num_correct + self.num_false,
            "falseness: inside sub-buckets do not add up"
        );
    }

    fn merge(&mut self, o: &Self) {
        self.num_updates += o.num_updates;
        self.num_no_ref_pos += o.num_no_ref_pos;
        self.num_pos_outside += o.num_pos_outside;
        self.num_pos_inside += o.num_pos_inside;
        self.num_no_ref_val += o.num_no_ref_val;
        self.num_unknown += o.num_unknown;
        self.num_correct += o.num_correct;
        self.num_false += o.num_false;
    }

    /// `false / (correct + false)`.
    fn metric(&self, _config: &FalsenessConfig) -> Option<f64> {
        ratio(self.num_false, self.num_correct + self.num_false)
    }

    fn num_issues(&self) -> u32 {
        self.num_false
    }
}

impl Evaluator for FalsenessConfig {
    fn evaluate(&self, ctx: &EvalContext<'_>, target: &dyn TargetData) -> Evaluation {
        let max_ref_time_diff = ctx.max_ref_time_diff();
        let skip_no_data = ctx.skip_no_data_details();

        let mut c = FalseCounts::default();
        let mut details = Vec::new();

        for t in target.tst_timestamps() {
            let Some(tst_pos) = target.tst_pos(t) else {
                continue;
            };
            c.num_updates += 1;

            let detail = |c: &FalseCounts, comment: &str| {
                EvaluationDetail::new(t, tst_pos)
                    .with_value(keys::NUM_UPDATES, c.num_updates)
                    .with_value(keys::NUM_NO_REF, c.num_no_ref_pos)
                    .with_value(keys::NUM_INSIDE, c.num_pos_inside)
                    .with_value(keys::NUM_OUTSIDE, c.num_pos_outside)
                    .with_value(keys::NUM_UNKNOWN, c.num_unknown)
                    .with_value(keys::NUM_CORRECT, c.num_correct)
                    .with_value(keys::NUM_NOT_CORRECT, c.num_false)
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

            let cmp = compare_field(target, t, self.field, max_ref_time_diff, self.max_difference);
            let no_data = match cmp.result {
                ComparisonResult::UnknownNoReference => {
                    c.num_no_ref_val += 1;
                    true
                }
                ComparisonResult::UnknownNoTest => {
                    c.num_unknown += 1;
                    true
                }
                ComparisonResult::Same => {
                    c.num_correct += 1;
                    false
                }
                ComparisonResult::Different => {
                    c.num_false += 1;
                    false
                }
            };

            if skip_no_data && no_data {
                continue;
            }
            details.push(
                detail(&c, &cmp.comment)
                    .add_position(Some(ref_pos))
                    .with_value(keys::POS_INSIDE, true)
                    .with_value(keys::REF_EXISTS, cmp.result != ComparisonResult::UnknownNoReference)
                    .with_value(keys::IS_NOT_OK, cmp.result == ComparisonResult::Different),
            );
        }

        Evaluation::new(Counts::Falseness(c), details)
    }

    fn validate(&self) -> Result<(), String> {
        if !(self.max_difference >= 0.0) {
            return Err("max_difference must be >= 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_false_metric_excludes_unknowns() {
        let c = FalseCounts {
            num_updates: 10,
            num_pos_inside: 10,
            num_no_ref_val: 2,
            num_unknown: 1,
            num_correct: 5,
            num_false: 2,
            ..Default::default()
        };
        c.check();
        let cfg = FalsenessConfig { field: Field::TargetIdentification, max_difference: 0.0 };
        assert!((c.metric(&cfg).unwrap() - 2.0 / 7.0).abs() < 1e-12);
        assert_eq!(c.num_issues(), 2);
    }

    #[test]
    fn test_no_comparable_samples_has_no_metric() {
        let c = FalseCounts { num_updates: 2, num_pos_inside: 2, num_unknown: 2, ..Default::default() };
        c.check();
        let cfg = FalsenessConfig { field: Field::ModeA, max_difference: 0.0 };
        assert_eq!(c.metric(&cfg), None);
    }
}
