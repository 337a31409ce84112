//! Presence family: is an optional field present on test when the
//! reference has it.
//!
//! Samples without reference value count in favour of the metric.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{EvalContext, Evaluation, Evaluator};
use crate::compare::ref_has_value;
use crate::data::{Field, TargetData};
use crate::detail::{keys, EvaluationDetail};
use crate::result::{ratio, Counts, Tally};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PresenceConfig {
    pub field: Field,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresenceCounts {
    pub num_updates: u32,
    pub num_no_ref_pos: u32,
    pub num_pos_outside: u32,
    pub num_pos_inside: u32,
    pub num_no_ref_val: u32,
    pub num_present: u32,
    pub num_missing: u32,
}

impl Tally for PresenceCounts {
    type Config = PresenceConfig;

    fn check(&self) {
        assert!(self.num_no_ref_pos <= self.num_updates, "presence: more no-reference samples than updates");
        assert_eq!(
            self.num_updates - self.num_no_ref_pos,
            self.num_pos_inside + self.num_pos_outside,
            "presence: inside + outside != updates with reference"
        );
        assert_eq!(
            self.num_pos_inside,
            self.num_no_ref_val + self.num_present + self.num_missing,
            "presence: inside sub-buckets do not add up"
        );
    }

    fn merge(&mut self, o: &Self) {
        self.num_updates += o.num_updates;
        self.num_no_ref_pos += o.num_no_ref_pos;
        self.num_pos_outside += o.num_pos_outside;
        self.num_pos_inside += o.num_pos_inside;
        self.num_no_ref_val += o.num_no_ref_val;
        self.num_present += o.num_present;
        self.num_missing += o.num_missing;
    }

    /// `(no_ref_val + present) / (no_ref_val + present + missing)`.
    fn metric(&self, _config: &PresenceConfig) -> Option<f64> {
        ratio(
            self.num_no_ref_val + self.num_present,
            self.num_no_ref_val + self.num_present + self.num_missing,
        )
    }

    fn num_issues(&self) -> u32 {
        self.num_missing
    }
}

impl Evaluator for PresenceConfig {
    fn evaluate(&self, ctx: &EvalContext<'_>, target: &dyn TargetData) -> Evaluation {
        let max_ref_time_diff = ctx.max_ref_time_diff();
        let skip_no_data = ctx.skip_no_data_details();

        let mut c = PresenceCounts::default();
        let mut details = Vec::new();

        for t in target.tst_timestamps() {
            let Some(tst_pos) = target.tst_pos(t) else {
                continue;
            };
            c.num_updates += 1;

            let detail = |c: &PresenceCounts, comment: &str| {
                EvaluationDetail::new(t, tst_pos)
                    .with_value(keys::NUM_UPDATES, c.num_updates)
                    .with_value(keys::NUM_NO_REF, c.num_no_ref_pos)
                    .with_value(keys::NUM_INSIDE, c.num_pos_inside)
                    .with_value(keys::NUM_OUTSIDE, c.num_pos_outside)
                    .with_value(keys::NUM_PRESENT, c.num_present)
                    .with_value(keys::NUM_MISSING, c.num_missing)
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

            let ref_exists = ref_has_value(target, t, self.field, max_ref_time_diff);
            let tst_exists = target.tst_value(t, self.field).is_some();

            let (is_not_ok, comment) = if !ref_exists {
                c.num_no_ref_val += 1;
                (false, "No reference value".to_string())
            } else if tst_exists {
                c.num_present += 1;
                (false, "OK".to_string())
            } else {
                c.num_missing += 1;
                (true, format!("Not OK: {} missing", self.field))
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

        Evaluation::new(Counts::Presence(c), details)
    }
}
