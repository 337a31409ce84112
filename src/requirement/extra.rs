//! Extra data and extra track families.
//!
//! Extra data: test updates inside the sector while the reference has no
//! coverage there. Extra track: test updates carried by a second track
//! number while another track of the same target is already running.

use std::collections::BTreeMap;

use chrono::Duration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{opt_span, EvalContext, Evaluation, Evaluator};
use crate::data::{TargetData, TargetPosition};
use crate::detail::{keys, EvaluationDetail};
use crate::result::{ratio, Counts, Tally};
use crate::time_period::TimePeriodCollection;
use crate::utils::{seconds, span, Timestamp};

/// Gap that closes a per-track-number run.
pub const TRACK_RUN_GAP_SECS: f64 = 300.0;

/// When a result with extra updates is kept out of pooling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IgnorePolicy {
    /// Seconds; extra updates spanning less than this are ignored.
    #[serde(default)]
    pub min_duration: f64,
    #[serde(default)]
    pub min_num_updates: u32,
    #[serde(default)]
    pub ignore_primary_only: bool,
}

impl IgnorePolicy {
    pub fn ignores(&self, target: &dyn TargetData, extra_times: &[Timestamp]) -> bool {
        if self.ignore_primary_only && target.is_primary_only() {
            return true;
        }
        if extra_times.is_empty() {
            return false;
        }
        (extra_times.len() as u32) < self.min_num_updates || seconds(time_span(extra_times)) < self.min_duration
    }

    fn validate(&self) -> Result<(), String> {
        if !(self.min_duration >= 0.0) {
            return Err("min_duration must be >= 0".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtraDataConfig {
    #[serde(flatten)]
    pub ignore: IgnorePolicy,
    /// Seconds; shorter reference periods give no coverage. Single-point
    /// periods are always dropped.
    #[serde(default)]
    pub min_ref_period: Option<f64>,
}

impl ExtraDataConfig {
    pub fn with_min_ref_period(mut self, secs: f64) -> Self {
        self.min_ref_period = Some(secs);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtraTrackConfig {
    #[serde(flatten)]
    pub ignore: IgnorePolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtraCounts {
    pub num_updates: u32,
    pub num_pos_outside: u32,
    pub num_pos_inside: u32,
    pub num_no_track_num: u32,
    pub num_extra: u32,
    pub num_ok: u32,
}

impl Tally for ExtraCounts {
    type Config = ();

    fn check(&self) {
        assert_eq!(
            self.num_updates,
            self.num_pos_outside + self.num_pos_inside,
            "extra: inside + outside != updates"
        );
        assert_eq!(
            self.num_pos_inside,
            self.num_no_track_num + self.num_extra + self.num_ok,
            "extra: inside sub-buckets do not add up"
        );
    }

    fn merge(&mut self, o: &Self) {
        self.num_updates += o.num_updates;
        self.num_pos_outside += o.num_pos_outside;
        self.num_pos_inside += o.num_pos_inside;
        self.num_no_track_num += o.num_no_track_num;
        self.num_extra += o.num_extra;
        self.num_ok += o.num_ok;
    }

    fn metric(&self, _config: &()) -> Option<f64> {
        ratio(self.num_extra, self.num_extra + self.num_ok)
    }

    fn num_issues(&self) -> u32 {
        self.num_extra
    }
}

fn counter_detail(t: Timestamp, pos: TargetPosition, c: &ExtraCounts, comment: &str) -> EvaluationDetail {
    EvaluationDetail::new(t, pos)
        .with_value(keys::NUM_UPDATES, c.num_updates)
        .with_value(keys::NUM_INSIDE, c.num_pos_inside)
        .with_value(keys::NUM_OUTSIDE, c.num_pos_outside)
        .with_value(keys::NUM_EXTRA, c.num_extra)
        .with_value(keys::NUM_OK, c.num_ok)
        .with_comment(comment)
}

impl Evaluator for ExtraDataConfig {
    fn evaluate(&self, ctx: &EvalContext<'_>, target: &dyn TargetData) -> Evaluation {
        let skip_no_data = ctx.skip_no_data_details();
        let mut periods = TimePeriodCollection::from_reference(
            target,
            ctx.sector_layer,
            ctx.max_ref_time_diff(),
            ctx.ground_bit_tolerance(),
        );
        periods.remove_point_periods();
        if let Some(min) = opt_span(self.min_ref_period) {
            periods.remove_small_periods(min);
        }

        let mut c = ExtraCounts::default();
        let mut details = Vec::new();
        let mut extra_times = Vec::new();

        for t in target.tst_timestamps() {
            let Some(tst_pos) = target.tst_pos(t) else {
                continue;
            };
            c.num_updates += 1;

            if !ctx.tst_pos_inside(target, t, &tst_pos) {
                c.num_pos_outside += 1;
                if !skip_no_data {
                    details.push(counter_detail(t, tst_pos, &c, "Outside sector").with_value(keys::POS_INSIDE, false));
                }
                continue;
            }
            c.num_pos_inside += 1;

            let covered = periods.is_inside(t);
            if covered {
                c.num_ok += 1;
            } else {
                c.num_extra += 1;
                extra_times.push(t);
            }
            details.push(
                counter_detail(t, tst_pos, &c, if covered { "OK" } else { "Extra" })
                    .with_value(keys::POS_INSIDE, true)
                    .with_value(keys::REF_EXISTS, covered)
                    .with_value(keys::EXTRA, !covered),
            );
        }

        let ignore = self.ignore.ignores(target, &extra_times);
        let mut evaluation = Evaluation::new(Counts::ExtraData(c), details).ignored(ignore);
        evaluation.ref_periods = periods.periods().to_vec();
        evaluation
    }

    fn validate(&self) -> Result<(), String> {
        if self.min_ref_period.is_some_and(|min| !(min >= 0.0)) {
            return Err("min_ref_period must be >= 0".to_string());
        }
        self.ignore.validate()
    }
}

impl Evaluator for ExtraTrackConfig {
    fn evaluate(&self, ctx: &EvalContext<'_>, target: &dyn TargetData) -> Evaluation {
        let max_ref_time_diff = ctx.max_ref_time_diff();
        let skip_no_data = ctx.skip_no_data_details();
        let run_gap = span(TRACK_RUN_GAP_SECS);

        let updates: Vec<_> = target
            .tst_timestamps()
            .into_iter()
            .filter_map(|t| {
                let tst_pos = target.tst_pos(t)?;
                let inside = ctx.tst_pos_inside(target, t, &tst_pos);
                Some((t, tst_pos, inside, target.tst_track_num(t)))
            })
            .collect();

        // runs only from updates the reference can vouch for
        let mut runs: BTreeMap<u32, TimePeriodCollection> = BTreeMap::new();
        for (t, _, inside, track_num) in &updates {
            if let (true, Some(tn)) = (*inside, track_num) {
                if target.has_mapped_ref_data(*t, max_ref_time_diff) {
                    runs.entry(*tn).or_default().extend_or_add(*t, run_gap);
                }
            }
        }

        let mut c = ExtraCounts::default();
        let mut details = Vec::new();
        let mut extra_times = Vec::new();

        for (t, tst_pos, inside, track_num) in updates {
            c.num_updates += 1;

            if !inside {
                c.num_pos_outside += 1;
                if !skip_no_data {
                    details.push(
                        counter_detail(t, tst_pos, &c, "Tst outside")
                            .with_value(keys::POS_INSIDE, false)
                            .with_opt_value(keys::TRACK_NUM, track_num),
                    );
                }
                continue;
            }
            c.num_pos_inside += 1;

            let Some(tn) = track_num else {
                c.num_no_track_num += 1;
                details.push(counter_detail(t, tst_pos, &c, "No track number").with_value(keys::POS_INSIDE, true));
                continue;
            };

            let others: Vec<String> = runs
                .iter()
                .filter(|(other_tn, periods)| **other_tn != tn && periods.is_inside(t))
                .map(|(other_tn, _)| other_tn.to_string())
                .collect();
            let extra = !others.is_empty();
            let comment = if extra {
                c.num_extra += 1;
                extra_times.push(t);
                format!("Extra tracks: {}", others.join(","))
            } else {
                c.num_ok += 1;
                "OK".to_string()
            };
            details.push(
                counter_detail(t, tst_pos, &c, &comment)
                    .with_value(keys::POS_INSIDE, true)
                    .with_value(keys::TRACK_NUM, tn)
                    .with_value(keys::EXTRA, extra),
            );
        }

        let ignore = self.ignore.ignores(target, &extra_times);
        Evaluation::new(Counts::ExtraTrack(c), details).ignored(ignore)
    }

    fn validate(&self) -> Result<(), String> {
        self.ignore.validate()
    }
}

/// Time spanned by a set of sorted timestamps.
pub(crate) fn time_span(times: &[Timestamp]) -> Duration {
    match (times.first(), times.last()) {
        (Some(first), Some(last)) => *last - *first,
        _ => Duration::zero(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvaluationSettings;
    use crate::data::{InMemoryTarget, Sample, Sector, SectorLayer};
    use crate::geo::DataSourceRegistry;
    use crate::utils::from_epoch_secs;

    fn ts(s: f64) -> Timestamp {
        from_epoch_secs(s)
    }

    fn pos() -> TargetPosition {
        TargetPosition::new(48.0, 16.0)
    }

    fn layer() -> SectorLayer {
        SectorLayer::new("fir").with_sector(Sector::new(
            "box",
            vec![[47.0, 15.0], [47.0, 17.0], [49.0, 17.0], [49.0, 15.0]],
        ))
    }

    fn run(kind: &dyn Evaluator, target: &InMemoryTarget) -> Evaluation {
        let settings = EvaluationSettings::default();
        let layer = layer();
        let registry = DataSourceRegistry::new();
        kind.evaluate(&EvalContext::new(&settings, &layer, &registry), target)
    }

    #[test]
    fn test_extra_data() {
        let reference: Vec<Sample> = (0..=5).map(|i| Sample::new(ts(i as f64), pos()).with_mode_a(0o1000)).collect();
        let test: Vec<Sample> = (0..10).map(|i| Sample::new(ts(i as f64 * 2.0), pos())).collect();
        let target = InMemoryTarget::new(3, reference, test);

        let eval = run(&ExtraDataConfig::default(), &target);
        let Counts::ExtraData(c) = &eval.counts else {
            panic!("wrong family");
        };
        c.check();
        // test at 0, 2, 4 covered by reference [0, 5]
        assert_eq!(c.num_ok, 3);
        assert_eq!(c.num_extra, 7);
        assert!(!eval.ignore);

        let strict = ExtraDataConfig {
            ignore: IgnorePolicy { min_num_updates: 8, ..Default::default() },
            ..Default::default()
        };
        assert!(run(&strict, &target).ignore);
    }

    #[test]
    fn test_ignore_policy() {
        let target = InMemoryTarget::new(1, Vec::new(), vec![Sample::new(ts(0.0), pos())]);
        assert!(target.is_primary_only());

        let policy = IgnorePolicy { ignore_primary_only: true, ..Default::default() };
        assert!(policy.ignores(&target, &[]));

        let policy = IgnorePolicy { min_duration: 10.0, ..Default::default() };
        assert!(!policy.ignores(&target, &[]));
        assert!(policy.ignores(&target, &[ts(0.0), ts(5.0)]));
        assert!(!policy.ignores(&target, &[ts(0.0), ts(15.0)]));
        assert_eq!(time_span(&[ts(0.0), ts(15.0)]), Duration::seconds(15));
    }

    #[test]
    fn test_extra_track_overlap() {
        let reference: Vec<Sample> = (0..=20).map(|i| Sample::new(ts(i as f64), pos())).collect();
        let mut test: Vec<Sample> = (0..=20).step_by(2).map(|i| Sample::new(ts(i as f64), pos()).with_track_num(1)).collect();
        test.extend((1..=9).step_by(2).map(|i| Sample::new(ts(i as f64), pos()).with_track_num(2)));
        test.push(Sample::new(ts(11.0), pos()));
        let target = InMemoryTarget::new(9, reference, test);

        let eval = run(&ExtraTrackConfig::default(), &target);
        let Counts::ExtraTrack(c) = &eval.counts else {
            panic!("wrong family");
        };
        c.check();
        assert_eq!(c.num_updates, 17);
        assert_eq!(c.num_no_track_num, 1);
        // track 2 runs [1, 9], track 1 runs [0, 20]
        assert_eq!(c.num_extra, 5 + 4);
        assert_eq!(c.num_ok, 7);
    }

    #[test]
    fn test_single_point_reference_gives_no_coverage() {
        let reference = vec![Sample::new(ts(0.0), pos())];
        let test = vec![Sample::new(ts(0.0), pos()), Sample::new(ts(1.0), pos())];
        let target = InMemoryTarget::new(4, reference, test);

        let eval = run(&ExtraDataConfig::default(), &target);
        let Counts::ExtraData(c) = &eval.counts else {
            panic!("wrong family");
        };
        c.check();
        assert!(eval.ref_periods.is_empty());
        assert_eq!(c.num_ok, 0);
        assert_eq!(c.num_extra, 2);
    }

    #[test]
    fn test_min_ref_period() {
        // reference [0, 3] and [20, 40]
        let mut reference: Vec<Sample> = (0..=3).map(|i| Sample::new(ts(i as f64), pos())).collect();
        reference.extend((20..=40).map(|i| Sample::new(ts(i as f64), pos())));
        let test: Vec<Sample> = [1.0, 2.0, 25.0, 30.0].iter().map(|&s| Sample::new(ts(s), pos())).collect();
        let target = InMemoryTarget::new(5, reference, test);

        let Counts::ExtraData(c) = run(&ExtraDataConfig::default(), &target).counts else {
            panic!("wrong family");
        };
        assert_eq!((c.num_ok, c.num_extra), (4, 0));

        let cfg = ExtraDataConfig::default().with_min_ref_period(5.0);
        let eval = run(&cfg, &target);
        let Counts::ExtraData(c) = &eval.counts else {
            panic!("wrong family");
        };
        c.check();
        assert_eq!(eval.ref_periods.len(), 1);
        assert_eq!((c.num_ok, c.num_extra), (2, 2));
        assert!(cfg.validate().is_ok());
        assert!(ExtraDataConfig::default().with_min_ref_period(-1.0).validate().is_err());
    }

    #[test]
    fn test_extra_track_scoped_by_test_position() {
        // reference stays inside, test drifts across the northern edge at 49N
        let reference: Vec<Sample> = (0..=10).map(|i| Sample::new(ts(i as f64), pos())).collect();
        let mut test: Vec<Sample> = (0..=10)
            .map(|i| {
                let lat = if i >= 6 { 49.2 } else { 48.9 };
                Sample::new(ts(i as f64), TargetPosition::new(lat, 16.0)).with_track_num(1)
            })
            .collect();
        test.extend([3.5, 7.5].iter().map(|&s| Sample::new(ts(s), pos()).with_track_num(2)));
        let target = InMemoryTarget::new(6, reference, test);

        let eval = run(&ExtraTrackConfig::default(), &target);
        let Counts::ExtraTrack(c) = &eval.counts else {
            panic!("wrong family");
        };
        c.check();
        assert_eq!(c.num_updates, 13);
        assert_eq!(c.num_pos_outside, 5);
        assert_eq!(c.num_pos_inside, 8);
        // track 1 runs [0, 5] inside, track 2 runs [3.5, 7.5]
        // extra: track 1 at 4 and 5, track 2 at 3.5
        assert_eq!(c.num_extra, 3);
        assert_eq!(c.num_ok, 5);

        let first_extra = eval.details.iter().find(|d| d.value_bool(keys::EXTRA) == Some(true)).unwrap();
        assert_eq!(first_extra.timestamp(), ts(3.5));
        assert_eq!(first_extra.comment(), "Extra tracks: 1");
    }
}
