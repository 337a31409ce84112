//! Dubious track and dubious target families.
//!
//! Both share one reason set, [`DubiousCriteria`]. The track family splits
//! in-sector test updates into runs per track number; a gap of more than
//! [`TRACK_RUN_GAP_SECS`] closes a run. The target family scores all
//! in-sector updates of the target as one run and ignores updates after such
//! a gap. A run is dubious when the share of its dubious updates exceeds
//! `dubious_prob`.
//!
//! Reasons, as reported in the detail comment group:
//!
//! | id     | scope  | condition                                              |
//! |--------|--------|--------------------------------------------------------|
//! | `Pri.` | run    | target is primary only                                 |
//! | `#Up`  | run    | fewer than `min_updates`, run stayed in sector         |
//! | `Dur.` | run    | shorter than `min_duration`, run stayed in sector      |
//! | `Spd`  | update | measured or position-derived speed above the maximum   |
//! | `Acc`  | update | acceleration above `max_acceleration`                  |
//! | `TR`   | update | turn rate above `max_turnrate`                         |
//! | `ROCD` | update | climb/descent rate above `max_rocd`                    |

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::extra::TRACK_RUN_GAP_SECS;
use super::{EvalContext, Evaluation, Evaluator};
use crate::data::{TargetData, TargetPosition, Velocity};
use crate::detail::{keys, EvaluationDetail, DUBIOUS_REASONS};
use crate::geo::{geodesic_distance, min_angle_difference, KNOTS2M_S};
use crate::result::{ratio, Counts, Tally};
use crate::utils::{seconds, span, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DubiousCriteria {
    #[serde(default)]
    pub mark_primary_only: bool,
    #[serde(default)]
    pub min_updates: Option<u32>,
    /// Seconds.
    #[serde(default)]
    pub min_duration: Option<f64>,
    #[serde(default)]
    pub max_groundspeed_kts: Option<f64>,
    /// m/s².
    #[serde(default)]
    pub max_acceleration: Option<f64>,
    /// deg/s.
    #[serde(default)]
    pub max_turnrate: Option<f64>,
    /// ft/s.
    #[serde(default)]
    pub max_rocd: Option<f64>,
    #[serde(default = "default_min_comparison_time")]
    pub minimum_comparison_time: f64,
    #[serde(default = "default_max_comparison_time")]
    pub maximum_comparison_time: f64,
    #[serde(default)]
    pub dubious_prob: f64,
}

fn default_min_comparison_time() -> f64 {
    1.0
}

fn default_max_comparison_time() -> f64 {
    30.0
}

impl Default for DubiousCriteria {
    fn default() -> Self {
        Self {
            mark_primary_only: false,
            min_updates: None,
            min_duration: None,
            max_groundspeed_kts: None,
            max_acceleration: None,
            max_turnrate: None,
            max_rocd: None,
            minimum_comparison_time: default_min_comparison_time(),
            maximum_comparison_time: default_max_comparison_time(),
            dubious_prob: 0.0,
        }
    }
}

/// Dubious tracks, scored per track number run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct DubiousTrackConfig(pub DubiousCriteria);

/// Dubious targets, scored over all in-sector updates of the target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct DubiousTargetConfig(pub DubiousCriteria);

#[derive(Debug, Clone, Copy)]
struct Update {
    t: Timestamp,
    pos: TargetPosition,
    velocity: Option<Velocity>,
}

#[derive(Debug, Default)]
struct Run {
    updates: Vec<Update>,
    left_sector: bool,
}

impl Run {
    fn begin(&self) -> Option<Timestamp> {
        self.updates.first().map(|u| u.t)
    }

    fn end(&self) -> Option<Timestamp> {
        self.updates.last().map(|u| u.t)
    }

    fn duration_secs(&self) -> f64 {
        match (self.begin(), self.end()) {
            (Some(b), Some(e)) => seconds(e - b),
            _ => 0.0,
        }
    }
}

/// Outcome of scoring one run.
struct ScoredRun {
    children: Vec<EvaluationDetail>,
    run_reasons: BTreeMap<&'static str, String>,
    /// Sorted, deduplicated reason ids over the run and its updates.
    reason_ids: Vec<&'static str>,
    num_dubious: u32,
    duration: f64,
    is_dubious: bool,
}

impl DubiousCriteria {
    fn run_reasons(&self, target: &dyn TargetData, run: &Run) -> BTreeMap<&'static str, String> {
        let mut reasons = BTreeMap::new();
        if self.mark_primary_only && target.is_primary_only() {
            reasons.insert("Pri.", "primary only".to_string());
        }
        if run.left_sector {
            return reasons;
        }
        if let Some(min) = self.min_updates.filter(|&min| (run.updates.len() as u32) < min) {
            reasons.insert("#Up", format!("{} < {}", run.updates.len(), min));
        }
        if let Some(min) = self.min_duration.filter(|&min| run.duration_secs() < min) {
            reasons.insert("Dur.", format!("{:.2} < {:.2}", run.duration_secs(), min));
        }
        reasons
    }

    fn update_reasons(&self, prev: Option<&Update>, cur: &Update) -> BTreeMap<&'static str, String> {
        let mut reasons = BTreeMap::new();

        if let Some(max) = self.max_groundspeed_kts {
            let measured = cur.velocity.map(|v| v.speed / KNOTS2M_S).filter(|&kts| kts > max);
            if let Some(kts) = measured {
                reasons.insert("Spd", format!("{kts:.2} kts"));
            } else if let Some(kts) = prev.and_then(|p| derived_speed_kts(p, cur)).filter(|&kts| kts > max) {
                reasons.insert("Spd", format!("{kts:.2} kts derived"));
            }
        }

        let Some(prev) = prev else {
            return reasons;
        };
        let dt = seconds(cur.t - prev.t);
        if dt < self.minimum_comparison_time || dt > self.maximum_comparison_time || dt <= 0.0 {
            return reasons;
        }

        if let (Some(v0), Some(v1)) = (prev.velocity, cur.velocity) {
            if let Some(max) = self.max_acceleration {
                let acc = (v1.speed - v0.speed).abs() / dt;
                if acc > max {
                    reasons.insert("Acc", format!("{acc:.2} m/s^2"));
                }
            }
            if let Some(max) = self.max_turnrate {
                let tr = min_angle_difference(v1.track_angle, v0.track_angle).abs() / dt;
                if tr > max {
                    reasons.insert("TR", format!("{tr:.2} deg/s"));
                }
            }
        }

        if let (Some(max), Some(a0), Some(a1)) = (self.max_rocd, prev.pos.altitude, cur.pos.altitude) {
            let rocd = (a1 - a0).abs() / dt;
            if rocd > max {
                reasons.insert("ROCD", format!("{rocd:.2} ft/s"));
            }
        }
        reasons
    }

    /// Scores every update of `run`; run reasons mark all of them dubious.
    fn score(&self, target: &dyn TargetData, run: &Run) -> ScoredRun {
        let run_reasons = self.run_reasons(target, run);

        let mut children = Vec::with_capacity(run.updates.len());
        let mut reason_ids: Vec<&'static str> = run_reasons.keys().copied().collect();
        let mut num_dubious = 0u32;
        let mut prev: Option<&Update> = None;
        for u in &run.updates {
            let reasons = self.update_reasons(prev, u);
            let dubious = !run_reasons.is_empty() || !reasons.is_empty();
            if dubious {
                num_dubious += 1;
            }
            reason_ids.extend(reasons.keys().copied());
            let mut child = EvaluationDetail::new(u.t, u.pos)
                .with_value(keys::DUBIOUS, dubious)
                .with_comment(reasons.keys().copied().collect::<Vec<_>>().join(", "));
            for (id, text) in reasons {
                child.add_group_comment(DUBIOUS_REASONS, id, text);
            }
            children.push(child);
            prev = Some(u);
        }
        reason_ids.sort_unstable();
        reason_ids.dedup();

        let is_dubious = !run.updates.is_empty() && num_dubious as f64 / run.updates.len() as f64 > self.dubious_prob;
        ScoredRun {
            children,
            run_reasons,
            reason_ids,
            num_dubious,
            duration: run.duration_secs(),
            is_dubious,
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.minimum_comparison_time > self.maximum_comparison_time {
            return Err("minimum_comparison_time exceeds maximum_comparison_time".to_string());
        }
        if !(0.0..=1.0).contains(&self.dubious_prob) {
            return Err("dubious_prob must lie in [0, 1]".to_string());
        }
        Ok(())
    }
}

/// Speed between two updates from their positions, in knots.
fn derived_speed_kts(prev: &Update, cur: &Update) -> Option<f64> {
    let dt = seconds(cur.t - prev.t);
    if dt <= 0.0 {
        return None;
    }
    geodesic_distance(&prev.pos, &cur.pos).map(|d| d / dt / KNOTS2M_S)
}

fn run_detail(begin: Timestamp, run: &Run, scored: ScoredRun, comment: String) -> EvaluationDetail {
    let mut detail = EvaluationDetail::with_positions(begin, run.updates.iter().map(|u| u.pos).collect())
        .with_value(keys::DUBIOUS, scored.is_dubious)
        .with_value(keys::DURATION, scored.duration)
        .with_value(keys::NUM_UPDATES, run.updates.len() as u32)
        .with_comment(comment);
    for (id, text) in scored.run_reasons {
        detail.add_group_comment(DUBIOUS_REASONS, id, text);
    }
    detail.with_children(scored.children)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DubiousCounts {
    pub num_updates: u32,
    pub num_no_track_num: u32,
    pub num_pos_outside: u32,
    pub num_pos_inside: u32,
    pub num_pos_inside_dubious: u32,
    pub num_tracks: u32,
    pub num_tracks_dubious: u32,
    /// Seconds over all runs.
    pub duration_all: f64,
    pub duration_dubious: f64,
}

impl Tally for DubiousCounts {
    type Config = DubiousTrackConfig;

    fn check(&self) {
        assert_eq!(
            self.num_updates,
            self.num_no_track_num + self.num_pos_outside + self.num_pos_inside,
            "dubious: inside + outside + no track number != updates"
        );
        assert!(self.num_pos_inside_dubious <= self.num_pos_inside, "dubious: more dubious than inside updates");
        assert!(self.num_tracks <= self.num_pos_inside, "dubious: more tracks than inside updates");
        assert_eq!(
            self.num_tracks == 0,
            self.num_pos_inside == 0,
            "dubious: inside updates without tracks"
        );
        assert!(self.num_tracks_dubious <= self.num_tracks, "dubious: more dubious tracks than tracks");
        assert!(
            0.0 <= self.duration_dubious && self.duration_dubious <= self.duration_all + 1e-6,
            "dubious: dubious duration outside [0, total duration]"
        );
    }

    fn merge(&mut self, o: &Self) {
        self.num_updates += o.num_updates;
        self.num_no_track_num += o.num_no_track_num;
        self.num_pos_outside += o.num_pos_outside;
        self.num_pos_inside += o.num_pos_inside;
        self.num_pos_inside_dubious += o.num_pos_inside_dubious;
        self.num_tracks += o.num_tracks;
        self.num_tracks_dubious += o.num_tracks_dubious;
        self.duration_all += o.duration_all;
        self.duration_dubious += o.duration_dubious;
    }

    fn metric(&self, _config: &DubiousTrackConfig) -> Option<f64> {
        ratio(self.num_tracks_dubious, self.num_tracks)
    }

    fn num_issues(&self) -> u32 {
        self.num_tracks_dubious
    }
}

impl Evaluator for DubiousTrackConfig {
    fn evaluate(&self, ctx: &EvalContext<'_>, target: &dyn TargetData) -> Evaluation {
        let run_gap = span(TRACK_RUN_GAP_SECS);

        let mut c = DubiousCounts::default();
        let mut open: BTreeMap<u32, Run> = BTreeMap::new();
        let mut closed: Vec<(u32, Run)> = Vec::new();

        for t in target.tst_timestamps() {
            let Some(pos) = target.tst_pos(t) else {
                continue;
            };
            c.num_updates += 1;

            let Some(tn) = target.tst_track_num(t) else {
                c.num_no_track_num += 1;
                continue;
            };

            if !ctx.tst_pos_inside(target, t, &pos) {
                c.num_pos_outside += 1;
                if let Some(run) = open.get_mut(&tn) {
                    run.left_sector = true;
                }
                continue;
            }
            c.num_pos_inside += 1;

            let gap_exceeded = open
                .get(&tn)
                .and_then(Run::end)
                .is_some_and(|end| t - end > run_gap);
            if gap_exceeded {
                if let Some(run) = open.remove(&tn) {
                    closed.push((tn, run));
                }
            }
            open.entry(tn).or_default().updates.push(Update {
                t,
                pos,
                velocity: target.tst_velocity(t),
            });
        }
        closed.extend(open);
        closed.sort_by_key(|(tn, run)| (run.begin(), *tn));

        if c.num_no_track_num > 0 {
            warn!(
                "utn {}: {} test updates without track number",
                target.utn(),
                c.num_no_track_num
            );
        }

        let mut details = Vec::with_capacity(closed.len());
        for (tn, run) in &closed {
            let Some(begin) = run.begin() else {
                continue;
            };
            let scored = self.0.score(target, run);

            c.num_pos_inside_dubious += scored.num_dubious;
            c.num_tracks += 1;
            c.duration_all += scored.duration;
            if scored.is_dubious {
                c.num_tracks_dubious += 1;
                c.duration_dubious += scored.duration;
            }

            let comment = if scored.is_dubious {
                format!("Dubious track {tn}: {}", scored.reason_ids.join(", "))
            } else {
                format!("Track {tn} OK")
            };
            details.push(run_detail(begin, run, scored, comment).with_value(keys::TRACK_NUM, *tn));
        }

        Evaluation::new(Counts::DubiousTrack(c), details)
    }

    fn validate(&self) -> Result<(), String> {
        self.0.validate()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DubiousTargetCounts {
    pub num_updates: u32,
    pub num_pos_outside: u32,
    pub num_pos_inside: u32,
    pub num_pos_inside_dubious: u32,
    /// Targets with at least one in-sector update.
    pub num_targets: u32,
    pub num_targets_dubious: u32,
    /// Seconds over all scored runs.
    pub duration_all: f64,
    pub duration_dubious: f64,
}

impl Tally for DubiousTargetCounts {
    type Config = DubiousTargetConfig;

    fn check(&self) {
        assert_eq!(
            self.num_updates,
            self.num_pos_outside + self.num_pos_inside,
            "dubious target: inside + outside != updates"
        );
        assert!(
            self.num_pos_inside_dubious <= self.num_pos_inside,
            "dubious target: more dubious than inside updates"
        );
        assert!(self.num_targets <= self.num_pos_inside, "dubious target: more targets than inside updates");
        assert_eq!(
            self.num_targets == 0,
            self.num_pos_inside == 0,
            "dubious target: inside updates without a target"
        );
        assert!(
            self.num_targets_dubious <= self.num_targets,
            "dubious target: more dubious targets than targets"
        );
        assert!(
            0.0 <= self.duration_dubious && self.duration_dubious <= self.duration_all + 1e-6,
            "dubious target: dubious duration outside [0, total duration]"
        );
    }

    fn merge(&mut self, o: &Self) {
        self.num_updates += o.num_updates;
        self.num_pos_outside += o.num_pos_outside;
        self.num_pos_inside += o.num_pos_inside;
        self.num_pos_inside_dubious += o.num_pos_inside_dubious;
        self.num_targets += o.num_targets;
        self.num_targets_dubious += o.num_targets_dubious;
        self.duration_all += o.duration_all;
        self.duration_dubious += o.duration_dubious;
    }

    fn metric(&self, _config: &DubiousTargetConfig) -> Option<f64> {
        ratio(self.num_targets_dubious, self.num_targets)
    }

    fn num_issues(&self) -> u32 {
        self.num_targets_dubious
    }
}

impl Evaluator for DubiousTargetConfig {
    fn evaluate(&self, ctx: &EvalContext<'_>, target: &dyn TargetData) -> Evaluation {
        let run_gap = span(TRACK_RUN_GAP_SECS);

        let mut c = DubiousTargetCounts::default();
        let mut run = Run::default();

        for t in target.tst_timestamps() {
            let Some(pos) = target.tst_pos(t) else {
                continue;
            };
            c.num_updates += 1;

            // tracks whether the last update lay outside
            if !ctx.tst_pos_inside(target, t, &pos) {
                c.num_pos_outside += 1;
                run.left_sector = true;
                continue;
            }
            run.left_sector = false;
            c.num_pos_inside += 1;

            if run.end().is_some_and(|end| t - end > run_gap) {
                continue;
            }
            run.updates.push(Update {
                t,
                pos,
                velocity: target.tst_velocity(t),
            });
        }

        let Some(begin) = run.begin() else {
            return Evaluation::new(Counts::DubiousTarget(c), Vec::new());
        };
        let skipped = c.num_pos_inside as usize - run.updates.len();
        if skipped > 0 {
            warn!("utn {}: {} test updates after a gap ignored", target.utn(), skipped);
        }

        let scored = self.0.score(target, &run);
        c.num_pos_inside_dubious = scored.num_dubious;
        c.num_targets = 1;
        c.duration_all = scored.duration;
        if scored.is_dubious {
            c.num_targets_dubious = 1;
            c.duration_dubious = scored.duration;
        }

        let comment = if scored.is_dubious {
            format!("Dubious target: {}", scored.reason_ids.join(", "))
        } else {
            "Target OK".to_string()
        };
        let detail = run_detail(begin, &run, scored, comment);
        Evaluation::new(Counts::DubiousTarget(c), vec![detail])
    }

    fn validate(&self) -> Result<(), String> {
        self.0.validate()
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

    fn pos(alt: f64) -> TargetPosition {
        TargetPosition::new(48.0, 16.0).with_altitude(alt)
    }

    fn evaluate(cfg: &dyn Evaluator, target: &InMemoryTarget) -> Evaluation {
        let settings = EvaluationSettings::default();
        let layer = SectorLayer::new("fir").with_sector(Sector::new(
            "box",
            vec![[47.0, 15.0], [47.0, 17.0], [49.0, 17.0], [49.0, 15.0]],
        ));
        let registry = DataSourceRegistry::new();
        cfg.evaluate(&EvalContext::new(&settings, &layer, &registry), target)
    }

    #[test]
    fn test_short_track_is_dubious() {
        let test = vec![
            // long, well-behaved track 1
            Sample::new(ts(0.0), pos(1000.0)).with_track_num(1),
            Sample::new(ts(60.0), pos(1000.0)).with_track_num(1),
            Sample::new(ts(120.0), pos(1000.0)).with_track_num(1),
            // short track 2
            Sample::new(ts(10.0), pos(1000.0)).with_track_num(2),
            Sample::new(ts(14.0), pos(1000.0)).with_track_num(2),
            Sample::new(ts(20.0), pos(1000.0)),
        ];
        let target = InMemoryTarget::new(4, Vec::new(), test);
        let cfg = DubiousTrackConfig(DubiousCriteria { min_duration: Some(30.0), ..Default::default() });

        let eval = evaluate(&cfg, &target);
        let Counts::DubiousTrack(c) = &eval.counts else {
            panic!("wrong family");
        };
        c.check();
        assert_eq!(c.num_updates, 6);
        assert_eq!(c.num_no_track_num, 1);
        assert_eq!(c.num_tracks, 2);
        assert_eq!(c.num_tracks_dubious, 1);
        assert_eq!(c.num_pos_inside_dubious, 2);
        assert!((c.duration_all - 124.0).abs() < 1e-9);
        assert!((c.duration_dubious - 4.0).abs() < 1e-9);
        assert_eq!(c.metric(&cfg), Some(0.5));

        assert_eq!(eval.details.len(), 2);
        let short = &eval.details[1];
        assert_eq!(short.value_u64(keys::TRACK_NUM), Some(2));
        assert_eq!(short.children().len(), 2);
        assert!(short.comment_group(DUBIOUS_REASONS).is_some_and(|g| g.contains_key("Dur.")));
    }

    #[test]
    fn test_gap_splits_run_and_rocd() {
        let test = vec![
            Sample::new(ts(0.0), pos(1000.0)).with_track_num(7),
            Sample::new(ts(5.0), pos(1005.0)).with_track_num(7),
            Sample::new(ts(400.0), pos(1000.0)).with_track_num(7),
            // 1000 ft in 5 s
            Sample::new(ts(405.0), pos(2000.0)).with_track_num(7),
        ];
        let target = InMemoryTarget::new(5, Vec::new(), test);
        let cfg = DubiousTrackConfig(DubiousCriteria { max_rocd: Some(100.0), dubious_prob: 0.4, ..Default::default() });

        let eval = evaluate(&cfg, &target);
        let Counts::DubiousTrack(c) = &eval.counts else {
            panic!("wrong family");
        };
        c.check();
        assert_eq!(c.num_tracks, 2);
        assert_eq!(c.num_pos_inside_dubious, 1);
        assert_eq!(c.num_tracks_dubious, 1);
        assert!(eval.details[1].comment().contains("ROCD"));
    }

    #[test]
    fn test_fast_target_is_dubious() {
        let mut test: Vec<Sample> = (0..10)
            .map(|i| {
                // 400 m/s is about 778 kts
                let speed = if i < 3 { 400.0 } else { 200.0 };
                Sample::new(ts(i as f64), pos(1000.0)).with_velocity(speed, 90.0)
            })
            .collect();
        test.push(Sample::new(ts(10.0), TargetPosition::new(50.0, 16.0)));
        let target = InMemoryTarget::new(6, Vec::new(), test);
        let cfg = DubiousTargetConfig(DubiousCriteria {
            max_groundspeed_kts: Some(600.0),
            dubious_prob: 0.2,
            ..Default::default()
        });

        let eval = evaluate(&cfg, &target);
        let Counts::DubiousTarget(c) = &eval.counts else {
            panic!("wrong family");
        };
        c.check();
        assert_eq!(c.num_updates, 11);
        assert_eq!(c.num_pos_outside, 1);
        assert_eq!(c.num_pos_inside, 10);
        assert_eq!(c.num_pos_inside_dubious, 3);
        assert_eq!(c.num_targets, 1);
        assert_eq!(c.num_targets_dubious, 1);
        assert!((c.duration_dubious - 9.0).abs() < 1e-9);
        assert_eq!(c.metric(&cfg), Some(1.0));

        assert_eq!(eval.details.len(), 1);
        assert_eq!(eval.details[0].comment(), "Dubious target: Spd");
        assert_eq!(eval.details[0].children().len(), 10);
        assert_eq!(eval.details[0].children()[3].value_bool(keys::DUBIOUS), Some(false));
    }

    #[test]
    fn test_target_derived_speed_and_gap() {
        let test = vec![
            Sample::new(ts(0.0), TargetPosition::new(48.0, 16.0)),
            // about 37 km in 10 s
            Sample::new(ts(10.0), TargetPosition::new(48.0, 16.5)),
            // after the gap, counted but not scored
            Sample::new(ts(400.0), TargetPosition::new(48.0, 16.5)),
        ];
        let target = InMemoryTarget::new(7, Vec::new(), test);
        let cfg = DubiousTargetConfig(DubiousCriteria {
            min_updates: Some(5),
            max_groundspeed_kts: Some(600.0),
            ..Default::default()
        });

        let eval = evaluate(&cfg, &target);
        let Counts::DubiousTarget(c) = &eval.counts else {
            panic!("wrong family");
        };
        c.check();
        assert_eq!(c.num_pos_inside, 3);
        assert_eq!(c.num_pos_inside_dubious, 2);
        assert_eq!(c.num_targets_dubious, 1);

        let detail = &eval.details[0];
        assert_eq!(detail.value_u64(keys::NUM_UPDATES), Some(2));
        assert_eq!(detail.comment(), "Dubious target: #Up, Spd");
        assert!(detail.children()[1].comment_group(DUBIOUS_REASONS).is_some_and(|g| g["Spd"].ends_with("derived")));
    }

    #[test]
    fn test_target_without_inside_updates() {
        let test = vec![Sample::new(ts(0.0), TargetPosition::new(50.0, 16.0))];
        let target = InMemoryTarget::new(8, Vec::new(), test);
        let cfg = DubiousTargetConfig::default();

        let eval = evaluate(&cfg, &target);
        let Counts::DubiousTarget(c) = &eval.counts else {
            panic!("wrong family");
        };
        c.check();
        assert_eq!(c.num_targets, 0);
        assert_eq!(c.metric(&cfg), None);
        assert!(eval.details.is_empty());
    }

    #[test]
    fn test_shared_validation() {
        let bad = DubiousCriteria { dubious_prob: 1.5, ..Default::default() };
        assert!(DubiousTrackConfig(bad.clone()).validate().is_err());
        assert!(DubiousTargetConfig(bad).validate().is_err());
    }
}
