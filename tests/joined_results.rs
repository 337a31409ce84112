//! Pooling of single results into joined results.

mod common;

use std::sync::Arc;

use common::{inside, ts, Fixture};
use track_eval::data::{Field, InMemoryTarget, Sample, TargetData};
use track_eval::requirement::{ComparisonType, PresenceConfig, Requirement, RequirementKind};
use track_eval::result::{rebuild, Counts, JoinedResult, SingleResult};

/// 10 updates with Mode 3/A on the reference, `missing` of them without on test.
fn target(utn: u32, missing: usize) -> InMemoryTarget {
    let reference = (0..10).map(|i| Sample::new(ts(i as f64), inside()).with_mode_a(0o7000)).collect();
    let test = (0..10)
        .map(|i| {
            let s = Sample::new(ts(i as f64), inside());
            if i < missing {
                s
            } else {
                s.with_mode_a(0o7000)
            }
        })
        .collect();
    InMemoryTarget::new(utn, reference, test)
}

fn presence(must_hold: bool) -> Arc<Requirement> {
    Arc::new(
        Requirement::new(
            "Mode 3/A Present",
            "MA-P",
            RequirementKind::Presence(PresenceConfig { field: Field::ModeA }),
        )
        .with_condition(ComparisonType::GreaterThanOrEqual, 0.8)
        .must_hold_for_any_target(must_hold),
    )
}

fn singles(req: &Arc<Requirement>, targets: &[InMemoryTarget]) -> Vec<Arc<SingleResult>> {
    let fx = Fixture::new();
    targets.iter().map(|t| Arc::new(req.evaluate(&fx.ctx(), t))).collect()
}

fn joined(req: &Arc<Requirement>, singles: &[Arc<SingleResult>]) -> JoinedResult {
    let mut joined = JoinedResult::new(Arc::clone(req), "fir");
    for s in singles {
        joined.add_single_result(Arc::clone(s));
    }
    joined.update_to_use_changes();
    joined
}

#[test]
fn test_rebuild_is_idempotent() {
    let req = presence(false);
    let targets = [target(1, 0), target(2, 3), target(3, 5)];
    let singles = singles(&req, &targets);
    let mut joined = joined(&req, &singles);

    let first = joined.state().clone();
    joined.update_to_use_changes();
    assert_eq!(joined.state(), &first);
    assert_eq!(rebuild(&req, &singles), first);

    let Counts::Presence(c) = joined.counts() else {
        panic!("wrong family");
    };
    assert_eq!(c.num_pos_inside, 30);
    assert_eq!(c.num_missing, 8);
    assert!((joined.result().unwrap() - 22.0 / 30.0).abs() < 1e-12);
}

#[test]
fn test_interest_factors_sum_to_one() {
    let req = presence(false);
    let targets = [target(1, 0), target(2, 3), target(3, 5), target(4, 1)];
    let singles = singles(&req, &targets);
    let joined = joined(&req, &singles);

    let total: f64 = targets.iter().map(|t| joined.interest(t.utn())).sum();
    assert!((total - 1.0).abs() < 1e-9);
    assert_eq!(joined.interest(1), 0.0);
    assert!((joined.interest(3) - 5.0 / 9.0).abs() < 1e-12);
}

#[test]
fn test_use_flag_changes_pool() {
    let req = presence(false);
    let targets = [target(1, 0), target(2, 6)];
    let singles = singles(&req, &targets);
    let mut joined = joined(&req, &singles);
    assert!((joined.result().unwrap() - 14.0 / 20.0).abs() < 1e-12);
    assert_eq!(joined.passed(), Some(false));

    targets[1].use_flag().set(false);
    joined.update_to_use_changes();
    assert_eq!(joined.state().num_targets, 1);
    assert_eq!(joined.result(), Some(1.0));
    assert_eq!(joined.passed(), Some(true));
    assert_eq!(joined.interest(2), 0.0);

    targets[0].use_flag().set(false);
    joined.update_to_use_changes();
    assert_eq!(joined.result(), None);
    assert_eq!(joined.passed(), None);
}

#[test]
fn test_must_hold_for_any_target() {
    let targets = [target(1, 0), target(2, 0), target(3, 0), target(4, 3)];

    let pooled = presence(false);
    let j = joined(&pooled, &singles(&pooled, &targets));
    assert!((j.result().unwrap() - 37.0 / 40.0).abs() < 1e-12);
    assert_eq!(j.passed(), Some(true));

    let strict = presence(true);
    let j = joined(&strict, &singles(&strict, &targets));
    assert_eq!(j.state().num_failed_targets, 1);
    assert_eq!(j.passed(), Some(false));
}

#[test]
fn test_unusable_singles_are_not_pooled() {
    let req = presence(false);
    let empty = InMemoryTarget::new(9, Vec::new(), vec![Sample::new(ts(0.0), inside())]);
    let singles = singles(&req, &[target(1, 2), empty]);
    let joined = joined(&req, &singles);

    assert_eq!(joined.num_single_results(), 2);
    assert_eq!(joined.num_usable_single_results(), 1);
    assert_eq!(joined.num_unusable_single_results(), 1);
    assert_eq!(joined.state().num_targets, 1);
}

#[test]
fn test_details_keep_order() {
    let req = presence(false);
    let singles = singles(&req, &[target(1, 4)]);
    let single = &singles[0];
    assert_eq!(single.num_details(), 10);
    let times: Vec<_> = single.details().iter().map(|d| d.timestamp()).collect();
    assert!(times.windows(2).all(|w| w[0] < w[1]));
}

#[test]
#[should_panic(expected = "another requirement")]
fn test_foreign_single_rejected() {
    let a = presence(false);
    let b = Arc::new(Requirement::new(
        "Other",
        "O",
        RequirementKind::Presence(PresenceConfig { field: Field::ModeC }),
    ));
    let single = singles(&b, &[target(1, 0)]).remove(0);
    let mut joined = JoinedResult::new(a, "fir");
    joined.add_single_result(single);
}
