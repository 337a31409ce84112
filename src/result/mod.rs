//! Single and joined results
//!
//! - [`SingleResult`]: one target, one requirement, one sector layer. Fixed at
//!   construction.
//! - [`JoinedResult`]: all singles of one requirement and sector layer, pooled
//!   by a full rebuild whenever the set of used singles changes.
//! - [`ResultsCache`]: owner of both, indexed by UTN and by
//!   (requirement, sector layer).

pub mod accumulator;
pub mod cache;
pub mod joined;
pub mod single;

use serde::Serialize;

use crate::requirement::{
    CorrectCounts, DeviationCounts, DubiousCounts, DubiousTargetCounts, ExtraCounts, FalseCounts, IntervalCounts,
    PresenceCounts, RequirementKind,
};

pub use accumulator::{LinearFit, ValueAccumulator};
pub use cache::ResultsCache;
pub use joined::{rebuild, JoinedResult, PooledState};
pub use single::SingleResult;

/// Family-specific counters.
///
/// `check` asserts the counter invariants; a violation is a defect in the
/// evaluator and panics.
pub trait Tally: Clone + Default {
    type Config;

    fn check(&self);
    fn merge(&mut self, other: &Self);
    fn metric(&self, config: &Self::Config) -> Option<f64>;
    fn num_issues(&self) -> u32;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Counts {
    Presence(PresenceCounts),
    Falseness(FalseCounts),
    Correctness(CorrectCounts),
    Interval(IntervalCounts),
    Deviation(DeviationCounts),
    ExtraData(ExtraCounts),
    ExtraTrack(ExtraCounts),
    DubiousTrack(DubiousCounts),
    DubiousTarget(DubiousTargetCounts),
}

macro_rules! dispatch {
    ($self:expr, $c:ident => $body:expr) => {
        match $self {
            Counts::Presence($c) => $body,
            Counts::Falseness($c) => $body,
            Counts::Correctness($c) => $body,
            Counts::Interval($c) => $body,
            Counts::Deviation($c) => $body,
            Counts::ExtraData($c) => $body,
            Counts::ExtraTrack($c) => $body,
            Counts::DubiousTrack($c) => $body,
            Counts::DubiousTarget($c) => $body,
        }
    };
}

impl Counts {
    /// Zeroed counters of the requirement's family.
    pub fn zero(kind: &RequirementKind) -> Self {
        match kind {
            RequirementKind::Presence(_) => Counts::Presence(Default::default()),
            RequirementKind::Falseness(_) => Counts::Falseness(Default::default()),
            RequirementKind::Correctness(_) => Counts::Correctness(Default::default()),
            RequirementKind::Interval(_) => Counts::Interval(Default::default()),
            RequirementKind::Deviation(_) => Counts::Deviation(Default::default()),
            RequirementKind::ExtraData(_) => Counts::ExtraData(Default::default()),
            RequirementKind::ExtraTrack(_) => Counts::ExtraTrack(Default::default()),
            RequirementKind::DubiousTrack(_) => Counts::DubiousTrack(Default::default()),
            RequirementKind::DubiousTarget(_) => Counts::DubiousTarget(Default::default()),
        }
    }

    pub fn check(&self) {
        dispatch!(self, c => c.check())
    }

    pub fn num_issues(&self) -> u32 {
        dispatch!(self, c => c.num_issues())
    }

    /// Adds `other` into `self`. Both must belong to the same family.
    pub fn merge(&mut self, other: &Counts) {
        match (self, other) {
            (Counts::Presence(a), Counts::Presence(b)) => a.merge(b),
            (Counts::Falseness(a), Counts::Falseness(b)) => a.merge(b),
            (Counts::Correctness(a), Counts::Correctness(b)) => a.merge(b),
            (Counts::Interval(a), Counts::Interval(b)) => a.merge(b),
            (Counts::Deviation(a), Counts::Deviation(b)) => a.merge(b),
            (Counts::ExtraData(a), Counts::ExtraData(b)) => a.merge(b),
            (Counts::ExtraTrack(a), Counts::ExtraTrack(b)) => a.merge(b),
            (Counts::DubiousTrack(a), Counts::DubiousTrack(b)) => a.merge(b),
            (Counts::DubiousTarget(a), Counts::DubiousTarget(b)) => a.merge(b),
            (a, b) => panic!("cannot merge {} counts into {} counts", b.family(), a.family()),
        }
    }

    /// Metric under the requirement's family configuration; `None` when undefined.
    pub fn metric(&self, kind: &RequirementKind) -> Option<f64> {
        match (self, kind) {
            (Counts::Presence(c), RequirementKind::Presence(cfg)) => c.metric(cfg),
            (Counts::Falseness(c), RequirementKind::Falseness(cfg)) => c.metric(cfg),
            (Counts::Correctness(c), RequirementKind::Correctness(cfg)) => c.metric(cfg),
            (Counts::Interval(c), RequirementKind::Interval(cfg)) => c.metric(cfg),
            (Counts::Deviation(c), RequirementKind::Deviation(cfg)) => c.metric(cfg),
            (Counts::ExtraData(c), RequirementKind::ExtraData(_)) => c.metric(&()),
            (Counts::ExtraTrack(c), RequirementKind::ExtraTrack(_)) => c.metric(&()),
            (Counts::DubiousTrack(c), RequirementKind::DubiousTrack(cfg)) => c.metric(cfg),
            (Counts::DubiousTarget(c), RequirementKind::DubiousTarget(cfg)) => c.metric(cfg),
            (c, k) => panic!("{} counts evaluated against {} requirement", c.family(), k.family()),
        }
    }

    pub fn family(&self) -> &'static str {
        match self {
            Counts::Presence(_) => "presence",
            Counts::Falseness(_) => "falseness",
            Counts::Correctness(_) => "correctness",
            Counts::Interval(_) => "interval",
            Counts::Deviation(_) => "deviation",
            Counts::ExtraData(_) => "extra_data",
            Counts::ExtraTrack(_) => "extra_track",
            Counts::DubiousTrack(_) => "dubious_track",
            Counts::DubiousTarget(_) => "dubious_target",
        }
    }
}

/// `num / den`, absent for a zero denominator.
pub(crate) fn ratio(num: u32, den: u32) -> Option<f64> {
    (den > 0).then(|| num as f64 / den as f64)
}
