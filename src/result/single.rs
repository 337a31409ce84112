//! Per-target result.

use std::sync::Arc;

use serde::Serialize;
use tracing::trace;

use super::Counts;
use crate::data::{TargetData, UseFlag, Utn};
use crate::detail::{Details, EvaluationDetail};
use crate::requirement::{Evaluation, Requirement};
use crate::time_period::TimePeriod;

/// Outcome of one requirement for one target in one sector layer.
///
/// Counters, metric and details are fixed at construction; re-evaluation
/// builds a new result. Only the target's use flag can change afterwards.
#[derive(Debug, Clone)]
pub struct SingleResult {
    requirement: Arc<Requirement>,
    sector_layer: String,
    utn: Utn,
    target_use: UseFlag,
    counts: Counts,
    details: Details,
    ref_periods: Vec<TimePeriod>,
    missed_periods: Vec<TimePeriod>,
    ignore: bool,
    result: Option<f64>,
}

impl SingleResult {
    pub fn new(requirement: Arc<Requirement>, sector_layer: &str, target: &dyn TargetData, evaluation: Evaluation) -> Self {
        let Evaluation { counts, details, ignore, ref_periods, missed_periods } = evaluation;

        counts.check();
        let result = counts.metric(&requirement.kind);
        trace!(
            "{} utn {} layer '{}': result {:?} ({} details)",
            requirement.short_name,
            target.utn(),
            sector_layer,
            result,
            details.len()
        );

        Self {
            requirement,
            sector_layer: sector_layer.to_string(),
            utn: target.utn(),
            target_use: target.use_flag(),
            counts,
            details,
            ref_periods,
            missed_periods,
            ignore,
            result,
        }
    }

    pub fn requirement(&self) -> &Arc<Requirement> {
        &self.requirement
    }

    pub fn sector_layer(&self) -> &str {
        &self.sector_layer
    }

    pub fn utn(&self) -> Utn {
        self.utn
    }

    pub fn counts(&self) -> &Counts {
        &self.counts
    }

    pub fn result(&self) -> Option<f64> {
        self.result
    }

    pub fn is_ignored(&self) -> bool {
        self.ignore
    }

    pub fn is_usable(&self) -> bool {
        self.result.is_some() && !self.ignore
    }

    pub fn target_used(&self) -> bool {
        self.target_use.get()
    }

    /// Usable and the operator keeps the target in use.
    pub fn use_result(&self) -> bool {
        self.is_usable() && self.target_used()
    }

    pub fn has_failed(&self) -> bool {
        match self.result {
            Some(v) if self.is_usable() => !self.requirement.condition_passed(v),
            _ => false,
        }
    }

    pub fn num_issues(&self) -> u32 {
        self.counts.num_issues()
    }

    pub fn has_issues(&self) -> bool {
        self.is_usable() && self.num_issues() > 0
    }

    pub fn details(&self) -> &[EvaluationDetail] {
        &self.details
    }

    pub fn num_details(&self) -> usize {
        self.details.len()
    }

    pub fn ref_periods(&self) -> &[TimePeriod] {
        &self.ref_periods
    }

    pub fn missed_periods(&self) -> &[TimePeriod] {
        &self.missed_periods
    }

    pub fn summary(&self) -> SingleSummary {
        SingleSummary {
            utn: self.utn,
            requirement: self.requirement.name.clone(),
            sector_layer: self.sector_layer.clone(),
            result: self.result,
            usable: self.is_usable(),
            used: self.use_result(),
            failed: self.has_failed(),
            num_issues: self.num_issues(),
            num_details: self.num_details(),
        }
    }
}

/// Report row of a single result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleSummary {
    pub utn: Utn,
    pub requirement: String,
    pub sector_layer: String,
    pub result: Option<f64>,
    pub usable: bool,
    pub used: bool,
    pub failed: bool,
    pub num_issues: u32,
    pub num_details: usize,
}
