//! Pooled result over all targets of one requirement and sector layer.
//!
//! Pooling is never incremental: [`rebuild`] starts from zeroed counters
//! and re-sums every used contributor, and [`JoinedResult`] swaps in the new
//! state as a whole.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::{Counts, SingleResult};
use crate::data::Utn;
use crate::requirement::Requirement;

/// Everything derived from the used contributors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PooledState {
    pub counts: Counts,
    pub result: Option<f64>,
    /// Contributors whose counters were pooled.
    pub num_targets: u32,
    pub num_failed_targets: u32,
    pub num_issues: u32,
    /// Share of the pooled issues per used contributor.
    pub interest: BTreeMap<Utn, f64>,
}

/// Pools the used contributors from scratch.
pub fn rebuild(requirement: &Requirement, contributors: &[Arc<SingleResult>]) -> PooledState {
    let mut counts = Counts::zero(&requirement.kind);
    let mut num_targets = 0;
    let mut num_failed_targets = 0;

    let used: Vec<&Arc<SingleResult>> = contributors.iter().filter(|s| s.use_result()).collect();
    for single in &used {
        num_targets += 1;
        if single.has_failed() {
            num_failed_targets += 1;
        }
        counts.merge(single.counts());
    }
    counts.check();

    let result = counts.metric(&requirement.kind);
    let num_issues = counts.num_issues();

    let mut interest = BTreeMap::new();
    if num_issues > 0 {
        for single in &used {
            interest.insert(single.utn(), single.num_issues() as f64 / num_issues as f64);
        }
    }

    PooledState {
        counts,
        result,
        num_targets,
        num_failed_targets,
        num_issues,
        interest,
    }
}

#[derive(Debug, Clone)]
pub struct JoinedResult {
    requirement: Arc<Requirement>,
    sector_layer: String,
    contributors: Vec<Arc<SingleResult>>,
    state: PooledState,
}

impl JoinedResult {
    pub fn new(requirement: Arc<Requirement>, sector_layer: impl Into<String>) -> Self {
        let state = rebuild(&requirement, &[]);
        Self {
            requirement,
            sector_layer: sector_layer.into(),
            contributors: Vec::new(),
            state,
        }
    }

    pub fn requirement(&self) -> &Arc<Requirement> {
        &self.requirement
    }

    pub fn sector_layer(&self) -> &str {
        &self.sector_layer
    }

    /// Registers a contributor. Call [`Self::update_to_use_changes`] afterwards.
    pub fn add_single_result(&mut self, single: Arc<SingleResult>) {
        assert_eq!(single.requirement().name, self.requirement.name, "single result of another requirement");
        assert_eq!(single.sector_layer(), self.sector_layer, "single result of another sector layer");
        self.contributors.push(single);
    }

    /// Recomputes the pooled state over the currently used contributors.
    pub fn update_to_use_changes(&mut self) {
        self.state = rebuild(&self.requirement, &self.contributors);
        debug!(
            "joined {} '{}': {} of {} targets used, result {:?}",
            self.requirement.short_name,
            self.sector_layer,
            self.state.num_targets,
            self.contributors.len(),
            self.state.result
        );
    }

    pub fn contributors(&self) -> &[Arc<SingleResult>] {
        &self.contributors
    }

    pub fn contains(&self, utn: Utn) -> bool {
        self.contributors.iter().any(|s| s.utn() == utn)
    }

    pub fn state(&self) -> &PooledState {
        &self.state
    }

    pub fn counts(&self) -> &Counts {
        &self.state.counts
    }

    pub fn result(&self) -> Option<f64> {
        self.state.result
    }

    pub fn is_usable(&self) -> bool {
        self.state.result.is_some()
    }

    /// `None` while no metric is defined.
    pub fn passed(&self) -> Option<bool> {
        if self.requirement.must_hold_for_any_target {
            return (self.state.num_targets > 0).then_some(self.state.num_failed_targets == 0);
        }
        self.state.result.map(|v| self.requirement.condition_passed(v))
    }

    pub fn interest(&self, utn: Utn) -> f64 {
        self.state.interest.get(&utn).copied().unwrap_or(0.0)
    }

    pub fn num_single_results(&self) -> usize {
        self.contributors.len()
    }

    pub fn num_usable_single_results(&self) -> usize {
        self.contributors.iter().filter(|s| s.is_usable()).count()
    }

    pub fn num_unusable_single_results(&self) -> usize {
        self.num_single_results() - self.num_usable_single_results()
    }

    pub fn summary(&self) -> JoinedSummary {
        JoinedSummary {
            requirement: self.requirement.name.clone(),
            short_name: self.requirement.short_name.clone(),
            group: self.requirement.group.clone(),
            sector_layer: self.sector_layer.clone(),
            condition: self.requirement.condition_str(),
            result: self.state.result,
            passed: self.passed(),
            num_targets: self.state.num_targets,
            num_failed_targets: self.state.num_failed_targets,
            num_single_results: self.num_single_results(),
            num_unusable_single_results: self.num_unusable_single_results(),
            num_issues: self.state.num_issues,
            counts: self.state.counts.clone(),
        }
    }
}

/// Report row of a joined result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedSummary {
    pub requirement: String,
    pub short_name: String,
    pub group: String,
    pub sector_layer: String,
    pub condition: String,
    pub result: Option<f64>,
    pub passed: Option<bool>,
    pub num_targets: u32,
    pub num_failed_targets: u32,
    pub num_single_results: usize,
    pub num_unusable_single_results: usize,
    pub num_issues: u32,
    pub counts: Counts,
}
