//! Owner of all results of a run.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{JoinedResult, SingleResult};
use crate::data::{UseFlag, Utn};

/// Singles indexed by UTN, joined results by (requirement, sector layer).
#[derive(Debug, Default)]
pub struct ResultsCache {
    singles: BTreeMap<Utn, Vec<Arc<SingleResult>>>,
    joined: BTreeMap<(String, String), JoinedResult>,
    use_flags: BTreeMap<Utn, UseFlag>,
}

impl ResultsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.singles.clear();
        self.joined.clear();
        self.use_flags.clear();
    }

    /// Stores a single and registers it with its joined result; the joined
    /// result is rebuilt later by [`Self::update_all`] or [`Self::update_for`].
    pub fn insert(&mut self, single: SingleResult, use_flag: UseFlag) {
        let single = Arc::new(single);
        let key = (single.requirement().name.clone(), single.sector_layer().to_string());

        self.use_flags.entry(single.utn()).or_insert(use_flag);
        self.joined
            .entry(key)
            .or_insert_with(|| JoinedResult::new(Arc::clone(single.requirement()), single.sector_layer()))
            .add_single_result(Arc::clone(&single));
        self.singles.entry(single.utn()).or_default().push(single);
    }

    pub fn update_all(&mut self) {
        self.joined.values_mut().for_each(JoinedResult::update_to_use_changes);
    }

    /// Rebuilds the joined results the target contributes to.
    pub fn update_for(&mut self, utn: Utn) -> usize {
        let mut n = 0;
        for joined in self.joined.values_mut().filter(|j| j.contains(utn)) {
            joined.update_to_use_changes();
            n += 1;
        }
        n
    }

    pub fn use_flag(&self, utn: Utn) -> Option<&UseFlag> {
        self.use_flags.get(&utn)
    }

    pub fn singles(&self, utn: Utn) -> &[Arc<SingleResult>] {
        self.singles.get(&utn).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn all_singles(&self) -> impl Iterator<Item = &Arc<SingleResult>> {
        self.singles.values().flatten()
    }

    pub fn utns(&self) -> impl Iterator<Item = Utn> + '_ {
        self.singles.keys().copied()
    }

    pub fn joined(&self, requirement: &str, sector_layer: &str) -> Option<&JoinedResult> {
        self.joined.get(&(requirement.to_string(), sector_layer.to_string()))
    }

    pub fn joined_results(&self) -> impl Iterator<Item = &JoinedResult> {
        self.joined.values()
    }

    pub fn num_joined(&self) -> usize {
        self.joined.len()
    }
}
