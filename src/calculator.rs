//! Evaluation run driver
//!
//! Evaluates every (target × sector layer × requirement) triple in
//! parallel, hands the singles to the [`ResultsCache`] and rebuilds each
//! joined result once. Operator use-flag changes rebuild only the joined
//! results the target contributes to.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EvaluationConfig;
use crate::data::{TargetData, UseFlag, Utn};
use crate::error::Result;
use crate::requirement::{EvalContext, Requirement};
use crate::result::joined::JoinedSummary;
use crate::result::single::SingleSummary;
use crate::result::{ResultsCache, SingleResult};

pub struct Calculator {
    config: EvaluationConfig,
    requirements: Vec<Arc<Requirement>>,
    cache: ResultsCache,
    run_id: Uuid,
    started: Option<DateTime<Utc>>,
    finished: Option<DateTime<Utc>>,
    num_targets: usize,
}

impl Calculator {
    pub fn new(config: EvaluationConfig) -> Result<Self> {
        config.validate()?;
        let requirements = config.requirements();
        Ok(Self {
            config,
            requirements,
            cache: ResultsCache::new(),
            run_id: Uuid::new_v4(),
            started: None,
            finished: None,
            num_targets: 0,
        })
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn results(&self) -> &ResultsCache {
        &self.cache
    }

    /// Evaluates all targets and returns the report. Earlier results are
    /// discarded.
    pub fn evaluate(&mut self, targets: &[Arc<dyn TargetData>]) -> EvaluationReport {
        self.run_id = Uuid::new_v4();
        self.started = Some(Utc::now());
        self.num_targets = targets.len();
        self.cache.clear();

        info!(
            "evaluation {}: {} targets, {} requirements, {} sector layers",
            self.run_id,
            targets.len(),
            self.requirements.len(),
            self.config.sector_layers.len()
        );

        let settings = &self.config.settings;
        let layers = &self.config.sector_layers;
        let registry = &self.config.data_sources;
        let requirements = &self.requirements;

        let singles: Vec<(SingleResult, UseFlag)> = targets
            .par_iter()
            .flat_map_iter(|target| {
                let target: &dyn TargetData = target.as_ref();
                layers.iter().flat_map(move |layer| {
                    let ctx = EvalContext::new(settings, layer, registry);
                    requirements
                        .iter()
                        .map(move |req| (req.evaluate(&ctx, target), target.use_flag()))
                })
                .collect::<Vec<_>>()
            })
            .collect();

        let num_singles = singles.len();
        for (single, use_flag) in singles {
            self.cache.insert(single, use_flag);
        }
        self.cache.update_all();
        self.finished = Some(Utc::now());

        let report = self.report();
        info!(
            "evaluation {} finished: {} single results, {} joined results, {} passed",
            self.run_id,
            num_singles,
            self.cache.num_joined(),
            report.joined.iter().filter(|j| j.passed == Some(true)).count()
        );
        report
    }

    /// Sets the operator use flag of a target and rebuilds the affected
    /// joined results. Returns how many were rebuilt.
    pub fn set_target_use(&mut self, utn: Utn, used: bool) -> usize {
        let Some(flag) = self.cache.use_flag(utn) else {
            warn!("set_target_use: no results for utn {}", utn);
            return 0;
        };
        if flag.get() == used {
            return 0;
        }
        flag.set(used);
        let n = self.cache.update_for(utn);
        debug!("utn {} use set to {}, {} joined results rebuilt", utn, used, n);
        n
    }

    pub fn report(&self) -> EvaluationReport {
        let joined = self.cache.joined_results().map(|j| j.summary()).collect();

        let skip_clean = self.config.settings.report_skip_targets_wo_issues;
        let targets = self
            .cache
            .utns()
            .filter_map(|utn| {
                let singles = self.cache.singles(utn);
                let num_issues: u32 = singles.iter().filter(|s| s.has_issues()).map(|s| s.num_issues()).sum();
                if skip_clean && num_issues == 0 {
                    return None;
                }
                Some(TargetRow {
                    utn,
                    used: self.cache.use_flag(utn).map_or(true, UseFlag::get),
                    num_issues,
                    results: singles.iter().map(|s| s.summary()).collect(),
                })
            })
            .collect();

        EvaluationReport {
            run_id: self.run_id,
            config_fingerprint: self.config.fingerprint().ok(),
            started: self.started,
            finished: self.finished,
            num_targets: self.num_targets,
            joined,
            targets,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetRow {
    pub utn: Utn,
    pub used: bool,
    pub num_issues: u32,
    pub results: Vec<SingleSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub run_id: Uuid,
    pub config_fingerprint: Option<String>,
    pub started: Option<DateTime<Utc>>,
    pub finished: Option<DateTime<Utc>>,
    pub num_targets: usize,
    pub joined: Vec<JoinedSummary>,
    pub targets: Vec<TargetRow>,
}

impl EvaluationReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn joined(&self, requirement: &str, sector_layer: &str) -> Option<&JoinedSummary> {
        self.joined
            .iter()
            .find(|j| j.requirement == requirement && j.sector_layer == sector_layer)
    }
}
