//! Evaluation configuration
//!
//! Settings, sector layers, requirement groups and sensor sites, loadable
//! from YAML or JSON. Settings are handed to the evaluators explicitly
//! through [`crate::requirement::EvalContext`].

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::data::SectorLayer;
use crate::error::{EvalError, Result};
use crate::geo::DataSourceRegistry;
use crate::requirement::Requirement;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EvaluationSettings {
    /// Max seconds between a test update and its mapped reference.
    #[serde(default = "default_max_ref_time_diff")]
    pub max_ref_time_diff: f64,
    /// Leave out details for samples without reference data.
    #[serde(default)]
    pub skip_no_data_details: bool,
    /// Report only targets with issues.
    #[serde(default)]
    pub report_skip_targets_wo_issues: bool,
    /// Seconds searched for a reference ground bit around a timestamp.
    #[serde(default = "default_ground_bit_tolerance")]
    pub ground_bit_tolerance: f64,
}

fn default_max_ref_time_diff() -> f64 {
    4.0
}

fn default_ground_bit_tolerance() -> f64 {
    15.0
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            max_ref_time_diff: default_max_ref_time_diff(),
            skip_no_data_details: false,
            report_skip_targets_wo_issues: false,
            ground_bit_tolerance: default_ground_bit_tolerance(),
        }
    }
}

impl EvaluationSettings {
    pub fn with_max_ref_time_diff(mut self, secs: f64) -> Self {
        self.max_ref_time_diff = secs;
        self
    }

    pub fn with_skip_no_data_details(mut self, skip: bool) -> Self {
        self.skip_no_data_details = skip;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RequirementGroup {
    pub name: String,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct EvaluationConfig {
    #[serde(default)]
    pub settings: EvaluationSettings,
    #[serde(default)]
    pub sector_layers: Vec<SectorLayer>,
    #[serde(default)]
    pub requirement_groups: Vec<RequirementGroup>,
    /// Sensor sites by data source id, needed by radar deviations.
    #[serde(default)]
    pub data_sources: DataSourceRegistry,
}

impl EvaluationConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a `.json` file as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        debug!("loading evaluation config from {:?}", path);
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.settings;
        if !(s.max_ref_time_diff > 0.0) {
            return Err(EvalError::Config("max_ref_time_diff must be > 0".to_string()));
        }
        if !(s.ground_bit_tolerance >= 0.0) {
            return Err(EvalError::Config("ground_bit_tolerance must be >= 0".to_string()));
        }

        let mut layer_names = HashSet::new();
        for layer in &self.sector_layers {
            if !layer_names.insert(layer.name.as_str()) {
                return Err(EvalError::Config(format!("duplicate sector layer '{}'", layer.name)));
            }
            if let Some(sector) = layer.sectors.iter().find(|s| s.points.len() < 3) {
                return Err(EvalError::Config(format!(
                    "sector '{}' in layer '{}' needs at least 3 points",
                    sector.name, layer.name
                )));
            }
        }

        let mut req_names = HashSet::new();
        for req in self.requirement_groups.iter().flat_map(|g| g.requirements.iter()) {
            req.validate()?;
            if !req_names.insert(req.name.as_str()) {
                return Err(EvalError::Config(format!("duplicate requirement '{}'", req.name)));
            }
        }
        Ok(())
    }

    /// All requirements, each tagged with its group name.
    pub fn requirements(&self) -> Vec<Arc<Requirement>> {
        self.requirement_groups
            .iter()
            .flat_map(|g| {
                g.requirements.iter().map(move |r| {
                    let mut r = r.clone();
                    if r.group.is_empty() {
                        r.group = g.name.clone();
                    }
                    Arc::new(r)
                })
            })
            .collect()
    }

    pub fn sector_layer(&self, name: &str) -> Result<&SectorLayer> {
        self.sector_layers
            .iter()
            .find(|l| l.name == name)
            .ok_or_else(|| EvalError::UnknownSectorLayer(name.to_string()))
    }

    pub fn requirement(&self, name: &str) -> Result<Arc<Requirement>> {
        self.requirements()
            .into_iter()
            .find(|r| r.name == name)
            .ok_or_else(|| EvalError::UnknownRequirement(name.to_string()))
    }

    /// JSON Schema of the configuration file.
    pub fn json_schema() -> serde_json::Value {
        serde_json::to_value(schema_for!(EvaluationConfig)).unwrap_or(serde_json::Value::Null)
    }

    /// SHA-256 over the canonical JSON form, recorded in reports.
    pub fn fingerprint(&self) -> Result<String> {
        let json = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&json)))
    }
}
