//! Track Evaluation Engine
//!
//! Scores surveillance test data against reference data, per target and
//! pooled over all targets:
//! - Presence, falseness and correctness of identification, address, Mode 3/A and Mode C
//! - Detection-style interval scoring with missed update intervals
//! - Geometric deviations (distance, along/across track, radar range and azimuth, speed, track angle)
//! - Extra data, extra tracks, dubious tracks and dubious targets
//! - Joined results rebuilt from scratch on every use-flag change

pub mod calculator;
pub mod compare;
pub mod config;
pub mod data;
pub mod detail;
pub mod error;
pub mod geo;
pub mod requirement;
pub mod result;
pub mod time_period;
pub mod utils;

// Re-exports for convenience
pub use calculator::{Calculator, EvaluationReport};
pub use config::{EvaluationConfig, EvaluationSettings, RequirementGroup};
pub use data::{InMemoryTarget, Sample, SectorLayer, TargetData, Utn};
pub use error::{EvalError, Result};
pub use requirement::{Requirement, RequirementKind};
pub use result::{JoinedResult, ResultsCache, SingleResult};
