//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use std::sync::Arc;

use track_eval::config::EvaluationSettings;
use track_eval::data::{InMemoryTarget, Sample, Sector, SectorLayer, TargetData, TargetPosition};
use track_eval::geo::DataSourceRegistry;
use track_eval::requirement::EvalContext;
use track_eval::utils::{from_epoch_secs, Timestamp};

pub fn ts(secs: f64) -> Timestamp {
    from_epoch_secs(secs)
}

/// Box around 48N 16E, 47..49 N, 15..17 E.
pub fn fir() -> SectorLayer {
    SectorLayer::new("fir").with_sector(Sector::new(
        "box",
        vec![[47.0, 15.0], [47.0, 17.0], [49.0, 17.0], [49.0, 15.0]],
    ))
}

pub fn inside() -> TargetPosition {
    TargetPosition::new(48.0, 16.0).with_altitude(10000.0)
}

pub fn outside() -> TargetPosition {
    TargetPosition::new(52.0, 16.0).with_altitude(10000.0)
}

/// Reference and test every second over `[0, n)`, both carrying `mode_a`.
pub fn steady_target(utn: u32, n: usize, mode_a: u32) -> InMemoryTarget {
    let reference = (0..n).map(|i| Sample::new(ts(i as f64), inside()).with_mode_a(mode_a)).collect();
    let test = (0..n).map(|i| Sample::new(ts(i as f64), inside()).with_mode_a(mode_a)).collect();
    InMemoryTarget::new(utn, reference, test)
}

pub struct Fixture {
    pub settings: EvaluationSettings,
    pub layer: SectorLayer,
    pub registry: DataSourceRegistry,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            settings: EvaluationSettings::default(),
            layer: fir(),
            registry: DataSourceRegistry::new(),
        }
    }

    pub fn ctx(&self) -> EvalContext<'_> {
        EvalContext::new(&self.settings, &self.layer, &self.registry)
    }
}

pub fn shared(targets: Vec<InMemoryTarget>) -> Vec<Arc<dyn TargetData>> {
    targets
        .into_iter()
        .map(|t| Arc::new(t) as Arc<dyn TargetData>)
        .collect()
}
