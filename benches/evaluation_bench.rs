use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use track_eval::config::RequirementGroup;
use track_eval::data::{Field, Sector, TargetPosition};
use track_eval::requirement::{
    ComparisonType, DeviationConfig, IntervalConfig, Measure, PresenceConfig, Validity,
};
use track_eval::utils::from_epoch_secs;
use track_eval::{Calculator, EvaluationConfig, InMemoryTarget, Requirement, RequirementKind, Sample, SectorLayer, TargetData};

/// Straight eastbound track at 1 Hz with a test chain dropping every 7th update.
fn synthetic_target(utn: u32, len: usize) -> Arc<dyn TargetData> {
    let lat = 47.2 + (utn % 50) as f64 * 0.03;
    let pos = |i: usize, offset: f64| TargetPosition::new(lat + offset, 15.2 + i as f64 * 0.002).with_altitude(12000.0);

    let reference = (0..len)
        .map(|i| {
            Sample::new(from_epoch_secs(i as f64), pos(i, 0.0))
                .with_mode_a(0o1000 + utn % 0o777)
                .with_velocity(230.0, 90.0)
        })
        .collect();
    let test = (0..len)
        .filter(|i| i % 7 != 3)
        .map(|i| {
            Sample::new(from_epoch_secs(i as f64 + 0.2), pos(i, 0.0003))
                .with_mode_a(0o1000 + utn % 0o777)
                .with_track_num(utn)
        })
        .collect();
    Arc::new(InMemoryTarget::new(utn, reference, test))
}

fn config() -> EvaluationConfig {
    let requirements = vec![
        Requirement::new(
            "Mode 3/A Present",
            "MA-P",
            RequirementKind::Presence(PresenceConfig { field: Field::ModeA }),
        )
        .with_condition(ComparisonType::GreaterThanOrEqual, 0.98),
        Requirement::new("PD", "PD", RequirementKind::Interval(IntervalConfig::new(Validity::Detection, 4.0)))
            .with_condition(ComparisonType::GreaterThanOrEqual, 0.97),
        Requirement::new(
            "Position Distance",
            "POS",
            RequirementKind::Deviation(DeviationConfig::new(Measure::Distance, 50.0)),
        )
        .with_condition(ComparisonType::GreaterThanOrEqual, 0.9),
    ];

    EvaluationConfig {
        sector_layers: vec![SectorLayer::new("fir").with_sector(Sector::new(
            "box",
            vec![[47.0, 15.0], [47.0, 17.0], [49.0, 17.0], [49.0, 15.0]],
        ))],
        requirement_groups: vec![RequirementGroup { name: "Bench".to_string(), requirements }],
        ..Default::default()
    }
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    group.sample_size(20);

    for num_targets in [16_usize, 128_usize] {
        let targets: Vec<_> = (0..num_targets).map(|utn| synthetic_target(utn as u32, 600)).collect();
        let mut calc = Calculator::new(config()).expect("bench config");

        group.throughput(Throughput::Elements(num_targets as u64));
        group.bench_with_input(BenchmarkId::new("fleet", num_targets), &num_targets, |b, _| {
            b.iter(|| black_box(calc.evaluate(black_box(&targets))));
        });
    }

    group.finish();
}

fn bench_use_toggle(c: &mut Criterion) {
    let targets: Vec<_> = (0..128).map(|utn| synthetic_target(utn, 600)).collect();
    let mut calc = Calculator::new(config()).expect("bench config");
    calc.evaluate(&targets);

    c.bench_function("set_target_use", |b| {
        let mut used = false;
        b.iter(|| {
            black_box(calc.set_target_use(black_box(42), used));
            used = !used;
        });
    });
}

criterion_group!(benches, bench_evaluate, bench_use_toggle);
criterion_main!(benches);
