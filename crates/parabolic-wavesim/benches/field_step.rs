//! Per-step cost of the field integrator.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use parabolic_wavesim::simulation::{MaterialMap, ReflectorProfile, SimulationConfig, StepMode};

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_step");

    for resolution in [100usize, 300, 600] {
        for mode in [StepMode::Sequential, StepMode::Parallel] {
            let id = BenchmarkId::new(format!("{mode:?}"), resolution);
            group.bench_with_input(id, &resolution, |b, &resolution| {
                let mut sim = SimulationConfig::coarse(resolution)
                    .build()
                    .expect("canonical configuration builds");
                sim.set_step_mode(mode);
                // Start from a field with the pulse already underway.
                sim.step_n(500);

                b.iter(|| {
                    sim.step();
                    black_box(sim.values()[0]);
                });
            });
        }
    }

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let profile = ReflectorProfile::canonical();
    let outer = profile.outer().expect("outer reflector");
    let inner = profile.inner().expect("inner reflector");

    let mut group = c.benchmark_group("classify");
    for resolution in [300usize, 600] {
        let grid = SimulationConfig::coarse(resolution).resolved_grid();
        group.bench_with_input(BenchmarkId::from_parameter(resolution), &grid, |b, grid| {
            b.iter(|| {
                let map = MaterialMap::classify(grid, &outer, &inner, profile.media.shell_thickness)
                    .expect("classification succeeds");
                black_box(map.resolution());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_step, bench_classify);
criterion_main!(benches);
