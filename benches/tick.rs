//! Benchmarks for the CPU tick.
//!
//! Run with: `cargo bench --bench tick`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use rgbd_particles::prelude::*;

fn random_source(half_width: u32, height: u32) -> StillFrameSource {
    let mut rng = StdRng::seed_from_u64(7);
    let frame = RgbdFrame::from_fn(half_width, height, 3.0, |_, _| {
        let color = Vec3::new(rng.gen(), rng.gen(), rng.gen());
        (color, rng.gen_range(0.5..2.5))
    });
    let intrinsics = Intrinsics::new(200.0, 200.0, half_width as f32 / 2.0, height as f32 / 2.0);
    StillFrameSource::new(frame, intrinsics)
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    let source = random_source(320, 240);

    for grid in [64u32, 128, 256] {
        group.bench_with_input(BenchmarkId::new("grid", grid), &grid, |b, &grid| {
            let mut sim = Simulation::new()
                .with_grid_size(grid)
                .build()
                .expect("valid config");
            let mut time = 0.0;
            b.iter(|| {
                time += 1.0 / 60.0;
                sim.tick(black_box(1.0 / 60.0), time, &source);
            })
        });
    }

    group.finish();
}

fn bench_filtered_tick(c: &mut Criterion) {
    let source = random_source(320, 240);
    let mut sim = Simulation::new()
        .with_grid_size(128)
        .with_tunables(Tunables::default().with_filter(2.0, 0.5).expect("valid filter"))
        .build()
        .expect("valid config");

    let mut time = 0.0;
    c.bench_function("tick_filter_radius_2", |b| {
        b.iter(|| {
            time += 1.0 / 60.0;
            sim.tick(1.0 / 60.0, time, &source);
        })
    });
}

criterion_group!(benches, bench_tick, bench_filtered_tick);
criterion_main!(benches);
